//! Evaluation report types shared by the detection and language evaluators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Square count matrix indexed `(true, predicted)` by label position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(labels: Vec<String>) -> Self {
        let n = labels.len();
        Self {
            labels,
            matrix: vec![vec![0; n]; n],
        }
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Count one `(truth, predicted)` pair. Returns false if either label is unknown.
    pub fn record(&mut self, truth: &str, predicted: &str) -> bool {
        match (self.index_of(truth), self.index_of(predicted)) {
            (Some(t), Some(p)) => {
                self.matrix[t][p] += 1;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, truth: &str, predicted: &str) -> usize {
        match (self.index_of(truth), self.index_of(predicted)) {
            (Some(t), Some(p)) => self.matrix[t][p],
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }
}

/// Per-class matching counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub ground_truth: usize,
    pub predictions: usize,
}

/// A prediction excluded from scoring, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataError {
    /// Position in the input prediction list.
    pub index: usize,
    pub element_id: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    #[serde(rename = "per_class_AP")]
    pub per_class_ap: BTreeMap<String, f32>,
    #[serde(rename = "mAP")]
    pub map: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub confusion_matrix: ConfusionMatrix,
    pub counts: BTreeMap<String, ClassCounts>,
    pub data_errors: Vec<DataError>,
    pub iou_threshold: f32,
}

/// Harmonic mean, 0 when both inputs are 0.
pub fn f1_score(precision: f32, recall: f32) -> f32 {
    if precision + recall <= 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// `num / den`, 0 on an empty denominator.
pub fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}
