//! Accuracy, macro precision/recall/F1 and confusion matrix for language labels.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::evaluation::EvaluationError;
use crate::models::report::{f1_score, ratio};
use crate::models::ConfusionMatrix;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    /// Number of true instances of the label.
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageMetrics {
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub per_language: BTreeMap<String, LabelMetrics>,
    pub confusion_matrix: ConfusionMatrix,
}

/// Score predicted labels against truth, position by position.
///
/// Labels are the sorted union of both lists; overall precision, recall and F1 are
/// macro averages over that label set.
pub fn evaluate<S: AsRef<str>>(predictions: &[S], truth: &[S]) -> Result<LanguageMetrics, EvaluationError> {
    if predictions.len() != truth.len() {
        return Err(EvaluationError::LengthMismatch {
            predictions: predictions.len(),
            truth: truth.len(),
        });
    }

    let labels: BTreeSet<&str> = predictions
        .iter()
        .chain(truth.iter())
        .map(AsRef::as_ref)
        .collect();
    let mut cm = ConfusionMatrix::new(labels.iter().map(|l| l.to_string()).collect());

    let mut correct = 0usize;
    for (p, t) in predictions.iter().zip(truth) {
        let (p, t) = (p.as_ref(), t.as_ref());
        cm.record(t, p);
        if p == t {
            correct += 1;
        }
    }

    let n = cm.labels.len();
    let mut per_language = BTreeMap::new();
    for (i, label) in cm.labels.iter().enumerate() {
        let tp = cm.matrix[i][i];
        let predicted: usize = (0..n).map(|r| cm.matrix[r][i]).sum();
        let support: usize = cm.matrix[i].iter().sum();
        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        per_language.insert(
            label.clone(),
            LabelMetrics {
                precision,
                recall,
                f1: f1_score(precision, recall),
                support,
            },
        );
    }

    let macro_avg = |f: fn(&LabelMetrics) -> f32| {
        if per_language.is_empty() {
            0.0
        } else {
            per_language.values().map(f).sum::<f32>() / per_language.len() as f32
        }
    };

    Ok(LanguageMetrics {
        accuracy: ratio(correct, truth.len()),
        precision: macro_avg(|m| m.precision),
        recall: macro_avg(|m| m.recall),
        f1: macro_avg(|m| m.f1),
        per_language,
        confusion_matrix: cm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let labels = ["en", "hi", "ur", "en"];
        let m = evaluate(&labels, &labels).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.f1, 1.0);
        assert_eq!(m.confusion_matrix.labels, vec!["en", "hi", "ur"]);
        assert_eq!(m.confusion_matrix.get("en", "en"), 2);
    }

    #[test]
    fn confusion_is_indexed_true_then_predicted() {
        let truth = ["hi", "hi", "ne", "ur"];
        let pred = ["hi", "ne", "ne", "ar"];
        let m = evaluate(&pred, &truth).unwrap();

        assert_eq!(m.confusion_matrix.labels, vec!["ar", "hi", "ne", "ur"]);
        assert_eq!(m.confusion_matrix.get("hi", "ne"), 1);
        assert_eq!(m.confusion_matrix.get("ur", "ar"), 1);
        assert!((m.accuracy - 0.5).abs() < 1e-6);

        let ne = m.per_language["ne"];
        assert!((ne.precision - 0.5).abs() < 1e-6);
        assert_eq!(ne.recall, 1.0);
        // "ar" is predicted but never true: zero support, zero recall
        assert_eq!(m.per_language["ar"].support, 0);
        assert_eq!(m.per_language["ar"].recall, 0.0);
    }

    #[test]
    fn macro_average_over_label_set() {
        let truth = ["en", "hi"];
        let pred = ["en", "en"];
        let m = evaluate(&pred, &truth).unwrap();
        // en: p=.5 r=1; hi: p=0 r=0
        assert!((m.precision - 0.25).abs() < 1e-6);
        assert!((m.recall - 0.5).abs() < 1e-6);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = evaluate(&["en"], &["en", "hi"]).unwrap_err();
        assert_eq!(err, EvaluationError::LengthMismatch { predictions: 1, truth: 2 });
    }

    #[test]
    fn empty_inputs() {
        let empty: [&str; 0] = [];
        let m = evaluate(&empty, &empty).unwrap();
        assert_eq!(m.accuracy, 0.0);
        assert!(m.confusion_matrix.labels.is_empty());
    }
}
