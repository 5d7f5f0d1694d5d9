//! Detection evaluator: greedy IoU matching per class, all-points AP, mAP.
//!
//! Matching: within one class, predictions are taken in descending score order
//! (stable, so equal scores keep input order). Each one is matched to the unconsumed
//! ground-truth box of the same class with the highest IoU; on exact IoU ties the
//! first box wins. A match needs IoU >= threshold and consumes the box.
//!
//! AP uses the all-points interpolated precision envelope with sentinel points at
//! recall 0 and 1. mAP averages AP over the configured classes that have at least
//! one ground-truth instance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::report::{f1_score, ratio};
use crate::models::{ClassCounts, ConfusionMatrix, DataError, Element, ElementClass, EvaluationReport};

use super::error::EvaluationError;
use super::validation::{validate_elements, validate_iou_threshold};

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionEvalConfig {
    pub iou_threshold: f32,
    /// Classes being scored. Predictions outside this set are reported as data errors.
    pub classes: Vec<ElementClass>,
}

impl Default for DetectionEvalConfig {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            classes: ElementClass::ALL.to_vec(),
        }
    }
}

impl DetectionEvalConfig {
    pub fn with_threshold(iou_threshold: f32) -> Self {
        Self {
            iou_threshold,
            ..Default::default()
        }
    }
}

/// Outcome of greedy matching for one class.
#[derive(Debug, Clone, Default)]
struct ClassMatch {
    /// `(prediction index, matched ground-truth index)` in rank order.
    ranked: Vec<(usize, Option<usize>)>,
    gt_indices: Vec<usize>,
}

impl ClassMatch {
    fn hits(&self) -> Vec<bool> {
        self.ranked.iter().map(|(_, gt)| gt.is_some()).collect()
    }

    fn tp(&self) -> usize {
        self.ranked.iter().filter(|(_, gt)| gt.is_some()).count()
    }
}

/// Evaluate with the default class set.
pub fn evaluate_detections(
    predictions: &[Element],
    ground_truth: &[Element],
    iou_threshold: f32,
) -> Result<EvaluationReport, EvaluationError> {
    evaluate(predictions, ground_truth, &DetectionEvalConfig::with_threshold(iou_threshold))
}

pub fn evaluate(
    predictions: &[Element],
    ground_truth: &[Element],
    config: &DetectionEvalConfig,
) -> Result<EvaluationReport, EvaluationError> {
    validate_iou_threshold(config.iou_threshold)?;
    validate_elements(predictions, "prediction")?;
    validate_elements(ground_truth, "ground truth")?;

    if let Some((index, gt)) = ground_truth
        .iter()
        .enumerate()
        .find(|(_, gt)| !config.classes.contains(&gt.class))
    {
        return Err(EvaluationError::malformed(format!(
            "ground truth #{index}: class {} is not in the evaluated class set",
            gt.class
        )));
    }

    let mut data_errors = Vec::new();
    let mut scored = vec![true; predictions.len()];
    for (index, pred) in predictions.iter().enumerate() {
        if !config.classes.contains(&pred.class) {
            scored[index] = false;
            data_errors.push(DataError {
                index,
                element_id: pred.id,
                reason: format!("class {} is not in the evaluated class set", pred.class),
            });
        }
    }

    let mut per_class_ap = BTreeMap::new();
    let mut counts = BTreeMap::new();
    let mut matched_pred = vec![false; predictions.len()];
    let mut matched_gt = vec![false; ground_truth.len()];
    let (mut tp_total, mut pred_total) = (0usize, 0usize);

    for &class in &config.classes {
        let pred_indices: Vec<usize> = (0..predictions.len())
            .filter(|&i| scored[i] && predictions[i].class == class)
            .collect();
        let gt_indices: Vec<usize> = (0..ground_truth.len())
            .filter(|&i| ground_truth[i].class == class)
            .collect();

        let m = match_class(predictions, ground_truth, &pred_indices, gt_indices, config.iou_threshold);
        for &(p, gt) in &m.ranked {
            if let Some(g) = gt {
                matched_pred[p] = true;
                matched_gt[g] = true;
            }
        }

        let tp = m.tp();
        let n_gt = m.gt_indices.len();
        counts.insert(
            class.as_str().to_string(),
            ClassCounts {
                tp,
                fp: m.ranked.len() - tp,
                fn_: n_gt - tp,
                ground_truth: n_gt,
                predictions: m.ranked.len(),
            },
        );
        if n_gt > 0 {
            per_class_ap.insert(class.as_str().to_string(), average_precision(&m.hits(), n_gt));
        }
        tp_total += tp;
        pred_total += m.ranked.len();
    }

    let map = if per_class_ap.is_empty() {
        0.0
    } else {
        per_class_ap.values().sum::<f32>() / per_class_ap.len() as f32
    };
    let precision = ratio(tp_total, pred_total);
    let recall = ratio(tp_total, ground_truth.len());

    let confusion_matrix = confusion(
        predictions,
        ground_truth,
        &scored,
        &matched_pred,
        &matched_gt,
        config.iou_threshold,
    );

    tracing::debug!(
        predictions = predictions.len(),
        ground_truth = ground_truth.len(),
        data_errors = data_errors.len(),
        map,
        "Detection evaluation complete"
    );

    Ok(EvaluationReport {
        per_class_ap,
        map,
        precision,
        recall,
        f1: f1_score(precision, recall),
        confusion_matrix,
        counts,
        data_errors,
        iou_threshold: config.iou_threshold,
    })
}

fn match_class(
    predictions: &[Element],
    ground_truth: &[Element],
    pred_indices: &[usize],
    gt_indices: Vec<usize>,
    threshold: f32,
) -> ClassMatch {
    let mut order = pred_indices.to_vec();
    // sort_by is stable: equal scores keep input order
    order.sort_by(|&a, &b| predictions[b].score.total_cmp(&predictions[a].score));

    let mut consumed = vec![false; gt_indices.len()];
    let mut ranked = Vec::with_capacity(order.len());

    for p in order {
        let mut best: Option<(usize, f32)> = None;
        for (slot, &g) in gt_indices.iter().enumerate() {
            if consumed[slot] {
                continue;
            }
            let iou = predictions[p].bbox.iou(&ground_truth[g].bbox);
            if best.map_or(true, |(_, b)| iou > b) {
                best = Some((slot, iou));
            }
        }
        match best {
            Some((slot, iou)) if iou >= threshold => {
                consumed[slot] = true;
                ranked.push((p, Some(gt_indices[slot])));
            }
            _ => ranked.push((p, None)),
        }
    }

    ClassMatch { ranked, gt_indices }
}

/// All-points interpolated AP for a ranked hit list against `n_gt` ground-truth boxes.
pub fn average_precision(hits: &[bool], n_gt: usize) -> f32 {
    if n_gt == 0 {
        return 0.0;
    }

    let mut recall = Vec::with_capacity(hits.len() + 2);
    let mut precision = Vec::with_capacity(hits.len() + 2);
    recall.push(0.0f64);
    precision.push(0.0f64);

    let mut tp = 0usize;
    for (rank, &hit) in hits.iter().enumerate() {
        if hit {
            tp += 1;
        }
        recall.push(tp as f64 / n_gt as f64);
        precision.push(tp as f64 / (rank + 1) as f64);
    }
    recall.push(1.0);
    precision.push(0.0);

    // Monotone envelope, right to left
    for i in (0..precision.len() - 1).rev() {
        precision[i] = precision[i].max(precision[i + 1]);
    }

    let mut ap = 0.0f64;
    for i in 0..recall.len() - 1 {
        let step = recall[i + 1] - recall[i];
        if step > 0.0 {
            ap += step * precision[i + 1];
        }
    }
    ap as f32
}

/// Class-agnostic confusion matrix over all element classes.
///
/// Per-class matches sit on the diagonal. Leftovers are then paired across classes
/// by IoU (highest-scoring prediction first) to expose misclassifications; whatever
/// is still unpaired goes to the `Background` row or column.
fn confusion(
    predictions: &[Element],
    ground_truth: &[Element],
    scored: &[bool],
    matched_pred: &[bool],
    matched_gt: &[bool],
    threshold: f32,
) -> ConfusionMatrix {
    let labels = ElementClass::ALL.iter().map(|c| c.as_str().to_string()).collect();
    let mut cm = ConfusionMatrix::new(labels);
    let background = ElementClass::Background.as_str();

    for (p, pred) in predictions.iter().enumerate() {
        if matched_pred[p] {
            cm.record(pred.class.as_str(), pred.class.as_str());
        }
    }

    let mut free_gt: Vec<usize> = (0..ground_truth.len()).filter(|&g| !matched_gt[g]).collect();
    let mut leftovers: Vec<usize> = (0..predictions.len())
        .filter(|&p| scored[p] && !matched_pred[p])
        .collect();
    leftovers.sort_by(|&a, &b| predictions[b].score.total_cmp(&predictions[a].score));

    for p in leftovers {
        let mut best: Option<(usize, f32)> = None;
        for (slot, &g) in free_gt.iter().enumerate() {
            let iou = predictions[p].bbox.iou(&ground_truth[g].bbox);
            if best.map_or(true, |(_, b)| iou > b) {
                best = Some((slot, iou));
            }
        }
        match best {
            Some((slot, iou)) if iou >= threshold => {
                let g = free_gt.remove(slot);
                cm.record(ground_truth[g].class.as_str(), predictions[p].class.as_str());
            }
            _ => {
                cm.record(background, predictions[p].class.as_str());
            }
        }
    }

    for g in free_gt {
        cm.record(ground_truth[g].class.as_str(), background);
    }

    cm
}
