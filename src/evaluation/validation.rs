//! Input checks run before any scoring. Violations fail fast with the reason.

use std::collections::HashSet;

use crate::models::Element;

use super::error::EvaluationError;

/// Reject elements with degenerate boxes, out-of-range scores or repeated ids.
///
/// `role` names the list in the error ("prediction", "ground truth").
pub fn validate_elements(elements: &[Element], role: &str) -> Result<(), EvaluationError> {
    let mut seen = HashSet::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        element
            .validate()
            .map_err(|reason| EvaluationError::malformed(format!("{role} #{index}: {reason}")))?;
        if !seen.insert(element.id) {
            return Err(EvaluationError::malformed(format!(
                "{role} #{index}: duplicate element id {}",
                element.id
            )));
        }
    }
    Ok(())
}

/// Threshold must be a usable IoU cutoff.
pub fn validate_iou_threshold(threshold: f32) -> Result<(), EvaluationError> {
    if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(EvaluationError::malformed(format!(
            "IoU threshold {threshold} outside (0, 1]"
        )))
    }
}
