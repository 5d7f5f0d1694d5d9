use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Malformed input: {reason}")]
    MalformedInput { reason: String },

    #[error("Length mismatch: {predictions} predictions vs {truth} ground-truth labels")]
    LengthMismatch { predictions: usize, truth: usize },
}

impl EvaluationError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            reason: reason.into(),
        }
    }
}
