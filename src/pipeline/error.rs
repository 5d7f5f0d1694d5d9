use thiserror::Error;

use crate::models::InvalidStage;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Fatal detection failure: {reason}")]
    FatalDetectionFailure { reason: String },

    #[error(transparent)]
    InvalidStage(#[from] InvalidStage),

    /// A panic escaped the guarded provider calls.
    #[error("Document processing panicked: {message}")]
    Panicked { message: String },
}

impl PipelineError {
    pub fn detection(reason: impl Into<String>) -> Self {
        Self::FatalDetectionFailure {
            reason: reason.into(),
        }
    }
}
