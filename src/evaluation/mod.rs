//! Offline scoring of pipeline output against ground truth.
//!
//! Everything here is pure: no I/O, no shared state.

pub mod detection;
pub mod document;
pub mod error;
pub mod generation;
pub mod recognition;
pub mod validation;

pub use detection::{evaluate, evaluate_detections, DetectionEvalConfig, DEFAULT_IOU_THRESHOLD};
pub use document::{evaluate_document, DocumentEvalConfig, DocumentEvaluation, GroundTruth};
pub use error::EvaluationError;
pub use generation::{score_generation, GenerationScore};
pub use recognition::{score, score_corpus, RecognitionScore};
