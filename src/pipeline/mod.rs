//! Stage pipeline: providers, guarded calls, the stage controller and batch runs.

pub mod batch;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod invoke;
pub mod providers;

pub use batch::{BatchEntry, BatchProcessor, BatchReport};
pub use config::{ConfigError, PipelineConfig};
pub use controller::{DocumentOutcome, StageController};
pub use diagnostics::{Diagnostic, Diagnostics, Step};
pub use error::PipelineError;
pub use invoke::{invoke, CallError, CallFailure};
pub use providers::{
    Detector, Generation, Generator, MockDetector, MockGenerator, MockRecognizer, ProviderError, Recognition,
    Recognizer,
};
