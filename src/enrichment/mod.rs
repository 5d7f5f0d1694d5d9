//! Stage 3 enrichment over a finished Stage 2 result.
//!
//! Each sub-step is a separate function returning its own `Result`, so the
//! controller can degrade one field without touching the others.

pub mod cross_reference;
pub mod enhance;
pub mod semantic;
pub mod summary;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cross_reference::detect_cross_references;
pub use enhance::enhance_descriptions;
pub use semantic::analyze;
pub use summary::summarize;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnrichmentError {
    #[error("Page has zero width or height")]
    EmptyPage,

    #[error("Invalid enrichment input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub proximity_weight: f32,
    pub lexical_weight: f32,
    /// References are emitted only when strictly stronger than this.
    pub cross_reference_threshold: f32,
    /// Average recognition confidence below this triggers a recommendation.
    pub low_ocr_confidence: f32,
    /// Average language confidence below this triggers a recommendation.
    pub low_language_confidence: f32,
    /// Nearest text snippets attached to an enhanced description.
    pub max_nearby_text: usize,
    /// Element count at which the density component saturates.
    pub density_saturation: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            proximity_weight: 0.5,
            lexical_weight: 0.5,
            cross_reference_threshold: 0.4,
            low_ocr_confidence: 0.6,
            low_language_confidence: 0.5,
            max_nearby_text: 3,
            density_saturation: 50,
        }
    }
}
