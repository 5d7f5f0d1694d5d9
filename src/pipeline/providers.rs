//! Capability providers consumed by the stage controller.
//!
//! The models behind these traits live outside this crate. The caller constructs
//! them once and lends them to the controller; nothing here caches or owns them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{BBox, Element, ElementClass, PageImage};

/// Error raised by a provider call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),
}

/// Recognized text for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,
    pub confidence: f32,
}

/// Generated description for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub confidence: f32,
}

/// Layout detector: page in, elements out.
pub trait Detector: Send + Sync {
    fn detect(&self, page: &PageImage) -> Result<Vec<Element>, ProviderError>;
}

/// Text recognizer for one region of a page.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, page: &PageImage, bbox: BBox) -> Result<Recognition, ProviderError>;
}

/// Natural-language description of a non-text region.
pub trait Generator: Send + Sync {
    fn describe(&self, page: &PageImage, bbox: BBox, class: ElementClass) -> Result<Generation, ProviderError>;
}

// ═══════════════════════════════════════════
// Mock providers (tests and wiring checks)
// ═══════════════════════════════════════════

/// Returns a fixed element list, or a fixed error.
pub struct MockDetector {
    pub result: Result<Vec<Element>, ProviderError>,
}

impl MockDetector {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { result: Ok(elements) }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(ProviderError::Inference(message.to_string())),
        }
    }
}

impl Detector for MockDetector {
    fn detect(&self, _page: &PageImage) -> Result<Vec<Element>, ProviderError> {
        self.result.clone()
    }
}

/// Returns per-region text keyed by the region's top-left corner; unknown regions
/// fail.
pub struct MockRecognizer {
    pub texts: HashMap<(i64, i64), String>,
    pub confidence: f32,
}

impl MockRecognizer {
    pub fn new(confidence: f32) -> Self {
        Self {
            texts: HashMap::new(),
            confidence,
        }
    }

    pub fn with_text(mut self, bbox: BBox, text: &str) -> Self {
        self.texts.insert(Self::key(&bbox), text.to_string());
        self
    }

    fn key(bbox: &BBox) -> (i64, i64) {
        (bbox.x.round() as i64, bbox.y.round() as i64)
    }
}

impl Recognizer for MockRecognizer {
    fn recognize(&self, _page: &PageImage, bbox: BBox) -> Result<Recognition, ProviderError> {
        self.texts
            .get(&Self::key(&bbox))
            .map(|text| Recognition {
                text: text.clone(),
                confidence: self.confidence,
            })
            .ok_or_else(|| ProviderError::Inference(format!("no text at ({}, {})", bbox.x, bbox.y)))
    }
}

/// Describes every region as "`<class>` region", or always fails.
pub struct MockGenerator {
    pub confidence: f32,
    pub fail: bool,
}

impl MockGenerator {
    pub fn new(confidence: f32) -> Self {
        Self { confidence, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            confidence: 0.0,
            fail: true,
        }
    }
}

impl Generator for MockGenerator {
    fn describe(&self, _page: &PageImage, _bbox: BBox, class: ElementClass) -> Result<Generation, ProviderError> {
        if self.fail {
            return Err(ProviderError::Unavailable("captioning model not loaded".into()));
        }
        Ok(Generation {
            text: format!("{} region", class.as_str().to_lowercase()),
            confidence: self.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn page() -> PageImage {
        PageImage::new(DynamicImage::new_rgb8(10, 10))
    }

    #[test]
    fn mock_recognizer_keys_by_corner() {
        let bbox = BBox::new(4.2, 7.8, 3.0, 1.0);
        let r = MockRecognizer::new(0.8).with_text(bbox, "hello");
        assert_eq!(r.recognize(&page(), bbox).unwrap().text, "hello");
        assert!(r.recognize(&page(), BBox::new(0.0, 0.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn mock_generator_names_class() {
        let g = MockGenerator::new(0.7);
        let out = g.describe(&page(), BBox::new(0.0, 0.0, 1.0, 1.0), ElementClass::Table).unwrap();
        assert_eq!(out.text, "table region");
        assert!(MockGenerator::failing()
            .describe(&page(), BBox::new(0.0, 0.0, 1.0, 1.0), ElementClass::Figure)
            .is_err());
    }
}
