use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

/// A rasterized document page handed to the pipeline.
///
/// Deskewing and format conversion happen upstream; the angle they applied (if any)
/// is carried through so it can be reported in the Stage 1 metadata.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub image: DynamicImage,
    pub source: Option<String>,
    pub deskew_angle: Option<f32>,
}

impl PageImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            source: None,
            deskew_angle: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_deskew_angle(mut self, degrees: f32) -> Self {
        self.deskew_angle = Some(degrees);
        self
    }

    pub fn size(&self) -> PageSize {
        let (w, h) = self.image.dimensions();
        PageSize { w, h }
    }

    pub fn preprocess_meta(&self) -> PreprocessMeta {
        PreprocessMeta {
            color_type: format!("{:?}", self.image.color()),
            deskew_angle: self.deskew_angle,
            source: self.source.clone(),
        }
    }
}

/// Page dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub w: u32,
    pub h: u32,
}

impl PageSize {
    pub fn area(&self) -> f32 {
        self.w as f32 * self.h as f32
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// What was known about the raster before detection ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessMeta {
    pub color_type: String,
    pub deskew_angle: Option<f32>,
    pub source: Option<String>,
}
