//! Stage results.
//!
//! Each stage result is a value built once from its predecessor through an explicit
//! `extend` function. The predecessor is embedded (and flattened on the wire), so a
//! Stage 2 document is a JSON superset of its Stage 1 document, and Stage 3 of Stage 2.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::element::{BBox, Element, ElementClass};
use super::enrichment::{CrossReference, DocumentSummary, EnhancedDescription, SemanticAnalysis};
use super::page::{PageSize, PreprocessMeta};

/// Requested depth of processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Stage {
    Stage1,
    Stage2,
    Stage3,
}

impl Stage {
    pub fn number(&self) -> u8 {
        match self {
            Self::Stage1 => 1,
            Self::Stage2 => 2,
            Self::Stage3 => 3,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage{}", self.number())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stage {0}: expected 1, 2 or 3")]
pub struct InvalidStage(pub u8);

impl TryFrom<u8> for Stage {
    type Error = InvalidStage;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Stage1),
            2 => Ok(Self::Stage2),
            3 => Ok(Self::Stage3),
            other => Err(InvalidStage(other)),
        }
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.number()
    }
}

// ═══════════════════════════════════════════
// Stage 1
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Result {
    pub elements: Vec<Element>,
    pub size: PageSize,
    pub preprocess_meta: PreprocessMeta,
}

/// Fields Stage 2 adds on top of Stage 1.
#[derive(Debug, Clone, Default)]
pub struct Stage2Fields {
    pub text_regions: Vec<TextRegion>,
    pub visual_descriptions: Vec<VisualDescription>,
    pub detected_languages: Vec<String>,
    pub language_confidence: BTreeMap<String, f32>,
}

impl Stage1Result {
    pub fn new(elements: Vec<Element>, size: PageSize, preprocess_meta: PreprocessMeta) -> Self {
        Self {
            elements,
            size,
            preprocess_meta,
        }
    }

    /// Compose a Stage 2 result. The Stage 1 value is moved in untouched.
    pub fn extend(self, fields: Stage2Fields) -> Stage2Result {
        Stage2Result {
            stage1: self,
            text_regions: fields.text_regions,
            visual_descriptions: fields.visual_descriptions,
            detected_languages: fields.detected_languages,
            language_confidence: fields.language_confidence,
        }
    }
}

// ═══════════════════════════════════════════
// Stage 2
// ═══════════════════════════════════════════

/// Text read from one textual element.
///
/// `text`/`score` are absent when recognition failed; `lang`/`lang_confidence` are
/// absent when there was no text to identify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub element_id: usize,
    pub bbox: BBox,
    pub text: Option<String>,
    pub lang: Option<String>,
    pub score: Option<f32>,
    pub lang_confidence: Option<f32>,
    /// Set when the language ensemble fell back to its default language.
    #[serde(default)]
    pub low_language_confidence: bool,
}

/// Where a visual description came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionSource {
    Generator,
    Template,
}

/// Natural-language description of one non-text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualDescription {
    pub element_id: usize,
    pub bbox: BBox,
    pub element_type: ElementClass,
    pub generated_text: Option<String>,
    pub confidence: Option<f32>,
    pub source: Option<DescriptionSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage2Result {
    #[serde(flatten)]
    pub stage1: Stage1Result,
    pub text_regions: Vec<TextRegion>,
    pub visual_descriptions: Vec<VisualDescription>,
    pub detected_languages: Vec<String>,
    pub language_confidence: BTreeMap<String, f32>,
}

/// Fields Stage 3 adds on top of Stage 2.
#[derive(Debug, Clone, Default)]
pub struct Stage3Fields {
    pub enhanced_descriptions: Vec<EnhancedDescription>,
    pub semantic_analysis: Option<SemanticAnalysis>,
    pub cross_references: Vec<CrossReference>,
    pub summary: Option<DocumentSummary>,
}

impl Stage2Result {
    pub fn elements(&self) -> &[Element] {
        &self.stage1.elements
    }

    pub fn size(&self) -> PageSize {
        self.stage1.size
    }

    /// Compose a Stage 3 result. The Stage 2 value is moved in untouched.
    pub fn extend(self, fields: Stage3Fields) -> Stage3Result {
        Stage3Result {
            stage2: self,
            enhanced_descriptions: fields.enhanced_descriptions,
            semantic_analysis: fields.semantic_analysis,
            cross_references: fields.cross_references,
            summary: fields.summary,
        }
    }
}

// ═══════════════════════════════════════════
// Stage 3
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage3Result {
    #[serde(flatten)]
    pub stage2: Stage2Result,
    pub enhanced_descriptions: Vec<EnhancedDescription>,
    pub semantic_analysis: Option<SemanticAnalysis>,
    pub cross_references: Vec<CrossReference>,
    pub summary: Option<DocumentSummary>,
}

impl Stage3Result {
    pub fn elements(&self) -> &[Element] {
        self.stage2.elements()
    }
}

/// Any stage's result, as returned for a request.
///
/// Untagged on the wire; variants are listed deepest first so that deserialization
/// picks the richest stage the document satisfies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageResult {
    Stage3(Box<Stage3Result>),
    Stage2(Box<Stage2Result>),
    Stage1(Stage1Result),
}

impl StageResult {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Stage1(_) => Stage::Stage1,
            Self::Stage2(_) => Stage::Stage2,
            Self::Stage3(_) => Stage::Stage3,
        }
    }

    pub fn elements(&self) -> &[Element] {
        match self {
            Self::Stage1(r) => &r.elements,
            Self::Stage2(r) => r.elements(),
            Self::Stage3(r) => r.elements(),
        }
    }

    /// Text regions, for stages that have them.
    pub fn text_regions(&self) -> Option<&[TextRegion]> {
        match self {
            Self::Stage1(_) => None,
            Self::Stage2(r) => Some(&r.text_regions),
            Self::Stage3(r) => Some(&r.stage2.text_regions),
        }
    }

    pub fn visual_descriptions(&self) -> Option<&[VisualDescription]> {
        match self {
            Self::Stage1(_) => None,
            Self::Stage2(r) => Some(&r.visual_descriptions),
            Self::Stage3(r) => Some(&r.stage2.visual_descriptions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::element::BBox;

    fn stage1() -> Stage1Result {
        Stage1Result::new(
            vec![Element::new(0, BBox::new(10.0, 10.0, 100.0, 20.0), ElementClass::Title, 0.9)],
            PageSize { w: 600, h: 800 },
            PreprocessMeta {
                color_type: "Rgb8".into(),
                deskew_angle: None,
                source: None,
            },
        )
    }

    fn json_keys(value: &serde_json::Value) -> Vec<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn stage_numbers_round_trip() {
        assert_eq!(Stage::try_from(2).unwrap(), Stage::Stage2);
        assert_eq!(Stage::try_from(0).unwrap_err(), InvalidStage(0));
        assert_eq!(Stage::try_from(99).unwrap_err().to_string(), "invalid stage 99: expected 1, 2 or 3");
        assert_eq!(serde_json::to_string(&Stage::Stage3).unwrap(), "3");
    }

    #[test]
    fn extend_keeps_predecessor_fields_verbatim() {
        let s1 = stage1();
        let s2 = s1.clone().extend(Stage2Fields::default());
        assert_eq!(s2.stage1, s1);

        let s3 = s2.clone().extend(Stage3Fields::default());
        assert_eq!(s3.stage2, s2);
    }

    #[test]
    fn stage_json_is_a_superset_of_the_previous_stage() {
        let s1 = stage1();
        let s2 = s1.clone().extend(Stage2Fields::default());
        let s3 = s2.clone().extend(Stage3Fields::default());

        let j1 = serde_json::to_value(&s1).unwrap();
        let j2 = serde_json::to_value(&s2).unwrap();
        let j3 = serde_json::to_value(&s3).unwrap();

        for key in json_keys(&j1) {
            assert_eq!(j1[&key], j2[&key], "stage2 changed {key}");
        }
        for key in json_keys(&j2) {
            assert_eq!(j2[&key], j3[&key], "stage3 changed {key}");
        }
        assert!(json_keys(&j2).len() > json_keys(&j1).len());
        assert!(json_keys(&j3).len() > json_keys(&j2).len());
        assert!(j2.get("text_regions").is_some());
        assert!(j3.get("cross_references").is_some());
    }

    #[test]
    fn untagged_stage_result_picks_richest_stage() {
        let s2 = stage1().extend(Stage2Fields::default());
        let json = serde_json::to_string(&s2).unwrap();
        let parsed: StageResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.stage(), Stage::Stage2);

        let json = serde_json::to_string(&stage1()).unwrap();
        let parsed: StageResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.stage(), Stage::Stage1);
        assert!(parsed.text_regions().is_none());
    }
}
