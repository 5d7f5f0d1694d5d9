//! Stage 3 output types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::element::{BBox, ElementClass};

/// Vertical third of the page an element's center falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePosition {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionContext {
    pub page_position: PagePosition,
    pub nearby_text: Vec<String>,
    /// Ids of text elements that reference this element.
    pub referenced_by: Vec<usize>,
    pub language: Option<String>,
}

/// A visual description rewritten with its page context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedDescription {
    pub element_id: usize,
    pub bbox: BBox,
    pub element_type: ElementClass,
    pub base_text: String,
    pub enhanced_text: String,
    pub confidence: f32,
    pub context: DescriptionContext,
}

/// Link between a text region and the visual element it likely talks about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    pub text_element_id: usize,
    pub visual_element_id: usize,
    pub strength: f32,
    pub proximity: f32,
    pub lexical: f32,
    /// Keyword that matched, if any (e.g. "figure", "तालिका").
    pub keyword: Option<String>,
    pub reference_number: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    pub fn from_score(score: f32) -> Self {
        if score < 0.33 {
            Self::Low
        } else if score < 0.66 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Weighted complexity heuristic and its components, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Complexity {
    pub score: f32,
    pub level: ComplexityLevel,
    pub structural: f32,
    pub language: f32,
    pub density: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticAnalysis {
    pub element_distribution: BTreeMap<ElementClass, usize>,
    /// Element ids in reading order.
    pub reading_order: Vec<usize>,
    pub language_distribution: BTreeMap<String, usize>,
    /// Share of the page covered by textual elements.
    pub text_coverage: f32,
    pub complexity: Complexity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub fact: String,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub executive_summary: String,
    pub key_points: Vec<KeyPoint>,
    pub recommendations: Vec<String>,
    pub element_counts: BTreeMap<ElementClass, usize>,
    pub dominant_languages: Vec<String>,
    pub complexity: Complexity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_levels_follow_thresholds() {
        assert_eq!(ComplexityLevel::from_score(0.0), ComplexityLevel::Low);
        assert_eq!(ComplexityLevel::from_score(0.329), ComplexityLevel::Low);
        assert_eq!(ComplexityLevel::from_score(0.33), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_score(0.66), ComplexityLevel::High);
    }

    #[test]
    fn class_keyed_maps_serialize_by_name() {
        let mut counts = BTreeMap::new();
        counts.insert(ElementClass::Table, 2usize);
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["Table"], 2);
    }
}
