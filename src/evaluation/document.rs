//! Whole-document evaluation of a stage result against annotated ground truth.
//!
//! Layout is always scored. Text, language and visual descriptions are scored when
//! both the stage result and the ground truth carry them. Ground-truth text and
//! visual entries are paired with produced regions by IoU.

use serde::{Deserialize, Serialize};

use crate::language::metrics::{self, LanguageMetrics};
use crate::models::{BBox, Element, EvaluationReport, StageResult};

use super::detection::{self, DetectionEvalConfig};
use super::error::EvaluationError;
use super::generation::{score_generation, GenerationScore};
use super::recognition::{score_corpus, RecognitionScore};

/// Annotated text line or block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthText {
    pub bbox: BBox,
    pub text: String,
    #[serde(default)]
    pub lang: Option<String>,
}

/// Reference description of a table or figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthVisual {
    pub bbox: BBox,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub elements: Vec<Element>,
    #[serde(default)]
    pub text: Vec<GroundTruthText>,
    #[serde(default)]
    pub visual: Vec<GroundTruthVisual>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentEvalConfig {
    pub detection: DetectionEvalConfig,
    /// Minimum IoU for pairing a ground-truth text/visual entry with a produced region.
    pub match_iou: f32,
}

impl Default for DocumentEvalConfig {
    fn default() -> Self {
        Self {
            detection: DetectionEvalConfig::default(),
            match_iou: 0.5,
        }
    }
}

/// Mean description scores over matched visual entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub mean: GenerationScore,
    pub matched: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEvaluation {
    pub layout: EvaluationReport,
    pub recognition: Option<RecognitionScore>,
    pub language: Option<LanguageMetrics>,
    pub generation: Option<GenerationSummary>,
}

/// Index of the candidate box with the highest IoU against `target`, if it clears
/// `min_iou`. Already-used candidates are skipped.
fn best_match<'a>(
    target: &BBox,
    candidates: impl Iterator<Item = (usize, &'a BBox)>,
    used: &[bool],
    min_iou: f32,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, bbox) in candidates {
        if used[i] {
            continue;
        }
        let iou = target.iou(bbox);
        if iou >= min_iou && best.map_or(true, |(_, b)| iou > b) {
            best = Some((i, iou));
        }
    }
    best.map(|(i, _)| i)
}

pub fn evaluate_document(
    result: &StageResult,
    truth: &GroundTruth,
    config: &DocumentEvalConfig,
) -> Result<DocumentEvaluation, EvaluationError> {
    let layout = detection::evaluate(result.elements(), &truth.elements, &config.detection)?;

    let mut recognition = None;
    let mut language = None;
    if let Some(regions) = result.text_regions().filter(|_| !truth.text.is_empty()) {
        let mut used = vec![false; regions.len()];
        let mut text_pairs: Vec<(&str, &str)> = Vec::with_capacity(truth.text.len());
        let mut predicted_langs = Vec::new();
        let mut true_langs = Vec::new();

        for gt in &truth.text {
            let candidates = regions.iter().enumerate().map(|(i, r)| (i, &r.bbox));
            match best_match(&gt.bbox, candidates, &used, config.match_iou) {
                Some(i) => {
                    used[i] = true;
                    let region = &regions[i];
                    text_pairs.push((region.text.as_deref().unwrap_or(""), gt.text.as_str()));
                    if let (Some(t), Some(p)) = (gt.lang.as_deref(), region.lang.as_deref()) {
                        true_langs.push(t);
                        predicted_langs.push(p);
                    }
                }
                // Missed text counts as fully deleted
                None => text_pairs.push(("", gt.text.as_str())),
            }
        }

        recognition = Some(score_corpus(text_pairs));
        if !true_langs.is_empty() {
            language = Some(metrics::evaluate(&predicted_langs, &true_langs)?);
        }
    }

    let mut generation = None;
    if let Some(visuals) = result.visual_descriptions().filter(|_| !truth.visual.is_empty()) {
        let mut used = vec![false; visuals.len()];
        let mut scores = Vec::new();
        for gt in &truth.visual {
            let candidates = visuals
                .iter()
                .enumerate()
                .filter(|(_, v)| v.generated_text.is_some())
                .map(|(i, v)| (i, &v.bbox));
            if let Some(i) = best_match(&gt.bbox, candidates, &used, config.match_iou) {
                used[i] = true;
                let v = &visuals[i];
                let text = v.generated_text.as_deref().unwrap_or("");
                scores.push(score_generation(text, &gt.description, v.element_type));
            }
        }

        let matched = scores.len();
        let mean = if matched == 0 {
            GenerationScore::default()
        } else {
            let n = matched as f32;
            GenerationScore {
                bleu: scores.iter().map(|s| s.bleu).sum::<f32>() / n,
                similarity: scores.iter().map(|s| s.similarity).sum::<f32>() / n,
                combined: scores.iter().map(|s| s.combined).sum::<f32>() / n,
            }
        };
        generation = Some(GenerationSummary {
            mean,
            matched,
            unmatched: truth.visual.len() - matched,
        });
    }

    Ok(DocumentEvaluation {
        layout,
        recognition,
        language,
        generation,
    })
}
