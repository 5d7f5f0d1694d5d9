//! Rule-based document summary: counts, key facts and recommendations.

use std::collections::BTreeMap;

use crate::models::{CrossReference, DocumentSummary, ElementClass, KeyPoint, Stage2Result};

use super::semantic::{complexity, dominant_languages, element_distribution, language_distribution};
use super::{EnrichmentConfig, EnrichmentError};

/// Dominant languages reported in the summary.
const MAX_DOMINANT_LANGUAGES: usize = 3;

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, n) = values.fold((0.0f32, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f32)
}

fn describe_counts(counts: &BTreeMap<ElementClass, usize>) -> String {
    counts
        .iter()
        .map(|(class, n)| format!("{} {}", n, class.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the summary for a Stage 2 result.
///
/// `failed_steps` names enrichment steps that already failed for this document;
/// each produces a recommendation.
pub fn summarize(
    stage2: &Stage2Result,
    cross_references: &[CrossReference],
    failed_steps: &[&str],
    config: &EnrichmentConfig,
) -> Result<DocumentSummary, EnrichmentError> {
    let elements = stage2.elements();
    for r in cross_references {
        let known = |id: usize| elements.iter().any(|e| e.id == id);
        if !known(r.text_element_id) || !known(r.visual_element_id) {
            return Err(EnrichmentError::InvalidInput(format!(
                "cross-reference {} -> {} names an unknown element",
                r.text_element_id, r.visual_element_id
            )));
        }
    }

    let element_counts = element_distribution(elements);
    let languages = language_distribution(stage2);
    let ranked = dominant_languages(&languages);
    let complexity = complexity(elements, &languages, config);

    let recognized = stage2.text_regions.iter().filter(|r| r.text.is_some()).count();
    let described = stage2
        .visual_descriptions
        .iter()
        .filter(|d| d.generated_text.is_some())
        .count();
    let avg_ocr = mean(stage2.text_regions.iter().filter_map(|r| r.score));
    let avg_lang = mean(stage2.text_regions.iter().filter_map(|r| r.lang_confidence));

    // Key points
    let mut key_points = Vec::new();
    if !elements.is_empty() {
        key_points.push(KeyPoint {
            fact: format!("{} elements detected: {}", elements.len(), describe_counts(&element_counts)),
            weight: 1.0,
        });
    }
    if !stage2.text_regions.is_empty() {
        key_points.push(KeyPoint {
            fact: format!(
                "{} of {} text regions recognized",
                recognized,
                stage2.text_regions.len()
            ),
            weight: 0.8,
        });
    }
    if let Some(primary) = ranked.first() {
        key_points.push(KeyPoint {
            fact: format!(
                "Primary language: {} ({} of {} regions)",
                primary,
                languages.get(primary).copied().unwrap_or(0),
                languages.values().sum::<usize>()
            ),
            weight: 0.9,
        });
    }
    if !stage2.visual_descriptions.is_empty() {
        key_points.push(KeyPoint {
            fact: format!(
                "{} of {} visual elements described",
                described,
                stage2.visual_descriptions.len()
            ),
            weight: 0.7,
        });
    }
    if !cross_references.is_empty() {
        key_points.push(KeyPoint {
            fact: format!("{} cross-references link text to visuals", cross_references.len()),
            weight: 0.6,
        });
    }
    key_points.push(KeyPoint {
        fact: format!(
            "Layout complexity is {} ({:.2})",
            complexity.level.as_str(),
            complexity.score
        ),
        weight: 0.5,
    });
    key_points.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    // Recommendations
    let mut recommendations = Vec::new();
    if elements.is_empty() {
        recommendations.push("No elements detected; check the page image and the layout detector".to_string());
    }
    if let Some(avg) = avg_ocr.filter(|&a| a < config.low_ocr_confidence) {
        recommendations.push(format!(
            "Average recognition confidence is {:.2}; consider rescanning at a higher resolution",
            avg
        ));
    }
    if let Some(avg) = avg_lang.filter(|&a| a < config.low_language_confidence) {
        recommendations.push(format!(
            "Average language confidence is {:.2}; verify the identified languages",
            avg
        ));
    }
    let undescribed = stage2.visual_descriptions.len() - described;
    if undescribed > 0 {
        recommendations.push(format!(
            "{} visual element(s) have no description; retry generation",
            undescribed
        ));
    }
    if languages.len() > 1 {
        recommendations.push(format!(
            "Document mixes {} languages ({}); review per-region language tags",
            languages.len(),
            ranked.join(", ")
        ));
    }
    if !failed_steps.is_empty() {
        recommendations.push(format!(
            "Enrichment steps failed: {}; inspect diagnostics",
            failed_steps.join(", ")
        ));
    }

    let executive_summary = if elements.is_empty() {
        "No layout elements were detected on this page.".to_string()
    } else {
        let language = ranked
            .first()
            .map(|l| format!(" Primary language: {}.", l))
            .unwrap_or_default();
        format!(
            "Page with {} elements ({}).{} Layout complexity: {}.",
            elements.len(),
            describe_counts(&element_counts),
            language,
            complexity.level.as_str()
        )
    };

    tracing::debug!(
        elements = elements.len(),
        languages = languages.len(),
        recommendations = recommendations.len(),
        complexity = complexity.score,
        "Summary built"
    );

    Ok(DocumentSummary {
        executive_summary,
        key_points,
        recommendations,
        element_counts,
        dominant_languages: ranked.into_iter().take(MAX_DOMINANT_LANGUAGES).collect(),
        complexity,
    })
}
