//! Document-level structure: distributions, reading order, coverage, complexity.

use std::collections::BTreeMap;

use crate::language::profiles::SUPPORTED;
use crate::models::{Complexity, ComplexityLevel, Element, ElementClass, SemanticAnalysis, Stage2Result};

use super::{EnrichmentConfig, EnrichmentError};

const STRUCTURAL_WEIGHT: f32 = 0.4;
const LANGUAGE_WEIGHT: f32 = 0.3;
const DENSITY_WEIGHT: f32 = 0.3;

pub fn element_distribution(elements: &[Element]) -> BTreeMap<ElementClass, usize> {
    let mut counts = BTreeMap::new();
    for el in elements {
        *counts.entry(el.class).or_insert(0) += 1;
    }
    counts
}

/// Count of text regions per identified language.
pub fn language_distribution(stage2: &Stage2Result) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for lang in stage2.text_regions.iter().filter_map(|r| r.lang.as_deref()) {
        *counts.entry(lang.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Languages ordered by region count, most frequent first; ties by code.
pub fn dominant_languages(distribution: &BTreeMap<String, usize>) -> Vec<String> {
    let mut ranked: Vec<(&String, usize)> = distribution.iter().map(|(l, &n)| (l, n)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().map(|(l, _)| l.clone()).collect()
}

/// `1 - min(1, cv / 2)` over the counts of the five content classes.
/// Evenly mixed layouts score high; a page of one class scores low.
fn structural_component(distribution: &BTreeMap<ElementClass, usize>) -> f32 {
    let counts: Vec<f32> = ElementClass::ALL
        .iter()
        .filter(|c| **c != ElementClass::Background)
        .map(|c| distribution.get(c).copied().unwrap_or(0) as f32)
        .collect();
    let mean = counts.iter().sum::<f32>() / counts.len() as f32;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f32>() / counts.len() as f32;
    let cv = variance.sqrt() / mean;
    1.0 - (cv / 2.0).min(1.0)
}

/// Shannon entropy of the language distribution, normalized by `ln(6)`.
fn language_component(distribution: &BTreeMap<String, usize>) -> f32 {
    let total: usize = distribution.values().sum();
    if total == 0 {
        return 0.0;
    }
    let entropy: f32 = distribution
        .values()
        .filter(|&&n| n > 0)
        .map(|&n| {
            let p = n as f32 / total as f32;
            -p * p.ln()
        })
        .sum();
    (entropy / (SUPPORTED.len() as f32).ln()).clamp(0.0, 1.0)
}

pub fn complexity(
    elements: &[Element],
    languages: &BTreeMap<String, usize>,
    config: &EnrichmentConfig,
) -> Complexity {
    let structural = structural_component(&element_distribution(elements));
    let language = language_component(languages);
    let density = if config.density_saturation == 0 {
        1.0
    } else {
        (elements.len() as f32 / config.density_saturation as f32).min(1.0)
    };
    let score = STRUCTURAL_WEIGHT * structural + LANGUAGE_WEIGHT * language + DENSITY_WEIGHT * density;
    Complexity {
        score,
        level: ComplexityLevel::from_score(score),
        structural,
        language,
        density,
    }
}

/// Element ids in reading order: rows banded by the median element height, then
/// left to right. Background elements are skipped.
pub fn reading_order(elements: &[Element]) -> Vec<usize> {
    let content: Vec<&Element> = elements
        .iter()
        .filter(|e| e.class != ElementClass::Background)
        .collect();
    if content.is_empty() {
        return Vec::new();
    }

    let mut heights: Vec<f32> = content.iter().map(|e| e.bbox.h).collect();
    heights.sort_by(f32::total_cmp);
    let band = heights[heights.len() / 2].max(1.0);

    let mut keyed: Vec<(i64, f32, usize)> = content
        .iter()
        .map(|e| {
            let (cx, cy) = e.bbox.center();
            ((cy / band).floor() as i64, cx, e.id)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));
    keyed.into_iter().map(|(_, _, id)| id).collect()
}

pub fn analyze(stage2: &Stage2Result, config: &EnrichmentConfig) -> Result<SemanticAnalysis, EnrichmentError> {
    let page = stage2.size();
    if page.is_empty() {
        return Err(EnrichmentError::EmptyPage);
    }
    let elements = stage2.elements();

    let text_area: f32 = elements
        .iter()
        .filter(|e| e.class.is_textual())
        .filter_map(|e| e.bbox.clamp_to(page.w, page.h))
        .map(|b| b.area())
        .sum();
    let languages = language_distribution(stage2);

    Ok(SemanticAnalysis {
        element_distribution: element_distribution(elements),
        reading_order: reading_order(elements),
        text_coverage: (text_area / page.area()).min(1.0),
        complexity: complexity(elements, &languages, config),
        language_distribution: languages,
    })
}
