//! Scoring of generated visual descriptions against reference descriptions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::ElementClass;

use super::recognition::{levenshtein, tokenize};

const MAX_NGRAM: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationScore {
    pub bleu: f32,
    pub similarity: f32,
    pub combined: f32,
}

/// `(bleu_weight, similarity_weight)` for an element type.
pub fn score_weights(class: ElementClass) -> (f32, f32) {
    match class {
        ElementClass::Table => (0.3, 0.7),
        _ => (0.5, 0.5),
    }
}

fn lowercase_tokens(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(str::to_lowercase).collect()
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// Sentence BLEU-4 with add-one smoothing on the 2..4-gram precisions.
pub fn bleu(candidate: &str, reference: &str) -> f32 {
    let cand = lowercase_tokens(candidate);
    let refs = lowercase_tokens(reference);
    if cand.is_empty() || refs.is_empty() {
        return 0.0;
    }

    let mut log_sum = 0.0f64;
    for n in 1..=MAX_NGRAM {
        let cand_counts = ngram_counts(&cand, n);
        let ref_counts = ngram_counts(&refs, n);
        let total: usize = cand_counts.values().sum();
        let matched: usize = cand_counts
            .iter()
            .map(|(gram, &count)| count.min(ref_counts.get(gram).copied().unwrap_or(0)))
            .sum();

        let precision = if n == 1 {
            if matched == 0 {
                return 0.0;
            }
            matched as f64 / total as f64
        } else {
            (matched + 1) as f64 / (total + 1) as f64
        };
        log_sum += precision.ln();
    }

    let (c, r) = (cand.len() as f64, refs.len() as f64);
    let brevity = if c > r { 1.0 } else { (1.0 - r / c).exp() };
    (brevity * (log_sum / MAX_NGRAM as f64).exp()) as f32
}

/// `1 - lev / max_len` over characters; 1 for two empty strings.
pub fn char_similarity(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f32 / max_len as f32
}

pub fn score_generation(candidate: &str, reference: &str, class: ElementClass) -> GenerationScore {
    let bleu = bleu(candidate, reference);
    let similarity = char_similarity(candidate, reference);
    let (wb, ws) = score_weights(class);
    GenerationScore {
        bleu,
        similarity,
        combined: (wb * bleu + ws * similarity).clamp(0.0, 1.0),
    }
}
