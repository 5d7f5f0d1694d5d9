//! Language identification strategies.
//!
//! Every strategy answers the same question independently: which supported
//! language is this text, and how sure are you. The ensemble fuses the answers.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::profiles::{profile, script_of, LanguageProfile, Script, SUPPORTED};

/// One strategy's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageGuess {
    pub language: String,
    pub confidence: f32,
}

impl LanguageGuess {
    pub fn new(language: impl Into<String>, confidence: f32) -> Self {
        Self {
            language: language.into(),
            confidence,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("No usable signal: {0}")]
    NoSignal(String),

    #[error("Strategy failed: {0}")]
    Failed(String),
}

/// A single language identification method.
pub trait LanguageStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn identify(&self, text: &str) -> Result<LanguageGuess, StrategyError>;
}

/// Whitespace words with surrounding punctuation trimmed, lowercased.
fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| script_of(c).is_none() && !is_combining(c)))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Zero-width joiners and the like that live inside words.
fn is_combining(c: char) -> bool {
    matches!(c, '\u{200C}' | '\u{200D}')
}

// ═══════════════════════════════════════════
// Script
// ═══════════════════════════════════════════

/// Unicode-range share of the dominant script, refined by script-specific markers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptStrategy;

impl ScriptStrategy {
    /// Arabic-script markers are letters, counted anywhere in the text.
    fn letter_hits(p: &LanguageProfile, text: &str) -> usize {
        text.chars()
            .filter(|c| p.markers.iter().any(|m| m.chars().eq(std::iter::once(*c))))
            .count()
    }

    /// Devanagari markers are whole words.
    fn word_hits(p: &LanguageProfile, words: &[String]) -> usize {
        words.iter().filter(|w| p.markers.contains(&w.as_str())).count()
    }

    /// Pick a language among those sharing `script`. Returns the code and how
    /// cleanly the markers separated it, in [0, 1].
    fn disambiguate(script: Script, text: &str) -> (&'static str, f32) {
        let share = |a: usize, b: usize| a as f32 / (a + b) as f32;
        match script {
            Script::Latin => ("en", 1.0),
            Script::Devanagari => {
                let words = words(text);
                let hits = |code| profile(code).map_or(0, |p| Self::word_hits(p, &words));
                let (hi, ne) = (hits("hi"), hits("ne"));
                if ne > hi {
                    ("ne", share(ne, hi))
                } else if hi > 0 {
                    ("hi", share(hi, ne))
                } else {
                    ("hi", 0.0)
                }
            }
            Script::Arabic => {
                let hits = |code| profile(code).map_or(0, |p| Self::letter_hits(p, text));
                let (ur, ar, fa) = (hits("ur"), hits("ar"), hits("fa"));
                // Urdu-only letters are decisive; Persian shares its forms with Urdu.
                if ur > 0 && ur >= ar {
                    ("ur", share(ur, ar))
                } else if ar > 0 && ar >= fa {
                    ("ar", share(ar, fa))
                } else if fa > 0 {
                    ("fa", share(fa, ar))
                } else {
                    ("ar", 0.0)
                }
            }
        }
    }
}

impl LanguageStrategy for ScriptStrategy {
    fn name(&self) -> &str {
        "script"
    }

    fn identify(&self, text: &str) -> Result<LanguageGuess, StrategyError> {
        let mut counts = [0usize; 3];
        for script in text.chars().filter_map(script_of) {
            let slot = Script::ALL.iter().position(|s| *s == script).unwrap_or(0);
            counts[slot] += 1;
        }
        let total: usize = counts.iter().sum();
        if total == 0 {
            return Err(StrategyError::NoSignal("no letters in a supported script".into()));
        }

        let mut dominant = 0;
        for (i, &c) in counts.iter().enumerate() {
            if c > counts[dominant] {
                dominant = i;
            }
        }
        let script = Script::ALL[dominant];
        let script_share = counts[dominant] as f32 / total as f32;
        let (code, separation) = Self::disambiguate(script, text);

        Ok(LanguageGuess::new(code, script_share * (0.5 + 0.5 * separation)))
    }
}

// ═══════════════════════════════════════════
// Frequency
// ═══════════════════════════════════════════

const WORD_WEIGHT: f32 = 0.6;
const CHAR_WEIGHT: f32 = 0.4;

/// Common-word hits combined with fit to expected letter frequencies.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrequencyStrategy;

impl FrequencyStrategy {
    fn score(p: &LanguageProfile, words: &[String], char_counts: &HashMap<char, usize>, letters: usize) -> f32 {
        let word_hits = p
            .common_words
            .iter()
            .filter(|cw| words.iter().any(|w| w == *cw))
            .count();
        let word_score = word_hits as f32 / p.common_words.len() as f32;

        let char_score = if letters == 0 {
            0.0
        } else {
            let expected_total: f32 = p.char_freq.iter().map(|(_, f)| f).sum();
            let deviation: f32 = p
                .char_freq
                .iter()
                .map(|(c, expected)| {
                    let actual = char_counts.get(c).copied().unwrap_or(0) as f32 / letters as f32;
                    (expected - actual).abs()
                })
                .sum();
            (1.0 - deviation / expected_total).max(0.0)
        };

        WORD_WEIGHT * word_score + CHAR_WEIGHT * char_score
    }
}

impl LanguageStrategy for FrequencyStrategy {
    fn name(&self) -> &str {
        "frequency"
    }

    fn identify(&self, text: &str) -> Result<LanguageGuess, StrategyError> {
        let lower = text.to_lowercase();
        let words = words(&lower);
        let mut char_counts = HashMap::new();
        let mut letters = 0usize;
        for c in lower.chars().filter(|c| script_of(*c).is_some()) {
            *char_counts.entry(c).or_insert(0usize) += 1;
            letters += 1;
        }

        let mut best: Option<(&str, f32)> = None;
        for p in SUPPORTED {
            let s = Self::score(p, &words, &char_counts, letters);
            if best.map_or(true, |(_, b)| s > b) {
                best = Some((p.code, s));
            }
        }

        match best {
            Some((code, s)) if s > 0.0 => Ok(LanguageGuess::new(code, s.min(1.0))),
            _ => Err(StrategyError::NoSignal("no common words or letter frequencies matched".into())),
        }
    }
}

// ═══════════════════════════════════════════
// Character trigrams
// ═══════════════════════════════════════════

type Profile = HashMap<String, f32>;

fn trigram_profile(text: &str) -> Profile {
    let mut profile = Profile::new();
    for word in words(text) {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        for gram in padded.windows(3) {
            *profile.entry(gram.iter().collect()).or_insert(0.0) += 1.0;
        }
    }
    profile
}

fn cosine(a: &Profile, b: &Profile) -> f32 {
    let dot: f32 = a.iter().filter_map(|(k, v)| b.get(k).map(|w| v * w)).sum();
    let norm = |p: &Profile| p.values().map(|v| v * v).sum::<f32>().sqrt();
    let denom = norm(a) * norm(b);
    if denom <= 0.0 {
        0.0
    } else {
        dot / denom
    }
}

static SEED_PROFILES: LazyLock<Vec<(&'static str, Profile)>> = LazyLock::new(|| {
    SUPPORTED
        .iter()
        .map(|p| (p.code, trigram_profile(p.seed)))
        .collect()
});

/// Cosine similarity of character trigrams against per-language seed profiles.
///
/// Confidence is the margin of the best match over the runner-up:
/// `best / (best + second)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NgramStrategy;

impl LanguageStrategy for NgramStrategy {
    fn name(&self) -> &str {
        "ngram"
    }

    fn identify(&self, text: &str) -> Result<LanguageGuess, StrategyError> {
        let input = trigram_profile(text);
        if input.is_empty() {
            return Err(StrategyError::NoSignal("no trigrams in input".into()));
        }

        let mut scores: Vec<(&str, f32)> = SEED_PROFILES
            .iter()
            .map(|(code, seed)| (*code, cosine(&input, seed)))
            .collect();
        // Stable: equal similarities keep table order
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));

        let (code, best) = scores[0];
        if best <= 0.0 {
            return Err(StrategyError::NoSignal("no trigram overlap with any language".into()));
        }
        let second = scores.get(1).map_or(0.0, |s| s.1.max(0.0));
        Ok(LanguageGuess::new(code, best / (best + second)))
    }
}

/// The three built-in strategies in their default order.
pub fn builtin_strategies() -> Vec<Box<dyn LanguageStrategy>> {
    vec![
        Box::new(ScriptStrategy),
        Box::new(FrequencyStrategy),
        Box::new(NgramStrategy),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(s: &dyn LanguageStrategy, text: &str) -> String {
        s.identify(text).unwrap().language
    }

    #[test]
    fn script_strategy_separates_shared_scripts() {
        let s = ScriptStrategy;
        assert_eq!(lang(&s, "The quick brown fox jumps over the lazy dog"), "en");
        assert_eq!(lang(&s, "यह एक परीक्षण है"), "hi");
        assert_eq!(lang(&s, "यो एउटा परीक्षण हो"), "ne");
        assert_eq!(lang(&s, "یہ ایک ٹیسٹ ہے"), "ur");
        assert_eq!(lang(&s, "هذه الوثيقة مهمة جدا"), "ar");
        assert_eq!(lang(&s, "این سند برای کار است"), "fa");
    }

    #[test]
    fn script_confidence_reflects_share() {
        let pure = ScriptStrategy.identify("hello world").unwrap();
        assert!((pure.confidence - 1.0).abs() < 1e-6);

        // Half Latin, half Devanagari letters without markers
        let mixed = ScriptStrategy.identify("abcd कखगघ").unwrap();
        assert!(mixed.confidence <= 0.5 + 1e-6);
    }

    #[test]
    fn script_strategy_needs_letters() {
        assert!(matches!(
            ScriptStrategy.identify("12345 !!"),
            Err(StrategyError::NoSignal(_))
        ));
    }

    #[test]
    fn frequency_strategy_uses_common_words() {
        let s = FrequencyStrategy;
        assert_eq!(lang(&s, "the cat and the dog sat on the mat for fun"), "en");
        assert_eq!(lang(&s, "यह किताब मेरी है और वह तुम्हारी है"), "hi");
        assert_eq!(lang(&s, "في البيت من الصباح إلى المساء"), "ar");
        assert!(s.identify("12345").is_err());
    }

    #[test]
    fn ngram_strategy_recognizes_seed_texts() {
        for p in SUPPORTED {
            let guess = NgramStrategy.identify(p.seed).unwrap();
            assert_eq!(guess.language, p.code);
            assert!(guess.confidence >= 0.5);
        }
    }

    #[test]
    fn ngram_strategy_rejects_unknown_scripts() {
        assert!(NgramStrategy.identify("").is_err());
        assert!(NgramStrategy.identify("Привет мир").is_err());
    }

    #[test]
    fn cosine_of_identical_profiles_is_one() {
        let p = trigram_profile("document layout");
        assert!((cosine(&p, &p) - 1.0).abs() < 1e-5);
        assert_eq!(cosine(&p, &Profile::new()), 0.0);
    }

    #[test]
    fn builtins_are_named() {
        let names: Vec<_> = builtin_strategies().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["script", "frequency", "ngram"]);
    }
}
