//! Fusion of independent language identification strategies.
//!
//! Policy:
//! - votes below `min_confidence` are not counted;
//! - the language with the most counted votes wins;
//! - ties go to the higher summed confidence, then to the language whose first
//!   counted voter comes earliest in strategy order;
//! - the fused confidence is the winners' summed confidence, clamped to [0, 1];
//! - with no counted vote, the default language is returned with confidence 0 and
//!   `low_confidence` set.
//!
//! Strategy calls are guarded like provider calls: a strategy that errors, panics
//! or overruns loses only its own vote.

use std::convert::Infallible;
use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pipeline::invoke::{invoke, CallError, CallFailure};

use super::profiles::is_supported;
use super::strategy::{builtin_strategies, LanguageGuess, LanguageStrategy, StrategyError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub min_confidence: f32,
    pub default_language: String,
    pub reliable_threshold: f32,
    pub max_alternatives: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            default_language: "en".to_string(),
            reliable_threshold: 0.6,
            max_alternatives: 3,
        }
    }
}

/// What one strategy said, or why it said nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub strategy: String,
    pub language: Option<String>,
    pub confidence: Option<f32>,
    pub error: Option<String>,
    /// Set when the strategy broke rather than abstained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<CallFailure>,
    /// Whether the vote cleared the confidence floor and took part in fusion.
    pub counted: bool,
}

impl Vote {
    fn abstained(strategy: &str, reason: String) -> Self {
        Self {
            strategy: strategy.to_string(),
            language: None,
            confidence: None,
            error: Some(reason),
            failure: None,
            counted: false,
        }
    }

    fn broken(strategy: &str, language: Option<String>, kind: CallFailure, reason: String) -> Self {
        Self {
            strategy: strategy.to_string(),
            language,
            confidence: None,
            error: Some(reason),
            failure: Some(kind),
            counted: false,
        }
    }

    /// The failure as a call error naming the strategy, if the strategy broke.
    pub fn call_error(&self) -> Option<CallError> {
        let kind = self.failure?;
        Some(CallError {
            kind,
            message: format!(
                "{}: {}",
                self.strategy,
                self.error.as_deref().unwrap_or("no answer")
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub language: String,
    pub votes: usize,
    pub confidence: f32,
}

/// Result of the pure fusion step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fusion {
    pub language: String,
    pub confidence: f32,
    pub alternatives: Vec<Alternative>,
    pub low_confidence: bool,
    pub is_reliable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleDecision {
    pub language: String,
    pub confidence: f32,
    pub per_method_votes: Vec<Vote>,
    pub alternatives: Vec<Alternative>,
    pub low_confidence: bool,
    pub is_reliable: bool,
}

struct Tally<'a> {
    language: &'a str,
    votes: usize,
    confidence_sum: f32,
}

fn counts(confidence: f32, config: &EnsembleConfig) -> bool {
    confidence.is_finite() && confidence >= config.min_confidence
}

/// Fuse `(language, confidence)` votes given in strategy order.
pub fn fuse(votes: &[(&str, f32)], config: &EnsembleConfig) -> Fusion {
    // Tallies are created in first-appearance order, which the stable sort keeps
    // as the final tie-break.
    let mut tallies: Vec<Tally> = Vec::new();
    for &(language, confidence) in votes {
        if !counts(confidence, config) {
            continue;
        }
        match tallies.iter_mut().find(|t| t.language == language) {
            Some(t) => {
                t.votes += 1;
                t.confidence_sum += confidence;
            }
            None => tallies.push(Tally {
                language,
                votes: 1,
                confidence_sum: confidence,
            }),
        }
    }

    if tallies.is_empty() {
        return Fusion {
            language: config.default_language.clone(),
            confidence: 0.0,
            alternatives: Vec::new(),
            low_confidence: true,
            is_reliable: false,
        };
    }

    tallies.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then(b.confidence_sum.total_cmp(&a.confidence_sum))
    });

    let winner = &tallies[0];
    let confidence = winner.confidence_sum.clamp(0.0, 1.0);

    let mut rest: Vec<Alternative> = tallies[1..]
        .iter()
        .map(|t| Alternative {
            language: t.language.to_string(),
            votes: t.votes,
            confidence: t.confidence_sum / t.votes as f32,
        })
        .collect();
    rest.sort_by(|a, b| b.votes.cmp(&a.votes).then(b.confidence.total_cmp(&a.confidence)));
    rest.truncate(config.max_alternatives);

    Fusion {
        language: winner.language.to_string(),
        confidence,
        alternatives: rest,
        low_confidence: false,
        is_reliable: confidence > config.reliable_threshold,
    }
}

/// Strategies plus fusion policy.
pub struct LanguageEnsemble {
    strategies: Vec<Box<dyn LanguageStrategy>>,
    config: EnsembleConfig,
}

impl LanguageEnsemble {
    pub fn new(strategies: Vec<Box<dyn LanguageStrategy>>, config: EnsembleConfig) -> Self {
        Self { strategies, config }
    }

    /// Script, frequency and trigram strategies, in that order.
    pub fn with_builtin(config: EnsembleConfig) -> Self {
        Self::new(builtin_strategies(), config)
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn identify(&self, text: &str) -> EnsembleDecision {
        self.identify_within(text, None)
    }

    /// Like `identify`, with a wall-clock budget applied to each strategy call.
    pub fn identify_within(&self, text: &str, timeout: Option<Duration>) -> EnsembleDecision {
        if text.trim().is_empty() {
            return EnsembleDecision {
                language: self.config.default_language.clone(),
                confidence: 0.0,
                per_method_votes: Vec::new(),
                alternatives: Vec::new(),
                low_confidence: true,
                is_reliable: false,
            };
        }

        let votes: Vec<Vote> = self
            .strategies
            .iter()
            .map(|strategy| self.vote(strategy.as_ref(), text, timeout))
            .collect();

        let answered: Vec<(&str, f32)> = votes
            .iter()
            .filter_map(|v| Some((v.language.as_deref()?, v.confidence?)))
            .collect();
        let fusion = fuse(&answered, &self.config);

        EnsembleDecision {
            language: fusion.language,
            confidence: fusion.confidence,
            per_method_votes: votes,
            alternatives: fusion.alternatives,
            low_confidence: fusion.low_confidence,
            is_reliable: fusion.is_reliable,
        }
    }

    /// Identify many texts in parallel. Output order matches input order.
    pub fn identify_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<EnsembleDecision> {
        texts.par_iter().map(|t| self.identify(t.as_ref())).collect()
    }

    fn vote(&self, strategy: &dyn LanguageStrategy, text: &str, timeout: Option<Duration>) -> Vote {
        let name = strategy.name();
        let answer = invoke(timeout, || Ok::<_, Infallible>(strategy.identify(text)));

        match answer {
            Ok(Ok(guess)) => self.checked(name, guess),
            Ok(Err(StrategyError::NoSignal(reason))) => {
                tracing::debug!(strategy = name, reason = %reason, "Language strategy abstained");
                Vote::abstained(name, format!("No usable signal: {}", reason))
            }
            Ok(Err(e)) => {
                tracing::warn!(strategy = name, error = %e, "Language strategy failed");
                Vote::broken(name, None, CallFailure::Failed, e.to_string())
            }
            Err(e) => {
                tracing::warn!(strategy = name, kind = e.kind.as_str(), error = %e.message, "Language strategy failed");
                Vote::broken(name, None, e.kind, e.message)
            }
        }
    }

    fn checked(&self, name: &str, guess: LanguageGuess) -> Vote {
        if guess.language.is_empty() {
            return Vote::broken(name, None, CallFailure::Failed, "empty language code".to_string());
        }
        if !is_supported(&guess.language) {
            let reason = format!("unsupported language code {:?}", guess.language);
            return Vote::broken(name, Some(guess.language), CallFailure::Failed, reason);
        }
        if !(0.0..=1.0).contains(&guess.confidence) {
            let reason = format!("confidence {} outside [0, 1]", guess.confidence);
            return Vote::broken(name, Some(guess.language), CallFailure::Failed, reason);
        }
        Vote {
            strategy: name.to_string(),
            counted: counts(guess.confidence, &self.config),
            language: Some(guess.language),
            confidence: Some(guess.confidence),
            error: None,
            failure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::strategy::{LanguageGuess, StrategyError};

    struct Fixed(&'static str, &'static str, f32);

    impl LanguageStrategy for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn identify(&self, _text: &str) -> Result<LanguageGuess, StrategyError> {
            Ok(LanguageGuess::new(self.1, self.2))
        }
    }

    struct Broken;

    impl LanguageStrategy for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn identify(&self, _text: &str) -> Result<LanguageGuess, StrategyError> {
            Err(StrategyError::Failed("model not loaded".into()))
        }
    }

    struct Exploding;

    impl LanguageStrategy for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }
        fn identify(&self, _text: &str) -> Result<LanguageGuess, StrategyError> {
            panic!("lookup table corrupted")
        }
    }

    struct Silent;

    impl LanguageStrategy for Silent {
        fn name(&self) -> &str {
            "silent"
        }
        fn identify(&self, _text: &str) -> Result<LanguageGuess, StrategyError> {
            Err(StrategyError::NoSignal("no letters".into()))
        }
    }

    fn cfg() -> EnsembleConfig {
        EnsembleConfig::default()
    }

    #[test]
    fn majority_wins() {
        let f = fuse(&[("hi", 0.5), ("ne", 0.9), ("hi", 0.4)], &cfg());
        assert_eq!(f.language, "hi");
        assert!((f.confidence - 0.9).abs() < 1e-6);
        assert_eq!(f.alternatives.len(), 1);
        assert_eq!(f.alternatives[0].language, "ne");
    }

    #[test]
    fn agreement_never_lowers_confidence() {
        let votes = [("ar", 0.35), ("ar", 0.5), ("ar", 0.45)];
        let f = fuse(&votes, &cfg());
        assert_eq!(f.language, "ar");
        for (_, c) in votes {
            assert!(f.confidence >= c);
        }
        assert_eq!(f.confidence, 1.0);
    }

    #[test]
    fn vote_tie_broken_by_confidence_sum() {
        let f = fuse(&[("ur", 0.4), ("fa", 0.7)], &cfg());
        assert_eq!(f.language, "fa");
    }

    #[test]
    fn full_tie_broken_by_strategy_order() {
        let votes = [("ne", 0.5), ("hi", 0.5)];
        for _ in 0..10 {
            assert_eq!(fuse(&votes, &cfg()).language, "ne");
        }
        let swapped = [("hi", 0.5), ("ne", 0.5)];
        assert_eq!(fuse(&swapped, &cfg()).language, "hi");
    }

    #[test]
    fn below_floor_falls_back_to_default() {
        let f = fuse(&[("hi", 0.2), ("ur", 0.29)], &cfg());
        assert_eq!(f.language, "en");
        assert_eq!(f.confidence, 0.0);
        assert!(f.low_confidence);
        assert!(!f.is_reliable);
    }

    #[test]
    fn reliability_threshold() {
        assert!(!fuse(&[("en", 0.6)], &cfg()).is_reliable);
        assert!(fuse(&[("en", 0.61)], &cfg()).is_reliable);
    }

    #[test]
    fn alternatives_are_capped() {
        let votes = [("en", 0.9), ("en", 0.9), ("hi", 0.5), ("ur", 0.6), ("ar", 0.4), ("fa", 0.7)];
        let f = fuse(&votes, &cfg());
        assert_eq!(f.language, "en");
        let alts: Vec<_> = f.alternatives.iter().map(|a| a.language.as_str()).collect();
        assert_eq!(alts, vec!["fa", "ur", "hi"]);
    }

    #[test]
    fn failing_strategy_is_recorded_and_ignored() {
        let ensemble = LanguageEnsemble::new(
            vec![Box::new(Broken), Box::new(Fixed("a", "fa", 0.8))],
            cfg(),
        );
        let d = ensemble.identify("متن");
        assert_eq!(d.language, "fa");
        assert_eq!(d.per_method_votes.len(), 2);
        assert!(d.per_method_votes[0].error.as_deref().unwrap().contains("model not loaded"));
        assert_eq!(d.per_method_votes[0].failure, Some(CallFailure::Failed));
        assert!(!d.per_method_votes[0].counted);
        assert!(d.per_method_votes[1].counted);
        assert_eq!(d.per_method_votes[1].failure, None);
    }

    #[test]
    fn panicking_strategy_keeps_other_votes() {
        let ensemble = LanguageEnsemble::new(
            vec![
                Box::new(Fixed("a", "ur", 0.7)),
                Box::new(Exploding),
                Box::new(Fixed("b", "ur", 0.5)),
            ],
            cfg(),
        );
        let d = ensemble.identify("یہ ایک رپورٹ ہے");
        assert_eq!(d.language, "ur");
        assert_eq!(d.per_method_votes.len(), 3);
        assert_eq!(d.per_method_votes[1].failure, Some(CallFailure::Panicked));

        let err = d.per_method_votes[1].call_error().unwrap();
        assert_eq!(err.kind, CallFailure::Panicked);
        assert_eq!(err.message, "exploding: lookup table corrupted");
        assert!(d.per_method_votes[0].call_error().is_none());
    }

    #[test]
    fn abstaining_strategy_is_not_a_failure() {
        let ensemble = LanguageEnsemble::new(vec![Box::new(Silent), Box::new(Fixed("a", "en", 0.9))], cfg());
        let d = ensemble.identify("1234");
        assert_eq!(d.language, "en");
        assert!(d.per_method_votes[0].error.is_some());
        assert!(d.per_method_votes[0].call_error().is_none());
    }

    #[test]
    fn slow_strategy_times_out() {
        struct Slow;
        impl LanguageStrategy for Slow {
            fn name(&self) -> &str {
                "slow"
            }
            fn identify(&self, _text: &str) -> Result<LanguageGuess, StrategyError> {
                std::thread::sleep(Duration::from_millis(30));
                Ok(LanguageGuess::new("hi", 0.9))
            }
        }

        let ensemble = LanguageEnsemble::new(vec![Box::new(Slow), Box::new(Fixed("a", "ne", 0.6))], cfg());
        let d = ensemble.identify_within("कुछ", Some(Duration::from_millis(5)));
        assert_eq!(d.language, "ne");
        assert_eq!(d.per_method_votes[0].failure, Some(CallFailure::TimedOut));
    }

    #[test]
    fn unsupported_language_code_is_a_failure() {
        let ensemble = LanguageEnsemble::new(vec![Box::new(Fixed("a", "de", 0.9)), Box::new(Fixed("b", "en", 0.4))], cfg());
        let d = ensemble.identify("Bericht");
        assert_eq!(d.language, "en");
        assert_eq!(d.per_method_votes[0].failure, Some(CallFailure::Failed));
        assert!(d.per_method_votes[0].error.as_deref().unwrap().contains("unsupported"));
    }

    #[test]
    fn out_of_range_confidence_is_not_counted() {
        let ensemble = LanguageEnsemble::new(
            vec![Box::new(Fixed("a", "hi", 1.7)), Box::new(Fixed("b", "ne", 0.4))],
            cfg(),
        );
        let d = ensemble.identify("कुछ");
        assert_eq!(d.language, "ne");
        assert!(d.per_method_votes[0].error.is_some());
        assert_eq!(d.per_method_votes[0].failure, Some(CallFailure::Failed));
    }

    #[test]
    fn empty_text_skips_strategies() {
        let ensemble = LanguageEnsemble::new(vec![Box::new(Fixed("a", "hi", 0.9))], cfg());
        let d = ensemble.identify("   ");
        assert_eq!(d.language, "en");
        assert!(d.low_confidence);
        assert!(d.per_method_votes.is_empty());
    }

    #[test]
    fn builtin_ensemble_identifies_each_script() {
        let ensemble = LanguageEnsemble::with_builtin(cfg());
        assert_eq!(ensemble.identify("The results of the survey are shown in the table").language, "en");
        assert_eq!(ensemble.identify("यो कागजात एउटा प्रतिवेदन हो").language, "ne");
        assert_eq!(ensemble.identify("یہ دستاویز ایک رپورٹ ہے").language, "ur");
    }

    #[test]
    fn batch_preserves_order() {
        let ensemble = LanguageEnsemble::with_builtin(cfg());
        let out = ensemble.identify_batch(&["hello there world", "", "یہ ایک رپورٹ ہے"]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].language, "en");
        assert!(out[1].low_confidence);
        assert_eq!(out[2].language, "ur");
    }
}
