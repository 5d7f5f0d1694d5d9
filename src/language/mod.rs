//! Language identification: built-in strategies, ensemble fusion and label metrics.

pub mod ensemble;
pub mod metrics;
pub mod profiles;
pub mod strategy;

pub use ensemble::{fuse, Alternative, EnsembleConfig, EnsembleDecision, Fusion, LanguageEnsemble, Vote};
pub use metrics::{evaluate, LabelMetrics, LanguageMetrics};
pub use profiles::{is_supported, Script, SUPPORTED};
pub use strategy::{
    builtin_strategies, FrequencyStrategy, LanguageGuess, LanguageStrategy, NgramStrategy,
    ScriptStrategy, StrategyError,
};
