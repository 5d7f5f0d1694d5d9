//! Pipeline configuration.
//!
//! Loaded from JSON. Every field has a default, so a partial file (or none at all)
//! is valid; `validate` catches values that would make thresholds meaningless.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CONFIG_ENV;
use crate::enrichment::EnrichmentConfig;
use crate::language::{is_supported, EnsembleConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Wall-clock budget per provider call. `None` disables the check.
    ///
    /// The check runs after the call returns and only discards a late result. A
    /// provider that never returns still blocks its element, and the whole batch
    /// with it; providers must bound their own work.
    pub call_timeout_ms: Option<u64>,
    /// Run Stage 2 per-element calls on the rayon pool.
    pub parallel_elements: bool,
    /// Fill failed generator calls with a class template (the failure is still recorded).
    pub template_fallback: bool,
    pub ensemble: EnsembleConfig,
    pub enrichment: EnrichmentConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: None,
            parallel_elements: true,
            template_fallback: false,
            ensemble: EnsembleConfig::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl PipelineConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `DOCSTAGE_CONFIG`, or fall back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                tracing::info!(path = %path.display(), "Loading pipeline config");
                Self::from_json_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} = {v} is outside [0, 1]")))
            }
        };

        if self.call_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("call_timeout_ms must be positive".into()));
        }

        let e = &self.ensemble;
        unit("ensemble.min_confidence", e.min_confidence)?;
        unit("ensemble.reliable_threshold", e.reliable_threshold)?;
        if !is_supported(&e.default_language) {
            return Err(ConfigError::Invalid(format!(
                "ensemble.default_language {:?} is not a supported language",
                e.default_language
            )));
        }

        let r = &self.enrichment;
        unit("enrichment.cross_reference_threshold", r.cross_reference_threshold)?;
        unit("enrichment.proximity_weight", r.proximity_weight)?;
        unit("enrichment.lexical_weight", r.lexical_weight)?;
        if r.proximity_weight + r.lexical_weight <= 0.0 {
            return Err(ConfigError::Invalid("cross-reference weights are both zero".into()));
        }
        unit("enrichment.low_ocr_confidence", r.low_ocr_confidence)?;
        unit("enrichment.low_language_confidence", r.low_language_confidence)?;

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
