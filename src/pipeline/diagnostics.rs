//! Per-document record of non-fatal sub-step failures.

use serde::{Deserialize, Serialize};

use crate::models::Stage;

use super::invoke::{CallError, CallFailure};

/// Sub-step that can fail without aborting the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Recognition,
    LanguageIdentification,
    Generation,
    CrossReference,
    SemanticAnalysis,
    Summary,
    Enhancement,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recognition => "recognition",
            Self::LanguageIdentification => "language_identification",
            Self::Generation => "generation",
            Self::CrossReference => "cross_reference",
            Self::SemanticAnalysis => "semantic_analysis",
            Self::Summary => "summary",
            Self::Enhancement => "enhancement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub step: Step,
    /// Element the failed call was about; `None` for document-level steps.
    pub element_id: Option<usize>,
    pub failure: CallFailure,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed call and log it.
    pub fn record(&mut self, stage: Stage, step: Step, element_id: Option<usize>, error: &CallError) {
        tracing::warn!(
            stage = %stage,
            step = step.as_str(),
            element_id = ?element_id,
            failure = error.kind.as_str(),
            error = %error.message,
            "Sub-step failed, continuing"
        );
        self.entries.push(Diagnostic {
            stage,
            step,
            element_id,
            failure: error.kind,
            message: error.message.clone(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Distinct steps that failed in `stage`, in first-failure order.
    pub fn failed_steps(&self, stage: Stage) -> Vec<Step> {
        let mut steps = Vec::new();
        for d in self.entries.iter().filter(|d| d.stage == stage) {
            if !steps.contains(&d.step) {
                steps.push(d.step);
            }
        }
        steps
    }
}
