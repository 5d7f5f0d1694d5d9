//! Batch processing: many pages, each an independent rayon task.
//!
//! A page whose Stage 1 fails (or whose providers panic outside the guarded calls)
//! becomes a `Failed` entry; its siblings are unaffected.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::models::{PageImage, Stage};

use super::controller::{DocumentOutcome, StageController};
use super::error::PipelineError;
use super::invoke::panic_message;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntry {
    Completed(Box<DocumentOutcome>),
    Failed {
        document_id: Uuid,
        /// Written as its display text.
        #[serde(serialize_with = "display_error")]
        error: PipelineError,
    },
}

fn display_error<S: Serializer>(error: &PipelineError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

impl BatchEntry {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn outcome(&self) -> Option<&DocumentOutcome> {
        match self {
            Self::Completed(outcome) => Some(outcome),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    pub completed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

pub struct BatchProcessor<'c, 'p> {
    controller: &'c StageController<'p>,
}

impl<'c, 'p> BatchProcessor<'c, 'p> {
    pub fn new(controller: &'c StageController<'p>) -> Self {
        Self { controller }
    }

    /// Process every page to `stage`. Entries are in input order.
    pub fn run(&self, pages: &[PageImage], stage: Stage) -> BatchReport {
        let start = Instant::now();

        let entries: Vec<BatchEntry> = pages
            .par_iter()
            .enumerate()
            .map(|(index, page)| self.run_one(index, page, stage))
            .collect();

        let completed = entries.iter().filter(|e| e.is_completed()).count();
        let failed = entries.len() - completed;
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(pages = pages.len(), completed, failed, duration_ms, "Batch complete");

        BatchReport {
            entries,
            completed,
            failed,
            duration_ms,
        }
    }

    fn run_one(&self, index: usize, page: &PageImage, stage: Stage) -> BatchEntry {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.controller.process(page, stage)));
        let error = match outcome {
            Ok(Ok(outcome)) => return BatchEntry::Completed(Box::new(outcome)),
            Ok(Err(e)) => e,
            Err(payload) => PipelineError::Panicked {
                message: panic_message(payload.as_ref()),
            },
        };

        let document_id = Uuid::new_v4();
        tracing::warn!(index, %document_id, error = %error, "Document failed");
        BatchEntry::Failed { document_id, error }
    }
}
