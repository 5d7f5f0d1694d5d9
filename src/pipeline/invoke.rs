//! Guarded provider calls.
//!
//! Providers are synchronous. A call is run to completion, then judged: an error is
//! `Failed`, a panic is `Panicked`, and a result that arrived after the configured
//! budget is discarded as `TimedOut`. Callers treat all three alike.

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallFailure {
    Failed,
    TimedOut,
    Panicked,
}

impl CallFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Panicked => "panicked",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} ({})", message, kind.as_str())]
pub struct CallError {
    pub kind: CallFailure,
    pub message: String,
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "provider panicked".to_string()
    }
}

/// Run `call` under the timeout and panic guards.
pub fn invoke<T, E, F>(timeout: Option<Duration>, call: F) -> Result<T, CallError>
where
    E: Display,
    F: FnOnce() -> Result<T, E>,
{
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(call));
    let elapsed = started.elapsed();

    let result = match outcome {
        Ok(result) => result,
        Err(payload) => {
            return Err(CallError {
                kind: CallFailure::Panicked,
                message: panic_message(payload.as_ref()),
            })
        }
    };

    if let Some(limit) = timeout {
        if elapsed > limit {
            return Err(CallError {
                kind: CallFailure::TimedOut,
                message: format!(
                    "call took {} ms, limit is {} ms",
                    elapsed.as_millis(),
                    limit.as_millis()
                ),
            });
        }
    }

    result.map_err(|e| CallError {
        kind: CallFailure::Failed,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_success() {
        let out: Result<u32, CallError> = invoke(None, || Ok::<_, String>(7));
        assert_eq!(out.unwrap(), 7);
    }

    #[test]
    fn classifies_errors() {
        let err = invoke(None, || Err::<u32, _>("bad input")).unwrap_err();
        assert_eq!(err.kind, CallFailure::Failed);
        assert_eq!(err.message, "bad input");
        assert_eq!(err.to_string(), "bad input (failed)");
    }

    #[test]
    fn catches_panics() {
        let err = invoke(None, || -> Result<u32, String> { panic!("model exploded") }).unwrap_err();
        assert_eq!(err.kind, CallFailure::Panicked);
        assert_eq!(err.message, "model exploded");
    }

    #[test]
    fn slow_success_is_discarded() {
        let err = invoke(Some(Duration::from_millis(5)), || {
            std::thread::sleep(Duration::from_millis(30));
            Ok::<_, String>(1)
        })
        .unwrap_err();
        assert_eq!(err.kind, CallFailure::TimedOut);
    }

    #[test]
    fn timed_out_call_still_runs_to_completion() {
        let mut finished = false;
        let err = invoke(Some(Duration::from_millis(1)), || {
            std::thread::sleep(Duration::from_millis(20));
            finished = true;
            Ok::<_, String>(())
        })
        .unwrap_err();
        assert_eq!(err.kind, CallFailure::TimedOut);
        assert!(finished, "the budget is checked only after the call returns");
    }

    #[test]
    fn fast_call_within_budget() {
        let out = invoke(Some(Duration::from_secs(5)), || Ok::<_, String>("ok"));
        assert_eq!(out.unwrap(), "ok");
    }
}
