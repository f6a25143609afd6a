//! Aggregation of per-workload outcomes into a single verdict.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StatusCheckError;
use crate::poller::PollOutcome;

/// Overall result of a status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "failures", rename_all = "snake_case")]
pub enum Verdict {
    Success,
    /// One line per failed workload, sorted by workload name.
    Failure(Vec<String>),
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn failures(&self) -> &[String] {
        match self {
            Self::Success => &[],
            Self::Failure(lines) => lines,
        }
    }

    pub fn into_result(self) -> Result<(), StatusCheckError> {
        match self {
            Self::Success => Ok(()),
            Self::Failure(failures) => Err(StatusCheckError::Rollout { failures }),
        }
    }
}

/// Failure line for one workload.
pub fn failure_line(workload: &str, cause: &str) -> String {
    format!("deployment {workload} failed due to {cause}")
}

/// Summarize terminal outcomes.
///
/// Output order follows the map's key order, so the same results always
/// produce the same verdict.
pub fn summarize(results: &BTreeMap<String, PollOutcome>) -> Verdict {
    let failures: Vec<String> = results
        .iter()
        .filter_map(|(name, outcome)| outcome.failure_cause().map(|c| failure_line(name, c)))
        .collect();

    if failures.is_empty() {
        Verdict::Success
    } else {
        Verdict::Failure(failures)
    }
}
