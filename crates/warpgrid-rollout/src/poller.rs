//! Per-workload rollout status poller.
//!
//! Each poller owns one workload and runs on its own timeline:
//!
//! ```text
//! query ──Err──────────────▶ InvocationFailure   (never retried)
//!   │
//!   ├── "successfully rolled out" ──▶ Success
//!   │
//!   └── anything else ── elapsed ≥ budget? ──yes──▶ TimedOut
//!                              │ no
//!                              └── sleep(interval) ──▶ query
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_POLL_INTERVAL;
use crate::error::{ConfigError, QueryError};
use crate::query::{ClusterTarget, RolloutStatusQuery};
use crate::store::ResultStore;

/// Substring of `kubectl rollout status` output once a rollout completed.
pub const ROLLOUT_SUCCESS_MARKER: &str = "successfully rolled out";

/// Failure cause reported for a workload that ran out of budget.
pub const TIMEOUT_CAUSE: &str = "did not stabilize within the given timeout";

/// Result of polling a workload's rollout status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PollOutcome {
    /// Rollout confirmed stable.
    Success,
    /// Not yet stable. Carries the status text; triggers another poll.
    Pending(String),
    /// The query itself failed. Terminal, never retried.
    InvocationFailure(String),
    /// The budget elapsed before the rollout was confirmed.
    TimedOut,
}

impl PollOutcome {
    /// Classify the result of one status query.
    pub fn from_query(result: Result<String, QueryError>) -> Self {
        match result {
            Err(e) => Self::InvocationFailure(e.to_string()),
            Ok(text) if text.contains(ROLLOUT_SUCCESS_MARKER) => Self::Success,
            Ok(text) => Self::Pending(text.trim().to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending(_))
    }

    /// Why this workload failed, or `None` if it did not.
    pub fn failure_cause(&self) -> Option<&str> {
        match self {
            Self::InvocationFailure(cause) => Some(cause),
            Self::TimedOut => Some(TIMEOUT_CAUSE),
            Self::Success | Self::Pending(_) => None,
        }
    }
}

/// Timing parameters shared by every poller of a status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    interval: Duration,
    query_timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            query_timeout: None,
        }
    }
}

impl PollSettings {
    /// `interval` must be strictly positive.
    pub fn new(interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(Self {
            interval,
            query_timeout: None,
        })
    }

    /// Bound every single query invocation by `limit`.
    pub fn with_query_timeout(mut self, limit: Duration) -> Self {
        self.query_timeout = Some(limit);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }
}

/// Polls rollout status for workloads and records terminal outcomes.
pub struct Poller<Q> {
    query: Arc<Q>,
    target: Arc<ClusterTarget>,
    settings: PollSettings,
    store: ResultStore,
}

impl<Q> Clone for Poller<Q> {
    fn clone(&self) -> Self {
        Self {
            query: Arc::clone(&self.query),
            target: Arc::clone(&self.target),
            settings: self.settings,
            store: self.store.clone(),
        }
    }
}

impl<Q: RolloutStatusQuery> Poller<Q> {
    pub fn new(
        query: Arc<Q>,
        target: Arc<ClusterTarget>,
        settings: PollSettings,
        store: ResultStore,
    ) -> Self {
        Self {
            query,
            target,
            settings,
            store,
        }
    }

    /// Poll `workload` until it reaches a terminal outcome within `budget`,
    /// then record that outcome in the store.
    pub async fn poll(&self, workload: &str, budget: Duration) -> PollOutcome {
        let outcome = self.poll_until_terminal(workload, budget).await;
        if let Err(e) = self.store.record(workload, outcome.clone()) {
            warn!(%workload, error = %e, "rollout outcome not recorded");
        }
        outcome
    }

    async fn poll_until_terminal(&self, workload: &str, budget: Duration) -> PollOutcome {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match PollOutcome::from_query(self.query_once(workload).await) {
                PollOutcome::Pending(status) => {
                    let elapsed = started.elapsed();
                    if elapsed >= budget {
                        warn!(
                            %workload,
                            attempt,
                            elapsed_ms = elapsed.as_millis() as u64,
                            budget_ms = budget.as_millis() as u64,
                            last_status = %status,
                            "rollout did not stabilize in time"
                        );
                        return PollOutcome::TimedOut;
                    }
                    debug!(%workload, attempt, %status, "rollout pending");
                    sleep(self.settings.interval).await;
                }
                PollOutcome::Success => {
                    info!(
                        %workload,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "rollout complete"
                    );
                    return PollOutcome::Success;
                }
                failure => {
                    warn!(%workload, attempt, cause = failure.failure_cause(), "rollout status query failed");
                    return failure;
                }
            }
        }
    }

    async fn query_once(&self, workload: &str) -> Result<String, QueryError> {
        let query = self.query.rollout_status(&self.target, workload);
        match self.settings.query_timeout {
            Some(limit) => timeout(limit, query)
                .await
                .unwrap_or(Err(QueryError::TimedOut(limit))),
            None => query.await,
        }
    }
}
