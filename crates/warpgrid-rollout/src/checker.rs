//! Status check orchestration.
//!
//! Resolves deadlines once, starts one poller task per workload, joins
//! every task, then summarizes the result store into a verdict.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::aggregate::{Verdict, summarize};
use crate::config::{DEFAULT_MANAGED_BY, StatusCheckConfig};
use crate::deadline::resolve_deadlines;
use crate::error::{ConfigError, ResolveError, StatusCheckError, StatusCheckResult};
use crate::poller::{PollOutcome, PollSettings, Poller};
use crate::query::{ClusterTarget, DeadlineQuery, KubectlCli, RolloutStatusQuery, managed_by_selector};
use crate::store::ResultStore;

/// Outcome of one status check run.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub target: ClusterTarget,
    /// Terminal outcome of every monitored workload, sorted by name.
    pub results: BTreeMap<String, PollOutcome>,
    pub verdict: Verdict,
}

impl StatusReport {
    pub fn into_result(self) -> StatusCheckResult<()> {
        self.verdict.into_result()
    }
}

/// Checks that every managed workload finished rolling out.
pub struct StatusChecker<Q> {
    query: Arc<Q>,
    settings: PollSettings,
    selector: String,
}

impl StatusChecker<KubectlCli> {
    /// Build a checker that shells out to the configured `kubectl`.
    pub fn from_config(config: &StatusCheckConfig) -> Result<Self, ConfigError> {
        Ok(
            Self::new(Arc::new(KubectlCli::new(&config.kubectl)), config.poll_settings()?)
                .with_selector(managed_by_selector(&config.managed_by)),
        )
    }
}

impl<Q> StatusChecker<Q>
where
    Q: RolloutStatusQuery + DeadlineQuery,
{
    pub fn new(query: Arc<Q>, settings: PollSettings) -> Self {
        Self {
            query,
            settings,
            selector: managed_by_selector(DEFAULT_MANAGED_BY),
        }
    }

    /// Label selector used to find managed workloads.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Run a status check against `target`.
    ///
    /// Each workload is polled against `timeout_override` when given,
    /// otherwise against its declared deadline. Fails early only when the
    /// deadlines cannot be resolved; per-workload failures end up in the
    /// report's verdict.
    pub async fn check(
        &self,
        target: ClusterTarget,
        timeout_override: Option<Duration>,
    ) -> StatusCheckResult<StatusReport> {
        info!(%target, selector = %self.selector, "checking rollout status");

        let deadlines = resolve_deadlines(self.query.as_ref(), &target, &self.selector)
            .await
            .map_err(StatusCheckError::Resolve)?;

        let store = ResultStore::new();
        let target = Arc::new(target);
        let poller = Poller::new(
            Arc::clone(&self.query),
            Arc::clone(&target),
            self.settings,
            store.clone(),
        );

        // Every budget is settled before the first poller starts.
        let budgets = deadlines
            .names()
            .map(|name| {
                deadlines
                    .budget_for(name, timeout_override)
                    .map(|budget| (name.to_string(), budget))
                    .ok_or_else(|| ResolveError::NoDeadline(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Dropping the set aborts every poller still running.
        let mut pollers = JoinSet::new();
        let mut workloads = HashMap::with_capacity(budgets.len());
        for (workload, budget) in budgets {
            let poller = poller.clone();
            let name = workload.clone();
            let handle = pollers.spawn(async move { poller.poll(&name, budget).await });
            workloads.insert(handle.id(), workload);
        }

        while let Some(joined) = pollers.join_next_with_id().await {
            let Err(e) = joined else { continue };
            let Some(workload) = workloads.get(&e.id()) else {
                continue;
            };
            error!(%workload, error = %e, "status poller aborted");
            let outcome = PollOutcome::InvocationFailure(format!("status poller aborted: {e}"));
            if let Err(e) = store.record(workload, outcome) {
                warn!(%workload, error = %e, "rollout outcome not recorded");
            }
        }

        let results = store.snapshot();
        let verdict = summarize(&results);
        info!(
            %target,
            workloads = results.len(),
            failed = verdict.failures().len(),
            "rollout status check finished"
        );

        Ok(StatusReport {
            target: Arc::unwrap_or_clone(target),
            results,
            verdict,
        })
    }
}
