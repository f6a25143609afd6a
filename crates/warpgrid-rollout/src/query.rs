//! Cluster queries consumed by the status checker.
//!
//! The checker never talks to the cluster directly. It issues two kinds of
//! read-only queries through these traits, which keeps the polling logic
//! testable against scripted responses. `KubectlCli` is the production
//! implementation and shells out to `kubectl`.

use std::fmt;
use std::future::Future;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::QueryError;

/// Go template emitting `name:progressDeadlineSeconds,` for every deployment.
pub const DEADLINE_TEMPLATE: &str =
    "{{range .items}}{{.metadata.name}}:{{.spec.progressDeadlineSeconds}},{{end}}";

/// Kube context and namespace a status check runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTarget {
    pub context: String,
    pub namespace: String,
}

impl ClusterTarget {
    pub fn new(context: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ClusterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.context, self.namespace)
    }
}

/// Label selector for workloads managed by `tool`.
pub fn managed_by_selector(tool: &str) -> String {
    format!("app.kubernetes.io/managed-by={tool}")
}

/// Fetches the current rollout status text of one workload.
///
/// An `Err` means the query itself failed (e.g. the workload does not
/// exist). A workload that is merely still rolling out returns `Ok` with
/// its status text.
pub trait RolloutStatusQuery: Send + Sync + 'static {
    fn rollout_status(
        &self,
        target: &ClusterTarget,
        workload: &str,
    ) -> impl Future<Output = Result<String, QueryError>> + Send;
}

/// Fetches `name:deadlineSeconds,` pairs for every workload matching `selector`.
pub trait DeadlineQuery: Send + Sync {
    fn deadlines(
        &self,
        target: &ClusterTarget,
        selector: &str,
    ) -> impl Future<Output = Result<String, QueryError>> + Send;
}

/// Queries the cluster by running `kubectl`.
#[derive(Debug, Clone)]
pub struct KubectlCli {
    binary: String,
}

impl Default for KubectlCli {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl KubectlCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Arguments for `rollout status`, without the binary.
    pub fn rollout_status_args(target: &ClusterTarget, workload: &str) -> Vec<String> {
        let mut args = base_args(target);
        args.extend([
            "rollout".to_string(),
            "status".to_string(),
            format!("deployment/{workload}"),
            // A single snapshot; the poller owns the retry loop.
            "--watch=false".to_string(),
        ]);
        args
    }

    /// Arguments for the deadline inspection query, without the binary.
    pub fn deadline_args(target: &ClusterTarget, selector: &str) -> Vec<String> {
        let mut args = base_args(target);
        args.extend([
            "get".to_string(),
            "deployments".to_string(),
            "-l".to_string(),
            selector.to_string(),
            "--output".to_string(),
            format!("go-template={DEADLINE_TEMPLATE}"),
        ]);
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<String, QueryError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!(%command, "running cluster query");

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| QueryError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(QueryError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| QueryError::Output { command })
    }
}

fn base_args(target: &ClusterTarget) -> Vec<String> {
    vec![
        "--context".to_string(),
        target.context.clone(),
        "--namespace".to_string(),
        target.namespace.clone(),
    ]
}

impl RolloutStatusQuery for KubectlCli {
    async fn rollout_status(
        &self,
        target: &ClusterTarget,
        workload: &str,
    ) -> Result<String, QueryError> {
        self.run(Self::rollout_status_args(target, workload)).await
    }
}

impl DeadlineQuery for KubectlCli {
    async fn deadlines(&self, target: &ClusterTarget, selector: &str) -> Result<String, QueryError> {
        self.run(Self::deadline_args(target, selector)).await
    }
}
