//! WarpGrid rollout status checks.
//!
//! After workloads are applied to a cluster, this crate decides whether
//! each of them actually finished rolling out within its deadline and
//! reduces the per-workload results to one verdict.
//!
//! # Flow
//!
//! ```text
//! StatusChecker::check
//!   ├── resolve_deadlines()      one inspection query, name → seconds
//!   ├── Poller per workload      concurrent tasks, rollout status loop
//!   │     └── ResultStore        one terminal outcome per workload
//!   └── summarize()              Verdict (sorted failure lines)
//! ```
//!
//! # Components
//!
//! - **`query`** — cluster query traits and the `kubectl` implementation
//! - **`deadline`** — deadline resolution and parsing
//! - **`poller`** — per-workload polling loop
//! - **`store`** — concurrent result store
//! - **`aggregate`** — verdict computation
//! - **`checker`** — orchestration entry point
//! - **`config`** — TOML configuration and duration parsing

pub mod aggregate;
pub mod checker;
pub mod config;
pub mod deadline;
pub mod error;
pub mod poller;
pub mod query;
pub mod store;

#[cfg(test)]
mod testing;

pub use aggregate::{Verdict, failure_line, summarize};
pub use checker::{StatusChecker, StatusReport};
pub use config::{StatusCheckConfig, parse_duration};
pub use deadline::{Deadlines, parse_deadlines, resolve_deadlines};
pub use error::{
    ConfigError, QueryError, ResolveError, StatusCheckError, StatusCheckResult, StoreError,
};
pub use poller::{PollOutcome, PollSettings, Poller, ROLLOUT_SUCCESS_MARKER, TIMEOUT_CAUSE};
pub use query::{ClusterTarget, DeadlineQuery, KubectlCli, RolloutStatusQuery, managed_by_selector};
pub use store::ResultStore;
