//! Error types for rollout status checks.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a single cluster query invocation.
///
/// These are never retried: a query that cannot run is terminal for the
/// workload it was issued for.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("failed to spawn `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` produced non-UTF-8 output")]
    Output { command: String },

    #[error("status query did not return within {0:?}")]
    TimedOut(Duration),

    #[error("{0}")]
    Other(String),
}

/// Errors resolving the per-workload readiness deadlines.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not fetch deployment deadlines: {0}")]
    Query(#[from] QueryError),

    #[error("malformed deadline entry `{entry}`: {reason}")]
    Malformed { entry: String, reason: String },

    #[error("deployment {0} declares no progress deadline and no timeout was given")]
    NoDeadline(String),
}

/// Errors loading or validating status-check configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for `{field}`: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
}

/// Errors writing to the result store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("result for deployment {0} already recorded")]
    Duplicate(String),

    #[error("outcome for deployment {0} is not terminal")]
    NotTerminal(String),
}

/// Top-level status check failure.
#[derive(Debug, Error)]
pub enum StatusCheckError {
    /// Deadlines could not be resolved; no workload was polled.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// One or more workloads failed to stabilize.
    #[error("{}", .failures.join("\n"))]
    Rollout { failures: Vec<String> },
}

pub type StatusCheckResult<T> = Result<T, StatusCheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollout_error_lists_every_failure() {
        let err = StatusCheckError::Rollout {
            failures: vec![
                "deployment a failed due to boom".to_string(),
                "deployment b failed due to bang".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "deployment a failed due to boom\ndeployment b failed due to bang"
        );
    }

    #[test]
    fn resolve_error_is_transparent() {
        let err: StatusCheckError =
            ResolveError::Query(QueryError::Other("error".to_string())).into();
        assert_eq!(err.to_string(), "could not fetch deployment deadlines: error");
    }
}
