//! Deadline resolution — one inspection query per status check.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error};

use crate::error::ResolveError;
use crate::query::{ClusterTarget, DeadlineQuery};

/// Declared readiness deadline (seconds) of every monitored workload.
///
/// A workload whose deadline is unset (kubectl prints `<no value>`) is
/// still monitored but has no entry value. Built once per status check
/// and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Deadlines {
    by_name: BTreeMap<String, Option<f64>>,
}

impl Deadlines {
    /// Declared deadline of `name`, if it is monitored and declares one.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.by_name.get(name).copied().flatten()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Workload names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.by_name.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Effective polling budget for `name`.
    ///
    /// `override_budget` wins when present; otherwise the declared deadline
    /// is used. `None` means the workload has no declared deadline and no
    /// fallback was supplied.
    pub fn budget_for(&self, name: &str, override_budget: Option<Duration>) -> Option<Duration> {
        override_budget.or_else(|| {
            self.get(name)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        })
    }
}

impl FromIterator<(String, f64)> for Deadlines {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            by_name: iter.into_iter().map(|(name, secs)| (name, Some(secs))).collect(),
        }
    }
}

/// Parse the inspection query output.
///
/// The output is a single line of `name:seconds` pairs separated by commas.
/// A trailing comma is tolerated, and empty or quoted-empty (`''`) output
/// means no managed workloads. A value that is not a number leaves the
/// workload without a declared deadline.
pub fn parse_deadlines(raw: &str) -> Result<Deadlines, ResolveError> {
    let line = raw.trim().trim_matches('\'');
    let mut by_name = BTreeMap::new();

    for entry in line.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let malformed = |reason: &str| ResolveError::Malformed {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let (name, secs) = entry
            .split_once(':')
            .ok_or_else(|| malformed("expected name:seconds"))?;
        if name.is_empty() {
            return Err(malformed("empty deployment name"));
        }
        let secs = match secs.trim().parse::<f64>() {
            Ok(secs) if secs <= 0.0 || Duration::try_from_secs_f64(secs).is_err() => {
                return Err(malformed("deadline must be a positive number of seconds"));
            }
            Ok(secs) => Some(secs),
            Err(_) => {
                debug!(deployment = %name, value = %secs, "deployment declares no deadline");
                None
            }
        };

        by_name.insert(name.to_string(), secs);
    }

    Ok(Deadlines { by_name })
}

/// Query the cluster for the deadlines of every workload matching `selector`.
///
/// Any failure here aborts the whole status check.
pub async fn resolve_deadlines<Q: DeadlineQuery>(
    query: &Q,
    target: &ClusterTarget,
    selector: &str,
) -> Result<Deadlines, ResolveError> {
    let raw = query.deadlines(target, selector).await.inspect_err(|e| {
        error!(%target, %selector, error = %e, "deadline query failed");
    })?;
    let deadlines = parse_deadlines(&raw)?;
    debug!(%target, workloads = deadlines.len(), "resolved deployment deadlines");
    Ok(deadlines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::testing::ScriptedCluster;

    fn deadlines(pairs: &[(&str, f64)]) -> Deadlines {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn parses_pairs() {
        assert_eq!(
            parse_deadlines("dep1:100,dep2:200").unwrap(),
            deadlines(&[("dep1", 100.0), ("dep2", 200.0)])
        );
    }

    #[test]
    fn tolerates_trailing_comma_and_quotes() {
        assert_eq!(
            parse_deadlines("'dep1:600,dep2:1.5,'\n").unwrap(),
            deadlines(&[("dep1", 600.0), ("dep2", 1.5)])
        );
    }

    #[test]
    fn empty_output_is_empty_mapping() {
        assert!(parse_deadlines("''").unwrap().is_empty());
        assert!(parse_deadlines("").unwrap().is_empty());
        assert!(parse_deadlines("  \n").unwrap().is_empty());
    }

    #[test]
    fn rejects_missing_separator() {
        let err = parse_deadlines("dep1:100,dep2").unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { ref entry, .. } if entry == "dep2"));
    }

    #[test]
    fn unset_deadline_is_kept_without_budget() {
        let d = parse_deadlines("dep1:<no value>,dep2:30,").unwrap();
        assert_eq!(d.names().collect::<Vec<_>>(), ["dep1", "dep2"]);
        assert!(d.contains("dep1"));
        assert_eq!(d.get("dep1"), None);
        assert_eq!(d.budget_for("dep1", None), None);
        assert_eq!(
            d.budget_for("dep1", Some(Duration::from_secs(5))),
            Some(Duration::from_secs(5))
        );
        assert_eq!(d.budget_for("dep2", None), Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_non_positive_deadline() {
        assert!(parse_deadlines("dep1:0").is_err());
        assert!(parse_deadlines("dep1:-5").is_err());
        assert!(parse_deadlines("dep1:NaN").is_err());
        assert!(parse_deadlines("dep1:inf").is_err());
    }

    #[test]
    fn budget_prefers_override() {
        let d = deadlines(&[("dep1", 100.0)]);
        assert_eq!(d.budget_for("dep1", None), Some(Duration::from_secs(100)));
        assert_eq!(
            d.budget_for("dep1", Some(Duration::from_secs(5))),
            Some(Duration::from_secs(5))
        );
        assert_eq!(d.budget_for("other", None), None);
        assert_eq!(
            d.budget_for("other", Some(Duration::from_secs(5))),
            Some(Duration::from_secs(5))
        );
    }

    #[tokio::test]
    async fn resolve_uses_query_output() {
        let cluster = ScriptedCluster::new().with_deadlines(Ok("dep1:100,dep2:200".to_string()));
        let target = ClusterTarget::new("kubecontext", "test");
        let resolved = resolve_deadlines(&cluster, &target, "app.kubernetes.io/managed-by=x")
            .await
            .unwrap();
        assert_eq!(resolved.names().collect::<Vec<_>>(), ["dep1", "dep2"]);
        assert_eq!(
            cluster.deadline_selectors(),
            ["app.kubernetes.io/managed-by=x".to_string()]
        );
    }

    #[tokio::test]
    async fn resolve_propagates_query_error() {
        let cluster =
            ScriptedCluster::new().with_deadlines(Err(QueryError::Other("error".to_string())));
        let target = ClusterTarget::new("kubecontext", "test");
        let err = resolve_deadlines(&cluster, &target, "sel").await.unwrap_err();
        assert!(matches!(err, ResolveError::Query(_)));
    }
}
