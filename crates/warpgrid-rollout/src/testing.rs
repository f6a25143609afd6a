//! Scripted cluster used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::QueryError;
use crate::query::{ClusterTarget, DeadlineQuery, RolloutStatusQuery};

#[derive(Default)]
struct Script {
    responses: Vec<String>,
    err: Option<QueryError>,
    calls: usize,
}

/// Answers queries from canned responses.
///
/// Rollout status responses are replayed in order; once exhausted the last
/// response repeats. A scripted error is returned on every call.
#[derive(Default)]
pub(crate) struct ScriptedCluster {
    deadlines: Mutex<Option<Result<String, QueryError>>>,
    deadline_selectors: Mutex<Vec<String>>,
    scripts: Mutex<HashMap<String, Script>>,
}

impl ScriptedCluster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_deadlines(self, result: Result<String, QueryError>) -> Self {
        *self.deadlines.lock().unwrap() = Some(result);
        self
    }

    pub(crate) fn with_responses(self, workload: &str, responses: &[&str]) -> Self {
        self.scripts.lock().unwrap().insert(
            workload.to_string(),
            Script {
                responses: responses.iter().map(|r| r.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    pub(crate) fn with_error(self, workload: &str, err: QueryError) -> Self {
        self.scripts.lock().unwrap().insert(
            workload.to_string(),
            Script {
                err: Some(err),
                ..Default::default()
            },
        );
        self
    }

    pub(crate) fn calls(&self, workload: &str) -> usize {
        self.scripts
            .lock()
            .unwrap()
            .get(workload)
            .map_or(0, |s| s.calls)
    }

    pub(crate) fn deadline_selectors(&self) -> Vec<String> {
        self.deadline_selectors.lock().unwrap().clone()
    }
}

impl RolloutStatusQuery for ScriptedCluster {
    async fn rollout_status(
        &self,
        _target: &ClusterTarget,
        workload: &str,
    ) -> Result<String, QueryError> {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.entry(workload.to_string()).or_default();
        script.calls += 1;

        if let Some(err) = &script.err {
            return Err(err.clone());
        }
        match script.responses.get(script.calls - 1).or(script.responses.last()) {
            Some(resp) => Ok(resp.clone()),
            None => Err(QueryError::Other(format!(
                "deployment.apps/{workload} could not be found"
            ))),
        }
    }
}

impl DeadlineQuery for ScriptedCluster {
    async fn deadlines(&self, _target: &ClusterTarget, selector: &str) -> Result<String, QueryError> {
        self.deadline_selectors
            .lock()
            .unwrap()
            .push(selector.to_string());
        self.deadlines
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
