//! Status-check configuration.
//!
//! Every field is optional in TOML form:
//!
//! ```toml
//! kubectl = "kubectl"
//! managed_by = "warpgrid"
//! poll_interval = "100ms"
//! timeout = "2m"
//! query_timeout = "30s"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::poller::PollSettings;

/// Default sleep between two status queries for the same workload.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Label value identifying workloads deployed by this tool.
pub const DEFAULT_MANAGED_BY: &str = "warpgrid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCheckConfig {
    /// Cluster CLI binary.
    pub kubectl: String,
    /// Value of the `app.kubernetes.io/managed-by` label.
    pub managed_by: String,
    pub poll_interval: String,
    /// Budget applied to every workload instead of its declared deadline.
    pub timeout: Option<String>,
    /// Ceiling on a single query invocation.
    pub query_timeout: Option<String>,
}

impl Default for StatusCheckConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_string(),
            managed_by: DEFAULT_MANAGED_BY.to_string(),
            poll_interval: "100ms".to_string(),
            timeout: None,
            query_timeout: None,
        }
    }
}

impl StatusCheckConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the timing fields into poller settings.
    pub fn poll_settings(&self) -> Result<PollSettings, ConfigError> {
        let interval = field_duration("poll_interval", &self.poll_interval)?;
        let settings = PollSettings::new(interval)?;
        Ok(match &self.query_timeout {
            Some(raw) => settings.with_query_timeout(field_duration("query_timeout", raw)?),
            None => settings,
        })
    }

    /// The caller-supplied budget override, if configured.
    pub fn timeout_override(&self) -> Result<Option<Duration>, ConfigError> {
        self.timeout
            .as_deref()
            .map(|raw| field_duration("timeout", raw))
            .transpose()
    }
}

fn field_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })
}

/// Parse a duration string like "5s", "500ms", "1m".
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
