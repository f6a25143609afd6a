//! `warp status` — wait for managed deployments to roll out.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;
use warpgrid_rollout::{ClusterTarget, PollOutcome, StatusCheckConfig, StatusChecker, StatusReport};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub timeout: Option<String>,
    pub poll_interval: Option<String>,
    pub kubectl: Option<String>,
    pub managed_by: Option<String>,
}

/// Run the `warp status` command.
pub async fn status(
    context: &str,
    namespace: &str,
    config_path: Option<&Path>,
    overrides: Overrides,
    format: &str,
) -> Result<()> {
    if !matches!(format, "text" | "json") {
        bail!("Unknown format: {format}. Use 'text' or 'json'.");
    }

    let config = load_config(config_path, overrides)?;
    let timeout = config.timeout_override()?;
    let checker = StatusChecker::from_config(&config)?;

    info!(%context, %namespace, "waiting for deployments to stabilize");
    let report = checker
        .check(ClusterTarget::new(context, namespace), timeout)
        .await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", render_text(&report)),
    }

    report.into_result().context("deployments failed to stabilize")
}

/// Read the config file (if any) and apply command-line overrides.
fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<StatusCheckConfig> {
    let mut config = match path {
        Some(path) => StatusCheckConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => StatusCheckConfig::default(),
    };

    if let Some(timeout) = overrides.timeout {
        config.timeout = Some(timeout);
    }
    if let Some(interval) = overrides.poll_interval {
        config.poll_interval = interval;
    }
    if let Some(kubectl) = overrides.kubectl {
        config.kubectl = kubectl;
    }
    if let Some(managed_by) = overrides.managed_by {
        config.managed_by = managed_by;
    }
    Ok(config)
}

fn render_text(report: &StatusReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("Rollout status ({})\n", report.target));
    out.push_str(&format!("{}\n", "=".repeat(40)));

    if report.results.is_empty() {
        out.push_str("  No managed deployments found.\n");
    }
    for (name, outcome) in &report.results {
        let status = match outcome {
            PollOutcome::Success => "OK",
            PollOutcome::TimedOut => "TIMEOUT",
            PollOutcome::InvocationFailure(_) => "FAILED",
            PollOutcome::Pending(_) => "PENDING",
        };
        out.push_str(&format!("  {status:<8} {name}\n"));
    }
    out.push('\n');

    let failures = report.verdict.failures();
    if failures.is_empty() {
        out.push_str(&format!(
            "All {} deployment(s) stabilized.\n",
            report.results.len()
        ));
    } else {
        out.push_str(&format!("{} deployment(s) failed:\n", failures.len()));
        for line in failures {
            out.push_str(&format!("  - {line}\n"));
        }
    }
    out
}
