use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "warp",
    about = "WarpGrid — Wasm-native cluster orchestrator",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for managed deployments to finish rolling out.
    ///
    /// Reads every deployment labelled app.kubernetes.io/managed-by=<tool>
    /// in the namespace and polls `kubectl rollout status` for each one
    /// until it is rolled out, cannot be queried, or runs out of time.
    /// Exits non-zero if any deployment failed.
    Status {
        /// Kube context to check
        #[arg(long)]
        context: String,
        /// Namespace to check
        #[arg(short, long, default_value = "default")]
        namespace: String,
        /// Status-check config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Budget per deployment, replacing its progressDeadlineSeconds (e.g. 90s, 2m)
        #[arg(short, long)]
        timeout: Option<String>,
        /// Sleep between status queries (e.g. 500ms)
        #[arg(long)]
        poll_interval: Option<String>,
        /// kubectl binary
        #[arg(long)]
        kubectl: Option<String>,
        /// Value of the app.kubernetes.io/managed-by label
        #[arg(long)]
        managed_by: Option<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("warp=info".parse()?)
                .add_directive("warpgrid_rollout=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status {
            context,
            namespace,
            config,
            timeout,
            poll_interval,
            kubectl,
            managed_by,
            format,
        } => {
            let overrides = commands::status::Overrides {
                timeout,
                poll_interval,
                kubectl,
                managed_by,
            };
            commands::status::status(&context, &namespace, config.as_deref(), overrides, &format)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_requires_context() {
        assert!(Cli::try_parse_from(["warp", "status"]).is_err());
    }

    #[test]
    fn status_defaults() {
        let cli = Cli::try_parse_from(["warp", "status", "--context", "kind"]).unwrap();
        let Commands::Status {
            context,
            namespace,
            config,
            timeout,
            format,
            ..
        } = cli.command;
        assert_eq!(context, "kind");
        assert_eq!(namespace, "default");
        assert!(config.is_none());
        assert!(timeout.is_none());
        assert_eq!(format, "text");
    }

    #[test]
    fn status_flags() {
        let cli = Cli::try_parse_from([
            "warp",
            "status",
            "--context",
            "prod",
            "-n",
            "payments",
            "--timeout",
            "2m",
            "--poll-interval",
            "500ms",
            "--managed-by",
            "skaffold",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::Status {
            namespace,
            timeout,
            poll_interval,
            managed_by,
            format,
            ..
        } = cli.command;
        assert_eq!(namespace, "payments");
        assert_eq!(timeout.as_deref(), Some("2m"));
        assert_eq!(poll_interval.as_deref(), Some("500ms"));
        assert_eq!(managed_by.as_deref(), Some("skaffold"));
        assert_eq!(format, "json");
    }
}
