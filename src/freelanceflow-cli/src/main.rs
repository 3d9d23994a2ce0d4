//! FreelanceFlow updater CLI - Main entry point.
//!
//! A command-line host for the update pipeline:
//! - `check` - query the release API for a newer version
//! - `download` - download and verify the artifact for this platform

mod update_cmd;

use anyhow::Result;
use clap::Parser;

use update_cmd::UpdateCli;

/// Log level accepted by `--log-level` and `FREELANCEFLOW_LOG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "freelanceflow-update", version, about = "Check for and download FreelanceFlow updates")]
struct Cli {
    #[command(flatten)]
    update: UpdateCli,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    log_level: LogLevel,
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else if let Ok(env_level) = std::env::var("FREELANCEFLOW_LOG") {
        LogLevel::from_str_loose(&env_level).unwrap_or(cli.log_level)
    } else {
        cli.log_level
    };

    // RUST_LOG wins when set; otherwise scope the level to our crates
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "error,freelanceflow_update={0},freelanceflow_common={0},freelanceflow_cli={0}",
            log_level.as_filter_str()
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    cli.update.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str_loose() {
        assert_eq!(LogLevel::from_str_loose(" DEBUG "), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str_loose("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str_loose("loud"), None);
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::parse_from(["freelanceflow-update", "check", "-v", "--json"]);
        assert!(cli.verbose);
        assert!(cli.update.json);
    }
}
