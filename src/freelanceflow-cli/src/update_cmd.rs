//! Update command - check for and download new FreelanceFlow releases.
//!
//! Talks to the GitHub Releases API (or a custom origin given with `--url`)
//! and drives the update controller the same way the desktop shell does.

use std::io::{Write, stdout};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use freelanceflow_update::{
    CURRENT_VERSION, CheckOptions, DownloadProgress, ReleaseSource, UpdateConfig,
    UpdateController, UpdateState, UpdateStatus,
};

/// Update CLI.
#[derive(Debug, Parser)]
pub struct UpdateCli {
    #[command(subcommand)]
    pub command: UpdateCommand,

    /// Include prerelease versions
    #[arg(long, global = true)]
    pub pre: bool,

    /// Use custom release API origin
    #[arg(long, global = true, hide = true)]
    pub url: Option<String>,

    /// Print the final state as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum UpdateCommand {
    /// Only check whether a newer version exists
    Check,
    /// Check, then download and verify the artifact for this platform
    Download {
        /// Give up on the download after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}

impl UpdateCli {
    /// Run the update command.
    pub async fn run(self) -> Result<()> {
        let mut config = UpdateConfig::load();
        if let Some(url) = &self.url {
            config.api_base = Some(url.clone());
        }
        if let UpdateCommand::Download {
            timeout: Some(secs),
        } = &self.command
        {
            config.download_timeout_secs = Some(*secs);
        }
        let options = CheckOptions {
            prerelease: self.pre || config.allow_prerelease,
        };

        if !self.json {
            println!("FreelanceFlow Update");
            println!("{}", "=".repeat(40));
            println!("Current version: v{}", CURRENT_VERSION);
            println!("Update server: {}", config.api_base());
        }

        let mut controller =
            UpdateController::new(config).context("Failed to initialize update controller")?;
        if !self.json {
            controller = controller.with_progress_sink(Arc::new(render_progress));
        }

        let state = controller.check_for_update(options).await;
        if !self.json {
            print_check_result(&state);
        }

        if matches!(self.command, UpdateCommand::Download { .. })
            && state.status == UpdateStatus::Available
        {
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    trigger.cancel();
                }
            });

            if !self.json {
                println!("\nDownloading v{}...", state.latest_version.as_deref().unwrap_or("?"));
            }
            let state = controller.start_download(&cancel).await;
            if !self.json {
                println!();
                print_download_result(&state);
            }
            return finish(&state, self.json);
        }

        finish(&state, self.json)
    }
}

/// Progress sink: redraws a single status line.
fn render_progress(total: i64, current: i64) {
    print!("\r  {}", progress_line(DownloadProgress::from_raw(total, current)));
    let _ = stdout().flush();
}

fn progress_line(progress: DownloadProgress) -> String {
    match progress.percentage() {
        Some(pct) => format!(
            "Downloading... {:.0}% ({} / {})",
            pct,
            progress.downloaded_human(),
            progress.total_human()
        ),
        None => format!("Downloading... {}", progress.downloaded_human()),
    }
}

fn print_check_result(state: &UpdateState) {
    match state.status {
        UpdateStatus::Available => {
            println!(
                "\n→ Update available: v{} → v{}",
                state.current_version,
                state.latest_version.as_deref().unwrap_or("?")
            );
            if let Some(info) = &state.update_info {
                if info.mandatory {
                    println!("  This update is mandatory.");
                }
                if !info.release_notes.is_empty() {
                    println!("\nRelease notes: {}", info.release_notes);
                }
                if let Some(url) = &info.release_notes_url {
                    println!("Full notes: {}", url);
                }
            }
            if state.release_source == Some(ReleaseSource::HeuristicAssetMatch) {
                println!("\n! This release publishes no update.json; downloads cannot be verified.");
            }
        }
        UpdateStatus::None => {
            println!(
                "\n✓ You are already on the latest version (v{})",
                state.current_version
            );
        }
        _ => {}
    }
}

fn print_download_result(state: &UpdateState) {
    if let (UpdateStatus::Ready, Some(path)) = (state.status, &state.artifact_path) {
        println!("✓ Update downloaded to {}", path.display());
    }
}

/// Report the final state, failing the process on `error`.
fn finish(state: &UpdateState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
    }
    if state.status == UpdateStatus::Error {
        bail!(
            "{}",
            state.error.as_deref().unwrap_or("update failed for an unknown reason")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        UpdateCli::command().debug_assert();
    }

    #[test]
    fn test_parse_download_with_timeout() {
        let cli = UpdateCli::parse_from(["update", "download", "--timeout", "30", "--pre"]);
        assert!(cli.pre);
        assert!(matches!(
            cli.command,
            UpdateCommand::Download { timeout: Some(30) }
        ));
    }

    #[test]
    fn test_progress_line_uses_human_sizes() {
        assert_eq!(
            progress_line(DownloadProgress::from_raw(2 * 1024 * 1024, 1024 * 1024)),
            "Downloading... 50% (1.0 MB / 2.0 MB)"
        );
        assert_eq!(
            progress_line(DownloadProgress::from_raw(-1, 1536)),
            "Downloading... 1.5 KB"
        );
    }

    #[test]
    fn test_finish_fails_on_error_state() {
        let mut state = UpdateState::new("1.0.0");
        assert!(finish(&state, false).is_ok());
        state.status = UpdateStatus::Error;
        state.error = Some("NetworkError: refused".into());
        let err = finish(&state, false).unwrap_err();
        assert!(err.to_string().contains("refused"));
    }
}
