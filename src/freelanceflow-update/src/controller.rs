//! Update controller - the observable check/download state machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;

use crate::CURRENT_VERSION;
use crate::api::{ReleaseClient, ReleaseResolver, platform_key};
use crate::config::{CheckOptions, UpdateConfig};
use crate::download::{DownloadProgress, Downloader};
use crate::error::{UpdateError, UpdateResult};
use crate::release::{PlatformArtifact, ReleaseSource};
use crate::state::{UpdateState, UpdateStatus};
use crate::verify::verify_digest;
use crate::version::Version;

/// Receives raw `(total, current)` byte counts; `total` is `-1` when unknown.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, total: i64, current: i64);
}

impl<F> ProgressSink for F
where
    F: Fn(i64, i64) + Send + Sync,
{
    fn emit(&self, total: i64, current: i64) {
        self(total, current)
    }
}

/// Drives update checks and downloads, owning the [`UpdateState`].
///
/// Operations are serialized: a download started while a check is running
/// waits for the check to finish.
pub struct UpdateController {
    config: UpdateConfig,
    current_version: Version,
    platform: String,
    resolver: Arc<dyn ReleaseResolver>,
    downloader: Downloader,
    sink: Option<Arc<dyn ProgressSink>>,
    state: watch::Sender<UpdateState>,
    op_lock: Mutex<()>,
}

impl UpdateController {
    /// Create a controller for the running build using the GitHub resolver.
    pub fn new(config: UpdateConfig) -> UpdateResult<Self> {
        let resolver = Arc::new(ReleaseClient::with_url(config.api_base().to_string()));
        let current_version = Version::parse(CURRENT_VERSION)?;
        Ok(Self::with_resolver(config, current_version, resolver))
    }

    /// Create a controller with an explicit current version and resolver.
    pub fn with_resolver(
        config: UpdateConfig,
        current_version: Version,
        resolver: Arc<dyn ReleaseResolver>,
    ) -> Self {
        let (state, _) = watch::channel(UpdateState::new(current_version.to_string()));
        Self {
            config,
            current_version,
            platform: platform_key(),
            resolver,
            downloader: Downloader::new(),
            sink: None,
            state,
            op_lock: Mutex::new(()),
        }
    }

    /// Override the platform key used to pick an artifact.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Forward raw progress events to the host shell.
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    pub fn current_version(&self) -> &Version {
        &self.current_version
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> UpdateState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.state.subscribe()
    }

    /// Check for a newer release. Failures land in the returned state.
    pub async fn check_for_update(&self, options: CheckOptions) -> UpdateState {
        let _guard = self.op_lock.lock().await;

        if let Err(e) = self.run_check(options).await {
            self.fail("check", &e);
        }
        self.state()
    }

    /// Download and verify the artifact for this platform.
    ///
    /// Allowed from `available`, or from `error` while a release is known.
    /// Once `ready` the call returns the current state unchanged.
    /// A cancelled download leaves its partial file behind.
    pub async fn start_download(&self, cancel: &CancellationToken) -> UpdateState {
        let _guard = self.op_lock.lock().await;

        // A verified artifact is final; repeating the request must not lose it
        if self.state.borrow().status == UpdateStatus::Ready {
            tracing::debug!("artifact already downloaded, ignoring download request");
            return self.state();
        }

        if let Err(e) = self.run_download(cancel).await {
            self.fail("download", &e);
        }
        self.state()
    }

    async fn run_check(&self, options: CheckOptions) -> UpdateResult<()> {
        let resolved = self
            .resolver
            .fetch_latest(&self.config.owner, &self.config.repo)
            .await?;
        let latest = Version::parse(&resolved.info.version)?;

        let newer = latest > self.current_version;
        let eligible = options.prerelease || !latest.is_prerelease();

        if newer && eligible {
            tracing::info!(
                current = %self.current_version,
                latest = %latest,
                source = ?resolved.source,
                "update available"
            );
            if resolved.source == ReleaseSource::HeuristicAssetMatch {
                tracing::warn!("release has no update.json, artifacts will not be verified");
            }
        } else if newer {
            tracing::info!(latest = %latest, "skipping prerelease update");
        } else {
            tracing::info!(current = %self.current_version, latest = %latest, "already up to date");
        }

        self.state.send_modify(|s| {
            s.latest_version = Some(latest.to_string());
            s.download_progress = 0.0;
            s.artifact_path = None;
            s.clear_error();
            if newer && eligible {
                s.status = UpdateStatus::Available;
                s.update_info = Some(resolved.info);
                s.release_source = Some(resolved.source);
            } else {
                s.status = UpdateStatus::None;
                s.update_info = None;
                s.release_source = None;
            }
        });
        Ok(())
    }

    async fn run_download(&self, cancel: &CancellationToken) -> UpdateResult<()> {
        let (info, version) = {
            let s = self.state.borrow();
            match (s.status, &s.update_info) {
                (UpdateStatus::Available | UpdateStatus::Error, Some(info)) => (
                    info.clone(),
                    s.latest_version.clone().unwrap_or_else(|| info.version.clone()),
                ),
                _ => {
                    return Err(UpdateError::InvalidState {
                        action: "start download".to_string(),
                        status: s.status.to_string(),
                    });
                }
            }
        };

        let artifact = info.artifact_for(&self.platform).cloned().ok_or_else(|| {
            UpdateError::NoArtifactForPlatform {
                platform: self.platform.clone(),
            }
        })?;
        let digest = artifact.digest()?;
        let dest = self.prepare_destination(&artifact, &version).await?;

        self.state.send_modify(|s| {
            s.status = UpdateStatus::Downloading;
            s.download_progress = 0.0;
            s.artifact_path = None;
            s.clear_error();
        });
        tracing::info!(url = %artifact.url, dest = %dest.display(), "downloading update");

        let observer = |p: DownloadProgress| self.report_progress(&artifact, p);
        match self.config.download_timeout() {
            Some(timeout) => {
                self.downloader
                    .download_with_timeout(&artifact.url, &dest, timeout, cancel, &observer)
                    .await?
            }
            None => {
                self.downloader
                    .download(&artifact.url, &dest, cancel, &observer)
                    .await?
            }
        };

        match digest {
            Some(digest) => {
                if let Err(e) = verify_digest(&dest, &digest).await {
                    if matches!(e, UpdateError::DigestMismatch { .. }) {
                        discard(&dest).await;
                    }
                    return Err(e);
                }
                tracing::info!("artifact digest verified");
            }
            None => tracing::warn!(path = %dest.display(), "artifact has no digest, skipping verification"),
        }

        self.state.send_modify(|s| {
            s.status = UpdateStatus::Ready;
            s.download_progress = 100.0;
            s.artifact_path = Some(dest);
        });
        Ok(())
    }

    /// Create the download directory and clear any stale artifact.
    async fn prepare_destination(
        &self,
        artifact: &PlatformArtifact,
        version: &str,
    ) -> UpdateResult<PathBuf> {
        let dir = self.config.download_dir();

        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&dir)
            .await
            .map_err(|e| UpdateError::fs(&dir, e))?;

        let filename = artifact.file_name().unwrap_or("freelanceflow-update.bin");
        let dest = dir.join(format!("{}_{}", version, filename));

        match tokio::fs::remove_file(&dest).await {
            Ok(()) => tracing::debug!(path = %dest.display(), "removed stale artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(UpdateError::fs(&dest, e)),
        }
        Ok(dest)
    }

    fn report_progress(&self, artifact: &PlatformArtifact, progress: DownloadProgress) {
        // Fall back to the advertised size when the server sends no length
        let pct = progress.percentage().or_else(|| {
            (artifact.size > 0)
                .then(|| (progress.downloaded as f64 / artifact.size as f64 * 100.0).min(100.0))
        });
        if let Some(pct) = pct {
            self.state.send_modify(|s| s.download_progress = pct);
        }
        if let Some(sink) = &self.sink {
            sink.emit(progress.total_or_unknown(), progress.downloaded as i64);
        }
    }

    fn fail(&self, action: &str, err: &UpdateError) {
        tracing::warn!(kind = %err.kind(), "update {} failed: {}", action, err);
        self.state
            .send_modify(|s| s.set_error(err.kind(), format!("{}: {}", err.kind(), err)));
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), "failed to remove corrupted artifact: {}", e);
    }
}
