//! Streaming download with progress tracking and cancellation.

use std::path::Path;
use std::time::Duration;

use freelanceflow_common::create_download_client;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::{UpdateError, UpdateResult};

/// Progress information during download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes written to disk so far
    pub downloaded: u64,
    /// Declared total size, `None` when the server sent no length
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Rebuild progress from the raw `(total, current)` pair given to sinks.
    pub fn from_raw(total: i64, current: i64) -> Self {
        Self {
            downloaded: current.max(0) as u64,
            total: u64::try_from(total).ok(),
        }
    }

    /// Total size with `-1` standing for unknown.
    pub fn total_or_unknown(&self) -> i64 {
        self.total.map(|t| t as i64).unwrap_or(-1)
    }

    /// Download progress as a percentage (0-100), if the total is known.
    pub fn percentage(&self) -> Option<f64> {
        match self.total {
            Some(0) | None => None,
            Some(total) => Some((self.downloaded as f64 / total as f64 * 100.0).min(100.0)),
        }
    }

    /// Get human-readable downloaded size.
    pub fn downloaded_human(&self) -> String {
        format_bytes(self.downloaded)
    }

    /// Get human-readable total size.
    pub fn total_human(&self) -> String {
        self.total
            .map(format_bytes)
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Format bytes as human-readable string.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Passive observer of download progress.
///
/// Called once per written chunk, possibly from a runtime worker thread.
/// Implementations must return quickly.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: DownloadProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(DownloadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: DownloadProgress) {
        self(progress)
    }
}

/// Streams remote artifacts to local files.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Create a downloader with the shared download client.
    pub fn new() -> Self {
        let client = create_download_client().unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Create a downloader around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` to `dest`, returning the number of bytes written.
    ///
    /// On cancellation the partially written file is left in place.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
        observer: &dyn ProgressObserver,
    ) -> UpdateResult<u64> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(UpdateError::Cancelled),
            res = self.client.get(url).send() => res.map_err(|e| UpdateError::network(url, e))?,
        };

        if response.status() != StatusCode::OK {
            return Err(UpdateError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let total = response.content_length();
        tracing::debug!(%url, dest = %dest.display(), ?total, "starting download");

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| UpdateError::fs(dest, e))?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(downloaded, "download cancelled");
                    let _ = file.flush().await;
                    return Err(UpdateError::Cancelled);
                }
                next = stream.next() => match next {
                    Some(chunk) => chunk.map_err(|e| UpdateError::network(url, e))?,
                    None => break,
                },
            };

            file.write_all(&chunk)
                .await
                .map_err(|e| UpdateError::fs(dest, e))?;

            downloaded += chunk.len() as u64;
            observer.on_progress(DownloadProgress { downloaded, total });
        }

        file.flush().await.map_err(|e| UpdateError::fs(dest, e))?;
        file.sync_all().await.map_err(|e| UpdateError::fs(dest, e))?;

        tracing::debug!(downloaded, "download complete");
        Ok(downloaded)
    }

    /// Like [`Downloader::download`], bounded by a deadline.
    pub async fn download_with_timeout(
        &self,
        url: &str,
        dest: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
        observer: &dyn ProgressObserver,
    ) -> UpdateResult<u64> {
        tokio::time::timeout(timeout, self.download(url, dest, cancel, observer))
            .await
            .map_err(|_| UpdateError::TimedOut { after: timeout })?
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}
