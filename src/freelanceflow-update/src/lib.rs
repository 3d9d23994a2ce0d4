//! FreelanceFlow Update - self-update pipeline for the FreelanceFlow desktop app
//!
//! Provides update checking and artifact download via:
//! - GitHub Releases, preferring a structured `update.json` asset
//! - Heuristic asset-name matching when no `update.json` is published
//! - Streaming downloads with progress reporting and SHA256 verification
//!
//! # Example
//!
//! ```rust,ignore
//! use freelanceflow_update::{CheckOptions, UpdateConfig, UpdateController, UpdateStatus};
//! use tokio_util::sync::CancellationToken;
//!
//! let controller = UpdateController::new(UpdateConfig::load())?;
//!
//! let state = controller.check_for_update(CheckOptions::default()).await;
//! if state.status == UpdateStatus::Available {
//!     let state = controller.start_download(&CancellationToken::new()).await;
//!     println!("{:?}", state.artifact_path);
//! }
//! ```

mod api;
mod config;
mod controller;
mod download;
mod error;
mod release;
mod state;
mod verify;
mod version;

pub use api::{ReleaseClient, ReleaseResolver, platform_key};
pub use config::{CheckOptions, UpdateConfig};
pub use controller::{ProgressSink, UpdateController};
pub use download::{DownloadProgress, Downloader, ProgressObserver};
pub use error::{ErrorKind, UpdateError, UpdateResult};
pub use release::{
    Digest, DigestAlgorithm, GithubAsset, GithubRelease, PlatformArtifact, ReleaseInfo,
    ReleaseSource, ResolvedRelease, UPDATE_MANIFEST_NAME, match_platform_assets,
};
pub use state::{UpdateState, UpdateStatus};
pub use verify::{calculate_sha256, verify_digest, verify_sha256};
pub use version::{Version, compare_versions, is_newer};

/// Current version of FreelanceFlow (set at compile time)
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default release hosting API origin
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Upstream repository owner
pub const DEFAULT_OWNER: &str = "freelanceflow";

/// Upstream repository name
pub const DEFAULT_REPO: &str = "freelanceflow";
