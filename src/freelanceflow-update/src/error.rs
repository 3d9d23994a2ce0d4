//! Error types for freelanceflow-update.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for update operations.
pub type UpdateResult<T> = std::result::Result<T, UpdateError>;

/// Errors that can occur during update operations.
#[derive(Debug, Error)]
pub enum UpdateError {
    // Version errors
    #[error("Invalid version format: {version:?} ({reason})")]
    InvalidVersion { version: String, reason: String },

    // Network errors
    #[error("Network error while requesting {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request to {url} failed with HTTP status {status}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    // File system errors
    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Verification errors
    #[error("SHA256 verification failed: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Unsupported digest algorithm: {algorithm}")]
    UnsupportedDigest { algorithm: String },

    // Resolution errors
    #[error("No artifact available for platform {platform}")]
    NoArtifactForPlatform { platform: String },

    #[error("Cannot {action} while update status is {status}")]
    InvalidState { action: String, status: String },

    // Config errors
    #[error("Failed to load config: {message}")]
    Config { message: String },

    // Cancellation
    #[error("Download cancelled")]
    Cancelled,

    #[error("Download timed out after {}s", .after.as_secs())]
    TimedOut { after: Duration },
}

/// Coarse classification of [`UpdateError`], exposed to the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    InvalidVersion,
    Network,
    HttpStatus,
    Decode,
    Filesystem,
    DigestMismatch,
    UnsupportedDigest,
    NoArtifactForPlatform,
    InvalidState,
    Config,
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidVersion => "InvalidVersion",
            Self::Network => "NetworkError",
            Self::HttpStatus => "HTTPStatusError",
            Self::Decode => "DecodeError",
            Self::Filesystem => "FilesystemError",
            Self::DigestMismatch => "DigestMismatch",
            Self::UnsupportedDigest => "UnsupportedDigest",
            Self::NoArtifactForPlatform => "NoArtifactForPlatform",
            Self::InvalidState => "InvalidState",
            Self::Config => "ConfigError",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

impl UpdateError {
    /// Build a network error from a transport failure.
    pub(crate) fn network(url: &str, err: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Build a decode error for the named document.
    pub(crate) fn decode(what: &str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            what: what.to_string(),
            message: err.to_string(),
        }
    }

    /// Build a filesystem error bound to a path.
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidVersion { .. } => ErrorKind::InvalidVersion,
            Self::Network { .. } => ErrorKind::Network,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::DigestMismatch { .. } => ErrorKind::DigestMismatch,
            Self::UnsupportedDigest { .. } => ErrorKind::UnsupportedDigest,
            Self::NoArtifactForPlatform { .. } => ErrorKind::NoArtifactForPlatform,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Config { .. } => ErrorKind::Config,
            Self::Cancelled | Self::TimedOut { .. } => ErrorKind::Cancelled,
        }
    }
}
