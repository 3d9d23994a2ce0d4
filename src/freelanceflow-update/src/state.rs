//! Observable update state, serialized for the host shell.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::release::{ReleaseInfo, ReleaseSource};

/// Current status of the update process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    #[default]
    None,
    Available,
    Downloading,
    Ready,
    Error,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Available => "available",
            Self::Downloading => "downloading",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the update system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateState {
    pub status: UpdateStatus,
    pub current_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_info: Option<ReleaseInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_source: Option<ReleaseSource>,
    /// 0-100, meaningful while downloading
    #[serde(default)]
    pub download_progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Verified artifact location once `ready`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
}

impl UpdateState {
    /// Initial state for a process running `current_version`.
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            status: UpdateStatus::None,
            current_version: current_version.into(),
            latest_version: None,
            update_info: None,
            release_source: None,
            download_progress: 0.0,
            error: None,
            error_kind: None,
            artifact_path: None,
        }
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
        self.error_kind = None;
    }

    pub(crate) fn set_error(&mut self, kind: ErrorKind, message: String) {
        self.status = UpdateStatus::Error;
        self.download_progress = 0.0;
        self.artifact_path = None;
        self.error = Some(message);
        self.error_kind = Some(kind);
    }
}
