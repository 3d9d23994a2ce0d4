//! Update configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use freelanceflow_common::AppDirs;
use serde::{Deserialize, Serialize};

use crate::error::{UpdateError, UpdateResult};
use crate::{DEFAULT_API_BASE, DEFAULT_OWNER, DEFAULT_REPO};

/// Options for a single update check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Whether prerelease versions are eligible
    #[serde(default)]
    pub prerelease: bool,
}

/// User configuration for updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Owner of the upstream repository
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Name of the upstream repository
    #[serde(default = "default_repo")]
    pub repo: String,

    /// Custom release API origin (for testing/staging)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Offer prerelease versions by default
    #[serde(default)]
    pub allow_prerelease: bool,

    /// Where downloaded artifacts are stored (default: cache dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,

    /// Upper bound for one artifact download; none by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_timeout_secs: Option<u64>,
}

fn default_owner() -> String {
    DEFAULT_OWNER.to_string()
}

fn default_repo() -> String {
    DEFAULT_REPO.to_string()
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            repo: default_repo(),
            api_base: None,
            allow_prerelease: false,
            download_dir: None,
            download_timeout_secs: None,
        }
    }
}

impl UpdateConfig {
    /// Path of the config file in the application config directory.
    pub fn config_path() -> Option<PathBuf> {
        AppDirs::new().map(|d| d.update_config_file())
    }

    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        match Self::config_path().filter(|p| p.exists()) {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring update config: {}", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Load config from a specific file.
    pub fn load_from(path: &Path) -> UpdateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| UpdateError::fs(path, e))?;
        serde_json::from_str(&content).map_err(|e| UpdateError::Config {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> UpdateResult<()> {
        let path = Self::config_path().ok_or_else(|| UpdateError::Config {
            message: "No home directory".to_string(),
        })?;
        self.save_to(&path)
    }

    /// Save config to a specific file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> UpdateResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| UpdateError::fs(parent, e))?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| UpdateError::Config {
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| UpdateError::fs(path, e))
    }

    /// Effective release API origin.
    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    /// Effective download directory.
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(|| AppDirs::new().map(|d| d.updates_dir()))
            .unwrap_or_else(|| std::env::temp_dir().join("freelanceflow-updates"))
    }

    /// Download deadline, if configured.
    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout_secs.map(Duration::from_secs)
    }

    /// Default check options derived from this config.
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            prerelease: self.allow_prerelease,
        }
    }
}
