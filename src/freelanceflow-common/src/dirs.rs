//! Cross-platform application directories for FreelanceFlow.
//!
//! - Linux/macOS: `~/.freelanceflow`
//! - Windows: `%APPDATA%\freelanceflow` (config) and `%LOCALAPPDATA%\freelanceflow` (cache)
//!
//! Can be overridden with the `FREELANCEFLOW_HOME` environment variable.

use std::path::PathBuf;

/// Application name for directory paths
pub const APP_NAME: &str = "freelanceflow";

/// Primary home directory name on Linux/macOS
pub const HOME_DIR_NAME: &str = ".freelanceflow";

/// Environment variable overriding every application directory
pub const HOME_ENV_VAR: &str = "FREELANCEFLOW_HOME";

/// Application directories structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    /// Configuration directory
    pub config_dir: PathBuf,
    /// Cache directory (downloaded update artifacts live below it)
    pub cache_dir: PathBuf,
}

impl AppDirs {
    /// Get application directories, respecting `FREELANCEFLOW_HOME`.
    ///
    /// A relative override is resolved against the current directory so
    /// config files never land somewhere unexpected.
    pub fn new() -> Option<Self> {
        if let Ok(home) = std::env::var(HOME_ENV_VAR) {
            let home = PathBuf::from(home);
            let home = if home.is_relative() {
                std::env::current_dir().ok()?.join(home)
            } else {
                home
            };
            return Some(Self {
                config_dir: home.clone(),
                cache_dir: home.join("cache"),
            });
        }

        #[cfg(target_os = "windows")]
        let (config_dir, cache_dir) = {
            let appdata = dirs::config_dir()?;
            let local_appdata = dirs::cache_dir()?;
            (appdata.join(APP_NAME), local_appdata.join(APP_NAME))
        };

        #[cfg(not(target_os = "windows"))]
        let (config_dir, cache_dir) = {
            let home = dirs::home_dir()?.join(HOME_DIR_NAME);
            (home.clone(), home.join("cache"))
        };

        Some(Self {
            config_dir,
            cache_dir,
        })
    }

    /// Path of the updater configuration file
    pub fn update_config_file(&self) -> PathBuf {
        self.config_dir.join("update.json")
    }

    /// Directory where downloaded update artifacts are stored
    pub fn updates_dir(&self) -> PathBuf {
        self.cache_dir.join("updates")
    }
}
