//! Application settings.
//!
//! Settings live in `settings.json` under the XDG config directory
//! (`~/.config/portprobe` on Linux). A missing file means defaults; a
//! malformed file is an error. Command-line flags override everything here.

use crate::error::{ConfigError, ConfigResult};
use crate::output::OutputFormat;
use crate::scanner::Protocol;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default per-probe timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default per-probe timeout in seconds.
    pub default_timeout_secs: u64,
    /// Default protocol selection.
    pub default_protocol: Protocol,
    /// Default output format.
    pub default_output: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_protocol: Protocol::Both,
            default_output: OutputFormat::Plain,
        }
    }
}

impl Settings {
    /// Path of the settings file in the XDG config directory.
    pub fn default_path() -> ConfigResult<PathBuf> {
        let project = ProjectDirs::from("com", "portprobe", "portprobe")
            .ok_or(ConfigError::DirectoryNotFound)?;
        Ok(project.config_dir().join("settings.json"))
    }

    /// Load settings from `path`, or from the default location if `None`.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&Self::default_path()?),
        }
    }

    /// Load settings from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.default_timeout_secs == 0 {
            return Err(ConfigError::InvalidFormat(
                "default_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The default timeout as a duration.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}
