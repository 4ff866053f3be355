//! Configuration model for the Keywatch tracker.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KeywatchError, Result};

/// Root configuration for a tracking session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Path of the evdev device to read.
    pub device_path: PathBuf,
    /// Path of the line-oriented event log written by the file sink.
    pub log_file: PathBuf,
    /// Key code whose release is treated as the stop gesture.
    pub stop_key: u16,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(crate::constants::DEFAULT_DEVICE_PATH),
            log_file: PathBuf::from(crate::constants::DEFAULT_LOG_FILE),
            stop_key: crate::constants::KEY_ESC,
        }
    }
}

impl TrackerConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| KeywatchError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values that can never work.
    ///
    /// # Errors
    ///
    /// Returns an error if the device path is empty.
    pub fn validate(&self) -> Result<()> {
        if self.device_path.as_os_str().is_empty() {
            return Err(KeywatchError::Config {
                message: "device path must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
