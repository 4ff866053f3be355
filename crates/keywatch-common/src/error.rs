//! Unified error types for the Keywatch workspace.
//!
//! Device- and read-level failures are converted into observer
//! notifications by the engine; these variants carry the context needed
//! to build those messages.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum KeywatchError {
    /// The input device could not be opened.
    #[error("device unavailable at {path}: {source}")]
    DeviceUnavailable {
        /// Path of the device that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A single device read was short or failed.
    ///
    /// Non-fatal: the read loop reports the failure and continues.
    #[error("device read failed: {message}")]
    ReadFailed {
        /// Description of the failed read.
        message: String,
    },

    /// The tracker worker thread could not be spawned.
    #[error("tracker thread could not be started: {source}")]
    Start {
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// `start()` was called on a tracker that is not idle.
    #[error("tracker has already been started")]
    AlreadyRunning,

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, KeywatchError>;
