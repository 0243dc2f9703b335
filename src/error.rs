//! Error types for the remapping engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for optmap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while grabbing, remapping or injecting input.
#[derive(Debug, Error)]
pub enum Error {
    /// An input device could not be opened, grabbed or read.
    #[error("device {}: {source}", path.display())]
    Device {
        /// Device node, e.g. `/dev/input/event3`.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No keyboard could be discovered or grabbed at startup.
    #[error("no keyboard could be grabbed")]
    NoKeyboards,

    /// A symbolic key name has no key code.
    #[error("unknown key name: {0}")]
    UnknownKey(String),

    /// Writing to the synthetic keyboard failed.
    #[error("failed to inject event: {0}")]
    InjectFailed(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The operation requires elevated permissions.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Thread-related error.
    #[error("thread error: {0}")]
    ThreadError(String),
}

impl Error {
    pub(crate) fn device(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Device {
            path: path.into(),
            source,
        }
    }
}
