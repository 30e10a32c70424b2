//! Settings errors.

use std::path::PathBuf;

/// Why settings could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not JSON, or does not fit the settings shape.
    #[error("malformed settings: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A value the hub cannot run with.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, SettingsError>;
