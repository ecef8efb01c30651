//! Configuration loading and shared formatting helpers.

mod file;
mod size;

use std::path::PathBuf;

use thiserror::Error;

pub use file::{
    normalize_base_path, BackendKind, ConfigFile, LoggingSettings, RegistrySettings,
    ServerSettings, StorageSettings, TransferSettings, DEFAULT_BASE_PATH, DEFAULT_BIND,
    DEFAULT_REGISTRY_ENDPOINT, DEFAULT_SCAN_ENTRY_LIMIT, DEFAULT_STORAGE_ROOT,
    DEFAULT_TICK_INTERVAL_SECS,
};
pub use size::format_size;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or is not valid INI.
    #[error("failed to read config {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// INI text could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A key holds a value of the wrong shape.
    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}
