//! Application error types.

use std::fmt;
use std::path::PathBuf;

use crate::registry::RegistryError;

/// Errors that can occur while assembling the application.
#[derive(Debug)]
pub enum AppError {
    /// A storage directory could not be created.
    Storage { path: PathBuf, reason: String },

    /// The registry client could not be built.
    Registry(RegistryError),

    /// Configuration error.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Storage { path, reason } => {
                write!(f, "Failed to prepare {}: {}", path.display(), reason)
            }
            AppError::Registry(e) => {
                write!(f, "Failed to create registry client: {}", e)
            }
            AppError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Registry(e) => Some(e),
            AppError::Storage { .. } | AppError::Config(_) => None,
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(e: RegistryError) -> Self {
        AppError::Registry(e)
    }
}
