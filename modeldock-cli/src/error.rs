//! CLI error type.

use std::fmt;

use modeldock::app::AppError;
use modeldock::catalog::{CatalogError, DeleteError};
use modeldock::config::ConfigError;
use modeldock::logging::LoggingError;
use modeldock::transfer::{SubmitError, TransferError, FETCH_EXIT_FAILURE, FETCH_EXIT_REGISTRY};

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is inconsistent.
    Config(String),

    /// Logging could not be initialized.
    Logging(LoggingError),

    /// The application could not be assembled.
    App(AppError),

    /// The async runtime could not be created.
    Runtime(String),

    /// The HTTP server failed.
    Serve(String),

    /// A transfer was rejected at submission.
    Submit(SubmitError),

    /// A transfer ended in the error phase.
    TransferFailed(String),

    /// The child fetch failed.
    Fetch(TransferError),

    Catalog(CatalogError),

    Delete(DeleteError),

    /// The operator declined or interrupted the command.
    Aborted,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Fetch(TransferError::Registry(_)) => FETCH_EXIT_REGISTRY,
            _ => FETCH_EXIT_FAILURE,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::App(e) => write!(f, "{}", e),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
            CliError::Serve(msg) => write!(f, "Server error: {}", msg),
            CliError::Submit(e) => write!(f, "{}", e),
            CliError::TransferFailed(msg) => write!(f, "Download failed: {}", msg),
            CliError::Fetch(e) => write!(f, "{}", e),
            CliError::Catalog(e) => write!(f, "{}", e),
            CliError::Delete(e) => write!(f, "{}", e),
            CliError::Aborted => write!(f, "Aborted"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<SubmitError> for CliError {
    fn from(e: SubmitError) -> Self {
        CliError::Submit(e)
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        CliError::Catalog(e)
    }
}

impl From<DeleteError> for CliError {
    fn from(e: DeleteError) -> Self {
        CliError::Delete(e)
    }
}
