//! Transfer error types.

use thiserror::Error;

use crate::registry::RegistryError;
use crate::repo::ValidationError;

/// A transfer that started but did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The registry refused or could not serve the repository.
    #[error("registry error: {0}")]
    Registry(String),

    /// Any other failure inside the fetch.
    #[error("unexpected error: {0}")]
    Unexpected(String),

    /// The configured deadline expired before the fetch finished.
    #[error("transfer did not finish within {secs}s")]
    Timeout { secs: u64 },

    /// The execution context could not run or report the fetch.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<RegistryError> for TransferError {
    fn from(e: RegistryError) -> Self {
        TransferError::Registry(e.to_string())
    }
}

impl TransferError {
    /// Short message shown to operators. Details stay in the log file.
    pub fn operator_message(&self) -> String {
        match self {
            TransferError::Registry(_) => {
                "Access denied or repository not found. Check the repository ID and token."
                    .to_string()
            }
            TransferError::Timeout { secs } => {
                format!("Download did not finish within {} seconds", secs)
            }
            TransferError::Unexpected(_) | TransferError::Backend(_) => {
                "Unexpected error during download. See the log file for details.".to_string()
            }
        }
    }
}

/// A submission rejected before any background work started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("A download is already in progress ({repository_id})")]
    AlreadyInProgress { repository_id: String },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Called outside a tokio runtime, so nothing could run the transfer.
    #[error("no async runtime available to run the transfer")]
    NoRuntime,
}
