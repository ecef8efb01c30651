//! Repository identifiers, file-name filters and storage layout.
//!
//! A [`TransferRequest`] is the immutable description of one requested
//! download: a validated [`RepoId`], an optional [`NamePattern`] and the
//! destination directory derived from the identifier.

mod id;
mod naming;
mod pattern;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use id::RepoId;
pub use naming::{cache_repo_dir, cache_repo_dir_name, destination_dir};
pub use pattern::NamePattern;

/// Input rejected before any background work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Repository identifier is not of the form `namespace/name`.
    #[error("Repository ID should be in format: username/model-name (got '{0}')")]
    InvalidRepositoryId(String),

    /// Path is not a strict descendant of the storage root.
    #[error("Invalid model path: must be within {root} (got '{path}')")]
    UnsafePath { path: String, root: String },
}

/// One requested download or update operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    repository_id: RepoId,
    name_pattern: NamePattern,
    destination: PathBuf,
}

impl TransferRequest {
    /// Create a request, validating the identifier and deriving the destination.
    pub fn new(
        repository_id: &str,
        name_pattern: &str,
        storage_root: &Path,
    ) -> Result<Self, ValidationError> {
        let repository_id = RepoId::parse(repository_id)?;
        let destination = destination_dir(storage_root, &repository_id);
        Ok(Self {
            repository_id,
            name_pattern: NamePattern::new(name_pattern),
            destination,
        })
    }

    /// The validated repository identifier.
    pub fn repository_id(&self) -> &RepoId {
        &self.repository_id
    }

    /// The file-name filter (may match everything).
    pub fn name_pattern(&self) -> &NamePattern {
        &self.name_pattern
    }

    /// Directory that completed files land in.
    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_derives_destination() {
        let request =
            TransferRequest::new("TheBloke/Llama-2-7B-GGUF", "Q4_K_M", Path::new("/models"))
                .unwrap();

        assert_eq!(request.repository_id().as_str(), "TheBloke/Llama-2-7B-GGUF");
        assert_eq!(
            request.destination(),
            Path::new("/models/TheBloke/Llama-2-7B-GGUF")
        );
        assert!(request.name_pattern().matches("llama-2-7b.Q4_K_M.gguf"));
        assert!(!request.name_pattern().matches("llama-2-7b.Q8_0.gguf"));
    }

    #[test]
    fn test_request_rejects_bad_id() {
        let err = TransferRequest::new("no-slash", "", Path::new("/models")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRepositoryId(_)));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::UnsafePath {
            path: "/etc".to_string(),
            root: "/models".to_string(),
        };
        assert!(err.to_string().contains("/models"));
        assert!(err.to_string().contains("/etc"));
    }
}
