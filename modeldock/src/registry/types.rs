//! Registry data types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from registry metadata lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Repository does not exist (or is hidden from this token).
    #[error("repository not found: {0}")]
    NotFound(String),

    /// Token missing, invalid, or lacking access to a gated repository.
    #[error("access denied: {0}")]
    Unauthorized(String),

    /// Transport-level failure or unexpected status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body was not the expected JSON shape.
    #[error("invalid registry response: {0}")]
    Parse(String),
}

/// One file in a repository listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoFile {
    /// Path relative to the repository root.
    pub name: String,
    pub size_bytes: u64,
}

/// Expected files and sizes for one transfer.
///
/// Produced once at the start of a transfer. An empty manifest means the
/// registry could not be queried and progress falls back to a heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ExpectedManifest {
    files: Vec<RepoFile>,
    total_expected_bytes: u64,
}

impl ExpectedManifest {
    /// Build a manifest from an ordered file list.
    pub fn new(files: Vec<RepoFile>) -> Self {
        let total_expected_bytes = files.iter().map(|f| f.size_bytes).sum();
        Self {
            files,
            total_expected_bytes,
        }
    }

    /// Manifest used when the registry lookup failed.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[RepoFile] {
        &self.files
    }

    pub fn total_expected_bytes(&self) -> u64 {
        self.total_expected_bytes
    }

    pub fn expected_file_count(&self) -> usize {
        self.files.len()
    }

    /// Whether a total size is known.
    pub fn is_known(&self) -> bool {
        self.total_expected_bytes > 0
    }
}

/// Repository metadata as returned by `GET /api/models/{id}?blobs=true`.
#[derive(Debug, Deserialize)]
pub(crate) struct ModelInfoResponse {
    #[serde(default)]
    pub siblings: Vec<SiblingResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SiblingResponse {
    pub rfilename: String,
    #[serde(default)]
    pub size: Option<u64>,
}
