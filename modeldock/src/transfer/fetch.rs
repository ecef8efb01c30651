//! Blocking bulk-fetch primitive.
//!
//! [`BulkFetch`] is the opaque "fetch every matching file of a repository"
//! operation. It blocks until done and reports nothing while running; the
//! supervisor watches bytes on disk instead.
//!
//! [`HubFetcher`] implements it on top of the `hf-hub` blocking API. Each file
//! is pulled into the hub cache, then its blob is moved to the destination
//! tree and the snapshot pointer removed, so bytes live in exactly one place
//! once a file completes.
//!
//! With `resume` set, a file already at the destination is kept only when its
//! length matches the size in the registry listing. Anything else (a changed
//! upstream file, a truncated copy, a file the listing has no size for) is
//! fetched again.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hf_hub::api::sync::{Api, ApiBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::TransferError;
use crate::registry::ExpectedManifest;
use crate::repo::{NamePattern, RepoId, TransferRequest};

/// Everything a fetch needs, independent of execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub repo_id: RepoId,
    pub destination: PathBuf,
    pub cache_dir: PathBuf,
    pub pattern: NamePattern,
    /// Skip files already present at the destination with the listed size.
    pub resume: bool,
    pub endpoint: Option<String>,
    pub token: Option<String>,
    /// Listed size per file name, from the registry.
    pub expected_sizes: BTreeMap<String, u64>,
}

impl FetchJob {
    /// Job for a validated request.
    pub fn for_request(request: &TransferRequest, cache_dir: &Path) -> Self {
        Self {
            repo_id: request.repository_id().clone(),
            destination: request.destination().to_path_buf(),
            cache_dir: cache_dir.to_path_buf(),
            pattern: request.name_pattern().clone(),
            resume: true,
            endpoint: None,
            token: None,
            expected_sizes: BTreeMap::new(),
        }
    }

    pub fn with_registry(mut self, endpoint: Option<String>, token: Option<String>) -> Self {
        self.endpoint = endpoint;
        self.token = token;
        self
    }

    /// Take the listed file sizes from a manifest.
    pub fn with_expected_sizes(mut self, manifest: &ExpectedManifest) -> Self {
        self.expected_sizes = manifest
            .files()
            .iter()
            .map(|f| (f.name.clone(), f.size_bytes))
            .collect();
        self
    }

    pub fn expected_size(&self, file_name: &str) -> Option<u64> {
        self.expected_sizes.get(file_name).copied()
    }
}

/// Outcome of a successful fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSummary {
    pub files_fetched: usize,
    /// Already present and left untouched.
    pub files_skipped: usize,
}

/// Blocking "fetch all matching files" operation.
pub trait BulkFetch: Send + Sync {
    fn fetch(&self, job: &FetchJob) -> Result<FetchSummary, TransferError>;
}

/// [`BulkFetch`] over the `hf-hub` blocking client.
#[derive(Debug, Default, Clone)]
pub struct HubFetcher;

impl HubFetcher {
    pub fn new() -> Self {
        Self
    }

    fn api(job: &FetchJob) -> Result<Api, TransferError> {
        let mut builder = ApiBuilder::new()
            .with_cache_dir(job.cache_dir.clone())
            .with_token(job.token.clone())
            .with_progress(false);
        if let Some(endpoint) = &job.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }
        builder
            .build()
            .map_err(|e| TransferError::Backend(format!("Failed to build hub client: {}", e)))
    }
}

impl BulkFetch for HubFetcher {
    fn fetch(&self, job: &FetchJob) -> Result<FetchSummary, TransferError> {
        let api = Self::api(job)?;
        let repo = api.model(job.repo_id.to_string());

        let listing = repo
            .info()
            .map_err(|e| TransferError::Registry(format!("{}: {}", job.repo_id, e)))?;

        fs::create_dir_all(&job.destination).map_err(|e| {
            TransferError::Unexpected(format!(
                "Failed to create {}: {}",
                job.destination.display(),
                e
            ))
        })?;

        let mut summary = FetchSummary::default();
        for sibling in listing
            .siblings
            .iter()
            .filter(|s| job.pattern.matches(&s.rfilename))
        {
            let target = job.destination.join(&sibling.rfilename);
            if job.resume {
                if is_up_to_date(&target, job.expected_size(&sibling.rfilename)) {
                    debug!(file = %sibling.rfilename, "Already present, skipping");
                    summary.files_skipped += 1;
                    continue;
                }
                if target.exists() {
                    info!(
                        file = %sibling.rfilename,
                        "Local copy does not match listing, fetching again"
                    );
                }
            }

            let pointer = repo.get(&sibling.rfilename).map_err(|e| {
                TransferError::Unexpected(format!("Failed to fetch {}: {}", sibling.rfilename, e))
            })?;
            place_file(&pointer, &target).map_err(|e| {
                TransferError::Unexpected(format!(
                    "Failed to move {} into {}: {}",
                    sibling.rfilename,
                    job.destination.display(),
                    e
                ))
            })?;

            debug!(file = %sibling.rfilename, "Fetched");
            summary.files_fetched += 1;
        }

        info!(
            repo = %job.repo_id,
            fetched = summary.files_fetched,
            skipped = summary.files_skipped,
            "Fetch finished"
        );
        Ok(summary)
    }
}

/// Whether `target` is a regular file of exactly `expected_size` bytes.
///
/// An unknown size never counts as up to date.
fn is_up_to_date(target: &Path, expected_size: Option<u64>) -> bool {
    match (fs::metadata(target), expected_size) {
        (Ok(meta), Some(size)) => meta.is_file() && meta.len() == size,
        _ => false,
    }
}

/// Move the blob behind a hub snapshot pointer to `target`.
fn place_file(pointer: &Path, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let blob = fs::canonicalize(pointer)?;
    if fs::rename(&blob, target).is_err() {
        fs::copy(&blob, target)?;
        remove_if_present(&blob)?;
    }

    // The pointer is dangling once the blob has moved.
    if blob != pointer {
        remove_if_present(pointer)?;
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
