//! Storage maintenance.
//!
//! - [`cache_stats`] / [`clear_cache`] report and reclaim the hub blob cache,
//!   where cancelled or failed fetches leave `.part`, `.incomplete` and
//!   `.lock` files behind
//! - [`find_linked_files`] / [`migrate_links`] replace symlinked or
//!   hard-linked files under the storage root with real copies, so every
//!   model owns its bytes

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use super::CatalogError;

/// File-name suffixes of partial or lock files left by interrupted fetches.
pub const LEFTOVER_SUFFIXES: &[&str] = &[".part", ".incomplete", ".lock"];

/// Blob-cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub files: usize,
    pub bytes: u64,
    /// Subset of `files` matching [`LEFTOVER_SUFFIXES`].
    pub leftover_files: usize,
    pub leftover_bytes: u64,
}

/// Result of [`clear_cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheClearResult {
    pub files_deleted: usize,
    pub bytes_freed: u64,
}

/// How a file shares its data with another path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Symlink,
    Hardlink,
}

/// A file under the storage root that is not a standalone copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedFile {
    pub path: PathBuf,
    pub kind: LinkKind,
}

/// Result of [`migrate_links`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub converted: Vec<PathBuf>,
    /// Links that could not be replaced (dangling, unreadable, ...).
    pub failed: Vec<PathBuf>,
    pub bytes_copied: u64,
}

fn io_error(path: &Path, e: impl ToString) -> CatalogError {
    CatalogError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn is_leftover(name: &str) -> bool {
    LEFTOVER_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Size of the blob cache. A missing cache is empty.
pub fn cache_stats(cache_dir: &Path) -> Result<CacheStats, CatalogError> {
    if !cache_dir.exists() {
        return Ok(CacheStats::default());
    }
    if !cache_dir.is_dir() {
        return Err(CatalogError::NotADirectory(cache_dir.to_path_buf()));
    }

    let mut stats = CacheStats::default();
    for entry in WalkDir::new(cache_dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable cache entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
        stats.files += 1;
        stats.bytes += len;
        if is_leftover(&entry.file_name().to_string_lossy()) {
            stats.leftover_files += 1;
            stats.leftover_bytes += len;
        }
    }
    Ok(stats)
}

/// Delete everything inside the blob cache, keeping the directory itself.
pub fn clear_cache(cache_dir: &Path) -> Result<CacheClearResult, CatalogError> {
    let stats = cache_stats(cache_dir)?;
    if !cache_dir.exists() {
        return Ok(CacheClearResult::default());
    }

    let entries = fs::read_dir(cache_dir).map_err(|e| io_error(cache_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error(cache_dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_error(&path, e))?;
        let removal = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removal.map_err(|e| io_error(&path, e))?;
    }

    info!(
        cache = %cache_dir.display(),
        files = stats.files,
        bytes = stats.bytes,
        "Blob cache cleared"
    );
    Ok(CacheClearResult {
        files_deleted: stats.files,
        bytes_freed: stats.bytes,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(unix)]
fn has_other_links(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink() > 1
}

#[cfg(not(unix))]
fn has_other_links(_: &fs::Metadata) -> bool {
    false
}

fn link_kind(entry: &DirEntry) -> Option<LinkKind> {
    let file_type = entry.file_type();
    if file_type.is_symlink() {
        // Directory links are not descended into and stay as they are.
        return match fs::metadata(entry.path()) {
            Ok(target) if target.is_dir() => None,
            _ => Some(LinkKind::Symlink),
        };
    }
    if file_type.is_file() && entry.metadata().is_ok_and(|m| has_other_links(&m)) {
        return Some(LinkKind::Hardlink);
    }
    None
}

/// Symlinked and hard-linked files under `storage_root`.
///
/// Hidden directories (the blob cache among them) are skipped.
pub fn find_linked_files(storage_root: &Path) -> Result<Vec<LinkedFile>, CatalogError> {
    if !storage_root.exists() {
        return Ok(Vec::new());
    }
    if !storage_root.is_dir() {
        return Err(CatalogError::NotADirectory(storage_root.to_path_buf()));
    }

    let mut linked = Vec::new();
    let walker = WalkDir::new(storage_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if let Some(kind) = link_kind(&entry) {
            linked.push(LinkedFile {
                path: entry.into_path(),
                kind,
            });
        }
    }
    Ok(linked)
}

/// Replace every linked file under `storage_root` with a real copy.
///
/// Link targets are left untouched. A file that cannot be converted is
/// recorded in [`MigrationReport::failed`] and the rest still proceed.
pub fn migrate_links(storage_root: &Path) -> Result<MigrationReport, CatalogError> {
    let mut report = MigrationReport::default();
    for file in find_linked_files(storage_root)? {
        match materialize(&file.path) {
            Ok(bytes) => {
                debug!(path = %file.path.display(), kind = ?file.kind, "Link replaced by copy");
                report.bytes_copied += bytes;
                report.converted.push(file.path);
            }
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "Failed to replace link");
                report.failed.push(file.path);
            }
        }
    }

    info!(
        root = %storage_root.display(),
        converted = report.converted.len(),
        failed = report.failed.len(),
        bytes = report.bytes_copied,
        "Link migration finished"
    );
    Ok(report)
}

/// Copy the data behind `path` next to it, then rename the copy over it.
fn materialize(path: &Path) -> io::Result<u64> {
    let source = fs::canonicalize(path)?;
    let modified = fs::metadata(&source).and_then(|m| m.modified()).ok();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = path.with_file_name(format!(".{}.migrating", file_name));

    let bytes = fs::copy(&source, &staging)?;
    if let Some(modified) = modified {
        if let Err(e) = fs::File::options()
            .write(true)
            .open(&staging)
            .and_then(|f| f.set_modified(modified))
        {
            debug!(path = %path.display(), error = %e, "Could not keep modification time");
        }
    }
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    Ok(bytes)
}
