//! Safe deletion inside the storage root.
//!
//! A path is only deleted when it is lexically a strict descendant of the
//! storage root and, if it exists, still inside the root after symlinks are
//! resolved. Relative paths and roots are taken from the working directory.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::format_size;
use crate::repo::ValidationError;

/// Errors from delete operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Model path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An active transfer writes into (or above) this path.
    #[error("A download is in progress for {}", .0.display())]
    Busy(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Failed to delete {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },
}

impl DeleteError {
    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => DeleteError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => DeleteError::PermissionDenied(path.to_path_buf()),
            _ => DeleteError::Io {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        }
    }
}

/// Result of a completed deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub path: PathBuf,
    pub files_removed: usize,
    pub bytes_freed: u64,
    /// Names of removed files (only filled by [`delete_matching`]).
    pub deleted_files: Vec<String>,
    pub message: String,
}

/// Resolve `..` and `.` without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// `path` made absolute against the working directory, then normalized.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_lexically(path))
    } else {
        Ok(normalize_lexically(&std::env::current_dir()?.join(path)))
    }
}

/// Whether either path contains the other.
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Check that `path` is safe to delete under `storage_root`.
///
/// Returns the normalized path.
pub fn validate_delete_path(path: &Path, storage_root: &Path) -> Result<PathBuf, ValidationError> {
    let unsafe_path = || ValidationError::UnsafePath {
        path: path.display().to_string(),
        root: storage_root.display().to_string(),
    };

    let root = absolutize(storage_root).map_err(|_| unsafe_path())?;
    let normalized = absolutize(path).map_err(|_| unsafe_path())?;
    if normalized == root || !normalized.starts_with(&root) {
        return Err(unsafe_path());
    }

    if fs::symlink_metadata(&normalized).is_ok() {
        let canonical_root = fs::canonicalize(&root).map_err(|_| unsafe_path())?;
        let canonical = fs::canonicalize(&normalized).map_err(|_| unsafe_path())?;
        if canonical == canonical_root || !canonical.starts_with(&canonical_root) {
            return Err(unsafe_path());
        }
    }

    Ok(normalized)
}

/// Delete a model directory or file, reporting what was freed.
pub fn delete_entry(path: &Path, storage_root: &Path) -> Result<DeleteOutcome, DeleteError> {
    let target = validate_delete_path(path, storage_root)?;
    let metadata =
        fs::symlink_metadata(&target).map_err(|_| DeleteError::NotFound(target.clone()))?;

    let (files_removed, bytes_freed) = measure(&target);
    let removal = if metadata.is_dir() {
        fs::remove_dir_all(&target)
    } else {
        fs::remove_file(&target)
    };
    removal.map_err(|e| DeleteError::from_io(&target, e))?;

    let summary = format!("{} files, {}", files_removed, format_size(bytes_freed));
    info!(path = %target.display(), summary = %summary, "Model deleted");

    Ok(DeleteOutcome {
        path: target,
        files_removed,
        bytes_freed,
        deleted_files: Vec::new(),
        message: format!("Model deleted successfully ({})", summary),
    })
}

/// Delete files under a model directory whose names contain or end with any pattern.
///
/// Blank patterns are ignored. Files that fail to delete are logged and
/// skipped.
pub fn delete_matching(
    path: &Path,
    storage_root: &Path,
    patterns: &[String],
) -> Result<DeleteOutcome, DeleteError> {
    let target = validate_delete_path(path, storage_root)?;
    if !target.exists() {
        return Err(DeleteError::NotFound(target));
    }

    let patterns: Vec<&str> = patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();

    let mut deleted_files = Vec::new();
    let mut bytes_freed = 0u64;

    for entry in WalkDir::new(&target)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !patterns
            .iter()
            .any(|p| name.contains(p) || name.ends_with(p))
        {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                bytes_freed += size;
                deleted_files.push(name);
            }
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Failed to delete file"),
        }
    }

    let message = if deleted_files.is_empty() {
        "No files matched the specified patterns".to_string()
    } else {
        format!(
            "Deleted {} files ({})",
            deleted_files.len(),
            format_size(bytes_freed)
        )
    };
    info!(path = %target.display(), removed = deleted_files.len(), "Matching files deleted");

    Ok(DeleteOutcome {
        path: target,
        files_removed: deleted_files.len(),
        bytes_freed,
        deleted_files,
        message,
    })
}

fn measure(path: &Path) -> (usize, u64) {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .fold((0, 0), |(count, bytes), e| {
            (count + 1, bytes + e.metadata().map(|m| m.len()).unwrap_or(0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, len: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; len]).unwrap();
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/models/a/../b/./c")),
            PathBuf::from("/models/b/c")
        );
        assert_eq!(
            normalize_lexically(Path::new("/models/../../etc")),
            PathBuf::from("/etc")
        );
    }

    #[test]
    fn test_rejects_root_and_outside() {
        let root = Path::new("/models");
        for bad in [
            "/models",
            "/models/",
            "/models/.",
            "/other/x",
            "/models/../etc",
            "/modelsx/y",
            "relative/path",
        ] {
            assert!(
                validate_delete_path(Path::new(bad), root).is_err(),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_accepts_descendant_that_does_not_exist() {
        let root = Path::new("/models");
        assert_eq!(
            validate_delete_path(Path::new("/models/org/x/../model"), root).unwrap(),
            PathBuf::from("/models/org/model")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_symlink_escape() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("models");
        let outside = temp.path().join("outside");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("escape")).unwrap();

        assert!(validate_delete_path(&root.join("escape"), &root).is_err());
    }

    /// `path` spelled relative to the working directory.
    #[cfg(unix)]
    fn relative_from_cwd(path: &Path) -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        let mut relative = PathBuf::new();
        for _ in cwd.components().skip(1) {
            relative.push("..");
        }
        relative.join(path.strip_prefix("/").unwrap())
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_listed_entry_under_relative_root() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("models/org/model/a.gguf"), 10);
        write(&temp.path().join("models/org/other/b.gguf"), 20);
        let root = relative_from_cwd(&temp.path().join("models"));
        assert!(root.is_relative());

        let models = crate::catalog::list_models(&root).unwrap();
        assert_eq!(models.len(), 2);
        assert!(models[0].path.is_absolute());

        let outcome = delete_entry(&models[0].path, &root).unwrap();
        assert_eq!(outcome.files_removed, 1);
        assert!(!temp.path().join("models/org/model").exists());

        let outcome = delete_entry(&root.join("org/other"), &root).unwrap();
        assert_eq!(outcome.bytes_freed, 20);
        assert!(delete_entry(&root, &root).is_err());
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize(Path::new("/models/./a/../b")).unwrap(),
            PathBuf::from("/models/b")
        );
        let relative = absolutize(Path::new("models/org")).unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("models/org"));
    }

    #[test]
    fn test_delete_entry_reports_summary() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let model = root.join("org/model");
        write(&model.join("a.gguf"), 1024);
        write(&model.join("b.gguf"), 1024);

        let outcome = delete_entry(&model, root).unwrap();
        assert!(!model.exists());
        assert_eq!(outcome.files_removed, 2);
        assert_eq!(outcome.bytes_freed, 2048);
        assert_eq!(outcome.message, "Model deleted successfully (2 files, 2.0 KB)");
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = delete_entry(&temp.path().join("org/missing"), temp.path()).unwrap_err();
        assert!(matches!(err, DeleteError::NotFound(_)));
    }

    #[test]
    fn test_delete_matching() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let model = root.join("org/model");
        write(&model.join("llama.Q4_K_M.gguf"), 100);
        write(&model.join("llama.Q8_0.gguf"), 100);
        write(&model.join("notes.txt"), 10);

        let outcome = delete_matching(
            &model,
            root,
            &["Q8_0".to_string(), ".txt".to_string(), "  ".to_string()],
        )
        .unwrap();

        assert_eq!(outcome.files_removed, 2);
        assert_eq!(outcome.bytes_freed, 110);
        assert!(model.join("llama.Q4_K_M.gguf").exists());
        assert_eq!(outcome.message, "Deleted 2 files (110.0 B)");
    }

    #[test]
    fn test_delete_matching_nothing() {
        let temp = TempDir::new().unwrap();
        let model = temp.path().join("org/model");
        write(&model.join("a.gguf"), 1);

        let outcome = delete_matching(&model, temp.path(), &["zzz".to_string()]).unwrap();
        assert_eq!(outcome.files_removed, 0);
        assert_eq!(outcome.message, "No files matched the specified patterns");
    }

    #[test]
    fn test_paths_overlap() {
        let dest = Path::new("/models/org/model");
        assert!(paths_overlap(Path::new("/models/org"), dest));
        assert!(paths_overlap(Path::new("/models/org/model/sub"), dest));
        assert!(!paths_overlap(Path::new("/models/org/model-2"), dest));
    }
}
