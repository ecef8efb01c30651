//! Catalog records.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::format_size;

/// Date format used for file listings.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One stored model file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Human-readable size.
    pub size: String,
    /// Modification time in unix seconds.
    pub modified: i64,
    /// Modification time formatted in local time.
    pub date: String,
}

impl FileInfo {
    /// Read metadata for `path`, `None` if it vanished or is unreadable.
    pub fn from_path(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        let name = path.file_name()?.to_string_lossy().into_owned();
        let (modified, date) = match metadata.modified() {
            Ok(time) => {
                let secs = time
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                let local: DateTime<Local> = time.into();
                (secs, local.format(DATE_FORMAT).to_string())
            }
            Err(_) => (0, String::new()),
        };

        Some(Self {
            name,
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            size: format_size(metadata.len()),
            modified,
            date,
        })
    }
}

/// Files sharing a shard or directory pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileGroup {
    /// Pattern describing the members, e.g. `model-*-of-3.safetensors`.
    pub key: String,
    pub files: Vec<FileInfo>,
    pub count: usize,
    pub total_bytes: u64,
    pub size: String,
}

impl FileGroup {
    pub fn new(key: String, mut files: Vec<FileInfo>) -> Self {
        files.sort_by(|a, b| a.name.cmp(&b.name));
        let total_bytes = files.iter().map(|f| f.size_bytes).sum();
        Self {
            key,
            count: files.len(),
            total_bytes,
            size: format_size(total_bytes),
            files,
        }
    }
}

/// One directory of stored model files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    /// Path relative to the storage root, e.g. `TheBloke/Llama-2-7B-GGUF`.
    pub name: String,
    pub path: PathBuf,
    pub groups: Vec<FileGroup>,
    pub individual_files: Vec<FileInfo>,
    pub total_bytes: u64,
    pub total_size: String,
}

impl ModelEntry {
    pub fn new(
        name: String,
        path: PathBuf,
        groups: Vec<FileGroup>,
        individual_files: Vec<FileInfo>,
    ) -> Self {
        let total_bytes = groups.iter().map(|g| g.total_bytes).sum::<u64>()
            + individual_files.iter().map(|f| f.size_bytes).sum::<u64>();
        Self {
            name,
            path,
            groups,
            individual_files,
            total_bytes,
            total_size: format_size(total_bytes),
        }
    }

    /// Number of files across groups and individual files.
    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum::<usize>() + self.individual_files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_info_reads_metadata() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("model.gguf");
        fs::write(&path, vec![0u8; 2048]).unwrap();
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(1_700_000_000, 0))
            .unwrap();

        let info = FileInfo::from_path(&path).unwrap();
        assert_eq!(info.name, "model.gguf");
        assert_eq!(info.size_bytes, 2048);
        assert_eq!(info.size, "2.0 KB");
        assert_eq!(info.modified, 1_700_000_000);
        assert_eq!(info.date.len(), "2023-11-14 22:13".len());
    }

    #[test]
    fn test_file_info_missing() {
        let temp = TempDir::new().unwrap();
        assert!(FileInfo::from_path(&temp.path().join("gone.bin")).is_none());
    }

    #[test]
    fn test_entry_totals() {
        let file = |name: &str, size: u64| FileInfo {
            name: name.to_string(),
            path: PathBuf::from(name),
            size_bytes: size,
            size: format_size(size),
            modified: 0,
            date: String::new(),
        };
        let group = FileGroup::new(
            "m-*-of-2.safetensors".to_string(),
            vec![file("m-2-of-2.safetensors", 512), file("m-1-of-2.safetensors", 512)],
        );
        assert_eq!(group.files[0].name, "m-1-of-2.safetensors");
        assert_eq!(group.size, "1.0 KB");

        let entry = ModelEntry::new(
            "org/model".to_string(),
            PathBuf::from("/models/org/model"),
            vec![group],
            vec![file("extra.pt", 1024)],
        );
        assert_eq!(entry.total_bytes, 2048);
        assert_eq!(entry.total_size, "2.0 KB");
        assert_eq!(entry.file_count(), 3);
    }
}
