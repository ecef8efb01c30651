//! Bytes-on-disk measurement.
//!
//! The bulk fetch gives no progress callbacks, so the monitor counts what has
//! landed on disk instead. Two trees are walked:
//!
//! - the destination directory, where completed files end up
//! - the hub cache entry `cache_dir/models--<ns>--<name>`, where in-flight
//!   blobs are written
//!
//! Symlinks are not followed. Snapshot pointers in the hub cache are links to
//! blobs and would otherwise be counted twice.

use std::path::Path;
use std::time::SystemTime;

use tracing::trace;
use walkdir::WalkDir;

use crate::config::DEFAULT_SCAN_ENTRY_LIMIT;
use crate::repo::{cache_repo_dir, RepoId};

/// Result of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskSnapshot {
    pub total_bytes_on_disk: u64,
    pub file_count: usize,
    /// File name of the most recently modified file, if any.
    pub most_recent_file: Option<String>,
    /// The entry limit was reached before the walk finished.
    pub truncated: bool,
}

/// Walks the destination and cache trees of one repository.
#[derive(Debug, Clone)]
pub struct DiskScanner {
    entry_limit: usize,
}

impl Default for DiskScanner {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_ENTRY_LIMIT)
    }
}

impl DiskScanner {
    /// Create a scanner visiting at most `entry_limit` entries per scan.
    pub fn new(entry_limit: usize) -> Self {
        Self {
            entry_limit: entry_limit.max(1),
        }
    }

    pub fn entry_limit(&self) -> usize {
        self.entry_limit
    }

    /// Measure bytes currently on disk for `repo`.
    ///
    /// Missing directories count as empty. Entries that cannot be read or
    /// vanish mid-walk are skipped.
    pub fn scan(&self, destination: &Path, cache_dir: &Path, repo: &RepoId) -> DiskSnapshot {
        let mut acc = Accumulator::default();
        let mut budget = self.entry_limit;

        for root in [destination.to_path_buf(), cache_repo_dir(cache_dir, repo)] {
            if budget == 0 {
                acc.truncated = true;
                break;
            }
            budget = acc.walk(&root, budget);
        }

        trace!(
            repo = %repo,
            bytes = acc.bytes,
            files = acc.files,
            truncated = acc.truncated,
            "Disk scan"
        );

        DiskSnapshot {
            total_bytes_on_disk: acc.bytes,
            file_count: acc.files,
            most_recent_file: acc.newest.map(|(_, name)| name),
            truncated: acc.truncated,
        }
    }
}

#[derive(Default)]
struct Accumulator {
    bytes: u64,
    files: usize,
    newest: Option<(SystemTime, String)>,
    truncated: bool,
}

impl Accumulator {
    /// Walk one tree, returning the remaining entry budget.
    fn walk(&mut self, root: &Path, mut budget: usize) -> usize {
        if !root.is_dir() {
            return budget;
        }

        for entry in WalkDir::new(root).follow_links(false) {
            if budget == 0 {
                self.truncated = true;
                break;
            }
            budget -= 1;

            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };

            self.bytes += metadata.len();
            self.files += 1;

            if let Ok(modified) = metadata.modified() {
                let newer = self
                    .newest
                    .as_ref()
                    .map_or(true, |(seen, _)| modified > *seen);
                if newer {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    self.newest = Some((modified, name));
                }
            }
        }

        budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn repo() -> RepoId {
        RepoId::parse("org/model").unwrap()
    }

    fn write(path: &Path, len: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; len]).unwrap();
    }

    #[test]
    fn test_missing_directories_are_empty() {
        let temp = TempDir::new().unwrap();
        let snapshot = DiskScanner::default().scan(
            &temp.path().join("org/model"),
            &temp.path().join(".cache"),
            &repo(),
        );

        assert_eq!(snapshot, DiskSnapshot::default());
    }

    #[test]
    fn test_sums_destination_and_cache() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("org/model");
        let cache = temp.path().join(".cache");

        write(&dest.join("a.gguf"), 300);
        write(&dest.join("sub/b.gguf"), 200);
        write(&cache.join("models--org--model/blobs/abc.incomplete"), 500);
        // Other repositories in the cache are ignored.
        write(&cache.join("models--org--other/blobs/zzz"), 9999);

        let snapshot = DiskScanner::default().scan(&dest, &cache, &repo());

        assert_eq!(snapshot.total_bytes_on_disk, 1000);
        assert_eq!(snapshot.file_count, 3);
        assert!(!snapshot.truncated);
    }

    #[test]
    fn test_most_recent_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("org/model");
        write(&dest.join("old.bin"), 10);
        write(&dest.join("new.bin"), 10);

        let now = SystemTime::now();
        filetime::set_file_mtime(
            dest.join("old.bin"),
            filetime::FileTime::from_system_time(now - Duration::from_secs(3600)),
        )
        .unwrap();
        filetime::set_file_mtime(
            dest.join("new.bin"),
            filetime::FileTime::from_system_time(now),
        )
        .unwrap();

        let snapshot = DiskScanner::default().scan(&dest, &temp.path().join(".cache"), &repo());
        assert_eq!(snapshot.most_recent_file.as_deref(), Some("new.bin"));
    }

    #[test]
    fn test_entry_limit_truncates() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("org/model");
        for i in 0..10 {
            write(&dest.join(format!("f{i}.bin")), 1);
        }

        let snapshot = DiskScanner::new(4).scan(&dest, &temp.path().join(".cache"), &repo());

        assert!(snapshot.truncated);
        assert!(snapshot.file_count < 10);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_double_counted() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("org/model");
        let cache = temp.path().join(".cache");
        let blob = cache.join("models--org--model/blobs/abc");
        write(&blob, 400);

        let snapshots = cache.join("models--org--model/snapshots/main");
        fs::create_dir_all(&snapshots).unwrap();
        std::os::unix::fs::symlink(&blob, snapshots.join("model.gguf")).unwrap();

        let snapshot = DiskScanner::default().scan(&dest, &cache, &repo());
        assert_eq!(snapshot.total_bytes_on_disk, 400);
        assert_eq!(snapshot.file_count, 1);
    }
}
