//! Storage tree listing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use super::delete::absolutize;
use super::grouping::{group_files, is_model_file};
use super::types::{FileInfo, ModelEntry};
use super::CatalogError;

/// List every directory under `storage_root` holding model files.
///
/// Entries are sorted by their path relative to the root. Hidden
/// directories (the blob cache among them) are not descended into. A
/// missing root yields an empty catalog. Entry paths are absolute, so they
/// can be handed back to [`delete_entry`](super::delete_entry) as listed.
pub fn list_models(storage_root: &Path) -> Result<Vec<ModelEntry>, CatalogError> {
    let storage_root = &absolutize(storage_root).map_err(|e| CatalogError::Io {
        path: storage_root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !storage_root.exists() {
        debug!(root = %storage_root.display(), "Storage root does not exist");
        return Ok(Vec::new());
    }
    if !storage_root.is_dir() {
        return Err(CatalogError::NotADirectory(storage_root.to_path_buf()));
    }

    let mut by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    let walker = WalkDir::new(storage_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(CatalogError::Io {
                    path: storage_root.to_path_buf(),
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_model_file(&name) {
            continue;
        }
        if let Some(parent) = entry.path().parent() {
            by_dir
                .entry(parent.to_path_buf())
                .or_default()
                .push(entry.path().to_path_buf());
        }
    }

    let mut models = Vec::with_capacity(by_dir.len());
    for (dir, paths) in by_dir {
        // Files deleted between the walk and the metadata read drop out here.
        let files: Vec<FileInfo> = paths.iter().filter_map(|p| FileInfo::from_path(p)).collect();
        if files.is_empty() {
            continue;
        }

        let name = relative_name(storage_root, &dir);
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());
        let (groups, individual) = group_files(&dir_name, files);
        models.push(ModelEntry::new(name, dir, groups, individual));
    }

    models.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(models)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn relative_name(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => dir.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, len: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![1u8; len]).unwrap();
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(list_models(&temp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_root_is_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            list_models(&file),
            Err(CatalogError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_lists_sorted_and_skips_hidden() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(&root.join("zeta/model/weights.gguf"), 10);
        write(&root.join("alpha/model/model.safetensors"), 20);
        write(&root.join("alpha/model/config.json"), 5);
        write(&root.join(".cache/models--a--b/blobs/x.gguf"), 99);
        write(&root.join("empty/README.md"), 3);

        let models = list_models(root).unwrap();
        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();

        assert_eq!(names, ["alpha/model", "zeta/model"]);
        assert_eq!(models[0].total_bytes, 20);
        assert_eq!(models[0].individual_files[0].name, "model.safetensors");
    }

    #[test]
    fn test_groups_within_entry() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("org/big");
        write(&dir.join("model-00001-of-00002.safetensors"), 1024);
        write(&dir.join("model-00002-of-00002.safetensors"), 1024);

        let models = list_models(temp.path()).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].groups[0].key, "model-*-of-00002.safetensors");
        assert_eq!(models[0].total_size, "2.0 KB");
        assert_eq!(models[0].path, dir);
    }

    #[test]
    fn test_relative_name() {
        let root = Path::new("/models");
        assert_eq!(relative_name(root, Path::new("/models")), ".");
        assert_eq!(relative_name(root, Path::new("/models/a/b")), "a/b");
    }
}
