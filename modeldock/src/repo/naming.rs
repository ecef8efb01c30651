//! Storage layout naming conventions.
//!
//! Single source of truth for where a repository's files live:
//! - completed files: `{storage_root}/{namespace}/{name}/...`
//! - in-flight blobs: `{cache_dir}/models--{namespace}--{name}/...`
//!
//! The cache naming matches the layout the hub client uses for its blob cache.

use std::path::{Path, PathBuf};

use super::RepoId;

/// Directory that completed files for `repo` are placed in.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use modeldock::repo::{destination_dir, RepoId};
///
/// let repo = RepoId::parse("org/model").unwrap();
/// assert_eq!(destination_dir(Path::new("/models"), &repo), Path::new("/models/org/model"));
/// ```
pub fn destination_dir(storage_root: &Path, repo: &RepoId) -> PathBuf {
    storage_root.join(repo.namespace()).join(repo.name())
}

/// Name of the per-repository directory inside the blob cache.
///
/// # Examples
///
/// ```
/// use modeldock::repo::{cache_repo_dir_name, RepoId};
///
/// let repo = RepoId::parse("org/model").unwrap();
/// assert_eq!(cache_repo_dir_name(&repo), "models--org--model");
/// ```
pub fn cache_repo_dir_name(repo: &RepoId) -> String {
    format!("models--{}", repo.as_str().replace('/', "--"))
}

/// Full path of the per-repository blob cache directory.
pub fn cache_repo_dir(cache_dir: &Path, repo: &RepoId) -> PathBuf {
    cache_dir.join(cache_repo_dir_name(repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_repo_dir() {
        let repo = RepoId::parse("TheBloke/Mistral-7B-GGUF").unwrap();
        assert_eq!(
            cache_repo_dir(Path::new("/models/.cache"), &repo),
            Path::new("/models/.cache/models--TheBloke--Mistral-7B-GGUF")
        );
    }

    #[test]
    fn test_destination_dir_nested() {
        let repo = RepoId::parse("a/b").unwrap();
        let dest = destination_dir(Path::new("/srv/models"), &repo);
        assert!(dest.starts_with("/srv/models"));
        assert_eq!(dest.file_name().unwrap(), "b");
    }
}
