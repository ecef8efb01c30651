//! Stored model catalog.
//!
//! Lists what lives under the storage root, grouped into shard sets, and
//! deletes entries or individual files without ever leaving the root. Also
//! maintains the blob cache and replaces linked files with real copies.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use modeldock::catalog::list_models;
//!
//! for model in list_models(Path::new("/models")).unwrap() {
//!     println!("{} ({})", model.name, model.total_size);
//! }
//! ```

mod delete;
mod grouping;
mod maintenance;
mod scanner;
mod types;

use std::path::PathBuf;

use thiserror::Error;

pub use delete::{
    absolutize, delete_entry, delete_matching, normalize_lexically, paths_overlap,
    validate_delete_path, DeleteError, DeleteOutcome,
};
pub use grouping::{group_files, is_model_file, shard_key, MODEL_EXTENSIONS};
pub use maintenance::{
    cache_stats, clear_cache, find_linked_files, migrate_links, CacheClearResult, CacheStats,
    LinkKind, LinkedFile, MigrationReport, LEFTOVER_SUFFIXES,
};
pub use scanner::list_models;
pub use types::{FileGroup, FileInfo, ModelEntry, DATE_FORMAT};

/// Errors from catalog listing.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("storage root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },
}
