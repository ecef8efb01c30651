//! Grouping of model files by shard pattern.
//!
//! - `<base>-<i>-of-<n>.<ext>` files share the key `<base>-*-of-<n>.<ext>`
//! - two or more unsharded `.gguf` files in one directory share `<dir>/*.gguf`
//! - anything else is listed individually

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use super::types::{FileGroup, FileInfo};

/// Extensions treated as model weights.
pub const MODEL_EXTENSIONS: &[&str] = &["safetensors", "bin", "gguf", "pt", "pth"];

fn shard_regex() -> &'static Regex {
    static SHARD: OnceLock<Regex> = OnceLock::new();
    SHARD.get_or_init(|| {
        Regex::new(r"^(.+)-(\d+)-of-(\d+)\.(safetensors|bin|gguf|pt|pth)$")
            .expect("valid shard regex")
    })
}

/// Whether `file_name` has a model weight extension.
pub fn is_model_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| MODEL_EXTENSIONS.contains(&ext))
}

/// Group key for a sharded file name, if it is one.
pub fn shard_key(file_name: &str) -> Option<String> {
    let caps = shard_regex().captures(file_name)?;
    Some(format!("{}-*-of-{}.{}", &caps[1], &caps[3], &caps[4]))
}

/// Split the model files of one directory into groups and individual files.
///
/// `dir_name` is the directory's own name, used in the gguf group key.
pub fn group_files(dir_name: &str, files: Vec<FileInfo>) -> (Vec<FileGroup>, Vec<FileInfo>) {
    let mut shards: BTreeMap<String, Vec<FileInfo>> = BTreeMap::new();
    let mut gguf = Vec::new();
    let mut individual = Vec::new();

    for file in files {
        if let Some(key) = shard_key(&file.name) {
            shards.entry(key).or_default().push(file);
        } else if file.name.ends_with(".gguf") {
            gguf.push(file);
        } else {
            individual.push(file);
        }
    }

    let mut groups: Vec<FileGroup> = shards
        .into_iter()
        .map(|(key, members)| FileGroup::new(key, members))
        .collect();

    if gguf.len() >= 2 {
        groups.push(FileGroup::new(format!("{}/*.gguf", dir_name), gguf));
    } else {
        individual.extend(gguf);
    }

    individual.sort_by(|a, b| a.name.cmp(&b.name));
    (groups, individual)
}
