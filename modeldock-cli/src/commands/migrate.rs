//! Migrate command - turn linked model files into real copies.

use std::path::{Path, PathBuf};

use clap::Args;

use modeldock::catalog::{absolutize, find_linked_files, migrate_links, LinkKind};
use modeldock::config::format_size;

use super::common::confirm;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the migrate command.
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Storage root (overrides [storage] root)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

/// Run the migrate command.
pub fn run(config_path: Option<&Path>, args: MigrateArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("migrate");
    let root = args
        .root
        .unwrap_or_else(|| runner.config().storage.root.clone());
    let root = absolutize(&root)
        .map_err(|e| CliError::Config(format!("Invalid storage root: {}", e)))?;

    let linked = find_linked_files(&root)?;
    if linked.is_empty() {
        println!("No linked files in {}", root.display());
        return Ok(());
    }

    println!("Linked files in {}:", root.display());
    for file in &linked {
        let kind = match file.kind {
            LinkKind::Symlink => "symlink",
            LinkKind::Hardlink => "hard link",
        };
        let shown = file.path.strip_prefix(&root).unwrap_or(&file.path);
        println!("  {}  ({})", shown.display(), kind);
    }
    if !args.yes {
        confirm(format!("Replace {} files with real copies?", linked.len()))?;
    }

    let report = migrate_links(&root)?;
    println!(
        "Converted {} files, copied {}",
        report.converted.len(),
        format_size(report.bytes_copied)
    );
    if !report.failed.is_empty() {
        println!("Failed to convert {} files:", report.failed.len());
        for path in &report.failed {
            println!("  {}", path.display());
        }
    }
    Ok(())
}
