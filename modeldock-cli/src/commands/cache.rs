//! Cache command - inspect or clear the hub blob cache.

use std::path::Path;

use clap::Subcommand;

use modeldock::catalog::{cache_stats, clear_cache};
use modeldock::config::format_size;

use super::common::confirm;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Operations on the blob cache.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show blob cache usage
    Stats,
    /// Delete everything in the blob cache
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

/// Run a cache action.
pub fn run(config_path: Option<&Path>, action: CacheAction) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    let cache_dir = runner.config().cache_dir();

    match action {
        CacheAction::Stats => {
            let stats = cache_stats(&cache_dir)?;
            println!("Blob cache: {}", cache_dir.display());
            println!();
            println!("  Files: {}", stats.files);
            println!("  Size:  {}", format_size(stats.bytes));
            println!(
                "  Partial/lock files: {} ({})",
                stats.leftover_files,
                format_size(stats.leftover_bytes)
            );
        }
        CacheAction::Clear { yes } => {
            runner.log_startup("cache clear");
            let stats = cache_stats(&cache_dir)?;
            if stats.files == 0 {
                println!("Blob cache is already empty");
                return Ok(());
            }
            if !yes {
                confirm(format!(
                    "Delete {} cached files ({}) from {}?",
                    stats.files,
                    format_size(stats.bytes),
                    cache_dir.display()
                ))?;
            }

            let result = clear_cache(&cache_dir)?;
            println!(
                "Deleted {} files, freed {}",
                result.files_deleted,
                format_size(result.bytes_freed)
            );
        }
    }
    Ok(())
}
