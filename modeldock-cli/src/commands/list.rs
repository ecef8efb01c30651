//! List command - print the stored catalog.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use modeldock::catalog::{list_models, ModelEntry};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the list command.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Storage root (overrides [storage] root)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Print the catalog as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the list command.
pub fn run(config_path: Option<&Path>, args: ListArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    let root = args
        .root
        .unwrap_or_else(|| runner.config().storage.root.clone());

    let models = list_models(&root)?;

    if args.json {
        let json = serde_json::to_string_pretty(&models)
            .map_err(|e| CliError::Config(format!("Failed to encode catalog: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    if models.is_empty() {
        println!("No models found in {}", root.display());
        return Ok(());
    }

    println!("Models in {}", root.display());
    println!();
    for model in &models {
        print_entry(model);
    }
    let total: u64 = models.iter().map(|m| m.total_bytes).sum();
    println!(
        "{} models, {}",
        models.len(),
        modeldock::config::format_size(total)
    );
    Ok(())
}

fn print_entry(model: &ModelEntry) {
    println!(
        "{}  {}",
        style(&model.name).bold(),
        style(&model.total_size).dim()
    );
    for group in &model.groups {
        println!(
            "  {}  {} files, {}",
            style(&group.key).cyan(),
            group.count,
            group.size
        );
    }
    for file in &model.individual_files {
        println!("  {}  {}  {}", file.name, file.size, style(&file.date).dim());
    }
    println!();
}
