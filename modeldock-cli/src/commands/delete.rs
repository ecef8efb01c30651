//! Delete command - remove a stored model or matching files within it.

use std::path::{Path, PathBuf};

use clap::Args;

use modeldock::catalog::{delete_entry, delete_matching};

use super::common::confirm;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the delete command.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Absolute path of the model directory or file
    pub path: PathBuf,

    /// Only delete files whose names contain or end with these patterns
    #[arg(long = "files", value_name = "PATTERN", num_args = 1..)]
    pub files: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

/// Run the delete command.
pub fn run(config_path: Option<&Path>, args: DeleteArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("delete");
    let root = runner.config().storage.root.clone();

    if !args.yes {
        let prompt = if args.files.is_empty() {
            format!("Delete {} and everything in it?", args.path.display())
        } else {
            format!(
                "Delete files matching {} in {}?",
                args.files.join(", "),
                args.path.display()
            )
        };
        confirm(prompt)?;
    }

    let outcome = if args.files.is_empty() {
        delete_entry(&args.path, &root)?
    } else {
        delete_matching(&args.path, &root, &args.files)?
    };

    println!("{}", outcome.message);
    for name in &outcome.deleted_files {
        println!("  {}", name);
    }
    Ok(())
}
