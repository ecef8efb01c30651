//! ModelDock CLI - Command-line interface and HTTP server
//!
//! This binary exposes the ModelDock library: a web UI and JSON API for
//! submitting downloads, plus direct commands for downloading, listing,
//! deleting and maintaining stored models.

mod commands;
mod error;
mod runner;
mod web;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::{cache, delete, download, fetch, list, migrate, serve};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "modeldock", version, about, long_about = None)]
struct Cli {
    /// Path to config.ini (default: platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web UI and JSON API
    Serve(serve::ServeArgs),
    /// Download a repository in the foreground with a progress bar
    Download(download::DownloadArgs),
    /// List stored models
    List(list::ListArgs),
    /// Delete a stored model directory, or matching files within it
    Delete(delete::DeleteArgs),
    /// Inspect or clear the hub blob cache
    Cache {
        #[command(subcommand)]
        action: cache::CacheAction,
    },
    /// Replace symlinked or hard-linked model files with real copies
    Migrate(migrate::MigrateArgs),
    /// Fetch a repository without monitoring (used by the subprocess backend)
    #[command(hide = true)]
    Fetch(fetch::FetchArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Serve(args) => serve::run(cli.config.as_deref(), args),
        Commands::Download(args) => download::run(cli.config.as_deref(), args),
        Commands::List(args) => list::run(cli.config.as_deref(), args),
        Commands::Delete(args) => delete::run(cli.config.as_deref(), args),
        Commands::Cache { action } => cache::run(cli.config.as_deref(), action),
        Commands::Migrate(args) => migrate::run(cli.config.as_deref(), args),
        Commands::Fetch(args) => fetch::run(cli.config.as_deref(), args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
