//! Serve command - run the web UI and JSON API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;

use modeldock::config::normalize_base_path;

use super::common::shutdown_runtime;
use crate::error::CliError;
use crate::runner::CliRunner;
use crate::web;

/// Arguments for the serve command.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides [server] bind)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Extra route prefix (overrides [server] base_path; "" disables it)
    #[arg(long, value_name = "PATH")]
    pub base_path: Option<String>,

    /// Storage root (overrides [storage] root)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

/// Run the serve command.
pub fn run(config_path: Option<&Path>, args: ServeArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("serve");
    let config = runner.config();

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let base_path = args
        .base_path
        .map(|p| normalize_base_path(&p))
        .unwrap_or_else(|| config.server.base_path.clone());

    let app = runner.create_app(args.root)?;

    println!("ModelDock v{}", modeldock::VERSION);
    println!("================================");
    println!();
    println!("Storage:   {}", app.storage_root().display());
    println!("Listening: http://{}", bind);
    if !base_path.is_empty() {
        println!("Prefix:    {}", base_path);
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let runtime = runner.runtime()?;
    let result = runtime.block_on(web::serve(Arc::clone(&app), &bind, &base_path));
    shutdown_runtime(runtime);
    result
}
