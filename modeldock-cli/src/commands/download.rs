//! Download command - run one transfer in the foreground.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;

use modeldock::app::ModelDockApp;
use modeldock::transfer::Phase;

use super::common::{completion_line, progress_bar, shutdown_runtime, status_line};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the download command.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Repository identifier, e.g. TheBloke/Llama-2-7B-GGUF
    pub repo: String,

    /// Only fetch files whose name contains this pattern (e.g. Q4_K_M)
    #[arg(long, short)]
    pub pattern: Option<String>,

    /// Storage root (overrides [storage] root)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

/// Run the download command.
pub fn run(config_path: Option<&Path>, args: DownloadArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("download");

    let app = runner.create_app(args.root)?;
    let runtime = runner.runtime()?;

    let interrupt = CancellationToken::new();
    let handler_token = interrupt.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let pattern = args.pattern.unwrap_or_default();
    let result = runtime.block_on(follow_transfer(
        Arc::clone(&app),
        &args.repo,
        &pattern,
        interrupt,
    ));
    shutdown_runtime(runtime);
    result
}

async fn follow_transfer(
    app: Arc<ModelDockApp>,
    repo: &str,
    pattern: &str,
    interrupt: CancellationToken,
) -> Result<(), CliError> {
    let mut updates = app.subscribe();
    let ticket = app.submit_transfer(repo, pattern)?;

    println!(
        "Downloading {} into {}",
        ticket.repository_id,
        ticket.destination.display()
    );
    println!("Press Ctrl+C to stop monitoring");
    println!();

    let bar = progress_bar();
    loop {
        let state = updates.borrow_and_update().clone();
        bar.set_position(state.percent_complete.round() as u64);
        bar.set_message(status_line(&state));

        match state.phase {
            Phase::Completed => {
                bar.finish_with_message("Download completed!");
                println!("Stored {} ({})", ticket.repository_id, completion_line(&state));
                return Ok(());
            }
            Phase::Error => {
                bar.abandon_with_message("Download failed");
                return Err(CliError::TransferFailed(
                    state.error_message.unwrap_or_default(),
                ));
            }
            Phase::Cancelled => {
                bar.abandon_with_message("Download cancelled");
                return Err(CliError::Aborted);
            }
            Phase::Idle | Phase::Starting | Phase::Downloading => {}
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Err(CliError::TransferFailed("status channel closed".to_string()));
                }
            }
            _ = interrupt.cancelled() => {
                app.cancel_transfer();
                bar.abandon_with_message("Cancelled; partial files are left in place");
                return Err(CliError::Aborted);
            }
        }
    }
}
