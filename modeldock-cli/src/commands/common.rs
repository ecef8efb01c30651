//! Common types and utilities shared across CLI commands.

use std::time::Duration;

use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::runtime::Runtime;

use modeldock::config::format_size;
use modeldock::transfer::ProgressState;

use crate::error::CliError;

/// Grace period for blocking work when a command's runtime shuts down.
///
/// A cancelled fetch cannot be interrupted, so the runtime is not allowed to
/// wait for it indefinitely.
pub const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Progress bar over 0..=100 percent.
pub fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(200));
    bar
}

/// One-line summary of a progress record.
pub fn status_line(state: &ProgressState) -> String {
    match state.eta_seconds {
        Some(eta) if state.phase.is_active() && eta > 0.0 => {
            format!("{} (ETA {})", state.current_file_label, format_eta(eta))
        }
        _ => state.current_file_label.clone(),
    }
}

/// Format seconds as `1h 02m`, `3m 07s` or `12s`.
pub fn format_eta(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Summary printed after a completed transfer.
pub fn completion_line(state: &ProgressState) -> String {
    format!(
        "{} files, {}",
        state.files_on_disk,
        format_size(state.downloaded_bytes)
    )
}

/// Ask a yes/no question, defaulting to no. Declining aborts the command.
pub fn confirm(prompt: String) -> Result<(), CliError> {
    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| CliError::Config(format!("Prompt failed: {}", e)))?;
    if confirmed {
        Ok(())
    } else {
        Err(CliError::Aborted)
    }
}

/// Shut a command runtime down without waiting on a stuck fetch.
pub fn shutdown_runtime(runtime: Runtime) {
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(0.0), "0s");
        assert_eq!(format_eta(12.4), "12s");
        assert_eq!(format_eta(187.0), "3m 07s");
        assert_eq!(format_eta(3720.0), "1h 02m");
        assert_eq!(format_eta(-5.0), "0s");
    }

    #[test]
    fn test_status_line_idle_has_no_eta() {
        let idle = ProgressState::idle();
        assert_eq!(status_line(&idle), "");
    }

    #[test]
    fn test_completion_line() {
        let mut done = ProgressState::idle();
        done.files_on_disk = 3;
        done.downloaded_bytes = 2048;
        assert_eq!(completion_line(&done), "3 files, 2.0 KB");
    }
}
