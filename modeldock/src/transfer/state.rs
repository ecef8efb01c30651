//! Transfer progress record.
//!
//! [`ProgressState`] is the single record observed by operators. It is always
//! replaced whole, never patched field by field, so readers never see a torn
//! mixture of two ticks.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Upper bound on `percent_complete` while bytes are still moving.
pub const MAX_IN_FLIGHT_PERCENT: f64 = 99.0;

/// Lifecycle phase of the current (or most recent) transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Starting,
    Downloading,
    Completed,
    Error,
    Cancelled,
}

impl Phase {
    /// Whether a transfer is currently running.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Starting | Phase::Downloading)
    }

    /// Whether the phase is terminal.
    pub fn is_finished(self) -> bool {
        matches!(self, Phase::Completed | Phase::Error | Phase::Cancelled)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Starting => "starting",
            Phase::Downloading => "downloading",
            Phase::Completed => "completed",
            Phase::Error => "error",
            Phase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Snapshot of transfer progress as seen by operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressState {
    pub phase: Phase,
    /// In `[0, 99]` while downloading, exactly `100` when completed.
    pub percent_complete: f64,
    /// Human-readable description of the current activity.
    pub current_file_label: String,
    pub downloaded_bytes: u64,
    /// Expected total, `0` when unknown.
    pub total_bytes: u64,
    pub expected_files: usize,
    pub files_on_disk: usize,
    /// Linear extrapolation of remaining time.
    pub eta_seconds: Option<f64>,
    pub repository_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::idle()
    }
}

impl ProgressState {
    /// Record before any transfer has been submitted.
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            percent_complete: 0.0,
            current_file_label: String::new(),
            downloaded_bytes: 0,
            total_bytes: 0,
            expected_files: 0,
            files_on_disk: 0,
            eta_seconds: None,
            repository_id: String::new(),
            started_at: None,
            error_message: None,
        }
    }

    /// Fresh record for a newly accepted transfer.
    pub fn starting(repository_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Starting,
            current_file_label: "Initializing download...".to_string(),
            repository_id: repository_id.to_string(),
            started_at: Some(started_at),
            ..Self::idle()
        }
    }

    /// Move to `downloading` once the expected size is known (or given up on).
    pub fn into_downloading(self, total_bytes: u64, expected_files: usize) -> Self {
        let current_file_label = if total_bytes > 0 {
            format!(
                "Starting download ({})...",
                crate::config::format_size(total_bytes)
            )
        } else {
            "Starting download...".to_string()
        };
        Self {
            phase: Phase::Downloading,
            total_bytes,
            expected_files,
            current_file_label,
            ..self
        }
    }

    /// Apply one monitoring tick. Percent is clamped to the in-flight maximum.
    pub fn with_estimate(
        self,
        percent: f64,
        eta_seconds: Option<f64>,
        label: String,
        downloaded_bytes: u64,
        files_on_disk: usize,
    ) -> Self {
        Self {
            percent_complete: percent.clamp(0.0, MAX_IN_FLIGHT_PERCENT),
            eta_seconds,
            current_file_label: label,
            downloaded_bytes,
            files_on_disk,
            ..self
        }
    }

    /// Terminal success.
    pub fn into_completed(self, downloaded_bytes: u64, files_on_disk: usize) -> Self {
        Self {
            phase: Phase::Completed,
            percent_complete: 100.0,
            eta_seconds: Some(0.0),
            current_file_label: "Download completed!".to_string(),
            downloaded_bytes,
            files_on_disk,
            ..self
        }
    }

    /// Terminal failure. The last percent is kept.
    pub fn into_error(self, message: String) -> Self {
        Self {
            phase: Phase::Error,
            eta_seconds: None,
            current_file_label: "Download failed".to_string(),
            error_message: Some(message),
            ..self
        }
    }

    /// Operator-requested stop. The last percent is kept.
    pub fn into_cancelled(self) -> Self {
        Self {
            phase: Phase::Cancelled,
            eta_seconds: None,
            current_file_label: "Download cancelled".to_string(),
            ..self
        }
    }
}
