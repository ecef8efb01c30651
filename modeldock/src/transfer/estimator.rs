//! Progress estimation from bytes on disk.
//!
//! # Rules
//!
//! With a known expected total:
//!
//! ```text
//! percent = min(99, 100 * bytes / total)
//! ```
//!
//! Without one the estimate is a slow heuristic ramp that never claims more
//! than 90%:
//!
//! ```text
//! percent = min(90, 10 + bytes / 100 MiB)
//! ```
//!
//! Percent never decreases within a transfer. The ETA is a linear
//! extrapolation of elapsed time and is only an estimate:
//!
//! ```text
//! eta = elapsed / percent * (100 - percent)
//! ```

use std::time::Duration;

use super::scanner::DiskSnapshot;
use super::state::MAX_IN_FLIGHT_PERCENT;
use crate::config::format_size;
use crate::registry::ExpectedManifest;

/// Ceiling of the heuristic when the expected total is unknown.
pub const HEURISTIC_MAX_PERCENT: f64 = 90.0;

/// Starting point of the heuristic.
pub const HEURISTIC_BASE_PERCENT: f64 = 10.0;

/// Bytes per heuristic percentage point.
pub const HEURISTIC_BYTES_PER_PERCENT: u64 = 100 * 1024 * 1024;

/// Output of one estimation tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub percent: f64,
    pub eta_seconds: Option<f64>,
    pub message: String,
    /// Bytes on disk grew since the previous tick.
    pub progressing: bool,
}

/// Per-transfer estimator.
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    manifest: ExpectedManifest,
    last_percent: f64,
    previous_bytes: u64,
    stalled_ticks: u32,
}

impl ProgressEstimator {
    pub fn new(manifest: ExpectedManifest) -> Self {
        Self {
            manifest,
            last_percent: 0.0,
            previous_bytes: 0,
            stalled_ticks: 0,
        }
    }

    pub fn manifest(&self) -> &ExpectedManifest {
        &self.manifest
    }

    /// Consecutive ticks without byte growth.
    pub fn stalled_ticks(&self) -> u32 {
        self.stalled_ticks
    }

    /// Fold one disk snapshot into the running estimate.
    pub fn estimate(&mut self, snapshot: &DiskSnapshot, elapsed: Duration) -> Estimate {
        let bytes = snapshot.total_bytes_on_disk;
        let total = self.manifest.total_expected_bytes();

        let computed = if total > 0 {
            (bytes as f64 / total as f64 * 100.0).min(MAX_IN_FLIGHT_PERCENT)
        } else {
            let ramp = (bytes / HEURISTIC_BYTES_PER_PERCENT) as f64;
            (HEURISTIC_BASE_PERCENT + ramp).min(HEURISTIC_MAX_PERCENT)
        };
        let percent = self.last_percent.max(computed);
        self.last_percent = percent;

        let progressing = bytes > self.previous_bytes;
        self.previous_bytes = bytes;
        if progressing {
            self.stalled_ticks = 0;
        } else {
            self.stalled_ticks = self.stalled_ticks.saturating_add(1);
        }

        Estimate {
            percent,
            eta_seconds: eta_seconds(percent, elapsed),
            message: self.message(snapshot, progressing),
            progressing,
        }
    }

    fn message(&self, snapshot: &DiskSnapshot, progressing: bool) -> String {
        let verb = if progressing {
            "Downloading..."
        } else {
            "Processing..."
        };
        let amount = if self.manifest.is_known() {
            format!(
                "{} / {}",
                format_size(snapshot.total_bytes_on_disk),
                format_size(self.manifest.total_expected_bytes())
            )
        } else {
            format!("{} downloaded", format_size(snapshot.total_bytes_on_disk))
        };

        match &snapshot.most_recent_file {
            Some(file) => format!("{} {} - {}", verb, amount, file),
            None => format!("{} {}", verb, amount),
        }
    }
}

/// Remaining-time extrapolation, `None` until some progress exists.
pub fn eta_seconds(percent: f64, elapsed: Duration) -> Option<f64> {
    if percent <= 0.0 {
        return None;
    }
    let elapsed = elapsed.as_secs_f64();
    Some((elapsed / percent * (100.0 - percent)).max(0.0))
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::registry::RepoFile;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_percent_bounded_and_monotonic(
            total in 0u64..10_000_000_000,
            samples in proptest::collection::vec(0u64..20_000_000_000, 1..20),
        ) {
            let manifest = if total == 0 {
                ExpectedManifest::unknown()
            } else {
                ExpectedManifest::new(vec![RepoFile { name: "f".to_string(), size_bytes: total }])
            };
            let mut estimator = ProgressEstimator::new(manifest);
            let mut previous = 0.0;

            for (i, bytes) in samples.into_iter().enumerate() {
                let snapshot = DiskSnapshot { total_bytes_on_disk: bytes, ..Default::default() };
                let estimate = estimator.estimate(&snapshot, Duration::from_secs(i as u64 + 1));
                prop_assert!(estimate.percent >= previous);
                prop_assert!(estimate.percent >= 0.0 && estimate.percent <= 99.0);
                if let Some(eta) = estimate.eta_seconds {
                    prop_assert!(eta >= 0.0);
                }
                previous = estimate.percent;
            }
        }
    }
}
