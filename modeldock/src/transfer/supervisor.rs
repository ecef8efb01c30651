//! Transfer supervision.
//!
//! The supervisor owns the one active transfer. It runs the state machine
//!
//! ```text
//! idle -> starting -> downloading -> completed | error | cancelled
//! ```
//!
//! and is the only writer of the [`StatusStore`].
//!
//! # Architecture
//!
//! ```text
//! submit() ──► driver task
//!               ├─ spawn_blocking(SizeProbe)          expected manifest
//!               ├─ ExecutionBackend::launch(FetchJob)  opaque bulk fetch
//!               └─ loop select!
//!                    ├─ cancel token               -> return (cancel() wrote status)
//!                    ├─ fetch join handle          -> final scan, completed | error
//!                    ├─ optional deadline          -> error (fetch left running)
//!                    └─ interval tick              -> spawn_blocking(DiskScanner)
//!                                                     ProgressEstimator -> publish
//! ```
//!
//! Every status write happens under the active-transfer lock and only while
//! the writer's transfer id is still the active one, so a cancelled or
//! superseded driver can never overwrite a newer record.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backend::ExecutionBackend;
use super::error::{SubmitError, TransferError};
use super::estimator::ProgressEstimator;
use super::fetch::FetchJob;
use super::scanner::{DiskScanner, DiskSnapshot};
use super::state::ProgressState;
use super::status::StatusStore;
use crate::config::{DEFAULT_SCAN_ENTRY_LIMIT, DEFAULT_TICK_INTERVAL_SECS};
use crate::registry::{ExpectedManifest, SizeProbe};
use crate::repo::{RepoId, TransferRequest};

/// Static settings for a supervisor.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    pub storage_root: PathBuf,
    pub cache_dir: PathBuf,
    pub tick_interval: Duration,
    pub transfer_timeout: Option<Duration>,
    pub scan_entry_limit: usize,
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

impl SupervisorConfig {
    pub fn new(storage_root: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            cache_dir: cache_dir.into(),
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
            transfer_timeout: None,
            scan_entry_limit: DEFAULT_SCAN_ENTRY_LIMIT,
            endpoint: None,
            token: None,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn with_scan_entry_limit(mut self, limit: usize) -> Self {
        self.scan_entry_limit = limit;
        self
    }

    pub fn with_registry(mut self, endpoint: Option<String>, token: Option<String>) -> Self {
        self.endpoint = endpoint;
        self.token = token;
        self
    }
}

/// Handle returned for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTicket {
    pub id: u64,
    pub repository_id: RepoId,
    pub destination: PathBuf,
}

struct ActiveTransfer {
    id: u64,
    repository_id: RepoId,
    destination: PathBuf,
    cancel: CancellationToken,
}

/// Owner of the single active transfer.
pub struct TransferSupervisor {
    config: SupervisorConfig,
    probe: Arc<dyn SizeProbe>,
    backend: Arc<dyn ExecutionBackend>,
    scanner: DiskScanner,
    status: StatusStore,
    active: Mutex<Option<ActiveTransfer>>,
    next_id: AtomicU64,
}

impl TransferSupervisor {
    pub fn new(
        config: SupervisorConfig,
        probe: Arc<dyn SizeProbe>,
        backend: Arc<dyn ExecutionBackend>,
    ) -> Self {
        let scanner = DiskScanner::new(config.scan_entry_limit);
        Self {
            config,
            probe,
            backend,
            scanner,
            status: StatusStore::new(),
            active: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn status(&self) -> &StatusStore {
        &self.status
    }

    /// Whether a transfer is starting or downloading.
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Destination of the active transfer, if any.
    pub fn active_destination(&self) -> Option<PathBuf> {
        self.active.lock().as_ref().map(|a| a.destination.clone())
    }

    /// Accept a transfer and start it in the background.
    ///
    /// Returns as soon as the status reads `starting`. Must be called from
    /// within a tokio runtime.
    pub fn submit(
        self: &Arc<Self>,
        repository_id: &str,
        name_pattern: &str,
    ) -> Result<TransferTicket, SubmitError> {
        let request = TransferRequest::new(repository_id, name_pattern, &self.config.storage_root)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SubmitError::NoRuntime)?;

        let mut active = self.active.lock();
        if let Some(current) = active.as_ref() {
            return Err(SubmitError::AlreadyInProgress {
                repository_id: current.repository_id.to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let initial = ProgressState::starting(request.repository_id().as_str(), Utc::now());
        self.status.replace(initial.clone());
        *active = Some(ActiveTransfer {
            id,
            repository_id: request.repository_id().clone(),
            destination: request.destination().to_path_buf(),
            cancel: cancel.clone(),
        });
        drop(active);

        info!(
            id,
            repo = %request.repository_id(),
            pattern = request.name_pattern().as_str().unwrap_or("*"),
            destination = %request.destination().display(),
            backend = self.backend.name(),
            "Transfer accepted"
        );

        let ticket = TransferTicket {
            id,
            repository_id: request.repository_id().clone(),
            destination: request.destination().to_path_buf(),
        };
        runtime.spawn(Arc::clone(self).drive(id, request, cancel, initial));
        Ok(ticket)
    }

    /// Stop monitoring the active transfer and mark it `cancelled`.
    ///
    /// The bulk fetch itself cannot be interrupted and keeps running until
    /// it finishes on its own. Returns `false` when nothing was active.
    pub fn cancel(&self) -> bool {
        let mut active = self.active.lock();
        let Some(transfer) = active.take() else {
            return false;
        };

        transfer.cancel.cancel();
        self.status.replace(self.status.snapshot().into_cancelled());
        warn!(
            id = transfer.id,
            repo = %transfer.repository_id,
            "Transfer cancelled; the underlying fetch continues in the background"
        );
        true
    }

    async fn drive(
        self: Arc<Self>,
        id: u64,
        request: TransferRequest,
        cancel: CancellationToken,
        initial: ProgressState,
    ) {
        let started = Instant::now();
        let manifest = self.probe_manifest(&request).await;
        if cancel.is_cancelled() {
            return;
        }

        let mut state = initial.into_downloading(
            manifest.total_expected_bytes(),
            manifest.expected_file_count(),
        );
        if !self.publish(id, &state) {
            return;
        }
        let job = FetchJob::for_request(&request, &self.config.cache_dir)
            .with_registry(self.config.endpoint.clone(), self.config.token.clone())
            .with_expected_sizes(&manifest);
        let mut estimator = ProgressEstimator::new(manifest);

        let mut handle = self.backend.launch(job);

        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = self
            .config
            .transfer_timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                joined = &mut handle => {
                    break joined
                        .map_err(|e| TransferError::Backend(format!("fetch task failed: {}", e)))
                        .and_then(|result| result);
                }
                _ = deadline_elapsed(deadline) => {
                    let secs = self.config.transfer_timeout.map_or(0, |t| t.as_secs());
                    break Err(TransferError::Timeout { secs });
                }
                _ = ticker.tick() => {
                    let Some(snapshot) = self.scan(&request).await else {
                        continue;
                    };
                    let estimate = estimator.estimate(&snapshot, started.elapsed());
                    state = state.with_estimate(
                        estimate.percent,
                        estimate.eta_seconds,
                        estimate.message,
                        snapshot.total_bytes_on_disk,
                        snapshot.file_count,
                    );
                    if !self.publish(id, &state) {
                        return;
                    }
                }
            }
        };

        let finished = match outcome {
            Ok(summary) => {
                let snapshot = self.scan(&request).await.unwrap_or(DiskSnapshot {
                    total_bytes_on_disk: state.downloaded_bytes,
                    file_count: state.files_on_disk,
                    ..Default::default()
                });
                info!(
                    id,
                    repo = %request.repository_id(),
                    fetched = summary.files_fetched,
                    skipped = summary.files_skipped,
                    bytes = snapshot.total_bytes_on_disk,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Transfer completed"
                );
                state.into_completed(snapshot.total_bytes_on_disk, snapshot.file_count)
            }
            Err(e) => {
                error!(id, repo = %request.repository_id(), error = %e, "Transfer failed");
                state.into_error(e.operator_message())
            }
        };
        self.finish(id, finished);
    }

    async fn probe_manifest(&self, request: &TransferRequest) -> ExpectedManifest {
        let probe = Arc::clone(&self.probe);
        let repo = request.repository_id().clone();
        let pattern = request.name_pattern().clone();

        match tokio::task::spawn_blocking(move || probe.fetch_expected_manifest(&repo, &pattern))
            .await
        {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(error = %e, "Size probe task failed, progress will be estimated");
                ExpectedManifest::unknown()
            }
        }
    }

    async fn scan(&self, request: &TransferRequest) -> Option<DiskSnapshot> {
        let scanner = self.scanner.clone();
        let destination = request.destination().to_path_buf();
        let cache_dir = self.config.cache_dir.clone();
        let repo = request.repository_id().clone();

        match tokio::task::spawn_blocking(move || scanner.scan(&destination, &cache_dir, &repo))
            .await
        {
            Ok(snapshot) => {
                if snapshot.truncated {
                    debug!(limit = self.scanner.entry_limit(), "Disk scan hit its entry limit");
                }
                Some(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Disk scan task failed, monitoring continues");
                None
            }
        }
    }

    /// Write `state` if transfer `id` is still active.
    fn publish(&self, id: u64, state: &ProgressState) -> bool {
        let active = self.active.lock();
        match active.as_ref() {
            Some(current) if current.id == id => {
                self.status.replace(state.clone());
                true
            }
            _ => false,
        }
    }

    /// Write a terminal `state` and release the active slot.
    fn finish(&self, id: u64, state: ProgressState) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|current| current.id == id) {
            self.status.replace(state);
            *active = None;
        }
    }
}

async fn deadline_elapsed(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
