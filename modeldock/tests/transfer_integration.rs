//! Integration tests for transfer supervision.
//!
//! These tests drive the full supervisor flow with a scripted bulk fetch
//! that writes real bytes into a temporary storage root:
//! - known-size progress, clamping and completion
//! - reentrancy guard
//! - heuristic progress when the registry lookup fails
//! - cancel, failure and timeout phases
//! - catalog listing and deletion around an active transfer
//!
//! Run with: `cargo test --test transfer_integration`

use std::fs;
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::watch;

use modeldock::app::{AppConfig, ModelDockApp};
use modeldock::catalog::DeleteError;
use modeldock::config::ConfigFile;
use modeldock::registry::{
    ExpectedManifest, HttpClient, RegistryError, RegistrySizeProbe, RepoFile, SizeProbe,
};
use modeldock::repo::{NamePattern, RepoId};
use modeldock::transfer::{
    BulkFetch, FetchJob, FetchSummary, Phase, ProgressState, SubmitError, SupervisorConfig,
    ThreadBackend, TransferError, TransferSupervisor,
};

// ============================================================================
// Test Doubles
// ============================================================================

/// Probe returning a fixed manifest.
struct FixedProbe(ExpectedManifest);

impl SizeProbe for FixedProbe {
    fn fetch_expected_manifest(&self, _: &RepoId, _: &NamePattern) -> ExpectedManifest {
        self.0.clone()
    }
}

/// HTTP client for a registry that refuses every request.
struct DeniedClient;

impl HttpClient for DeniedClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, RegistryError> {
        Err(RegistryError::Unauthorized(url.to_string()))
    }
}

/// Fetch that writes one file per step and waits for the test between steps.
struct ScriptedFetch {
    steps: Vec<u64>,
    gate: Mutex<mpsc::Receiver<()>>,
    outcome: Result<FetchSummary, TransferError>,
}

impl ScriptedFetch {
    fn new(steps: Vec<u64>, outcome: Result<FetchSummary, TransferError>) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                steps,
                gate: Mutex::new(rx),
                outcome,
            },
            tx,
        )
    }
}

impl BulkFetch for ScriptedFetch {
    fn fetch(&self, job: &FetchJob) -> Result<FetchSummary, TransferError> {
        fs::create_dir_all(&job.destination).map_err(|e| TransferError::Unexpected(e.to_string()))?;
        for (i, bytes) in self.steps.iter().enumerate() {
            let path = job.destination.join(format!("part-{}.gguf", i));
            fs::write(&path, vec![0u8; *bytes as usize])
                .map_err(|e| TransferError::Unexpected(e.to_string()))?;
            let _ = self.gate.lock().recv_timeout(Duration::from_secs(10));
        }
        self.outcome.clone()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const TICK: Duration = Duration::from_millis(20);

fn manifest(total: u64) -> ExpectedManifest {
    ExpectedManifest::new(vec![RepoFile {
        name: "model.gguf".to_string(),
        size_bytes: total,
    }])
}

fn supervisor(
    root: &Path,
    probe: Arc<dyn SizeProbe>,
    fetch: ScriptedFetch,
    timeout: Option<Duration>,
) -> Arc<TransferSupervisor> {
    Arc::new(TransferSupervisor::new(
        SupervisorConfig::new(root, root.join(".cache"))
            .with_tick_interval(TICK)
            .with_timeout(timeout),
        probe,
        Arc::new(ThreadBackend::new(Arc::new(fetch))),
    ))
}

/// Wait until the status satisfies `pred`, failing after a few seconds.
async fn wait_for<F>(rx: &mut watch::Receiver<ProgressState>, pred: F) -> ProgressState
where
    F: Fn(&ProgressState) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        {
            let state = rx.borrow_and_update();
            if pred(&state) {
                return state.clone();
            }
        }
        match tokio::time::timeout_at(deadline, rx.changed()).await {
            Ok(Ok(())) => continue,
            _ => panic!("condition not reached, last state: {:?}", *rx.borrow()),
        }
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_known_size_progress_clamps_then_completes() {
    let temp = TempDir::new().unwrap();
    let (fetch, gate) = ScriptedFetch::new(vec![600_000, 600_000], Ok(FetchSummary::default()));
    let supervisor = supervisor(
        temp.path(),
        Arc::new(FixedProbe(manifest(1_000_000))),
        fetch,
        None,
    );
    let mut rx = supervisor.status().subscribe();

    supervisor.submit("org/model", "").unwrap();
    assert!(supervisor.status().snapshot().phase.is_active());

    let state = wait_for(&mut rx, |s| {
        s.phase == Phase::Downloading && s.downloaded_bytes == 600_000
    })
    .await;
    assert!((state.percent_complete - 60.0).abs() < 1e-6);
    assert_eq!(state.total_bytes, 1_000_000);
    assert!(state.eta_seconds.is_some());

    gate.send(()).unwrap();
    let state = wait_for(&mut rx, |s| s.downloaded_bytes == 1_200_000).await;
    assert_eq!(state.phase, Phase::Downloading);
    assert_eq!(state.percent_complete, 99.0);

    gate.send(()).unwrap();
    let state = wait_for(&mut rx, |s| s.phase.is_finished()).await;
    assert_eq!(state.phase, Phase::Completed);
    assert_eq!(state.percent_complete, 100.0);
    assert_eq!(state.files_on_disk, 2);
    assert!(!supervisor.is_active());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_submit_rejected_while_active() {
    let temp = TempDir::new().unwrap();
    let (fetch, gate) = ScriptedFetch::new(vec![10], Ok(FetchSummary::default()));
    let supervisor = supervisor(
        temp.path(),
        Arc::new(FixedProbe(manifest(10))),
        fetch,
        None,
    );
    let mut rx = supervisor.status().subscribe();

    supervisor.submit("org/first", "").unwrap();
    let err = supervisor.submit("org/second", "").unwrap_err();
    assert_eq!(
        err,
        SubmitError::AlreadyInProgress {
            repository_id: "org/first".to_string()
        }
    );
    assert_eq!(supervisor.status().snapshot().repository_id, "org/first");

    gate.send(()).unwrap();
    wait_for(&mut rx, |s| s.phase == Phase::Completed).await;

    // Free again once the first one finished. Without a gate the next fetch
    // runs straight through.
    drop(gate);
    assert!(supervisor.submit("org/second", "").is_ok());
    let state = wait_for(&mut rx, |s| {
        s.repository_id == "org/second" && s.phase.is_finished()
    })
    .await;
    assert_eq!(state.phase, Phase::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_registry_failure_falls_back_to_heuristic() {
    let temp = TempDir::new().unwrap();
    let (fetch, gate) = ScriptedFetch::new(vec![1024], Ok(FetchSummary::default()));
    let probe = RegistrySizeProbe::new(DeniedClient, "https://hub.invalid");
    let supervisor = supervisor(temp.path(), Arc::new(probe), fetch, None);
    let mut rx = supervisor.status().subscribe();

    supervisor.submit("org/gated", "").unwrap();

    let state = wait_for(&mut rx, |s| {
        s.phase == Phase::Downloading && s.downloaded_bytes == 1024
    })
    .await;
    assert_eq!(state.total_bytes, 0);
    assert_eq!(state.percent_complete, 10.0);
    assert!(state.current_file_label.contains("downloaded"));

    gate.send(()).unwrap();
    let state = wait_for(&mut rx, |s| s.phase.is_finished()).await;
    assert_eq!(state.phase, Phase::Completed);
    assert_eq!(state.percent_complete, 100.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_marks_cancelled_and_frees_slot() {
    let temp = TempDir::new().unwrap();
    let (fetch, gate) = ScriptedFetch::new(vec![500], Ok(FetchSummary::default()));
    let supervisor = supervisor(
        temp.path(),
        Arc::new(FixedProbe(manifest(1000))),
        fetch,
        None,
    );
    let mut rx = supervisor.status().subscribe();

    supervisor.submit("org/model", "").unwrap();
    wait_for(&mut rx, |s| s.downloaded_bytes == 500).await;

    assert!(supervisor.cancel());
    let state = supervisor.status().snapshot();
    assert_eq!(state.phase, Phase::Cancelled);
    assert_eq!(state.percent_complete, 50.0);
    assert!(!supervisor.is_active());

    // The fetch finishing afterwards must not overwrite the record.
    gate.send(()).unwrap();
    tokio::time::sleep(TICK * 5).await;
    assert_eq!(supervisor.status().snapshot().phase, Phase::Cancelled);
    assert!(!supervisor.cancel());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fetch_failure_reports_operator_message() {
    let temp = TempDir::new().unwrap();
    let (fetch, gate) = ScriptedFetch::new(
        vec![250],
        Err(TransferError::Registry("401 for org/private".to_string())),
    );
    let supervisor = supervisor(
        temp.path(),
        Arc::new(FixedProbe(manifest(1000))),
        fetch,
        None,
    );
    let mut rx = supervisor.status().subscribe();

    supervisor.submit("org/private", "").unwrap();
    wait_for(&mut rx, |s| s.downloaded_bytes == 250).await;
    gate.send(()).unwrap();

    let state = wait_for(&mut rx, |s| s.phase.is_finished()).await;
    assert_eq!(state.phase, Phase::Error);
    assert_eq!(state.percent_complete, 25.0);
    let message = state.error_message.unwrap();
    assert!(message.contains("Access denied"));
    assert!(!message.contains("401"));
    assert!(!supervisor.is_active());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_marks_error() {
    let temp = TempDir::new().unwrap();
    // The gate is never opened; dropping it at the end releases the fetch.
    let (fetch, _gate) = ScriptedFetch::new(vec![1], Ok(FetchSummary::default()));
    let supervisor = supervisor(
        temp.path(),
        Arc::new(FixedProbe(manifest(100))),
        fetch,
        Some(Duration::from_millis(200)),
    );
    let mut rx = supervisor.status().subscribe();

    supervisor.submit("org/slow", "").unwrap();
    let state = wait_for(&mut rx, |s| s.phase.is_finished()).await;

    assert_eq!(state.phase, Phase::Error);
    assert!(state.error_message.unwrap().contains("did not finish"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_app_delete_and_catalog_around_transfer() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_path_buf();
    let shards = root.join("org/sharded");
    fs::create_dir_all(&shards).unwrap();
    fs::write(shards.join("model-00001-of-00002.safetensors"), vec![0u8; 512]).unwrap();
    fs::write(shards.join("model-00002-of-00002.safetensors"), vec![0u8; 512]).unwrap();

    let (fetch, gate) = ScriptedFetch::new(vec![64], Ok(FetchSummary::default()));
    let mut config = AppConfig::from_config_file(&ConfigFile::default()).with_storage_root(root.clone());
    config.tick_interval = TICK;
    let app = ModelDockApp::with_components(
        config,
        Arc::new(FixedProbe(manifest(64))),
        Arc::new(ThreadBackend::new(Arc::new(fetch))),
    );
    let mut rx = app.subscribe();

    app.submit_transfer("org/model", "").unwrap();
    assert!(matches!(
        app.delete_entry(&root.join("org/model")),
        Err(DeleteError::Busy(_))
    ));

    gate.send(()).unwrap();
    wait_for(&mut rx, |s| s.phase == Phase::Completed).await;

    let catalog = app.list_catalog().unwrap();
    let names: Vec<_> = catalog.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["org/model", "org/sharded"]);
    assert_eq!(catalog[1].groups[0].key, "model-*-of-00002.safetensors");
    assert_eq!(catalog[1].groups[0].count, 2);
    assert_eq!(catalog[0].individual_files[0].name, "part-0.gguf");

    let outcome = app.delete_entry(&root.join("org/sharded")).unwrap();
    assert_eq!(outcome.message, "Model deleted successfully (2 files, 1.0 KB)");
    assert_eq!(app.list_catalog().unwrap().len(), 1);

    for bad in ["/", "/etc", "relative"] {
        assert!(matches!(
            app.delete_entry(Path::new(bad)),
            Err(DeleteError::Invalid(_))
        ));
    }
    assert!(matches!(
        app.delete_entry(&root.join("org/../../escape")),
        Err(DeleteError::Invalid(_))
    ));
}
