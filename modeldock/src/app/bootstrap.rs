//! Application bootstrap implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::config::AppConfig;
use super::error::AppError;
use crate::catalog::{self, paths_overlap, validate_delete_path, CatalogError, DeleteError};
use crate::catalog::{DeleteOutcome, ModelEntry};
use crate::config::BackendKind;
use crate::registry::{RegistrySizeProbe, ReqwestClient, SizeProbe};
use crate::transfer::{
    ExecutionBackend, HubFetcher, ProgressState, SubmitError, SubprocessBackend, ThreadBackend,
    TransferSupervisor, TransferTicket,
};

/// ModelDock application facade.
///
/// Owns the transfer supervisor and knows the storage root. Everything the
/// CLI and HTTP layer do goes through here.
///
/// # Example
///
/// ```ignore
/// use modeldock::app::{AppConfig, ModelDockApp};
/// use modeldock::config::ConfigFile;
///
/// let config = AppConfig::from_config_file(&ConfigFile::load()?);
/// let app = ModelDockApp::new(config)?;
///
/// // Inside a tokio runtime
/// app.submit_transfer("TheBloke/Llama-2-7B-GGUF", "Q4_K_M")?;
/// println!("{:?}", app.status().phase);
/// ```
pub struct ModelDockApp {
    config: AppConfig,
    supervisor: Arc<TransferSupervisor>,
}

impl ModelDockApp {
    /// Build the application from configuration.
    ///
    /// Creates the storage root and cache directories and makes both paths
    /// absolute. Call outside an async context: the registry client is
    /// blocking.
    pub fn new(mut config: AppConfig) -> Result<Self, AppError> {
        for dir in [&mut config.storage_root, &mut config.cache_dir] {
            fs::create_dir_all(&*dir).map_err(|e| AppError::Storage {
                path: dir.clone(),
                reason: e.to_string(),
            })?;
            let absolute = catalog::absolutize(dir).map_err(|e| AppError::Storage {
                path: dir.clone(),
                reason: e.to_string(),
            })?;
            *dir = absolute;
        }

        let client = ReqwestClient::new(config.token.as_deref())?;
        let probe: Arc<dyn SizeProbe> =
            Arc::new(RegistrySizeProbe::new(client, config.endpoint.clone()));

        let backend: Arc<dyn ExecutionBackend> = match config.backend {
            BackendKind::Thread => Arc::new(ThreadBackend::new(Arc::new(HubFetcher::new()))),
            BackendKind::Subprocess => {
                let command = config.subprocess.clone().ok_or_else(|| {
                    AppError::Config("subprocess backend requires a program to run".to_string())
                })?;
                Arc::new(
                    SubprocessBackend::new(command.program).with_base_args(command.base_args),
                )
            }
        };

        info!(
            root = %config.storage_root.display(),
            cache = %config.cache_dir.display(),
            backend = backend.name(),
            endpoint = %config.endpoint,
            "ModelDock initialized"
        );

        Ok(Self::with_components(config, probe, backend))
    }

    /// Assemble from explicit components.
    pub fn with_components(
        config: AppConfig,
        probe: Arc<dyn SizeProbe>,
        backend: Arc<dyn ExecutionBackend>,
    ) -> Self {
        let supervisor = Arc::new(TransferSupervisor::new(
            config.supervisor_config(),
            probe,
            backend,
        ));
        Self { config, supervisor }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage_root(&self) -> &Path {
        &self.config.storage_root
    }

    pub fn supervisor(&self) -> &Arc<TransferSupervisor> {
        &self.supervisor
    }

    /// Start a download (or an update of an existing model).
    pub fn submit_transfer(
        &self,
        repository_id: &str,
        name_pattern: &str,
    ) -> Result<TransferTicket, SubmitError> {
        self.supervisor.submit(repository_id, name_pattern)
    }

    /// Current progress record.
    pub fn status(&self) -> ProgressState {
        self.supervisor.status().snapshot()
    }

    /// Receiver notified on every progress change.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.supervisor.status().subscribe()
    }

    pub fn cancel_transfer(&self) -> bool {
        self.supervisor.cancel()
    }

    pub fn list_catalog(&self) -> Result<Vec<ModelEntry>, CatalogError> {
        catalog::list_models(&self.config.storage_root)
    }

    /// Delete a model directory or file under the storage root.
    pub fn delete_entry(&self, path: &Path) -> Result<DeleteOutcome, DeleteError> {
        self.ensure_not_busy(path)?;
        catalog::delete_entry(path, &self.config.storage_root)
    }

    /// Delete files under a model directory matching any of `patterns`.
    pub fn delete_matching(
        &self,
        path: &Path,
        patterns: &[String],
    ) -> Result<DeleteOutcome, DeleteError> {
        self.ensure_not_busy(path)?;
        catalog::delete_matching(path, &self.config.storage_root, patterns)
    }

    fn ensure_not_busy(&self, path: &Path) -> Result<PathBuf, DeleteError> {
        let target = validate_delete_path(path, &self.config.storage_root)?;
        if let Some(destination) = self.supervisor.active_destination() {
            if paths_overlap(&target, &destination) {
                warn!(
                    path = %target.display(),
                    destination = %destination.display(),
                    "Delete rejected during active transfer"
                );
                return Err(DeleteError::Busy(target));
            }
        }
        Ok(target)
    }
}
