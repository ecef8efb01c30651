//! Application configuration for ModelDockApp.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{BackendKind, ConfigFile};
use crate::transfer::SupervisorConfig;

/// Top-level configuration passed to [`ModelDockApp::new`](super::ModelDockApp::new).
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub storage_root: PathBuf,
    pub cache_dir: PathBuf,
    pub endpoint: String,
    pub token: Option<String>,
    pub backend: BackendKind,
    pub tick_interval: Duration,
    pub transfer_timeout: Option<Duration>,
    pub scan_entry_limit: usize,
    /// How to start the child process for [`BackendKind::Subprocess`].
    pub subprocess: Option<SubprocessCommand>,
}

/// Program and leading arguments of the `fetch` child.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubprocessCommand {
    pub program: PathBuf,
    pub base_args: Vec<String>,
}

impl AppConfig {
    /// Create application config from the configuration file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            storage_root: config.storage.root.clone(),
            cache_dir: config.cache_dir(),
            endpoint: config.registry.endpoint.clone(),
            token: config.registry.token.clone(),
            backend: config.transfer.backend,
            tick_interval: config.transfer.tick_interval,
            transfer_timeout: config.transfer.timeout,
            scan_entry_limit: config.transfer.scan_entry_limit,
            subprocess: None,
        }
    }

    /// Set the child command used by the subprocess backend.
    pub fn with_subprocess(mut self, program: PathBuf, base_args: Vec<String>) -> Self {
        self.subprocess = Some(SubprocessCommand { program, base_args });
        self
    }

    /// Override the storage root. The cache follows unless it was set apart.
    pub fn with_storage_root(mut self, root: PathBuf) -> Self {
        if self.cache_dir == self.storage_root.join(".cache") {
            self.cache_dir = root.join(".cache");
        }
        self.storage_root = root;
        self
    }

    pub(crate) fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig::new(&self.storage_root, &self.cache_dir)
            .with_tick_interval(self.tick_interval)
            .with_timeout(self.transfer_timeout)
            .with_scan_entry_limit(self.scan_entry_limit)
            .with_registry(Some(self.endpoint.clone()), self.token.clone())
    }
}
