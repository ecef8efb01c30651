//! Shared command setup: configuration, logging and application assembly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use modeldock::app::{AppConfig, ModelDockApp};
use modeldock::config::ConfigFile;
use modeldock::logging;

use crate::error::CliError;

/// Per-invocation context every command starts from.
pub struct CliRunner {
    config: ConfigFile,
    config_path: Option<PathBuf>,
    _log_guard: WorkerGuard,
}

impl CliRunner {
    /// Load configuration and install logging.
    ///
    /// An explicit `config_path` must exist; the default location may be
    /// absent, in which case defaults apply.
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        }
        .with_env_overrides(|key| std::env::var(key).ok());

        let log_guard = logging::init(&config.log_dir(), &config.logging.level)?;

        Ok(Self {
            config,
            config_path: config_path.map(Path::to_path_buf),
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log the command being run.
    pub fn log_startup(&self, command: &str) {
        info!(
            version = modeldock::VERSION,
            command,
            config = ?self.config_path,
            log_dir = %self.config.log_dir().display(),
            "ModelDock starting"
        );
    }

    /// Application config, with the storage root optionally overridden.
    pub fn app_config(&self, root: Option<PathBuf>) -> Result<AppConfig, CliError> {
        let mut config = AppConfig::from_config_file(&self.config);
        if let Some(root) = root {
            config = config.with_storage_root(root);
        }

        let program = std::env::current_exe()
            .map_err(|e| CliError::Config(format!("Cannot locate own executable: {}", e)))?;
        let base_args = match &self.config_path {
            Some(path) => vec!["--config".to_string(), path.display().to_string()],
            None => Vec::new(),
        };
        Ok(config.with_subprocess(program, base_args))
    }

    /// Build the application. Call before entering the runtime.
    pub fn create_app(&self, root: Option<PathBuf>) -> Result<Arc<ModelDockApp>, CliError> {
        let app = ModelDockApp::new(self.app_config(root)?)?;
        Ok(Arc::new(app))
    }

    /// Multi-threaded runtime for commands that run transfers or serve HTTP.
    pub fn runtime(&self) -> Result<Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("modeldock-worker")
            .build()
            .map_err(|e| CliError::Runtime(e.to_string()))
    }
}
