//! INI configuration file.
//!
//! The configuration lives at `~/.config/modeldock/config.ini` by default.
//! Every key is optional; a missing file yields the defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use tracing::debug;

use super::ConfigError;

/// Default storage root, matching the usual container volume mount.
pub const DEFAULT_STORAGE_ROOT: &str = "/models";

/// Default registry endpoint.
pub const DEFAULT_REGISTRY_ENDPOINT: &str = "https://huggingface.co";

/// Default interval between progress ticks (in seconds).
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 2;

/// Default upper bound on entries visited by a single disk scan.
pub const DEFAULT_SCAN_ENTRY_LIMIT: usize = 200_000;

/// Default HTTP bind address.
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

/// Default path prefix the HTTP routes are additionally mounted under.
pub const DEFAULT_BASE_PATH: &str = "/hf-downloader";

/// Execution context used to run the blocking bulk fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// A blocking thread inside this process.
    #[default]
    Thread,
    /// A child process running the CLI's `fetch` command.
    Subprocess,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "thread" => Ok(BackendKind::Thread),
            "subprocess" | "process" => Ok(BackendKind::Subprocess),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    /// Root of the model tree.
    pub root: PathBuf,
    /// Blob cache directory; `None` means `<root>/.cache`.
    pub cache_dir: Option<PathBuf>,
}

/// `[registry]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySettings {
    /// Base URL of the registry.
    pub endpoint: String,
    /// Access token for gated or private repositories.
    pub token: Option<String>,
}

/// `[transfer]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSettings {
    pub backend: BackendKind,
    pub tick_interval: Duration,
    /// Deadline for a whole transfer; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub scan_entry_limit: usize,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub bind: String,
    /// Extra prefix the routes are mounted under; empty disables it.
    pub base_path: String,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory for the rolling log file; `None` uses the platform data dir.
    pub directory: Option<PathBuf>,
    pub level: String,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub storage: StorageSettings,
    pub registry: RegistrySettings,
    pub transfer: TransferSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            storage: StorageSettings {
                root: PathBuf::from(DEFAULT_STORAGE_ROOT),
                cache_dir: None,
            },
            registry: RegistrySettings {
                endpoint: DEFAULT_REGISTRY_ENDPOINT.to_string(),
                token: None,
            },
            transfer: TransferSettings {
                backend: BackendKind::Thread,
                tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
                timeout: None,
                scan_entry_limit: DEFAULT_SCAN_ENTRY_LIMIT,
            },
            server: ServerSettings {
                bind: DEFAULT_BIND.to_string(),
                base_path: DEFAULT_BASE_PATH.to_string(),
            },
            logging: LoggingSettings {
                directory: None,
                level: "info".to_string(),
            },
        }
    }
}

impl ConfigFile {
    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("modeldock").join("config.ini"))
    }

    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading configuration");
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |section: &str, key: &str| {
            ini.get_from(Some(section), key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(root) = get("storage", "root") {
            config.storage.root = PathBuf::from(root);
        }
        config.storage.cache_dir = get("storage", "cache_dir").map(PathBuf::from);

        if let Some(endpoint) = get("registry", "endpoint") {
            config.registry.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        config.registry.token = get("registry", "token").map(str::to_string);

        if let Some(backend) = get("transfer", "backend") {
            config.transfer.backend = backend
                .parse()
                .map_err(|reason| invalid("transfer", "backend", backend, reason))?;
        }
        if let Some(secs) = get("transfer", "tick_interval_secs") {
            let secs = parse_number::<u64>("transfer", "tick_interval_secs", secs)?;
            if secs == 0 {
                return Err(invalid(
                    "transfer",
                    "tick_interval_secs",
                    "0",
                    "must be at least 1".to_string(),
                ));
            }
            config.transfer.tick_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = get("transfer", "timeout_secs") {
            let secs = parse_number::<u64>("transfer", "timeout_secs", secs)?;
            config.transfer.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(limit) = get("transfer", "scan_entry_limit") {
            config.transfer.scan_entry_limit =
                parse_number::<usize>("transfer", "scan_entry_limit", limit)?.max(1);
        }

        if let Some(bind) = get("server", "bind") {
            config.server.bind = bind.to_string();
        }
        // An explicitly empty base_path disables the prefixed mount.
        if let Some(base) = ini.get_from(Some("server"), "base_path") {
            config.server.base_path = normalize_base_path(base);
        }

        config.logging.directory = get("logging", "directory").map(PathBuf::from);
        if let Some(level) = get("logging", "level") {
            config.logging.level = level.to_string();
        }

        Ok(config)
    }

    /// Apply `HF_TOKEN` and `HF_ENDPOINT` style overrides.
    ///
    /// The lookup is injected so callers can pass `std::env::var` and tests
    /// can pass a fixed map.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("HF_TOKEN").filter(|t| !t.is_empty()) {
            self.registry.token = Some(token);
        }
        if let Some(endpoint) = lookup("HF_ENDPOINT").filter(|e| !e.is_empty()) {
            self.registry.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        self
    }

    /// Resolved blob cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.storage
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.storage.root.join(".cache"))
    }

    /// Resolved log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.logging.directory.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("modeldock")
                .join("logs")
        })
    }
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| invalid(section, key, value, e.to_string()))
}

fn invalid(section: &str, key: &str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

/// Normalise a route prefix to `/segment` form, or empty.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.storage.root, PathBuf::from("/models"));
        assert_eq!(config.cache_dir(), PathBuf::from("/models/.cache"));
        assert_eq!(config.transfer.backend, BackendKind::Thread);
        assert_eq!(config.transfer.tick_interval, Duration::from_secs(2));
        assert!(config.transfer.timeout.is_none());
        assert_eq!(config.server.base_path, "/hf-downloader");
    }

    #[test]
    fn test_parse_full_file() {
        let config = ConfigFile::parse(
            r#"
[storage]
root = /srv/models
cache_dir = /srv/cache

[registry]
endpoint = https://mirror.example.com/
token = hf_secret

[transfer]
backend = subprocess
tick_interval_secs = 3
timeout_secs = 3600
scan_entry_limit = 5000

[server]
bind = 127.0.0.1:8080
base_path = models-ui/

[logging]
directory = /var/log/modeldock
level = debug
"#,
        )
        .unwrap();

        assert_eq!(config.storage.root, PathBuf::from("/srv/models"));
        assert_eq!(config.cache_dir(), PathBuf::from("/srv/cache"));
        assert_eq!(config.registry.endpoint, "https://mirror.example.com");
        assert_eq!(config.registry.token.as_deref(), Some("hf_secret"));
        assert_eq!(config.transfer.backend, BackendKind::Subprocess);
        assert_eq!(config.transfer.tick_interval, Duration::from_secs(3));
        assert_eq!(config.transfer.timeout, Some(Duration::from_secs(3600)));
        assert_eq!(config.transfer.scan_entry_limit, 5000);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.base_path, "/models-ui");
        assert_eq!(config.log_dir(), PathBuf::from("/var/log/modeldock"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let config = ConfigFile::parse("[transfer]\ntimeout_secs = 0\n").unwrap();
        assert!(config.transfer.timeout.is_none());
    }

    #[test]
    fn test_empty_base_path_disables_prefix() {
        let config = ConfigFile::parse("[server]\nbase_path =\n").unwrap();
        assert_eq!(config.server.base_path, "");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ConfigFile::parse("[transfer]\nbackend = carrier-pigeon\n").unwrap_err();
        assert!(err.to_string().contains("backend"));

        let err = ConfigFile::parse("[transfer]\ntick_interval_secs = soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        assert!(ConfigFile::parse("[transfer]\ntick_interval_secs = 0\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HF_TOKEN", "hf_from_env"),
            ("HF_ENDPOINT", "https://hf-mirror.example/"),
        ]
        .into_iter()
        .collect();

        let config = ConfigFile::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.registry.token.as_deref(), Some("hf_from_env"));
        assert_eq!(config.registry.endpoint, "https://hf-mirror.example");
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = ConfigFile::load_from(&temp.path().join("absent.ini"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[storage]\nroot = /data/models\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.storage.root, PathBuf::from("/data/models"));
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("Thread".parse::<BackendKind>(), Ok(BackendKind::Thread));
        assert_eq!("process".parse::<BackendKind>(), Ok(BackendKind::Subprocess));
        assert!("".parse::<BackendKind>().is_err());
    }
}
