//! Configuration management for freeapi-control.
//!
//! Loads settings from `~/.config/freeapi-control/config.toml` with environment overrides.

use crate::http::{ClientOptions, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 15;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(StorageBackend::Json),
            "sqlite" => Ok(StorageBackend::Sqlite),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    #[serde(default = "default_poll_timeout_secs")]
    pub timeout_secs: u64,
    /// Skip TLS certificate validation when polling sites.
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl PollingConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            accept_invalid_certs: self.accept_invalid_certs,
            user_agent: self.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuthConfig {
    /// When set, `/api/*` requires this bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbosity: LogVerbosity,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogVerbosity {
    Minimal,
    #[default]
    Compact,
    Verbose,
}

// Default value functions
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { DEFAULT_PORT }
fn default_true() -> bool { true }
fn default_poll_timeout_secs() -> u64 { DEFAULT_POLL_TIMEOUT_SECS }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }
fn default_data_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("freeapi-control")
        .join("data.json")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_data_path(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_poll_timeout_secs(),
            accept_invalid_certs: default_true(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("freeapi-control")
            .join("config.toml")
    }

    /// Load config from file, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from a specific path.
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("FREEAPI_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("FREEAPI_PORT") {
            self.server.port = port;
        }
        if let Some(backend) = env_parse("FREEAPI_STORAGE_BACKEND") {
            self.storage.backend = backend;
        }
        if let Ok(path) = std::env::var("FREEAPI_DATA_PATH") {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(secs) = env_parse("FREEAPI_POLL_TIMEOUT_SECS") {
            self.polling.timeout_secs = secs;
        }
        if let Some(accept) = env_parse("FREEAPI_ACCEPT_INVALID_CERTS") {
            self.polling.accept_invalid_certs = accept;
        }
        if let Ok(token) = std::env::var("FREEAPI_ADMIN_TOKEN") {
            self.auth.admin_token = Some(token).filter(|t| !t.is_empty());
        }
        self
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(&path, content).map_err(ConfigError::Io)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_config_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, r#"
[server]
port = 9090

[storage]
backend = "sqlite"
path = "/tmp/sites.db"

[polling]
timeout_secs = 5
accept_invalid_certs = false

[auth]
admin_token = "secret"
"#).unwrap();

        let config = Config::load_from(config_path).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/sites.db"));
        assert_eq!(config.polling.timeout_secs, 5);
        assert!(!config.polling.accept_invalid_certs);
        assert_eq!(config.auth.admin_token, Some("secret".to_string()));
    }

    #[test]
    fn returns_defaults_when_file_missing() {
        let config = Config::load_from(PathBuf::from("/nonexistent/path/config.toml")).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.polling.timeout_secs, 15);
        assert!(config.polling.accept_invalid_certs);
        assert_eq!(config.polling.user_agent, "Mozilla/5.0");
        assert_eq!(config.auth.admin_token, None);
        assert_eq!(config.logging.verbosity, LogVerbosity::Compact);
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[server\nport = ").unwrap();

        assert!(matches!(Config::load_from(config_path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn env_overrides_take_precedence_over_file() {
        std::env::remove_var("FREEAPI_POLL_TIMEOUT_SECS");

        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, r#"
[polling]
timeout_secs = 30
"#).unwrap();

        let config_from_file = Config::load_from(config_path.clone()).unwrap();
        assert_eq!(config_from_file.polling.timeout_secs, 30);

        std::env::set_var("FREEAPI_POLL_TIMEOUT_SECS", "7");
        let config = Config::load_from(config_path).unwrap().with_env_overrides();

        assert_eq!(config.polling.timeout_secs, 7);

        std::env::remove_var("FREEAPI_POLL_TIMEOUT_SECS");
    }

    #[test]
    fn ignores_unparseable_env_values() {
        std::env::set_var("FREEAPI_STORAGE_BACKEND", "mongodb");

        let config = Config::default().with_env_overrides();

        assert_eq!(config.storage.backend, StorageBackend::Json);

        std::env::remove_var("FREEAPI_STORAGE_BACKEND");
    }

    #[test]
    fn saves_config_to_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("config.toml");

        let config = Config {
            server: ServerConfig { host: "0.0.0.0".to_string(), port: 8080 },
            ..Config::default()
        };

        config.save_to(config_path.clone()).unwrap();

        let loaded = Config::load_from(config_path).unwrap();
        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.server.host, "0.0.0.0");
    }

    #[test]
    fn polling_config_maps_to_client_options() {
        let polling = PollingConfig {
            timeout_secs: 3,
            accept_invalid_certs: false,
            user_agent: "probe/1.0".to_string(),
        };

        let options = polling.client_options();

        assert_eq!(options.timeout, Duration::from_secs(3));
        assert!(!options.accept_invalid_certs);
        assert_eq!(options.user_agent, "probe/1.0");
    }

    #[test]
    fn parses_all_log_verbosity_levels() {
        let dir = tempfile::tempdir().unwrap();

        for (value, expected) in [
            ("minimal", LogVerbosity::Minimal),
            ("compact", LogVerbosity::Compact),
            ("verbose", LogVerbosity::Verbose),
        ] {
            let config_path = dir.path().join(format!("config_{}.toml", value));
            fs::write(&config_path, format!(r#"
[logging]
verbosity = "{}"
"#, value)).unwrap();

            let config = Config::load_from(config_path).unwrap();
            assert_eq!(config.logging.verbosity, expected);
        }
    }
}
