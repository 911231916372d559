// Configuration loading and parsing (config.toml).
//
// The file lives in the platform config directory. Every key is optional; a
// missing file is replaced by a commented template on first run.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to write default config to {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not determine the platform config directory")]
    NoProjectDirs,
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    /// SQLite file backing the secure store.
    pub store_path: PathBuf,
    /// Directory the log file is written to.
    pub log_dir: PathBuf,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Per-request timeout. `None` means requests may wait indefinitely.
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Whether the local unlock check is available at all. When false the
    /// lock screen always lets the user straight through.
    pub enabled: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig { enabled: true }
    }
}

// ---------------------------------------------------------------------------
// config.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    gateway: GatewayConfig,
    auth: AuthConfig,
    storage: StorageSection,
    logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StorageSection {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LoggingSection {
    dir: Option<PathBuf>,
    filter: Option<String>,
}

pub const DEFAULT_LOG_FILTER: &str = "companion=info,warn";
pub const CONFIG_FILE_NAME: &str = "config.toml";
const STORE_FILE_NAME: &str = "secure.db";

/// Written to disk the first time the companion runs.
pub const DEFAULT_CONFIG_TOML: &str = r#"# OpenClaw Companion configuration.

[gateway]
# Seconds before a chat or health request is abandoned. Leave unset to wait
# for as long as the gateway takes.
# request_timeout_secs = 30

[auth]
# Require the unlock passcode (when one is enrolled) before opening the chat.
enabled = true

[storage]
# SQLite file holding the gateway URL, token, and unlock passcode.
# path = "/path/to/secure.db"

[logging]
# dir = "/path/to/logs"
# filter = "companion=debug,warn"
"#;

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load configuration from `config_path`, resolving default storage and log
/// locations under `data_dir`. A missing file yields the defaults.
pub fn load_config_from(config_path: &Path, data_dir: &Path) -> Result<Config, ConfigError> {
    let file = if config_path.exists() {
        let text = read_file(config_path)?;
        toml::from_str::<ConfigFile>(&text).map_err(|e| ConfigError::ParseError {
            path: config_path.to_path_buf(),
            source: e,
        })?
    } else {
        ConfigFile::default()
    };

    let config = Config {
        gateway: file.gateway,
        auth: file.auth,
        store_path: file
            .storage
            .path
            .unwrap_or_else(|| data_dir.join(STORE_FILE_NAME)),
        log_dir: file.logging.dir.unwrap_or_else(|| data_dir.join("logs")),
        log_filter: file
            .logging
            .filter
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
    };

    validate(&config)?;
    Ok(config)
}

/// Write the commented template to `config_path` unless a file is already
/// there. Returns whether a file was written.
pub fn ensure_config_file(config_path: &Path) -> Result<bool, ConfigError> {
    if config_path.exists() {
        return Ok(false);
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(config_path, DEFAULT_CONFIG_TOML).map_err(|e| ConfigError::WriteError {
        path: config_path.to_path_buf(),
        source: e,
    })?;
    Ok(true)
}

/// Convenience wrapper: loads config from the platform directories, writing
/// the template on first run.
pub fn load_config() -> Result<Config, ConfigError> {
    let dirs = project_dirs()?;
    let config_path = dirs.config_dir().join(CONFIG_FILE_NAME);
    ensure_config_file(&config_path)?;
    load_config_from(&config_path, dirs.data_dir())
}

pub fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("dev", "openclaw", "companion").ok_or(ConfigError::NoProjectDirs)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.gateway.request_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError {
            field: "gateway.request_timeout_secs".into(),
            message: "must be greater than 0 (omit it to disable the timeout)".into(),
        });
    }

    if config.store_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "storage.path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.log_filter.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.filter".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
