//! Configuration loading and resolution
//!
//! Settings come from a TOML bootstrap file. The file path is resolved in
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. `INTAKE_CONFIG` environment variable
//! 3. `~/.config/portal-intake/config.toml`
//! 4. `/etc/portal-intake/config.toml`
//!
//! A missing file is not fatal: a warning is logged and compiled defaults are
//! used. The upstream listing URL has no default, so [`Settings::resolve`]
//! fails when neither the file nor an override supplies it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "INTAKE_CONFIG";

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_COLLECTION_TTL_MINUTES: u64 = 1440;
pub const DEFAULT_INTAKE_TOKEN_TTL_MINUTES: u64 = 30;
pub const DEFAULT_REFRESH_LATEST_INSPECTION_URL: &str =
    "https://app.dhi-portal.net/customers/refreshLatestInspection";

const APP_DIR: &str = "portal-intake";

/// Contents of the TOML bootstrap file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Legacy portal endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_latest_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_latest_inspection_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_collection_ttl")]
    pub collection_ttl_minutes: u64,

    #[serde(default = "default_intake_token_ttl")]
    pub intake_token_ttl_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            collection_ttl_minutes: DEFAULT_COLLECTION_TTL_MINUTES,
            intake_token_ttl_minutes: DEFAULT_INTAKE_TOKEN_TTL_MINUTES,
        }
    }
}

fn default_collection_ttl() -> u64 {
    DEFAULT_COLLECTION_TTL_MINUTES
}

fn default_intake_token_ttl() -> u64 {
    DEFAULT_INTAKE_TOKEN_TTL_MINUTES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Pick the config file to read, or `None` when no candidate exists
///
/// An explicit path (CLI or environment) is returned even if it does not
/// exist so the caller can warn about it.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Load the bootstrap config, degrading to defaults when no file is found
///
/// A file that exists but fails to parse is an error.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = resolve_config_path(cli_arg) else {
        warn!("No config file found, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using compiled defaults");
        return Ok(TomlConfig::default());
    }

    let config = TomlConfig::load(&path)?;
    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR).join("intake.db"))
        .unwrap_or_else(|| PathBuf::from("./intake.db"))
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub database_path: PathBuf,
    pub customer_latest_url: String,
    pub refresh_latest_inspection_url: String,
    pub collection_ttl: Duration,
    pub intake_token_ttl: Duration,
    pub log_level: String,
}

impl Settings {
    /// Merge the file contents with command-line overrides
    pub fn resolve(
        config: TomlConfig,
        port_override: Option<u16>,
        database_override: Option<PathBuf>,
    ) -> Result<Self> {
        let customer_latest_url = config
            .upstream
            .customer_latest_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                Error::Config("upstream.customer_latest_url is not configured".to_string())
            })?;

        if config.cache.collection_ttl_minutes == 0 || config.cache.intake_token_ttl_minutes == 0 {
            return Err(Error::Config("cache TTLs must be at least one minute".to_string()));
        }

        Ok(Self {
            port: port_override.or(config.port).unwrap_or(DEFAULT_PORT),
            database_path: database_override
                .or(config.database_path)
                .unwrap_or_else(default_database_path),
            customer_latest_url,
            refresh_latest_inspection_url: config
                .upstream
                .refresh_latest_inspection_url
                .unwrap_or_else(|| DEFAULT_REFRESH_LATEST_INSPECTION_URL.to_string()),
            collection_ttl: Duration::from_secs(config.cache.collection_ttl_minutes * 60),
            intake_token_ttl: Duration::from_secs(config.cache.intake_token_ttl_minutes * 60),
            log_level: config.logging.level,
        })
    }
}
