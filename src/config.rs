//! TOML configuration parsing and validation.
//!
//! The configuration is read once at startup by [`load_config`] and never
//! mutated afterwards. See `config/rfp.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

/// Default model identifier for the Gemini provider.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-002";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub datastore: DatastoreConfig,
    #[serde(default)]
    pub langmodel: LangModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Store backend, selected by `kind`.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DatastoreConfig {
    Postgres(PostgresConfig),
    Sqlite(SqliteConfig),
}

#[derive(Debug, Deserialize, Clone)]
pub struct PostgresConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
fn default_pg_port() -> u16 {
    5432
}
fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LangModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Endpoint base URL override; each provider has its own default.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Caller-side retries for engine-unavailable failures only. Off by default.
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for LangModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            version: default_version(),
            url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_version() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    match &config.datastore {
        DatastoreConfig::Postgres(pg) => {
            if pg.user.trim().is_empty() {
                anyhow::bail!("datastore.user must not be empty");
            }
            if pg.database.trim().is_empty() {
                anyhow::bail!("datastore.database must not be empty");
            }
            if pg.max_connections == 0 {
                anyhow::bail!("datastore.max_connections must be >= 1");
            }
        }
        DatastoreConfig::Sqlite(sqlite) => {
            if sqlite.path.as_os_str().is_empty() {
                anyhow::bail!("datastore.path must not be empty");
            }
            if sqlite.max_connections == 0 {
                anyhow::bail!("datastore.max_connections must be >= 1");
            }
        }
    }

    if config.langmodel.version.trim().is_empty() {
        anyhow::bail!("langmodel.version must not be empty");
    }

    if config.langmodel.timeout_secs == 0 {
        anyhow::bail!("langmodel.timeout_secs must be > 0");
    }

    match config.langmodel.provider.as_str() {
        "gemini" | "openai" => {}
        other => anyhow::bail!(
            "Unknown langmodel provider: '{}'. Must be gemini or openai.",
            other
        ),
    }

    Ok(config)
}
