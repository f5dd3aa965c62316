//! ideashare/crates/configs/src/lib.rs
//!
//! Layered settings: built-in defaults, then `config/default.toml`, then
//! `config/{IDEASHARE_ENV}.toml`, then `IDEASHARE__SECTION__KEY` variables.
//! A `.env` file is loaded first when present.

use std::net::SocketAddr;
use std::time::Duration;

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const ENV_PREFIX: &str = "IDEASHARE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid { key, reason: reason.into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub listing: ListingSettings,
    pub retry: RetrySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::invalid("server.host", format!("{e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: SecretString,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// HS256 shared secret of the identity provider
    pub jwt_secret: SecretString,
    pub audience: Option<String>,
    #[serde(default)]
    pub admin_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListingSettings {
    pub page_size: u32,
    pub reference_cache_ttl_secs: u64,
}

impl ListingSettings {
    pub fn reference_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.reference_cache_ttl_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    pub format: LogFormat,
    /// `EnvFilter` directives; `RUST_LOG` wins when unset
    pub filter: Option<String>,
}

impl Settings {
    /// Reads `.env`, config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        let env_name = std::env::var(format!("{ENV_PREFIX}_ENV")).unwrap_or_else(|_| "development".into());

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env_name}")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.admin_ids")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    /// Built-in defaults. Everything except `auth.jwt_secret` has one.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("storage.backend", "memory")?
            .set_default("database.url", "postgres://localhost/ideashare")?
            .set_default("database.max_connections", 10)?
            .set_default("database.run_migrations", true)?
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.admin_ids", Vec::<String>::new())?
            .set_default("listing.page_size", 6)?
            .set_default("listing.reference_cache_ttl_secs", 300)?
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.base_delay_ms", 1000)?
            .set_default("retry.max_delay_ms", 8000)?
            .set_default("logging.format", "json")?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listing.page_size == 0 {
            return Err(ConfigError::invalid("listing.page_size", "must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::invalid("retry.max_delay_ms", "must not be below base_delay_ms"));
        }
        if self.auth.jwt_secret.expose_secret().is_empty() {
            return Err(ConfigError::invalid("auth.jwt_secret", "must be set"));
        }
        if self.storage.backend == StorageBackend::Postgres && self.database.url.expose_secret().is_empty() {
            return Err(ConfigError::invalid("database.url", "required for the postgres backend"));
        }
        self.server.socket_addr()?;
        Ok(())
    }
}
