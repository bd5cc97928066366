//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod relay;
mod server;
mod storage;

pub use relay::{EnrichmentConfig, WatcherConfig};
pub use server::ServerConfig;
pub use storage::{MongodbConfig, StorageConfig, StorageType};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "GST_RELAY_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "GST_RELAY";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "GST_RELAY_LOG";

/// Legacy environment variable for the HTTP port.
pub const PORT_ENV_VAR: &str = "PORT";
/// Legacy environment variable for the MongoDB connection string.
pub const MONGO_URI_ENV_VAR: &str = "MONGO_URI";
/// Legacy environment variable for the GST service endpoint.
pub const GST_API_URL_ENV_VAR: &str = "GST_API_URL";

use serde::Deserialize;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Booking store configuration.
    pub storage: StorageConfig,
    /// GST service configuration.
    pub enrichment: EnrichmentConfig,
    /// Change feed processing configuration.
    pub watcher: WatcherConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    /// 5. Legacy `PORT`, `MONGO_URI` and `GST_API_URL` variables
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Config = config.try_deserialize()?;
        config.apply_legacy_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the plain environment variables used by earlier deployments.
    fn apply_legacy_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = lookup(PORT_ENV_VAR) {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{PORT_ENV_VAR}={port:?}")))?;
        }
        if let Some(uri) = lookup(MONGO_URI_ENV_VAR) {
            self.storage.mongodb.uri = uri;
        }
        if let Some(url) = lookup(GST_API_URL_ENV_VAR) {
            self.enrichment.url = url;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.watcher.lanes == 0 {
            return Err(ConfigError::Invalid("watcher.lanes must be at least 1".into()));
        }
        if self.enrichment.url.is_empty() {
            return Err(ConfigError::Invalid("enrichment.url is not set".into()));
        }
        Ok(())
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        let mut config = Self::default();
        config.storage.storage_type = StorageType::Memory;
        config
    }
}
