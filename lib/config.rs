//! Configuration Model

use config::builder::DefaultState;
use config::{
    Config as ConfigRaw,
    ConfigBuilder,
    ConfigError as InnerConfigError,
    Environment,
    File,
    FileFormat,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] InnerConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainConfig {
    pub prometheus_address: Option<String>,
    pub prometheus_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub address: Option<String>,
    pub port: u16,
    pub database_uri: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_s: u64,
    pub refresh_token_ttl_s: u64,
    /// Page size used when a list request doesn't carry `take`.
    pub default_page_size: u64,
    pub recent_movies_limit: u64,
    pub recent_movies_ttl_s: u64,
    pub log_request_body: bool,
    pub log_response_body: bool,
}

#[derive(Debug, Clone, Deserialize)]
///
///
/// * `main`: Process wide settings (metrics exporter)
/// * `api`: Configuration of the API server
pub struct Config {
    pub main: MainConfig,
    pub api: ApiConfig,
}

#[derive(Debug)]
pub struct ConfigLoader {
    builder: ConfigBuilder<DefaultState>,
}

impl ConfigLoader {
    /// Loads a fresh copy of the configuration from source.
    pub fn load(&self) -> Result<Config, ConfigError> {
        Self::deserialize(self.builder.build_cloned()?)
    }

    /// Loads only the `main` section.
    pub fn load_main(&self) -> Result<MainConfig, ConfigError> {
        Ok(self.load()?.main)
    }

    /// creates a new loader configured to load the default and overlays
    /// the user supplied config (if supplied).
    ///
    /// * `config_file`: The path of the configuration file to load.
    pub fn from_path(path: &Option<String>) -> ConfigLoader {
        let raw = include_str!("default.toml");
        let mut builder =
            ConfigRaw::builder().add_source(File::from_str(raw, FileFormat::Toml));
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        // Environment goes last so it wins over files and defaults.
        builder = builder.add_source(
            Environment::with_prefix("CINEMA")
                .try_parsing(true)
                .separator("__")
                .list_separator(","),
        );
        ConfigLoader { builder }
    }

    // Sets an override that will always be applied on top of all sources.
    // Mostly useful in tests.
    pub fn set_override<K, V>(self, key: K, value: V) -> Result<Self, ConfigError>
    where
        K: AsRef<str>,
        V: Into<config::Value>,
    {
        Ok(Self {
            builder: self.builder.set_override(key, value)?,
        })
    }

    fn deserialize(config: ConfigRaw) -> Result<Config, ConfigError> {
        Ok(config.try_deserialize()?)
    }
}
