use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_DURABLE_PATH: &str = ".auth-session/durable.json";

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    /// Parsed base URL with any trailing slash removed, so endpoint paths can be appended.
    pub fn base_url(&self) -> Result<String, ConfigError> {
        let parsed = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Message(format!("invalid api.base_url {}: {}", self.base_url, e)))?;

        if parsed.cannot_be_a_base() {
            return Err(ConfigError::Message(format!(
                "api.base_url {} cannot be used as a base",
                self.base_url
            )));
        }

        Ok(parsed.as_str().trim_end_matches('/').to_string())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub durable_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default values
            .set_default("environment", "development")?
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("storage.durable_path", DEFAULT_DURABLE_PATH)?
            .set_default("logging.level", "info")?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_API__BASE_URL=https://auth.example.com/api` sets `Settings.api.base_url`
            .add_source(
                Environment::with_prefix("app")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = s.try_deserialize()?;
        settings.api.base_url()?;
        Ok(settings)
    }

    pub fn new_for_test() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("environment", "test")?
            .set_default("api.base_url", "http://127.0.0.1:3001/api")?
            .set_default("storage.durable_path", "target/test-durable.json")?
            .set_default("logging.level", "debug")?
            .build()?
            .try_deserialize()
    }
}
