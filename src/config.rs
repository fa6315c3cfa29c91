//! Configuration management

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Environment variable that points at an alternative config file
pub const CONFIG_PATH_ENV: &str = "VISITOR_LOG_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub geolocation: GeolocationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Path of the JSON Lines log (file backend only)
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ipapi,
    Ipinfo,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Ipapi => "https://ipapi.co",
            Provider::Ipinfo => "https://ipinfo.io",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeolocationConfig {
    pub provider: Provider,
    /// Overrides the provider's public endpoint (e.g. a self-hosted mirror)
    #[serde(default)]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Skip the outbound call for private, loopback and reserved addresses
    pub skip_private: bool,
}

impl GeolocationConfig {
    pub fn base_url(&self) -> &str {
        match self.base_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => self.provider.default_base_url(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());

        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.http_port", 3000)?
            .set_default("storage.backend", "file")?
            .set_default("storage.path", "logs.txt")?
            .set_default("geolocation.provider", "ipapi")?
            .set_default("geolocation.timeout_secs", 5)?
            .set_default("geolocation.skip_private", true)?
            .set_default("logging.level", "info")?
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("VISITOR_LOG")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings = builder.build()?;
        let config: Config = settings.try_deserialize()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.http_port == 0 {
            anyhow::bail!("Invalid http_port: 0 is not allowed");
        }
        if self.server.host.is_empty() {
            anyhow::bail!("Server host cannot be empty");
        }

        if self.storage.backend == StorageBackend::File && self.storage.path.is_empty() {
            anyhow::bail!("Storage path cannot be empty for the file backend");
        }

        if !(1..=30).contains(&self.geolocation.timeout_secs) {
            anyhow::bail!(
                "Invalid geolocation timeout {}s. Must be between 1 and 30",
                self.geolocation.timeout_secs
            );
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid logging level '{}'. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}
