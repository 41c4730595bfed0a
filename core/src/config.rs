use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::{ClientError, Result};

/// Main configuration for the ProofAI client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(Default)]
pub struct Config {
    pub service: ServiceConfig,
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Production configuration with conservative timeouts
    pub fn production() -> Self {
        Self {
            service: ServiceConfig::production(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::production(),
        }
    }

    /// Development configuration with short timeouts for a local service
    pub fn development() -> Self {
        Self {
            service: ServiceConfig::development(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::development(),
        }
    }

    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&config_str)?;

        config.apply_env_overrides();

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("PROOFAI_API_URL") {
            self.service.api_base_url = url;
        }

        if let Ok(secs) = std::env::var("PROOFAI_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                self.service.request_timeout_secs = secs;
            }
        }

        if let Ok(secs) = std::env::var("PROOFAI_PROBE_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                self.service.probe_timeout_secs = secs;
            }
        }

        if let Ok(path) = std::env::var("PROOFAI_DATA_DIR") {
            self.storage.data_directory = PathBuf::from(path);
        }
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        self.service.validate().map_err(ClientError::Config)?;
        self.gateway.validate().map_err(ClientError::Config)?;
        self.storage.validate().map_err(ClientError::Config)?;
        Ok(())
    }
}

/// Local ProofAI service (the `/api` surface)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            request_timeout_secs: 30,
            probe_timeout_secs: 5,
        }
    }
}

impl ServiceConfig {
    pub fn production() -> Self {
        Self {
            // Model execution on the service can hold newTransaction open for a while
            request_timeout_secs: 120,
            probe_timeout_secs: 10,
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            request_timeout_secs: 10,
            probe_timeout_secs: 2,
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(format!("API base URL must be http(s): {}", self.api_base_url));
        }
        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }
        if self.probe_timeout_secs == 0 {
            return Err("Probe timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Storage gateway routes, relative to the resolved service machine address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub probe_route: String,
    pub upload_route: String,
    pub fetch_route: String,
    pub max_upload_bytes: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            probe_route: "/fetch".to_string(),
            upload_route: "/upload".to_string(),
            fetch_route: "/fetch".to_string(),
            max_upload_bytes: 5 * 1024 * 1024 * 1024, // gateway multipart limit
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        for route in [&self.probe_route, &self.upload_route, &self.fetch_route] {
            if !route.starts_with('/') {
                return Err(format!("Gateway route must start with '/': {route}"));
            }
        }
        if self.max_upload_bytes == 0 {
            return Err("Max upload size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Client-side durable state ("remember me" credentials)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub credentials_tree: String,
    /// Keep remembered credentials in memory only
    pub ephemeral: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("./proofai-data"),
            credentials_tree: "credentials".to_string(),
            ephemeral: false,
        }
    }
}

impl StorageConfig {
    pub fn production() -> Self {
        Self {
            data_directory: PathBuf::from("./proofai-data"),
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            data_directory: PathBuf::from("./proofai-dev-data"),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.data_directory.as_os_str().is_empty() {
            return Err("Data directory cannot be empty".to_string());
        }
        if self.credentials_tree.trim().is_empty() {
            return Err("Credentials tree name cannot be empty".to_string());
        }
        Ok(())
    }
}
