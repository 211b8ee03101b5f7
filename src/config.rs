//! Application Configuration
//!
//! Configuration is read once at startup: an optional YAML file supplies the
//! base values, environment variables override them, and the result is
//! validated before anything else is built. The finished [`AppConfig`] is
//! handed to [`AppState::from_config`](crate::app_state::AppState::from_config);
//! nothing reads the environment after that.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

pub use crate::storage::config::{StorageBackend, StorageConfig};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const MIB: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("could not parse {path}: {source}")]
    Parse { path: String, source: serde_yaml::Error },

    #[error("JWT_SECRET_KEY is not set, must be the same as the one used in the backend api")]
    MissingSecret,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub sweeper: SweeperConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Public base URL used to build asset links
    pub public_url: String,
    /// Body limit for non-multipart requests (the garbage collection list)
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            workers: 4,
            public_url: "http://localhost:9000".to_string(),
            max_body_bytes: 16 * MIB as usize,
        }
    }
}

/// Upload policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_size_bytes: u64,
    pub enforce_extensions: bool,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 100 * MIB,
            enforce_extensions: true,
            allowed_extensions: ["png", "jpg", "jpeg", "gif"].iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Token validation settings
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HMAC secret, identical to the one the backend signs with
    #[serde(skip_serializing)]
    pub secret: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &if self.secret.is_empty() { "<unset>" } else { "<redacted>" })
            .finish()
    }
}

/// Cross-origin policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `*` or a comma separated list of origins
    pub allowed_origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: "*".to_string(),
        }
    }
}

/// Staging sweeper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    pub enabled: bool,
    /// Seconds between sweeps
    pub interval_secs: u64,
    /// Staged files older than this many seconds are removed
    pub max_age_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 900,
            max_age_secs: 3600,
        }
    }
}

impl AppConfig {
    /// Load from `$ASSET_DEPOT_CONFIG` (or `config.yaml`), apply environment
    /// overrides and validate
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("ASSET_DEPOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file_or_default(&path)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file_or_default(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            warn!("Config file {} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Apply overrides from `lookup`, which maps variable names to values
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("JWT_SECRET_KEY") {
            self.auth.secret = secret;
        }
        if let Some(url) = lookup("URL") {
            self.server.public_url = url;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(origins) = lookup("CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = origins;
        }
        if let Some(dir) = lookup("STORAGE_DIRECTORY") {
            self.storage.base_path = dir;
        }
        if let Some(backend) = lookup("STORAGE_BACKEND") {
            self.storage.backend = backend.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(mb) = lookup("MAX_UPLOAD_MB") {
            let mb: u64 = parse_var("MAX_UPLOAD_MB", &mb)?;
            self.upload.max_size_bytes = mb
                .checked_mul(MIB)
                .ok_or_else(|| ConfigError::Invalid(format!("MAX_UPLOAD_MB is too large: {}", mb)))?;
        }
        if let Some(enforce) = lookup("ENFORCE_EXTENSIONS") {
            self.upload.enforce_extensions = parse_var("ENFORCE_EXTENSIONS", &enforce)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.upload.max_size_bytes == 0 {
            return Err(ConfigError::Invalid("upload.max_size_bytes must be positive".to_string()));
        }
        if self.upload.enforce_extensions && self.upload.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "upload.allowed_extensions is empty while enforce_extensions is on".to_string(),
            ));
        }
        if self.cors.allowed_origins.trim() == "*" {
            info!("CORS_ALLOWED_ORIGINS is not restricted, allowing all origins");
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} has an invalid value: {:?}", key, value)))
}
