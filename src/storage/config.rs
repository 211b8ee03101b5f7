//! Configuration for asset storage backends

use crate::storage::{local_store::LocalAssetStore, mock_store::MockAssetStore, AssetStore};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

const STAGING_DIR_NAME: &str = ".staging";

/// Available asset storage backends
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Mock,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "fs" | "filesystem" => Ok(StorageBackend::Local),
            "mock" | "memory" => Ok(StorageBackend::Mock),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend type
    pub backend: StorageBackend,
    /// Directory holding the assets, also served under `/images`
    pub base_path: String,
    /// Directory for in-flight uploads. Must be on the same filesystem as
    /// `base_path`; defaults to a dot-directory inside it.
    pub staging_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            base_path: "./images".to_string(),
            staging_path: None,
        }
    }
}

impl StorageConfig {
    pub fn base_dir(&self) -> PathBuf {
        PathBuf::from(&self.base_path)
    }

    pub fn staging_dir(&self) -> PathBuf {
        match &self.staging_path {
            Some(path) => PathBuf::from(path),
            None => self.base_dir().join(STAGING_DIR_NAME),
        }
    }

    /// Create a storage instance based on the configuration
    pub fn create_store(&self) -> io::Result<Arc<dyn AssetStore>> {
        Ok(match self.backend {
            StorageBackend::Local => Arc::new(LocalAssetStore::open(self)?),
            StorageBackend::Mock => Arc::new(MockAssetStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("local".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert_eq!("LOCAL".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert_eq!("fs".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert_eq!("mock".parse::<StorageBackend>().unwrap(), StorageBackend::Mock);
        assert_eq!("Memory".parse::<StorageBackend>().unwrap(), StorageBackend::Mock);

        assert!("s3".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_staging_defaults_inside_base() {
        let config = StorageConfig {
            base_path: "/srv/images".to_string(),
            ..Default::default()
        };
        assert_eq!(config.staging_dir(), PathBuf::from("/srv/images/.staging"));

        let explicit = StorageConfig {
            staging_path: Some("/srv/tmp".to_string()),
            ..config
        };
        assert_eq!(explicit.staging_dir(), PathBuf::from("/srv/tmp"));
    }

    #[test]
    fn test_create_store() {
        let dir = tempfile::tempdir().unwrap();
        let local_config = StorageConfig {
            base_path: dir.path().join("images").to_string_lossy().into_owned(),
            ..Default::default()
        };
        let mock_config = StorageConfig {
            backend: StorageBackend::Mock,
            ..Default::default()
        };

        let local = local_config.create_store().unwrap();
        let mock = mock_config.create_store().unwrap();

        assert!(local.list_names().unwrap().is_empty());
        assert!(mock.list_names().unwrap().is_empty());
        assert!(local_config.staging_dir().is_dir());
    }
}
