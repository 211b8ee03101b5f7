//! Application State Management
//!
//! This module provides the application state that contains all services
//! and their dependencies, following the dependency injection pattern.

use log::info;
use std::io;
use std::sync::Arc;

use crate::auth::TokenValidator;
use crate::config::{AppConfig, StorageBackend};
use crate::service::collector::GarbageCollector;
use crate::service::deletion_service::DeletionService;
use crate::service::ingest_service::IngestService;
use crate::service::staging_sweeper::StagingSweeper;
use crate::storage::mock_store::MockAssetStore;
use crate::storage::AssetStore;

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<TokenValidator>,
    pub ingest_service: Arc<IngestService>,
    pub deletion_service: Arc<DeletionService>,
    pub collector: Arc<GarbageCollector>,
    pub store: Arc<dyn AssetStore>,
    pub config: AppConfig,
}

impl AppState {
    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> io::Result<Self> {
        info!("Initializing application state with configuration");

        let store = config.storage.create_store()?;
        match config.storage.backend {
            StorageBackend::Local => info!("Using local storage backend at {}", config.storage.base_path),
            StorageBackend::Mock => info!("Using mock storage backend, assets will not be persisted"),
        }

        let state = Self::with_store(config, store);
        info!("Application state initialized successfully");
        Ok(state)
    }

    /// Wire the services around an already constructed store
    pub fn with_store(config: AppConfig, store: Arc<dyn AssetStore>) -> Self {
        let validator = Arc::new(TokenValidator::new(&config.auth.secret));
        let ingest_service = Arc::new(IngestService::new(
            Arc::clone(&store),
            config.upload.clone(),
            &config.server.public_url,
        ));
        let deletion_service = Arc::new(DeletionService::new(Arc::clone(&store)));
        let collector = Arc::new(GarbageCollector::new(Arc::clone(&store)));

        Self {
            validator,
            ingest_service,
            deletion_service,
            collector,
            store,
            config,
        }
    }

    /// Create application state for testing with the in-memory store
    pub fn new_for_testing(secret: &str) -> (Self, Arc<MockAssetStore>) {
        let mut config = AppConfig::default();
        config.auth.secret = secret.to_string();
        config.storage.backend = StorageBackend::Mock;

        let store = Arc::new(MockAssetStore::new());
        (Self::with_store(config, store.clone()), store)
    }

    /// The staging sweeper for this state's store, if enabled
    pub fn staging_sweeper(&self) -> Option<StagingSweeper> {
        self.config
            .sweeper
            .enabled
            .then(|| StagingSweeper::new(Arc::clone(&self.store), &self.config.sweeper))
    }
}
