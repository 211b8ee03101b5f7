//! Background sweeper for interrupted uploads
//!
//! Uploads are written to the staging area and renamed into place. A crash
//! between the two leaves a partial file behind; this worker runs
//! periodically and deletes staged files older than the configured age.

use crate::config::SweeperConfig;
use crate::storage::AssetStore;
use log::{debug, error, info};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

pub struct StagingSweeper {
    store: Arc<dyn AssetStore>,
    interval: Duration,
    max_age: Duration,
}

impl StagingSweeper {
    pub fn new(store: Arc<dyn AssetStore>, config: &SweeperConfig) -> Self {
        Self {
            store,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            max_age: Duration::from_secs(config.max_age_secs),
        }
    }

    /// Start the sweeper (runs until the runtime shuts down)
    pub async fn run(self) {
        info!(
            "Starting staging sweeper with {}s interval, max age {}s",
            self.interval.as_secs(),
            self.max_age.as_secs()
        );

        let mut interval = time::interval(self.interval);
        loop {
            interval.tick().await;

            if let Err(e) = self.sweep_once().await {
                error!("Error sweeping staging area: {}", e);
            }
        }
    }

    /// One pass over the staging area, off the async executor
    pub async fn sweep_once(&self) -> io::Result<usize> {
        let store = Arc::clone(&self.store);
        let max_age = self.max_age;

        let purged = tokio::task::spawn_blocking(move || store.purge_stale_staging(max_age))
            .await
            .map_err(io::Error::other)??;

        if purged > 0 {
            info!("Purged {} stale staged uploads", purged);
        } else {
            debug!("No stale staged uploads");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::config::StorageConfig;
    use crate::storage::local_store::LocalAssetStore;
    use crate::storage::mock_store::MockAssetStore;
    use std::fs::File;
    use std::time::SystemTime;

    #[tokio::test]
    async fn test_sweep_once_removes_only_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            base_path: dir.path().join("images").to_string_lossy().into_owned(),
            ..Default::default()
        };
        let store = Arc::new(LocalAssetStore::open(&storage).unwrap());
        let staging = storage.staging_dir();

        let stale = File::create(staging.join("stale.partial")).unwrap();
        stale
            .set_modified(SystemTime::now() - Duration::from_secs(600))
            .unwrap();
        File::create(staging.join("live.partial")).unwrap();

        let config = SweeperConfig {
            enabled: true,
            interval_secs: 60,
            max_age_secs: 300,
        };
        let sweeper = StagingSweeper::new(store, &config);

        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
        assert!(!staging.join("stale.partial").exists());
        assert!(staging.join("live.partial").exists());
    }

    #[tokio::test]
    async fn test_sweep_once_on_mock_store() {
        let sweeper = StagingSweeper::new(Arc::new(MockAssetStore::new()), &SweeperConfig::default());
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    }
}
