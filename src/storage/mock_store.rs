//! In-memory implementation of AssetStore for testing

use crate::storage::{AssetName, AssetStore, Removal};
use log::info;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mock implementation of AssetStore for testing
#[derive(Default)]
pub struct MockAssetStore {
    assets: Mutex<BTreeMap<AssetName, Vec<u8>>>,
    // Names whose removal should fail, to exercise partial sweeps
    failing_removals: Mutex<HashSet<String>>,
}

impl MockAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn assets(&self) -> MutexGuard<'_, BTreeMap<AssetName, Vec<u8>>> {
        self.assets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an asset directly, bypassing any upload policy
    pub fn insert(&self, name: &str, data: &[u8]) -> io::Result<()> {
        let name = AssetName::parse(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.assets().insert(name, data.to_vec());
        Ok(())
    }

    /// Get the stored bytes of an asset
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.assets()
            .iter()
            .find(|(stored, _)| stored.as_str() == name)
            .map(|(_, data)| data.clone())
    }

    /// Get the number of assets in the store
    pub fn len(&self) -> usize {
        self.assets().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets().is_empty()
    }

    /// Make every later removal of `name` fail with an I/O error
    pub fn fail_removal_of(&self, name: &str) {
        self.failing_removals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());
    }
}

impl AssetStore for MockAssetStore {
    fn write_new(&self, name: &AssetName, data: &[u8]) -> io::Result<()> {
        self.assets().insert(name.clone(), data.to_vec());
        info!("Mock: stored {} with size {}", name, data.len());
        Ok(())
    }

    fn remove(&self, name: &AssetName) -> io::Result<Removal> {
        let failing = self
            .failing_removals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name.as_str());
        if failing {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, format!("mock refused to remove {}", name)));
        }

        Ok(match self.assets().remove(name) {
            Some(_) => Removal::Removed,
            None => Removal::AlreadyAbsent,
        })
    }

    fn list_names(&self) -> io::Result<BTreeSet<AssetName>> {
        Ok(self.assets().keys().cloned().collect())
    }
}
