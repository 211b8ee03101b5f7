//! Explicit removal of a single asset

use log::info;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Grant;
use crate::error::AssetError;
use crate::storage::{AssetName, AssetStore, Removal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionOutcome {
    Removed,
    AlreadyAbsent,
}

impl DeletionOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            DeletionOutcome::Removed => "image deleted successfully",
            DeletionOutcome::AlreadyAbsent => "image already absent",
        }
    }
}

pub struct DeletionService {
    store: Arc<dyn AssetStore>,
}

impl DeletionService {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    /// Remove `raw_name`. Deleting twice is not an error.
    pub fn delete(&self, grant: &Grant, raw_name: &str) -> Result<DeletionOutcome, AssetError> {
        let name = AssetName::parse(raw_name)?;

        let outcome = match self.store.remove(&name)? {
            Removal::Removed => DeletionOutcome::Removed,
            Removal::AlreadyAbsent => DeletionOutcome::AlreadyAbsent,
        };
        info!(
            "Delete of {} by {}: {:?}",
            name,
            grant.subject().unwrap_or("anonymous"),
            outcome
        );
        Ok(outcome)
    }
}
