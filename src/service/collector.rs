//! Mark-and-sweep reconciliation of the stored set against the active set
//!
//! The backend periodically reports every asset name it still references.
//! Anything stored but not reported is an orphan and gets removed. The set
//! arithmetic lives in [`compute_orphans`]; [`GarbageCollector::collect`] only
//! adds the I/O around it.

use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::auth::Grant;
use crate::error::AssetError;
use crate::storage::{AssetName, AssetStore, Removal};

/// Names in `stored` that are not in `active`
pub fn compute_orphans(stored: &BTreeSet<AssetName>, active: &BTreeSet<AssetName>) -> BTreeSet<AssetName> {
    stored.difference(active).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionReport {
    /// True when no usable active name was reported and nothing was examined
    pub skipped: bool,
    pub removed: Vec<AssetName>,
}

impl CollectionReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            removed: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.removed.len()
    }

    pub fn message(&self) -> &'static str {
        if self.skipped {
            "no active images"
        } else {
            "garbage collect complete"
        }
    }
}

pub struct GarbageCollector {
    store: Arc<dyn AssetStore>,
}

impl GarbageCollector {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    /// Remove every stored asset missing from `active`.
    ///
    /// An empty `active` set does nothing, and neither does one holding only
    /// names that could never be stored. A failed removal stops the sweep;
    /// whatever was removed before it stays removed.
    pub fn collect<I, S>(&self, grant: &Grant, active: I) -> Result<CollectionReport, AssetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut active_names = BTreeSet::new();
        for raw in active {
            match AssetName::parse(raw.as_ref()) {
                Ok(name) => {
                    active_names.insert(name);
                }
                // Cannot name a stored asset, so it cannot protect one either.
                Err(e) => debug!("Ignoring active entry: {}", e),
            }
        }

        if active_names.is_empty() {
            info!("Garbage collection skipped: no active images reported");
            return Ok(CollectionReport::skipped());
        }

        let stored = self.store.list_names()?;
        let orphans = compute_orphans(&stored, &active_names);
        info!(
            "Garbage collection by {}: {} stored, {} active, {} orphaned",
            grant.subject().unwrap_or("anonymous"),
            stored.len(),
            active_names.len(),
            orphans.len()
        );

        let mut removed = Vec::with_capacity(orphans.len());
        for orphan in orphans {
            match self.store.remove(&orphan) {
                Ok(Removal::Removed) => removed.push(orphan),
                Ok(Removal::AlreadyAbsent) => {
                    warn!("Orphan {} vanished before it could be removed", orphan);
                    removed.push(orphan);
                }
                Err(e) => {
                    error!("Garbage collection aborted at {} after {} removals: {}", orphan, removed.len(), e);
                    return Err(e.into());
                }
            }
        }

        info!("Garbage collection removed {} images", removed.len());
        Ok(CollectionReport {
            skipped: false,
            removed,
        })
    }
}
