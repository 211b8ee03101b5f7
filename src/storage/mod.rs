//! Asset Storage Layer Abstraction
//!
//! This module provides an abstraction over the directory that holds the
//! assets. The directory listing is the only record of what exists: there is
//! no index, and an asset is live exactly as long as its file is present.

pub mod config;
pub mod local_store;
pub mod mock_store;


use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::time::Duration;

use crate::error::ValidationError;

const MAX_NAME_LEN: usize = 255;

/// Trait defining the asset storage interface
pub trait AssetStore: Send + Sync {
    /// Persist a new asset. Readers never observe a partially written file.
    fn write_new(&self, name: &AssetName, data: &[u8]) -> io::Result<()>;

    /// Remove an asset. An absent name is not an error.
    fn remove(&self, name: &AssetName) -> io::Result<Removal>;

    /// Names of every asset currently stored. Entries that are not valid
    /// asset names (non UTF-8, dot-prefixed, ...) are not listed, so garbage
    /// collection never touches them.
    fn list_names(&self) -> io::Result<BTreeSet<AssetName>>;

    /// Drop leftovers of interrupted writes older than `max_age`, returning
    /// how many were removed. Backends without a staging area have none.
    fn purge_stale_staging(&self, _max_age: Duration) -> io::Result<usize> {
        Ok(0)
    }
}

/// What `remove` found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    AlreadyAbsent,
}

/// A name accepted at the store boundary.
///
/// Bare file names only: no separators, no `.`/`..`, no leading dot (dot
/// files belong to the store itself), nothing that could resolve outside the
/// asset directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AssetName(String);

impl AssetName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let reject = |why: &str| ValidationError::InvalidName(format!("{:?} {}", raw, why));

        if raw.is_empty() {
            return Err(reject("is empty"));
        }
        if raw.len() > MAX_NAME_LEN {
            return Err(reject("is too long"));
        }
        if raw.contains(['/', '\\', '\0']) {
            return Err(reject("contains a path separator"));
        }
        if raw == "." || raw == ".." {
            return Err(reject("is a directory reference"));
        }
        if raw.starts_with('.') {
            return Err(reject("starts with a dot"));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
