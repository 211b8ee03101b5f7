//! Local directory asset storage implementation

use crate::storage::config::StorageConfig;
use crate::storage::{AssetName, AssetStore, Removal};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Assets are plain files in `root`; uploads are written into `staging`
/// first and renamed into place once complete.
pub struct LocalAssetStore {
    root: PathBuf,
    staging: PathBuf,
}

impl LocalAssetStore {
    pub fn open(config: &StorageConfig) -> io::Result<Self> {
        let root = config.base_dir();
        let staging = config.staging_dir();

        fs::create_dir_all(&root)?;
        fs::create_dir_all(&staging)?;
        info!("Using asset directory {} with staging area {}", root.display(), staging.display());

        Ok(Self { root, staging })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn asset_path(&self, name: &AssetName) -> PathBuf {
        self.root.join(name.as_str())
    }

    fn staging_file(&self) -> PathBuf {
        self.staging.join(format!("{}.partial", Uuid::new_v4()))
    }

    fn write_staged(&self, staged: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(staged)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(staged, target)
    }
}

impl AssetStore for LocalAssetStore {
    fn write_new(&self, name: &AssetName, data: &[u8]) -> io::Result<()> {
        let staged = self.staging_file();
        let target = self.asset_path(name);

        if let Err(e) = self.write_staged(&staged, &target, data) {
            warn!("Failed to store {}: {}", name, e);
            if let Err(cleanup) = fs::remove_file(&staged) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!("Could not remove staged file {}: {}", staged.display(), cleanup);
                }
            }
            return Err(e);
        }

        debug!("Stored {} ({} bytes)", name, data.len());
        Ok(())
    }

    fn remove(&self, name: &AssetName) -> io::Result<Removal> {
        match fs::remove_file(self.asset_path(name)) {
            Ok(()) => Ok(Removal::Removed),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Removal::AlreadyAbsent),
            Err(e) => Err(e),
        }
    }

    fn list_names(&self) -> io::Result<BTreeSet<AssetName>> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(raw) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping non UTF-8 entry {:?}", entry.file_name());
                continue;
            };
            match AssetName::parse(&raw) {
                Ok(name) => {
                    names.insert(name);
                }
                Err(_) if raw.starts_with('.') => debug!("Skipping hidden entry {:?}", raw),
                Err(e) => warn!("Skipping {:?}, not a valid asset name: {}", raw, e),
            }
        }
        Ok(names)
    }

    fn purge_stale_staging(&self, max_age: Duration) -> io::Result<usize> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let now = Utc::now();
        let mut purged = 0;

        for entry in fs::read_dir(&self.staging)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let modified: DateTime<Utc> = metadata.modified()?.into();
            if now.signed_duration_since(modified) <= max_age {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => purged += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(purged)
    }
}
