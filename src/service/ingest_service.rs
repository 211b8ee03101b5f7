//! Upload pipeline: policy checks, naming and persistence of new assets

use bytes::Bytes;
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::auth::Grant;
use crate::config::UploadConfig;
use crate::error::{AssetError, ValidationError};
use crate::service::naming::{extract_extension, generate_name};
use crate::storage::{AssetName, AssetStore};

const MIB: f64 = 1024.0 * 1024.0;

/// A file received from a client, not yet accepted
#[derive(Debug, Clone)]
pub struct IncomingAsset {
    pub original_filename: String,
    /// Headers of the multipart part, echoed back to the client
    pub content_headers: BTreeMap<String, Vec<String>>,
    pub data: Bytes,
}

/// What the client gets back for a stored upload
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub image_name: AssetName,
    pub image_url: String,
    pub header: BTreeMap<String, Vec<String>>,
    pub size: u64,
}

pub struct IngestService {
    store: Arc<dyn AssetStore>,
    policy: UploadConfig,
    base_url: String,
}

impl IngestService {
    pub fn new(store: Arc<dyn AssetStore>, policy: UploadConfig, base_url: &str) -> Self {
        Self {
            store,
            policy,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn max_size(&self) -> u64 {
        self.policy.max_size_bytes
    }

    pub fn check_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.policy.max_size_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size,
                limit: self.policy.max_size_bytes,
            });
        }
        Ok(())
    }

    /// Extension of `original_filename`, if the policy accepts it
    pub fn check_extension(&self, original_filename: &str) -> Result<String, ValidationError> {
        let extension = extract_extension(original_filename)?;
        if self.policy.enforce_extensions
            && !self.policy.allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&extension))
        {
            return Err(ValidationError::UnsupportedMediaType(extension));
        }
        Ok(extension)
    }

    pub fn asset_url(&self, name: &AssetName) -> String {
        format!("{}/images/{}", self.base_url, name)
    }

    pub fn upload(&self, grant: &Grant, incoming: IncomingAsset) -> Result<AssetMetadata, AssetError> {
        let size = incoming.data.len() as u64;
        self.check_size(size)?;
        if size == 0 {
            return Err(ValidationError::EmptyUpload.into());
        }
        let extension = self.check_extension(&incoming.original_filename)?;

        let name = generate_name(&extension)?;
        self.store.write_new(&name, &incoming.data)?;
        info!(
            "Stored upload {} as {} ({}) for {}",
            incoming.original_filename,
            name,
            format_size(size),
            grant.subject().unwrap_or("anonymous")
        );

        let metadata = AssetMetadata {
            image_url: self.asset_url(&name),
            image_name: name,
            header: incoming.content_headers,
            size,
        };
        debug!("Upload metadata: {:?}", metadata);
        Ok(metadata)
    }
}

/// Human readable size: MB above one mebibyte, KB below
pub fn format_size(bytes: u64) -> String {
    let mb = bytes as f64 / MIB;
    if mb > 1.0 {
        format!("{:.2} MB", mb)
    } else {
        format!("{:.2} KB", mb * 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock_store::MockAssetStore;

    fn policy(max_size_bytes: u64, enforce_extensions: bool) -> UploadConfig {
        UploadConfig {
            max_size_bytes,
            enforce_extensions,
            ..Default::default()
        }
    }

    fn incoming(filename: &str, data: &'static [u8]) -> IncomingAsset {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), vec!["image/png".to_string()]);
        IncomingAsset {
            original_filename: filename.to_string(),
            content_headers: headers,
            data: Bytes::from_static(data),
        }
    }

    fn service(store: &Arc<MockAssetStore>, policy: UploadConfig) -> IngestService {
        IngestService::new(store.clone(), policy, "http://cdn.example.com/")
    }

    #[test]
    fn test_upload_stores_bytes_and_reports_metadata() {
        let store = Arc::new(MockAssetStore::new());
        let service = service(&store, policy(1024, true));

        let metadata = service.upload(&Grant::for_tests(), incoming("photo.PNG", b"0123456789")).unwrap();

        assert!(metadata.image_name.as_str().ends_with(".png"));
        assert_eq!(metadata.size, 10);
        assert_eq!(
            metadata.image_url,
            format!("http://cdn.example.com/images/{}", metadata.image_name)
        );
        assert_eq!(metadata.header["content-type"], vec!["image/png".to_string()]);
        assert_eq!(store.contents(metadata.image_name.as_str()).unwrap(), b"0123456789");
    }

    #[test]
    fn test_oversized_upload_rejected_without_write() {
        let store = Arc::new(MockAssetStore::new());
        let service = service(&store, policy(9, true));

        let err = service.upload(&Grant::for_tests(), incoming("photo.png", b"0123456789")).unwrap_err();

        assert!(matches!(
            err,
            AssetError::Validation(ValidationError::PayloadTooLarge { size: 10, limit: 9 })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_size_exactly_at_limit_accepted() {
        let store = Arc::new(MockAssetStore::new());
        let service = service(&store, policy(10, true));

        assert!(service.upload(&Grant::for_tests(), incoming("photo.png", b"0123456789")).is_ok());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_extension_policy() {
        let store = Arc::new(MockAssetStore::new());
        let strict = service(&store, policy(1024, true));

        let err = strict.upload(&Grant::for_tests(), incoming("notes.txt", b"hello")).unwrap_err();
        assert!(matches!(err, AssetError::Validation(ValidationError::UnsupportedMediaType(ref ext)) if ext == "txt"));
        assert!(store.is_empty());

        for name in ["a.png", "b.JPG", "c.jpeg", "d.gif"] {
            assert!(strict.check_extension(name).is_ok(), "{}", name);
        }

        let relaxed = service(&store, policy(1024, false));
        let metadata = relaxed.upload(&Grant::for_tests(), incoming("notes.txt", b"hello")).unwrap();
        assert!(metadata.image_name.as_str().ends_with(".txt"));
    }

    #[test]
    fn test_missing_extension_and_empty_upload() {
        let store = Arc::new(MockAssetStore::new());
        let service = service(&store, policy(1024, false));

        let err = service.upload(&Grant::for_tests(), incoming("README", b"hello")).unwrap_err();
        assert!(matches!(err, AssetError::Validation(ValidationError::MissingExtension)));

        let err = service.upload(&Grant::for_tests(), incoming("empty.png", b"")).unwrap_err();
        assert!(matches!(err, AssetError::Validation(ValidationError::EmptyUpload)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_names_unique_across_uploads() {
        let store = Arc::new(MockAssetStore::new());
        let service = service(&store, policy(1024, true));

        for _ in 0..200 {
            service.upload(&Grant::for_tests(), incoming("same.png", b"same bytes")).unwrap();
        }
        assert_eq!(store.len(), 200);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "0.50 KB");
        assert_eq!(format_size(1024 * 1024), "1024.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.50 MB");
    }
}
