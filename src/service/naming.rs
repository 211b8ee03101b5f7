//! Asset name generation

use uuid::Uuid;

use crate::error::ValidationError;
use crate::storage::AssetName;

const MAX_EXTENSION_LEN: usize = 16;

/// Lower-cased suffix after the last `.` of a client supplied file name
pub fn extract_extension(original: &str) -> Result<String, ValidationError> {
    let (_, suffix) = original.rsplit_once('.').ok_or(ValidationError::MissingExtension)?;
    if suffix.is_empty() {
        return Err(ValidationError::MissingExtension);
    }
    if suffix.len() > MAX_EXTENSION_LEN || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidExtension(suffix.to_string()));
    }
    Ok(suffix.to_ascii_lowercase())
}

/// Fresh `<uuid>.<extension>` name. Uniqueness rests on the 122 random bits
/// of the v4 UUID; the store is not consulted.
pub fn generate_name(extension: &str) -> Result<AssetName, ValidationError> {
    AssetName::parse(&format!("{}.{}", Uuid::new_v4(), extension))
}
