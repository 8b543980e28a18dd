//! Shared key generation for storage backends.

use crate::traits::{StorageError, StorageResult};

/// Storage key for the archive of configuration version `cv_id`.
///
/// Ids are generated server-side, but they also arrive in request paths, so
/// anything outside `[A-Za-z0-9_-]` is rejected here.
pub fn configuration_version_key(cv_id: &str) -> StorageResult<String> {
    if cv_id.is_empty()
        || !cv_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StorageError::InvalidKey(format!(
            "invalid configuration version id: {}",
            cv_id
        )));
    }
    Ok(format!("configs/{}.tar.gz", cv_id))
}
