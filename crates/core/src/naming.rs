//! Naming conventions for job tokens and storage keys.
//!
//! Storage keys are partitioned by account so no two accounts ever write
//! under the same prefix: `account-{id}/predictions/{object}.{ext}`.

use uuid::Uuid;

use crate::types::DbId;

/// Generate a fresh job token (random 128-bit UUID, simple hex form).
pub fn new_job_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Prefix under which all of an account's prediction images live.
pub fn account_prediction_prefix(account_id: DbId) -> String {
    format!("account-{account_id}/predictions/")
}

/// Build a fresh, unique storage key for a prediction image.
///
/// # Examples
///
/// ```
/// use pictor_core::naming::prediction_storage_key;
///
/// let key = prediction_storage_key(7, "png");
/// assert!(key.starts_with("account-7/predictions/"));
/// assert!(key.ends_with(".png"));
/// ```
pub fn prediction_storage_key(account_id: DbId, extension: &str) -> String {
    format!(
        "{}{}.{}",
        account_prediction_prefix(account_id),
        Uuid::new_v4().simple(),
        extension.trim_start_matches('.')
    )
}

/// Storage key for a clone of `source_key` owned by `account_id`.
///
/// Keeps the source extension, falling back to `png`.
pub fn clone_storage_key(source_key: &str, account_id: DbId) -> String {
    let extension = source_key
        .rsplit_once('/')
        .map_or(source_key, |(_, file)| file)
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("png");
    prediction_storage_key(account_id, extension)
}

/// Normalise an object key: no leading slashes.
pub fn normalize_key(key: &str) -> &str {
    key.trim_start_matches('/')
}
