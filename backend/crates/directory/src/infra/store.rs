//! Record Store capability
//!
//! A dumb blob store keyed by collection name. Every write replaces the
//! whole payload and is conditional on the revision the writer read.

use crate::error::{StoreError, StoreResult};

/// Store key of the user collection
pub const USERS_COLLECTION: &str = "users";
/// Store key of the location collection
pub const LOCATIONS_COLLECTION: &str = "locations";

/// Payload plus the revision it was stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedBlob {
    pub revision: u64,
    pub payload: Vec<u8>,
}

#[trait_variant::make(RecordStore: Send)]
pub trait LocalRecordStore {
    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>>;

    /// Replace the payload stored under `key`
    ///
    /// `expected_revision` is the revision the caller read; `None` means the
    /// key must not exist yet. Returns the new revision, or
    /// [`StoreError::RevisionConflict`] if another writer got there first.
    async fn put(
        &self,
        key: &str,
        payload: Vec<u8>,
        expected_revision: Option<u64>,
    ) -> StoreResult<u64>;
}

/// Compare-and-swap check shared by the local backends
///
/// Returns the revision to store on success.
pub(crate) fn next_revision(current: Option<u64>, expected: Option<u64>) -> StoreResult<u64> {
    match (current, expected) {
        (None, None) => Ok(1),
        (Some(actual), Some(expected)) if actual == expected => Ok(actual + 1),
        (current, expected) => Err(StoreError::RevisionConflict {
            expected,
            actual: current.unwrap_or(0),
        }),
    }
}

/// Keys become file names and URL segments
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
