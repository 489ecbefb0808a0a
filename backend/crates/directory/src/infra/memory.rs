//! In-process record store
//!
//! Lives as long as the process; used for development and tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::StoreResult;
use crate::infra::store::{RecordStore, VersionedBlob, next_revision, validate_key};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, VersionedBlob>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for InMemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        validate_key(key)?;
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        payload: Vec<u8>,
        expected_revision: Option<u64>,
    ) -> StoreResult<u64> {
        validate_key(key)?;
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let current = records.get(key).map(|blob| blob.revision);
        let revision = next_revision(current, expected_revision)?;
        records.insert(key.to_string(), VersionedBlob { revision, payload });
        Ok(revision)
    }
}
