//! Primary/fallback composition
//!
//! Precedence: the primary (remote) store when one is configured, otherwise
//! the local fallback. The two absent-backend cases and the failing-backend
//! case are separate paths:
//!
//! | situation | behaviour |
//! |---|---|
//! | no primary configured | fallback used, `debug` log |
//! | primary fails, `fallback_on_error` | `error` log, fallback used |
//! | primary fails, no `fallback_on_error` | `error` log, error returned |
//! | primary reports a revision conflict | conflict returned unchanged |
//! | no fallback configured | reads are empty, writes are dropped |
//!
//! The two backends count revisions independently, so revisions issued by
//! the fallback carry [`FALLBACK_REVISION_BIT`]. A write conditional on such
//! a revision goes to the fallback that issued it and never to the primary,
//! where the same number could name an unrelated snapshot.

use crate::error::{StoreError, StoreResult};
use crate::infra::file::FileStore;
use crate::infra::memory::InMemoryStore;
use crate::infra::store::{RecordStore, VersionedBlob};

/// Marks a revision as issued by the fallback backend
pub const FALLBACK_REVISION_BIT: u64 = 1 << 63;

fn from_fallback(revision: u64) -> u64 {
    revision | FALLBACK_REVISION_BIT
}

/// Splits a caller revision into (issued by fallback, backend-local revision)
fn origin_of(expected: Option<u64>) -> (bool, Option<u64>) {
    match expected {
        Some(revision) if revision & FALLBACK_REVISION_BIT != 0 => {
            (true, Some(revision & !FALLBACK_REVISION_BIT))
        }
        other => (false, other),
    }
}

fn tag_conflict(e: StoreError) -> StoreError {
    match e {
        StoreError::RevisionConflict { expected, actual } => StoreError::RevisionConflict {
            expected: expected.map(from_fallback),
            actual: from_fallback(actual),
        },
        other => other,
    }
}

pub struct FallbackStore<P, F> {
    primary: Option<P>,
    fallback: Option<F>,
    fallback_on_error: bool,
}

impl<P, F> FallbackStore<P, F> {
    pub fn new(primary: Option<P>, fallback: Option<F>, fallback_on_error: bool) -> Self {
        Self {
            primary,
            fallback,
            fallback_on_error,
        }
    }

    /// Local-only store, as used in development
    pub fn local(fallback: F) -> Self {
        Self::new(None, Some(fallback), true)
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

impl<P, F> RecordStore for FallbackStore<P, F>
where
    P: RecordStore + Sync,
    F: RecordStore + Sync,
{
    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        match &self.primary {
            Some(primary) => match primary.get(key).await {
                Ok(blob) => return Ok(blob),
                Err(e) => {
                    tracing::error!(key, error = %e, "Primary record store read failed");
                    if !self.fallback_on_error {
                        return Err(e);
                    }
                }
            },
            None => tracing::debug!(key, "No primary record store configured"),
        }

        match &self.fallback {
            Some(fallback) => Ok(fallback.get(key).await?.map(|blob| VersionedBlob {
                revision: from_fallback(blob.revision),
                payload: blob.payload,
            })),
            None => {
                tracing::debug!(key, "No fallback record store; read returns empty");
                Ok(None)
            }
        }
    }

    async fn put(
        &self,
        key: &str,
        payload: Vec<u8>,
        expected_revision: Option<u64>,
    ) -> StoreResult<u64> {
        let (issued_by_fallback, expected) = origin_of(expected_revision);
        if issued_by_fallback {
            return self.put_fallback(key, payload, expected).await;
        }

        match &self.primary {
            Some(primary) => {
                // payload is needed again if the primary fails
                match primary.put(key, payload.clone(), expected_revision).await {
                    Ok(revision) => return Ok(revision),
                    Err(e) if e.is_conflict() => return Err(e),
                    Err(e) => {
                        tracing::error!(key, error = %e, "Primary record store write failed");
                        if !self.fallback_on_error {
                            return Err(e);
                        }
                    }
                }
            }
            None => tracing::debug!(key, "No primary record store configured"),
        }

        match &self.fallback {
            Some(_) => self.put_fallback(key, payload, expected).await,
            None => {
                tracing::debug!(key, bytes = payload.len(), "No fallback record store; write dropped");
                Ok(expected.unwrap_or(0))
            }
        }
    }
}

impl<P, F> FallbackStore<P, F>
where
    F: RecordStore + Sync,
{
    async fn put_fallback(
        &self,
        key: &str,
        payload: Vec<u8>,
        expected: Option<u64>,
    ) -> StoreResult<u64> {
        match &self.fallback {
            Some(fallback) => fallback
                .put(key, payload, expected)
                .await
                .map(from_fallback)
                .map_err(tag_conflict),
            // A fallback revision without a fallback cannot be honoured
            None => Err(StoreError::RevisionConflict {
                expected: expected.map(from_fallback),
                actual: 0,
            }),
        }
    }
}

/// Local backend chosen at startup
#[derive(Debug)]
pub enum LocalStore {
    Memory(InMemoryStore),
    File(FileStore),
}

impl RecordStore for LocalStore {
    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        match self {
            LocalStore::Memory(store) => store.get(key).await,
            LocalStore::File(store) => store.get(key).await,
        }
    }

    async fn put(
        &self,
        key: &str,
        payload: Vec<u8>,
        expected_revision: Option<u64>,
    ) -> StoreResult<u64> {
        match self {
            LocalStore::Memory(store) => store.put(key, payload, expected_revision).await,
            LocalStore::File(store) => store.put(key, payload, expected_revision).await,
        }
    }
}
