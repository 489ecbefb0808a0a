//! Local directory record store
//!
//! One JSON envelope per key (`{dir}/{key}.json`). Writes go to a temp file
//! that is renamed over the target, so readers never see a torn write.
//! A single writer lock serializes the read-compare-write of `put` within
//! this process; the directory must not be shared between processes.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::infra::store::{RecordStore, VersionedBlob, next_revision, validate_key};

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    revision: u64,
    /// Base64 of the opaque payload
    payload: String,
}

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!(dir = %dir.display(), "File record store opened");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    async fn read_envelope(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        let bytes = match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{key}: {e}")))?;
        let payload = BASE64
            .decode(envelope.payload.as_bytes())
            .map_err(|e| StoreError::Corrupt(format!("{key}: {e}")))?;

        Ok(Some(VersionedBlob {
            revision: envelope.revision,
            payload,
        }))
    }
}

impl RecordStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        validate_key(key)?;
        self.read_envelope(key).await
    }

    async fn put(
        &self,
        key: &str,
        payload: Vec<u8>,
        expected_revision: Option<u64>,
    ) -> StoreResult<u64> {
        validate_key(key)?;
        let _guard = self.write_lock.lock().await;

        let current = self.read_envelope(key).await?.map(|blob| blob.revision);
        let revision = next_revision(current, expected_revision)?;

        let envelope = Envelope {
            revision,
            payload: BASE64.encode(&payload),
        };
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| StoreError::Backend(format!("envelope encoding failed: {e}")))?;

        let tmp = self
            .dir
            .join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(key, revision, bytes = bytes.len(), "Record written");
        Ok(revision)
    }
}
