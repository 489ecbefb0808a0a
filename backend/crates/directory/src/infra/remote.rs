//! Remote HTTP key-value store
//!
//! Wire protocol:
//! - `GET {base}/values/{key}`: 200 with the payload and `ETag: "<revision>"`, or 404
//! - `PUT {base}/values/{key}`: body is the payload; `If-None-Match: *` to
//!   create, `If-Match: "<revision>"` to replace. 2xx returns the new `ETag`,
//!   412 means the revision moved (current `ETag` included when known).
//!
//! Requests carry `Authorization: Bearer <token>` when a token is configured
//! and fail with [`StoreError::Timeout`] after the configured timeout.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ETAG, HeaderMap, IF_MATCH, IF_NONE_MATCH};

use crate::error::{StoreError, StoreResult};
use crate::infra::store::{RecordStore, VersionedBlob, validate_key};

/// Remote KV connection settings
#[derive(Debug, Clone)]
pub struct RemoteKvConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for RemoteKvConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787".to_string(),
            token: None,
            timeout: Duration::from_millis(2000),
        }
    }
}

impl RemoteKvConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Local KV emulator without auth
    pub fn development() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct RemoteKvStore {
    client: reqwest::Client,
    config: RemoteKvConfig,
}

impl RemoteKvStore {
    pub fn new(config: RemoteKvConfig) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Backend(format!("HTTP client setup failed: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url_for(&self, key: &str) -> String {
        format!(
            "{}/values/{}",
            self.config.base_url.trim_end_matches('/'),
            key
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl RecordStore for RemoteKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        validate_key(key)?;
        let response = self
            .authorize(self.client.get(self.url_for(key)))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let revision = revision_from(response.headers()).ok_or_else(|| {
                    StoreError::Backend(format!("GET {key}: response has no revision ETag"))
                })?;
                let payload = response.bytes().await.map_err(transport_error)?;
                Ok(Some(VersionedBlob {
                    revision,
                    payload: payload.to_vec(),
                }))
            }
            status => Err(status_error("GET", key, status)),
        }
    }

    async fn put(
        &self,
        key: &str,
        payload: Vec<u8>,
        expected_revision: Option<u64>,
    ) -> StoreResult<u64> {
        validate_key(key)?;
        let request = self.client.put(self.url_for(key)).body(payload);
        let request = match expected_revision {
            None => request.header(IF_NONE_MATCH, "*"),
            Some(revision) => request.header(IF_MATCH, format!("\"{revision}\"")),
        };

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::PRECONDITION_FAILED => Err(StoreError::RevisionConflict {
                expected: expected_revision,
                actual: revision_from(response.headers()).unwrap_or(0),
            }),
            status if status.is_success() => revision_from(response.headers()).ok_or_else(|| {
                StoreError::Backend(format!("PUT {key}: response has no revision ETag"))
            }),
            status => Err(status_error("PUT", key, status)),
        }
    }
}

/// Parse `"7"` / `W/"7"` / `7`
fn revision_from(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(ETAG)?.to_str().ok()?.trim();
    let raw = raw.strip_prefix("W/").unwrap_or(raw);
    raw.trim_matches('"').parse().ok()
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else if err.is_connect() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

fn status_error(method: &str, key: &str, status: StatusCode) -> StoreError {
    if status.is_server_error() {
        StoreError::Unavailable(format!("{method} {key}: {status}"))
    } else {
        StoreError::Backend(format!("{method} {key}: {status}"))
    }
}
