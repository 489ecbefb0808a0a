//! Directory Error Types
//!
//! `StoreError` covers the blob backends; `DirectoryError` is what the
//! collection operations and HTTP handlers return.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Record store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached or answered with a server error
    #[error("Store backend unavailable: {0}")]
    Unavailable(String),

    #[error("Store request timed out")]
    Timeout,

    /// Conditional write lost against a concurrent writer
    #[error("Revision conflict: expected {expected:?}, found {actual}")]
    RevisionConflict { expected: Option<u64>, actual: u64 },

    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    #[error("Corrupt store record: {0}")]
    Corrupt(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Conflicts are a normal outcome of optimistic writes, not a backend fault
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::RevisionConflict { .. })
    }
}

/// Directory-specific error variants
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Collection serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Location already exists: {0}")]
    LocationExists(String),

    #[error("Location not found")]
    LocationNotFound,

    /// Optimistic write retries exhausted
    #[error("Write contention on '{collection}' after {attempts} attempts")]
    Contention {
        collection: &'static str,
        attempts: u32,
    },

    #[error("{0}")]
    Validation(String),
}

impl DirectoryError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DirectoryError::Validation(_) => ErrorKind::BadRequest,
            DirectoryError::EmailTaken | DirectoryError::LocationExists(_) => ErrorKind::Conflict,
            DirectoryError::LocationNotFound => ErrorKind::NotFound,
            DirectoryError::Contention { .. } => ErrorKind::ServiceUnavailable,
            DirectoryError::Store(_) | DirectoryError::Serialization(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.to_string())
    }

    fn log(&self) {
        match self {
            DirectoryError::Store(e) => {
                tracing::error!(error = %e, "Directory store error");
            }
            DirectoryError::Serialization(e) => {
                tracing::error!(error = %e, "Directory collection is not decodable");
            }
            DirectoryError::Contention {
                collection,
                attempts,
            } => {
                tracing::warn!(collection, attempts, "Directory write contention");
            }
            _ => {
                tracing::debug!(error = %self, "Directory error");
            }
        }
    }
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DirectoryError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(DirectoryError::EmailTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            DirectoryError::LocationNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DirectoryError::Store(StoreError::Timeout).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_conflict_detection() {
        let conflict = StoreError::RevisionConflict {
            expected: Some(1),
            actual: 2,
        };
        assert!(conflict.is_conflict());
        assert!(!StoreError::Timeout.is_conflict());
    }

    #[test]
    fn test_store_detail_not_exposed() {
        let err = DirectoryError::Store(StoreError::Backend("secret host".into()));
        let app = err.to_app_error();
        assert_eq!(app.public_message(), "Internal server error");
    }
}
