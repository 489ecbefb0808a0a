//! Auth Error Types
//!
//! Auth-specific error variants that render through the unified
//! `kernel::error::AppError` body (`{"error": "..."}`).

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use directory::DirectoryError;
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordHashError;
use platform::rate_limit::RateLimitError;
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or missing input; the message is shown to the user
    #[error("{0}")]
    Validation(String),

    #[error("User with this email already exists")]
    UserExists,

    /// Same message for unknown email and wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{message}")]
    RateLimited {
        message: &'static str,
        retry_after_secs: u64,
    },

    /// Missing, malformed, or expired bearer token
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Directory error: {0}")]
    Directory(DirectoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::UserExists => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Directory(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::BadRequest,
            AuthError::UserExists => ErrorKind::Conflict,
            AuthError::InvalidCredentials | AuthError::Unauthorized => ErrorKind::Unauthorized,
            AuthError::RateLimited { .. } => ErrorKind::TooManyRequests,
            AuthError::Directory(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.to_string())
    }

    /// Short label for audit records
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation",
            AuthError::UserExists => "user_exists",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::RateLimited { .. } => "rate_limited",
            AuthError::Unauthorized => "unauthorized",
            AuthError::Directory(_) | AuthError::Internal(_) => "internal",
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Directory(e) => {
                tracing::error!(error = %e, "Auth directory error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::RateLimited {
                retry_after_secs, ..
            } => {
                tracing::warn!(retry_after_secs, "Auth request rate limited");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        let retry_after = match &self {
            AuthError::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        };

        let mut response = self.to_app_error().into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::EmailTaken => AuthError::UserExists,
            DirectoryError::Validation(msg) => AuthError::Validation(msg),
            other => AuthError::Directory(other),
        }
    }
}

impl From<PasswordHashError> for AuthError {
    fn from(err: PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<RateLimitError> for AuthError {
    fn from(err: RateLimitError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
