//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Value objects and audit events
//! - `application/` - Use cases, token and password services, the gateway
//! - `infra/` - Audit sink implementations
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Registration and login with email + password
//! - Stateless HS256 session tokens (7 days) sent as `Authorization: Bearer`
//! - Profile edits and password changes for the signed-in user
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optionally peppered
//! - Unknown email and wrong password are indistinguishable
//! - Register, login, and password change share one per-client rate limit
//! - Every attempt is written to the `audit` log target

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use application::{AuthGateway, TokenService};
pub use error::{AuthError, AuthResult};
pub use infra::TracingAuditSink;
pub use presentation::router::auth_router_generic;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
