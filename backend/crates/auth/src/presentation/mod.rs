//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::{AuthAppState, RateLimitHeaders};
pub use middleware::require_session;
pub use router::auth_router_generic;
