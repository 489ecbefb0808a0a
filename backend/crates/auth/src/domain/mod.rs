//! Domain Layer
//!
//! Value objects and audit events. User records are owned by the
//! directory crate.

pub mod audit;
pub mod value_object;

// Re-exports
pub use audit::{AuditEvent, AuditEventKind, AuditSink};
pub use value_object::{DisplayName, Email, RawPassword};
