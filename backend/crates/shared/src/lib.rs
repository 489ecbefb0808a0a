//! Shared Kernel - Vocabulary common to every bounded context
//!
//! - Unified error type ([`error::app_error::AppError`]) and its HTTP mapping
//! - Typed identifiers ([`id::Id`])
//! - The authenticated caller identity handed from the auth layer to
//!   other contexts ([`session::SessionIdentity`])
//!
//! Only things with one meaning across the whole system belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
pub mod session;
