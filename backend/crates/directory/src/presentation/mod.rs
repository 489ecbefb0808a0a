//! Presentation Layer
//!
//! HTTP handlers, DTOs, and routers for locations and presence.

pub mod dto;
pub mod handlers;
pub mod router;
