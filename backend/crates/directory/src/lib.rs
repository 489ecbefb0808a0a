//! Directory Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - User and location records, repository traits
//! - `application/` - Configuration and presence use cases
//! - `infra/` - Record store backends and the store-backed directory
//! - `presentation/` - HTTP handlers, DTOs, routers for locations
//!
//! ## Consistency Model
//! - Each collection is a single versioned blob; every write replaces it
//! - Writes are conditional on the revision read, and retried on conflict
//! - Email uniqueness is checked inside the write, so concurrent
//!   registrations for one address cannot both persist
//! - Presence lives in the location collection; a user occupies at most
//!   one location

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::DirectoryConfig;
pub use domain::repository::{LocationDirectory, UserDirectory};
pub use error::{DirectoryError, DirectoryResult, StoreError, StoreResult};
pub use infra::kv_directory::KvDirectory;
pub use presentation::router::{location_router_generic, presence_router_generic};

pub mod models {
    pub use crate::domain::location::*;
    pub use crate::domain::user::*;
    pub use crate::presentation::dto::*;
}

pub mod store {
    pub use crate::infra::fallback::{FallbackStore, LocalStore};
    pub use crate::infra::file::FileStore;
    pub use crate::infra::memory::InMemoryStore;
    pub use crate::infra::remote::{RemoteKvConfig, RemoteKvStore};
    pub use crate::infra::store::*;
}

#[cfg(test)]
mod tests;
