//! Infrastructure Layer
//!
//! Record store backends and the store-backed directory.

pub mod fallback;
pub mod file;
pub mod kv_directory;
pub mod memory;
pub mod remote;
pub mod store;

// Re-exports
pub use fallback::{FallbackStore, LocalStore};
pub use file::FileStore;
pub use kv_directory::KvDirectory;
pub use memory::InMemoryStore;
pub use remote::{RemoteKvConfig, RemoteKvStore};
pub use store::{LOCATIONS_COLLECTION, RecordStore, USERS_COLLECTION, VersionedBlob};
