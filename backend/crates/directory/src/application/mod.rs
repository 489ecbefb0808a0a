//! Application Layer
//!
//! Configuration and use cases.

pub mod config;
pub mod presence;

// Re-exports
pub use config::DirectoryConfig;
pub use presence::{CheckInInput, CheckInUseCase, CheckOutOutput, CheckOutUseCase};
