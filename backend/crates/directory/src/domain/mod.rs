//! Domain Layer
//!
//! Records, value types, and repository traits.

pub mod location;
pub mod repository;
pub mod user;

// Re-exports
pub use location::{Coordinates, Intent, Location, LocationPatch, Occupant, Presence};
pub use repository::{LocationDirectory, UserDirectory};
pub use user::{User, UserPatch, normalize_email};
