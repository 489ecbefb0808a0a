//! Repository Traits
//!
//! Collection-scoped operations over users and locations. The store-backed
//! implementation lives in the infrastructure layer.

use kernel::id::UserId;

use crate::domain::location::{Location, LocationPatch, Presence};
use crate::domain::user::{User, UserPatch};
use crate::error::DirectoryResult;

/// User collection
#[trait_variant::make(UserDirectory: Send)]
pub trait LocalUserDirectory {
    /// All users in creation order
    async fn list_users(&self) -> DirectoryResult<Vec<User>>;

    /// Case-insensitive lookup on the normalized email
    async fn find_user_by_email(&self, email: &str) -> DirectoryResult<Option<User>>;

    async fn find_user_by_id(&self, id: &UserId) -> DirectoryResult<Option<User>>;

    /// Append a user; fails with `EmailTaken` if the email is already present
    async fn create_user(&self, user: User) -> DirectoryResult<User>;

    /// Returns `None` when no user has this id
    async fn update_user(&self, id: &UserId, patch: UserPatch) -> DirectoryResult<Option<User>>;
}

/// Location collection and presence
#[trait_variant::make(LocationDirectory: Send)]
pub trait LocalLocationDirectory {
    async fn list_locations(&self) -> DirectoryResult<Vec<Location>>;

    async fn find_location(&self, id: &str) -> DirectoryResult<Option<Location>>;

    /// Append a location; an empty id is replaced by a generated one
    async fn add_location(&self, location: Location) -> DirectoryResult<Location>;

    /// Shallow-merge `patch`; a missing id is a no-op returning `None`
    async fn update_location(
        &self,
        id: &str,
        patch: LocationPatch,
    ) -> DirectoryResult<Option<Location>>;

    /// Move the user to `location_id`, leaving any other location
    async fn check_in(&self, location_id: &str, presence: Presence) -> DirectoryResult<Location>;

    /// Remove the user from every location; returns how many were left
    async fn check_out(&self, user_id: &UserId) -> DirectoryResult<usize>;
}
