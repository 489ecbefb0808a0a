//! Presence Use Cases
//!
//! Check-in and check-out for an authenticated session.

use std::sync::Arc;

use kernel::session::SessionIdentity;

use crate::domain::location::{Intent, Location, Presence};
use crate::domain::repository::LocationDirectory;
use crate::error::DirectoryResult;

/// Check-in input
pub struct CheckInInput {
    pub location_id: String,
    pub intent: Intent,
}

/// Check in the session's user at a location
pub struct CheckInUseCase<D>
where
    D: LocationDirectory,
{
    directory: Arc<D>,
}

impl<D> CheckInUseCase<D>
where
    D: LocationDirectory,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    pub async fn execute(
        &self,
        session: &SessionIdentity,
        input: CheckInInput,
    ) -> DirectoryResult<Location> {
        let presence = Presence {
            user_id: session.user_id,
            name: session.name.clone(),
            intent: input.intent,
        };
        self.directory.check_in(&input.location_id, presence).await
    }
}

/// Check-out output
pub struct CheckOutOutput {
    /// Locations the user was removed from
    pub left: usize,
}

pub struct CheckOutUseCase<D>
where
    D: LocationDirectory,
{
    directory: Arc<D>,
}

impl<D> CheckOutUseCase<D>
where
    D: LocationDirectory,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    pub async fn execute(&self, session: &SessionIdentity) -> DirectoryResult<CheckOutOutput> {
        let left = self.directory.check_out(&session.user_id).await?;
        Ok(CheckOutOutput { left })
    }
}
