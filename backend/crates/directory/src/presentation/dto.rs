//! API DTOs (Data Transfer Objects)
//!
//! Locations go over the wire in their stored shape, so only requests and
//! the check-out result need their own types. Requests never carry
//! occupancy; `coworkers` and `hasDouble` sent by a client are ignored.

use serde::{Deserialize, Serialize};

use crate::domain::location::{Coordinates, Intent, Location};

// ============================================================================
// Locations
// ============================================================================

/// Add location request
#[derive(Debug, Clone, Deserialize)]
pub struct NewLocationRequest {
    /// Generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub coords: Coordinates,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
}

impl From<NewLocationRequest> for Location {
    fn from(req: NewLocationRequest) -> Self {
        let mut location = Location::new(req.id.unwrap_or_default(), req.name, req.coords);
        location.amenities = req.amenities;
        location
    }
}

// ============================================================================
// Presence
// ============================================================================

/// Check-in request
#[derive(Debug, Clone, Deserialize)]
pub struct CheckInRequest {
    pub intent: Intent,
}

/// Check-out response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutResponse {
    pub locations_left: usize,
}
