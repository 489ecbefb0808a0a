//! Location record and occupancy

use kernel::id::UserId;
use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};

/// Why someone is at a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    BodyDouble,
    Focus,
    Social,
}

/// `[lat, lon]` in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates(pub f64, pub f64);

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> DirectoryResult<Self> {
        let coords = Self(lat, lon);
        coords.validate()?;
        Ok(coords)
    }

    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }

    pub fn validate(&self) -> DirectoryResult<()> {
        let (lat, lon) = (self.0, self.1);
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(DirectoryError::Validation(
                "Latitude must be between -90 and 90".to_string(),
            ));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(DirectoryError::Validation(
                "Longitude must be between -180 and 180".to_string(),
            ));
        }
        Ok(())
    }
}

/// Someone currently present at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupant {
    pub name: String,
    pub intent: Intent,
    /// Set for check-ins made through an authenticated session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// A physical place users may declare presence at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(rename = "coords")]
    pub coordinates: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
    #[serde(rename = "coworkers", default)]
    pub occupants: Vec<Occupant>,
    #[serde(rename = "hasDouble", default, skip_serializing_if = "Option::is_none")]
    pub has_active_double: Option<bool>,
}

impl Location {
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinates,
            amenities: None,
            occupants: Vec::new(),
            has_active_double: None,
        }
    }

    pub fn validate(&self) -> DirectoryResult<()> {
        if self.id.trim().is_empty() {
            return Err(DirectoryError::Validation("Location id is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(DirectoryError::Validation(
                "Location name is required".to_string(),
            ));
        }
        self.coordinates.validate()
    }

    /// Shallow merge: every field present in the patch replaces the stored one
    ///
    /// Occupancy is not patchable; it only changes through check-in and check-out.
    pub fn apply(&mut self, patch: LocationPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(coordinates) = patch.coordinates {
            self.coordinates = coordinates;
        }
        if let Some(amenities) = patch.amenities {
            self.amenities = Some(amenities);
        }
    }

    /// Drop any occupancy carried in from outside a session
    pub(crate) fn vacate(&mut self) {
        self.occupants.clear();
        self.has_active_double = None;
    }

    pub fn has_body_double(&self) -> bool {
        self.occupants
            .iter()
            .any(|o| o.intent == Intent::BodyDouble)
    }

    /// Recompute `hasDouble` from the current occupants
    pub fn refresh_double(&mut self) {
        self.has_active_double = Some(self.has_body_double());
    }

    pub fn is_occupied_by(&self, user_id: &UserId) -> bool {
        self.occupants
            .iter()
            .any(|o| o.user_id.as_ref() == Some(user_id))
    }

    /// Remove the user's presence; returns whether anything changed
    pub fn remove_occupant(&mut self, user_id: &UserId) -> bool {
        let before = self.occupants.len();
        self.occupants
            .retain(|o| o.user_id.as_ref() != Some(user_id));
        let removed = self.occupants.len() != before;
        if removed {
            self.refresh_double();
        }
        removed
    }

    pub(crate) fn push_occupant(&mut self, occupant: Occupant) {
        self.occupants.push(occupant);
        self.refresh_double();
    }
}

/// Partial location update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationPatch {
    pub name: Option<String>,
    #[serde(rename = "coords")]
    pub coordinates: Option<Coordinates>,
    pub amenities: Option<Vec<String>>,
}

/// Authenticated check-in request
#[derive(Debug, Clone)]
pub struct Presence {
    pub user_id: UserId,
    pub name: String,
    pub intent: Intent,
}

impl From<Presence> for Occupant {
    fn from(presence: Presence) -> Self {
        Self {
            name: presence.name,
            intent: presence.intent,
            user_id: Some(presence.user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cafe() -> Location {
        Location::new("1", "Blue Bottle", Coordinates(40.7128, -74.006))
    }

    fn occupant(intent: Intent, user_id: Option<UserId>) -> Occupant {
        Occupant {
            name: "Ann".to_string(),
            intent,
            user_id,
        }
    }

    #[test]
    fn test_intent_wire_names() {
        assert_eq!(
            serde_json::to_string(&Intent::BodyDouble).unwrap(),
            "\"body-double\""
        );
        let intent: Intent = serde_json::from_str("\"social\"").unwrap();
        assert_eq!(intent, Intent::Social);
    }

    #[test]
    fn test_reads_client_shape() {
        let json = r#"{
            "id": "1",
            "name": "Blue Bottle Coffee",
            "coords": [40.7128, -74.006],
            "amenities": ["wifi", "outlets"],
            "coworkers": [{"name": "Sam", "intent": "focus"}],
            "hasDouble": false
        }"#;
        let location: Location = serde_json::from_str(json).unwrap();
        assert_eq!(location.coordinates.lat(), 40.7128);
        assert_eq!(location.occupants.len(), 1);
        assert_eq!(location.occupants[0].user_id, None);
        assert_eq!(location.has_active_double, Some(false));
    }

    #[test]
    fn test_optional_fields_omitted() {
        let json = serde_json::to_value(cafe()).unwrap();
        assert!(json.get("amenities").is_none());
        assert!(json.get("hasDouble").is_none());
        assert_eq!(json["coworkers"], serde_json::json!([]));
        assert_eq!(json["coords"], serde_json::json!([40.7128, -74.006]));
    }

    #[test]
    fn test_coordinate_bounds() {
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(90.1, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_validate_requires_name() {
        let mut location = cafe();
        location.name = "  ".to_string();
        assert!(matches!(
            location.validate(),
            Err(DirectoryError::Validation(_))
        ));
    }

    #[test]
    fn test_patch_is_shallow() {
        let mut location = cafe();
        location.amenities = Some(vec!["wifi".into()]);

        location.apply(LocationPatch {
            name: Some("Renamed".into()),
            ..Default::default()
        });

        assert_eq!(location.name, "Renamed");
        assert_eq!(location.amenities, Some(vec!["wifi".to_string()]));
        assert_eq!(location.coordinates, Coordinates(40.7128, -74.006));
    }

    #[test]
    fn test_patch_ignores_occupancy() {
        let user = UserId::new();
        let mut location = cafe();
        location.push_occupant(occupant(Intent::Focus, Some(user)));

        let patch: LocationPatch = serde_json::from_str(
            r#"{"name": "Renamed", "coworkers": [{"name": "Mallory", "intent": "body-double"}], "hasDouble": true}"#,
        )
        .unwrap();
        location.apply(patch);

        assert_eq!(location.name, "Renamed");
        assert_eq!(location.occupants.len(), 1);
        assert!(location.is_occupied_by(&user));
        assert_eq!(location.has_active_double, Some(false));
    }

    #[test]
    fn test_remove_occupant() {
        let user = UserId::new();
        let mut location = cafe();
        location.push_occupant(occupant(Intent::BodyDouble, Some(user)));
        location.push_occupant(occupant(Intent::Focus, None));
        assert!(location.is_occupied_by(&user));
        assert_eq!(location.has_active_double, Some(true));

        assert!(location.remove_occupant(&user));
        assert!(!location.remove_occupant(&user));
        assert_eq!(location.occupants.len(), 1);
        assert_eq!(location.has_active_double, Some(false));
    }
}
