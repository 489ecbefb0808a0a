//! User record
//!
//! Stored shape: `{id, email, passwordHash, name, createdAt}`. Records
//! written under the older `password` field name are still readable.

use std::fmt;

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use serde::{Deserialize, Serialize};

/// Canonical form used for storage and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Always stored normalized (see [`normalize_email`])
    pub email: String,
    #[serde(alias = "password")]
    pub password_hash: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// New record with a fresh id and the current time
    pub fn new(email: &str, password_hash: String, display_name: String) -> Self {
        Self {
            id: UserId::new(),
            email: normalize_email(email),
            password_hash,
            display_name,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn apply(&mut self, patch: UserPatch) {
        if let Some(email) = patch.email {
            self.email = normalize_email(&email);
        }
        if let Some(name) = patch.display_name {
            self.display_name = name;
        }
        if let Some(hash) = patch.password_hash {
            self.password_hash = hash;
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[HASH]")
            .field("display_name", &self.display_name)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.display_name.is_none() && self.password_hash.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_email() {
        let user = User::new("  Ann@Example.COM ", "h".into(), "Ann".into());
        assert_eq!(user.email, "ann@example.com");
    }

    #[test]
    fn test_wire_shape() {
        let user = User::new("a@b.com", "$argon2id$...".into(), "Ann".into());
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(json["email"], "a@b.com");
        assert_eq!(json["name"], "Ann");
        assert_eq!(json["passwordHash"], "$argon2id$...");
        assert!(json["createdAt"].is_string());
        assert_eq!(json["id"], user.id.to_string());
    }

    #[test]
    fn test_reads_legacy_password_field() {
        let json = r#"{
            "id": "6f1c4c7e-55f4-4d8e-9b62-0d1a3f4f8c11",
            "email": "a@b.com",
            "password": "legacy-hash",
            "name": "Ann",
            "createdAt": "2024-05-01T10:00:00.000Z"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.password_hash, "legacy-hash");
        assert_eq!(user.display_name, "Ann");
    }

    #[test]
    fn test_apply_patch() {
        let mut user = User::new("a@b.com", "old".into(), "Ann".into());
        user.apply(UserPatch {
            email: Some("New@B.com".into()),
            display_name: None,
            password_hash: Some("new".into()),
        });
        assert_eq!(user.email, "new@b.com");
        assert_eq!(user.display_name, "Ann");
        assert_eq!(user.password_hash, "new");
    }

    #[test]
    fn test_debug_hides_hash() {
        let user = User::new("a@b.com", "$argon2id$secret".into(), "Ann".into());
        assert!(!format!("{:?}", user).contains("secret"));
    }
}
