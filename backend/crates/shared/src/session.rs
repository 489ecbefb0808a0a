//! Authenticated caller identity
//!
//! The auth middleware verifies a bearer token and stores a
//! [`SessionIdentity`] in the request extensions. Other contexts read it
//! without depending on the auth crate.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Identity claims of a verified session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}
