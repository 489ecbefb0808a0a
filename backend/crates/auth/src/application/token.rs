//! Session Tokens
//!
//! HS256 JWTs asserting `{userId, email, name}` with `iat`/`exp`.

use chrono::Utc;
use directory::models::User;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use kernel::id::UserId;
use kernel::session::SessionIdentity;
use serde::{Deserialize, Serialize};

use crate::application::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            user_id: self.user_id,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Session identity carried by a user's token
pub fn identity_of(user: &User) -> SessionIdentity {
    SessionIdentity {
        user_id: user.id,
        email: user.email.clone(),
        name: user.display_name.clone(),
    }
}

/// A user together with a freshly issued token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(&config.jwt_secret),
            decoding_key: DecodingKey::from_secret(&config.jwt_secret),
            ttl_secs: config.token_ttl_secs(),
        }
    }

    pub fn issue(&self, identity: &SessionIdentity) -> AuthResult<String> {
        self.issue_at(identity, Utc::now().timestamp())
    }

    pub fn issue_at(&self, identity: &SessionIdentity, now_secs: i64) -> AuthResult<String> {
        let claims = Claims {
            user_id: identity.user_id,
            email: identity.email.clone(),
            name: identity.name.clone(),
            iat: now_secs,
            exp: now_secs.saturating_add(self.ttl_secs),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))
    }

    pub fn issue_for(&self, user: User) -> AuthResult<AuthenticatedUser> {
        let token = self.issue(&identity_of(&user))?;
        Ok(AuthenticatedUser { user, token })
    }

    /// Check signature and expiry
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Session token rejected");
                AuthError::Unauthorized
            })
    }
}
