//! Password hashing service
//!
//! Argon2 is CPU- and memory-bound, so every hash and verify runs on the
//! blocking pool instead of an async worker.

use std::sync::Arc;

use platform::password::{HashedPassword, PasswordHashError, PasswordHasher};
use tokio::sync::OnceCell;

use crate::application::config::AuthConfig;
use crate::domain::value_object::RawPassword;
use crate::error::{AuthError, AuthResult};

const DUMMY_PASSWORD: &str = "timing-equalizer-not-a-real-password";

/// Result of a login-time verification
#[derive(Debug)]
pub enum Verification {
    Rejected,
    /// `rehashed` is set when the stored hash used other parameters
    Accepted { rehashed: Option<HashedPassword> },
}

#[derive(Clone)]
pub struct PasswordService {
    hasher: PasswordHasher,
    /// Hash verified against when the account does not exist
    dummy: Arc<OnceCell<HashedPassword>>,
}

impl PasswordService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            hasher: PasswordHasher::new(config.hash_cost, config.password_pepper.clone()),
            dummy: Arc::new(OnceCell::new()),
        }
    }

    pub async fn hash(&self, password: RawPassword) -> AuthResult<HashedPassword> {
        let hasher = self.hasher.clone();
        let clear = password.into_clear_text();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&clear))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))??;
        Ok(hashed)
    }

    /// Verify against a stored PHC string
    ///
    /// A stored value that is not a valid hash never verifies.
    pub async fn verify(&self, stored: &str, password: RawPassword) -> AuthResult<bool> {
        let hashed = match HashedPassword::from_phc_string(stored) {
            Ok(hashed) => hashed,
            Err(e) => {
                tracing::error!(error = %e, "Stored password hash is unreadable");
                // still spend the time so the response is not faster
                self.burn(password).await?;
                return Ok(false);
            }
        };
        self.verify_hashed(hashed, password).await
    }

    /// Verify, and rehash the same clear text when the stored hash is outdated
    pub async fn verify_upgrading(
        &self,
        stored: &str,
        password: RawPassword,
    ) -> AuthResult<Verification> {
        let hashed = match HashedPassword::from_phc_string(stored) {
            Ok(hashed) => hashed,
            Err(e) => {
                tracing::error!(error = %e, "Stored password hash is unreadable");
                self.burn(password).await?;
                return Ok(Verification::Rejected);
            }
        };

        let hasher = self.hasher.clone();
        let clear = password.into_clear_text();
        let verification =
            tokio::task::spawn_blocking(move || -> Result<Verification, PasswordHashError> {
                if !hasher.verify(&hashed, &clear) {
                    return Ok(Verification::Rejected);
                }
                let rehashed = if hasher.needs_rehash(&hashed) {
                    Some(hasher.hash(&clear)?)
                } else {
                    None
                };
                Ok(Verification::Accepted { rehashed })
            })
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))??;
        Ok(verification)
    }

    /// Spend one verification's worth of work and discard the result
    pub async fn burn(&self, password: RawPassword) -> AuthResult<()> {
        let dummy = self.dummy_hash().await?;
        self.verify_hashed(dummy, password).await?;
        Ok(())
    }

    /// Compute the dummy hash ahead of the first unknown-email login
    pub async fn warm_up(&self) -> AuthResult<()> {
        self.dummy_hash().await.map(|_| ())
    }

    async fn dummy_hash(&self) -> AuthResult<HashedPassword> {
        self.dummy
            .get_or_try_init(|| async {
                self.hash(RawPassword::for_verification(DUMMY_PASSWORD.to_string()))
                    .await
            })
            .await
            .cloned()
    }

    async fn verify_hashed(&self, hashed: HashedPassword, password: RawPassword) -> AuthResult<bool> {
        let hasher = self.hasher.clone();
        let clear = password.into_clear_text();
        tokio::task::spawn_blocking(move || hasher.verify(&hashed, &clear))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))
    }
}
