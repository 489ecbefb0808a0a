//! Login Use Case
//!
//! Unknown email and wrong password fail identically, with comparable
//! latency: a dummy verification runs when no account matches. A hash made
//! with outdated parameters is replaced after a successful login.

use std::sync::Arc;

use directory::UserDirectory;
use directory::models::{User, UserPatch};
use platform::password::HashedPassword;

use crate::application::credentials::{PasswordService, Verification};
use crate::application::provided;
use crate::application::token::{AuthenticatedUser, TokenService};
use crate::domain::value_object::{Email, RawPassword};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Default)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginInput {
    pub fn attempted_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

pub struct LoginUseCase<D>
where
    D: UserDirectory,
{
    directory: Arc<D>,
    passwords: PasswordService,
    tokens: TokenService,
}

impl<D> LoginUseCase<D>
where
    D: UserDirectory + Sync,
{
    pub fn new(directory: Arc<D>, passwords: PasswordService, tokens: TokenService) -> Self {
        Self {
            directory,
            passwords,
            tokens,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> AuthResult<AuthenticatedUser> {
        let (Some(email), Some(password)) = (provided(input.email), provided(input.password))
        else {
            return Err(AuthError::Validation(
                "Email and password are required".to_string(),
            ));
        };

        let email = Email::parse(&email)?;
        let password = RawPassword::for_verification(password);

        let Some(user) = self.directory.find_user_by_email(email.as_str()).await? else {
            self.passwords.burn(password).await?;
            return Err(AuthError::InvalidCredentials);
        };

        let rehashed = match self
            .passwords
            .verify_upgrading(&user.password_hash, password)
            .await?
        {
            Verification::Rejected => return Err(AuthError::InvalidCredentials),
            Verification::Accepted { rehashed } => rehashed,
        };

        tracing::debug!(user_id = %user.id, "Credentials verified");

        if let Some(rehashed) = rehashed {
            self.upgrade_hash(&user, rehashed).await;
        }

        self.tokens.issue_for(user)
    }

    /// Best effort: the login already succeeded
    async fn upgrade_hash(&self, user: &User, rehashed: HashedPassword) {
        let patch = UserPatch {
            password_hash: Some(rehashed.into_phc_string()),
            ..UserPatch::default()
        };
        match self.directory.update_user(&user.id, patch).await {
            Ok(_) => tracing::info!(user_id = %user.id, "Password hash upgraded"),
            Err(e) => tracing::warn!(user_id = %user.id, error = %e, "Password hash upgrade failed"),
        }
    }
}
