//! Profile Use Cases
//!
//! Reading and editing the signed-in user's own record.

use std::sync::Arc;

use directory::UserDirectory;
use directory::models::{User, UserPatch};
use kernel::session::SessionIdentity;

use crate::application::provided;
use crate::application::token::{AuthenticatedUser, TokenService};
use crate::domain::value_object::{DisplayName, Email};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Current user lookup
///
/// A valid token whose account no longer exists is treated as unauthorized.
pub struct CurrentUserUseCase<D>
where
    D: UserDirectory,
{
    directory: Arc<D>,
}

impl<D> CurrentUserUseCase<D>
where
    D: UserDirectory + Sync,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    pub async fn execute(&self, session: &SessionIdentity) -> AuthResult<User> {
        self.directory
            .find_user_by_id(&session.user_id)
            .await?
            .ok_or(AuthError::Unauthorized)
    }
}

/// Name and email edit; reissues the token so its claims stay current
pub struct UpdateProfileUseCase<D>
where
    D: UserDirectory,
{
    directory: Arc<D>,
    tokens: TokenService,
}

impl<D> UpdateProfileUseCase<D>
where
    D: UserDirectory + Sync,
{
    pub fn new(directory: Arc<D>, tokens: TokenService) -> Self {
        Self { directory, tokens }
    }

    pub async fn execute(
        &self,
        session: &SessionIdentity,
        input: UpdateProfileInput,
    ) -> AuthResult<AuthenticatedUser> {
        let name = provided(input.name);
        let email = provided(input.email);
        if name.is_none() && email.is_none() {
            return Err(AuthError::Validation(
                "Name or email is required".to_string(),
            ));
        }

        let patch = UserPatch {
            display_name: name
                .map(|n| DisplayName::parse(&n).map(DisplayName::into_string))
                .transpose()?,
            email: email
                .map(|e| Email::parse(&e).map(Email::into_string))
                .transpose()?,
            password_hash: None,
        };

        let user = self
            .directory
            .update_user(&session.user_id, patch)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        tracing::info!(user_id = %user.id, "Profile updated");

        self.tokens.issue_for(user)
    }
}
