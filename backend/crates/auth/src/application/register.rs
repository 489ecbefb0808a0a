//! Register Use Case
//!
//! Creates a new account and signs it in.

use std::sync::Arc;

use directory::UserDirectory;
use directory::models::User;

use crate::application::credentials::PasswordService;
use crate::application::provided;
use crate::application::token::{AuthenticatedUser, TokenService};
use crate::domain::value_object::{DisplayName, Email, RawPassword};
use crate::error::{AuthError, AuthResult};

/// Register input; absent and empty fields are both "missing"
#[derive(Debug, Default)]
pub struct RegisterInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl RegisterInput {
    /// Email as submitted, for audit records
    pub fn attempted_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

/// Register use case
pub struct RegisterUseCase<D>
where
    D: UserDirectory,
{
    directory: Arc<D>,
    passwords: PasswordService,
    tokens: TokenService,
}

impl<D> RegisterUseCase<D>
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

    pub async fn execute(&self, input: RegisterInput) -> AuthResult<AuthenticatedUser> {
        let (Some(email), Some(password), Some(name)) = (
            provided(input.email),
            provided(input.password),
            provided(input.name),
        ) else {
            return Err(AuthError::Validation(
                "Email, password, and name are required".to_string(),
            ));
        };

        let password = RawPassword::new(password)?;
        let email = Email::parse(&email)?;
        let name = DisplayName::parse(&name)?;

        if self
            .directory
            .find_user_by_email(email.as_str())
            .await?
            .is_some()
        {
            return Err(AuthError::UserExists);
        }

        let hashed = self.passwords.hash(password).await?;
        let user = User::new(
            email.as_str(),
            hashed.into_phc_string(),
            name.into_string(),
        );

        // A racing registration for the same email surfaces as EmailTaken here
        let user = self.directory.create_user(user).await?;

        tracing::info!(user_id = %user.id, "User registered");

        self.tokens.issue_for(user)
    }
}
