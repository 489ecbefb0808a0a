//! Change Password Use Case

use std::sync::Arc;

use directory::UserDirectory;
use directory::models::UserPatch;
use kernel::session::SessionIdentity;

use crate::application::credentials::PasswordService;
use crate::application::provided;
use crate::domain::value_object::RawPassword;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Default)]
pub struct ChangePasswordInput {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub struct ChangePasswordUseCase<D>
where
    D: UserDirectory,
{
    directory: Arc<D>,
    passwords: PasswordService,
}

impl<D> ChangePasswordUseCase<D>
where
    D: UserDirectory + Sync,
{
    pub fn new(directory: Arc<D>, passwords: PasswordService) -> Self {
        Self {
            directory,
            passwords,
        }
    }

    pub async fn execute(
        &self,
        session: &SessionIdentity,
        input: ChangePasswordInput,
    ) -> AuthResult<()> {
        let (Some(current), Some(new)) = (
            provided(input.current_password),
            provided(input.new_password),
        ) else {
            return Err(AuthError::Validation(
                "Current password and new password are required".to_string(),
            ));
        };

        let new = RawPassword::new(new)?;

        let user = self
            .directory
            .find_user_by_id(&session.user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let current = RawPassword::for_verification(current);
        if !self.passwords.verify(&user.password_hash, current).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let hashed = self.passwords.hash(new).await?;
        self.directory
            .update_user(
                &user.id,
                UserPatch {
                    password_hash: Some(hashed.into_phc_string()),
                    ..UserPatch::default()
                },
            )
            .await?
            .ok_or(AuthError::Unauthorized)?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::login::{LoginInput, LoginUseCase};
    use crate::application::register::{RegisterInput, RegisterUseCase};
    use crate::application::test_support::{memory_directory, services};
    use crate::application::token::identity_of;
    use directory::models::User;

    fn change(current: &str, new: &str) -> ChangePasswordInput {
        ChangePasswordInput {
            current_password: Some(current.to_string()),
            new_password: Some(new.to_string()),
        }
    }

    fn login(password: &str) -> LoginInput {
        LoginInput {
            email: Some("ann@example.com".into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn test_change_password_flow() {
        let directory = memory_directory();
        let (passwords, tokens) = services();
        let registered = RegisterUseCase::new(directory.clone(), passwords.clone(), tokens.clone())
            .execute(RegisterInput {
                email: Some("ann@example.com".into()),
                password: Some("secret1".into()),
                name: Some("Ann".into()),
            })
            .await
            .unwrap();
        let session = identity_of(&registered.user);
        let use_case = ChangePasswordUseCase::new(directory.clone(), passwords.clone());

        let wrong = use_case.execute(&session, change("nope12", "secret2")).await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        let short = use_case.execute(&session, change("secret1", "123")).await;
        assert!(matches!(short, Err(AuthError::Validation(_))));

        use_case
            .execute(&session, change("secret1", "secret2"))
            .await
            .unwrap();

        let login_use_case = LoginUseCase::new(directory, passwords, tokens);
        assert!(login_use_case.execute(login("secret2")).await.is_ok());
        assert!(matches!(
            login_use_case.execute(login("secret1")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_change_password_requires_both() {
        let directory = memory_directory();
        let (passwords, _) = services();
        let session = identity_of(&User::new("a@b.com", "h".into(), "Ann".into()));
        let result = ChangePasswordUseCase::new(directory, passwords)
            .execute(
                &session,
                ChangePasswordInput {
                    current_password: Some("secret1".into()),
                    new_password: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }
}
