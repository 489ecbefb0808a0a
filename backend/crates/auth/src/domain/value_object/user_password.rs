//! User Password Value Object
//!
//! Domain wrapper over `platform::password`. The clear text is zeroized on
//! drop and never appears in `Debug` output.

use platform::password::{ClearTextPassword, PasswordPolicyError};

use crate::error::{AuthError, AuthResult};

/// Password as typed by the user
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Accept a new password (registration, password change)
    pub fn new(raw: String) -> AuthResult<Self> {
        ClearTextPassword::new(raw).map(Self).map_err(|e| match e {
            PasswordPolicyError::TooShort { .. } => AuthError::Validation(e.to_string()),
        })
    }

    /// Wrap a password that is only going to be verified
    pub fn for_verification(raw: String) -> Self {
        Self(ClearTextPassword::from_input(raw))
    }

    pub fn into_clear_text(self) -> ClearTextPassword {
        self.0
    }
}

impl std::fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RawPassword([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_password_message() {
        match RawPassword::new("12345".to_string()) {
            Err(AuthError::Validation(msg)) => {
                assert_eq!(msg, "Password must be at least 6 characters long")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_six_characters_accepted() {
        assert!(RawPassword::new("secret".to_string()).is_ok());
    }

    #[test]
    fn test_verification_skips_policy() {
        let _ = RawPassword::for_verification("x".to_string());
    }
}
