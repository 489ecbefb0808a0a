//! Display Name Value Object

use std::fmt;

use crate::error::{AuthError, AuthResult};

pub const DISPLAY_NAME_MIN_LENGTH: usize = 2;
pub const DISPLAY_NAME_MAX_LENGTH: usize = 50;

/// Trimmed name shown to other users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(raw: &str) -> AuthResult<Self> {
        let trimmed = raw.trim();
        let length = trimmed.chars().count();
        if !(DISPLAY_NAME_MIN_LENGTH..=DISPLAY_NAME_MAX_LENGTH).contains(&length) {
            return Err(AuthError::Validation(format!(
                "Name must be between {} and {} characters",
                DISPLAY_NAME_MIN_LENGTH, DISPLAY_NAME_MAX_LENGTH
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(DisplayName::parse("Al").is_ok());
        assert!(DisplayName::parse(&"x".repeat(50)).is_ok());
        assert!(DisplayName::parse("A").is_err());
        assert!(DisplayName::parse(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_trimmed_before_counting() {
        assert!(DisplayName::parse("  A  ").is_err());
        assert_eq!(DisplayName::parse("  Ann ").unwrap().as_str(), "Ann");
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 25 two-byte characters
        assert!(DisplayName::parse(&"é".repeat(25)).is_ok());
    }

    #[test]
    fn test_message() {
        match DisplayName::parse("") {
            Err(AuthError::Validation(msg)) => {
                assert_eq!(msg, "Name must be between 2 and 50 characters")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
