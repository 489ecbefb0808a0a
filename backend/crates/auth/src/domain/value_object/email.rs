//! Email Value Object
//!
//! A `local@domain.tld` shaped address, stored trimmed and lowercased.

use std::fmt;

use crate::error::{AuthError, AuthResult};

pub const INVALID_EMAIL_MESSAGE: &str = "Invalid email format";

/// Email address value object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Validate and normalize
    pub fn parse(raw: &str) -> AuthResult<Self> {
        let trimmed = raw.trim();
        if !Self::is_valid_format(trimmed) {
            return Err(AuthError::Validation(INVALID_EMAIL_MESSAGE.to_string()));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Basic shape check: one `@`, no whitespace, a dot inside the domain
    fn is_valid_format(email: &str) -> bool {
        if email.chars().any(char::is_whitespace) {
            return false;
        }

        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };
        if local.is_empty() || domain.contains('@') {
            return false;
        }

        // some '.' with at least one character on each side
        domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes() {
        let email = Email::parse("  Ann@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "ann@example.com");
    }

    #[test]
    fn test_accepts_basic_shapes() {
        for ok in ["a@b.co", "first.last@sub.domain.io", "x+tag@b.com", "a@b..c"] {
            assert!(Email::parse(ok).is_ok(), "{ok} should be accepted");
        }
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "", "plain", "@b.com", "a@", "a@b", "a@.com", "a@com.", "a@b@c.com", "a b@c.com",
        ] {
            match Email::parse(bad) {
                Err(AuthError::Validation(msg)) => assert_eq!(msg, INVALID_EMAIL_MESSAGE),
                other => panic!("{bad:?} gave {other:?}"),
            }
        }
    }
}
