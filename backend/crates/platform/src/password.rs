//! Password Hashing and Verification
//!
//! - Argon2id hashing (memory-hard) with a configurable cost
//! - Zeroization of clear-text passwords on drop
//! - Constant-time verification (delegated to `argon2`)
//! - Optional application-wide pepper
//!
//! Hashing is CPU-bound by design. Async callers should run
//! [`PasswordHasher::hash`] and [`PasswordHasher::verify`] on a blocking
//! thread (`tokio::task::spawn_blocking`).

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum password length, in Unicode code points
pub const MIN_PASSWORD_LENGTH: usize = 6;

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters long")]
    TooShort { min: usize, actual: usize },
}

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,

    #[error("Invalid hash cost parameters: {0}")]
    InvalidCost(String),
}

// ============================================================================
// Hash cost
// ============================================================================

/// Argon2id work parameters
///
/// The default (19 MiB, 2 passes, 1 lane) is the OWASP baseline and costs
/// at least as much per guess as bcrypt with 12 rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashCost {
    /// Smallest parameters argon2 accepts. Tests only.
    pub const fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn params(&self) -> Result<Params, PasswordHashError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordHashError::InvalidCost(e.to_string()))
    }
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// - Not `Clone`, so copies cannot be made by accident
/// - `Debug` output is redacted
/// - Input is NFKC-normalized so visually identical passwords hash alike
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Accept a new password, enforcing [`MIN_PASSWORD_LENGTH`]
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let password = Self::from_input(raw);

        let char_count = password.0.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        Ok(password)
    }

    /// Wrap a password for verification only (no policy check)
    pub fn from_input(mut raw: String) -> Self {
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Hashed password in PHC string format (`$argon2id$v=19$m=...`)
///
/// The PHC string carries algorithm, parameters and salt, so hashes made
/// under an older [`HashCost`] still verify.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Create from a stored PHC string
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    pub fn into_phc_string(self) -> String {
        self.hash
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Hasher
// ============================================================================

/// Argon2id hasher bound to a cost and an optional pepper
#[derive(Clone)]
pub struct PasswordHasher {
    cost: HashCost,
    pepper: Option<Vec<u8>>,
}

impl PasswordHasher {
    pub fn new(cost: HashCost, pepper: Option<Vec<u8>>) -> Self {
        Self { cost, pepper }
    }

    pub fn cost(&self) -> HashCost {
        self.cost
    }

    /// Hash with a fresh random 128-bit salt
    pub fn hash(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.cost.params()?);
        let salt = SaltString::generate(&mut OsRng);

        let input = self.peppered(password);
        let hash = argon2
            .hash_password(&input, &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }

    /// Verify a password against a stored hash
    ///
    /// Unparseable hashes verify as `false`.
    pub fn verify(&self, hashed: &HashedPassword, password: &ClearTextPassword) -> bool {
        let parsed = match PasswordHash::new(&hashed.hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        let input = self.peppered(password);
        // Argon2 compares digests in constant time
        Argon2::default().verify_password(&input, &parsed).is_ok()
    }

    /// True if the stored hash was made with another algorithm or a
    /// different cost than this hasher's
    pub fn needs_rehash(&self, hashed: &HashedPassword) -> bool {
        let parsed = match PasswordHash::new(&hashed.hash) {
            Ok(h) => h,
            Err(_) => return true,
        };

        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }

        match Params::try_from(&parsed) {
            Ok(params) => {
                params.m_cost() != self.cost.memory_kib
                    || params.t_cost() != self.cost.iterations
                    || params.p_cost() != self.cost.parallelism
            }
            Err(_) => true,
        }
    }

    fn peppered(&self, password: &ClearTextPassword) -> PepperedInput {
        let mut bytes = password.as_bytes().to_vec();
        if let Some(pepper) = &self.pepper {
            bytes.extend_from_slice(pepper);
        }
        PepperedInput(bytes)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(HashCost::default(), None)
    }
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Password bytes with pepper appended; wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
struct PepperedInput(Vec<u8>);

impl std::ops::Deref for PepperedInput {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================================================
// Tests
// ============================================================================
