//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Client identification from proxy headers
//! - Password hashing (Argon2id) with zeroized clear text
//! - Per-client rate limiting (fixed window opened on first request)

pub mod client;
pub mod password;
pub mod rate_limit;
