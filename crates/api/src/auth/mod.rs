//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- access tokens and refresh-token helpers.
//! - [`cookie`] -- the `access_token` cookie set on login.

pub mod cookie;
pub mod jwt;
pub mod password;
