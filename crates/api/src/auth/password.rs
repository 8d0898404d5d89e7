//! Argon2id password hashing and verification.
//!
//! Passwords are trimmed before hashing and before verifying.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rpa_core::validation::normalize_password;

/// Hash a password, returning the PHC string (algorithm, params, salt, hash).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(normalize_password(password).as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only if `hash` is not a valid PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(normalize_password(password).as_bytes(), &parsed_hash)
    {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
