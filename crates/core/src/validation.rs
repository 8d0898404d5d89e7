//! Input rules for account data.

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length in bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Normalize a password before hashing or verifying it.
///
/// Leading and trailing whitespace is not significant.
pub fn normalize_password(password: &str) -> &str {
    password.trim()
}

/// Check a (normalized) password against the length rules.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(format!(
            "Password is too long (maximum {MAX_PASSWORD_BYTES} bytes)"
        ));
    }
    Ok(())
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal structural check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), String> {
    let invalid = || Err(format!("Invalid email address: '{email}'"));
    let Some((local, domain)) = email.split_once('@') else {
        return invalid();
    };
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return invalid();
    }
    Ok(())
}
