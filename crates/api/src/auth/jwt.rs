//! Portal session tokens.
//!
//! The access token is an HS256 JWT carrying the user id and role name; it
//! travels as a Bearer header or in the `access_token` cookie. The refresh
//! token is an opaque random string whose SHA-256 digest is the session key
//! in `user_sessions`.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::Error as JwtError;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rpa_core::types::DbId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// `users.id` of the holder.
    pub sub: DbId,
    /// Role name when the token was issued. A role change takes effect on
    /// the next login or refresh.
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
    pub refresh_token_expiry_days: i64,
}

/// A freshly minted refresh token. Only `hash` is stored.
#[derive(Debug)]
pub struct RefreshToken {
    pub plaintext: String,
    pub hash: String,
}

impl RefreshToken {
    pub fn generate() -> Self {
        let plaintext = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let hash = hash_refresh_token(&plaintext);
        Self { plaintext, hash }
    }
}

impl JwtConfig {
    /// Read `JWT_SECRET` (required), `JWT_ACCESS_EXPIRY_MINS` (default one
    /// working day, 1440) and `JWT_REFRESH_EXPIRY_DAYS` (default 7).
    ///
    /// # Panics
    ///
    /// On a missing or empty secret, or a non-numeric expiry.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        assert!(!secret.is_empty(), "JWT_SECRET must be set and non-empty");

        Self {
            secret,
            access_token_expiry_mins: env_i64("JWT_ACCESS_EXPIRY_MINS", 1440),
            refresh_token_expiry_days: env_i64("JWT_REFRESH_EXPIRY_DAYS", 7),
        }
    }

    /// Access token lifetime in seconds, as reported in `expires_in` and the
    /// cookie `Max-Age`.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }

    pub fn issue_access_token(&self, user_id: DbId, role: &str) -> Result<String, JwtError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            role: role.to_owned(),
            exp: iat + self.access_ttl_secs(),
            iat,
            jti: Uuid::new_v4().to_string(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    /// Check signature and expiry, returning the claims.
    pub fn decode_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
    }
}

/// Lowercase hex SHA-256 of a refresh token.
pub fn hash_refresh_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn env_i64(key: &str, default: i64) -> i64 {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be an integer, got '{raw}'")),
        Err(_) => default,
    }
}
