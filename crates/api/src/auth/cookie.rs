//! The `access_token` cookie used by the browser frontend.
//!
//! API clients send `Authorization: Bearer`; the browser gets the same
//! token as an `HttpOnly` cookie on login so page loads are authenticated
//! without script access to the token.

use std::fmt;
use std::str::FromStr;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(format!("Invalid SameSite value: '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Adds the `Secure` attribute. Must be on behind HTTPS.
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

impl CookieConfig {
    /// Load from the environment.
    ///
    /// | Env Var           | Default |
    /// |-------------------|---------|
    /// | `COOKIE_SECURE`   | `false` |
    /// | `COOKIE_SAMESITE` | `lax`   |
    pub fn from_env() -> Self {
        let secure = std::env::var("COOKIE_SECURE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let same_site = std::env::var("COOKIE_SAMESITE")
            .ok()
            .map(|v| v.parse().expect("COOKIE_SAMESITE must be strict, lax or none"))
            .unwrap_or(SameSite::Lax);

        Self { secure, same_site }
    }

    /// `Set-Cookie` value carrying `token` for `max_age_secs`.
    pub fn access_cookie(&self, token: &str, max_age_secs: i64) -> String {
        self.build(token, max_age_secs)
    }

    /// `Set-Cookie` value that removes the access cookie.
    pub fn clear_access_cookie(&self) -> String {
        self.build("", 0)
    }

    fn build(&self, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{ACCESS_TOKEN_COOKIE}={value}; Path=/; HttpOnly; SameSite={}; Max-Age={max_age_secs}",
            self.same_site
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Read the access token from the request's `Cookie` headers.
pub fn access_token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == ACCESS_TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
