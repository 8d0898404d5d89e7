//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller, from a Bearer token or the
//!   `access_token` cookie.
//! - [`rbac::RequireAdmin`] -- requires `admin`.
//! - [`rbac::RequireOperator`] -- requires `user` or `admin` (may run exports).

pub mod auth;
pub mod rbac;
