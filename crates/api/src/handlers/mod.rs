//! Request handlers, one module per resource.
//!
//! Handlers delegate to `rpa_db` repositories and the services in
//! [`crate::services`], mapping failures through [`AppError`](crate::error::AppError).

pub mod admin;
pub mod auth;
pub mod bom;
pub mod executions;
pub mod processes;
