//! RPA portal API server library.
//!
//! Exposes config, state, error handling, routes and the export
//! orchestrator so the binaries and integration tests share them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
