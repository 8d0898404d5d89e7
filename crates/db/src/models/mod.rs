//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and the DTOs used to insert or patch it.

pub mod bom;
pub mod execution;
pub mod role;
pub mod session;
pub mod user;
