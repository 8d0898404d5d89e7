//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an open transaction) as the first argument.

pub mod bom_repo;
pub mod execution_repo;
pub mod role_repo;
pub mod session_repo;
pub mod user_repo;

pub use bom_repo::BomRepo;
pub use execution_repo::ExecutionRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
