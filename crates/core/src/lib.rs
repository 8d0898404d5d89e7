//! Domain logic for the RPA portal.
//!
//! Everything in this crate is free of database access so it can be unit
//! tested in isolation: roles and page access, execution lifecycle rules,
//! reporting periods, the bounded polling loop, automation script executors
//! and the SAP CS13 BOM export parser.

pub mod bom;
pub mod error;
pub mod execution_status;
pub mod pagination;
pub mod period;
pub mod polling;
pub mod process;
pub mod roles;
pub mod scripting;
pub mod types;
pub mod validation;
