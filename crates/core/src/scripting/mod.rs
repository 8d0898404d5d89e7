//! Launching the external export automation.
//!
//! The SAP GUI macros stay outside this workspace (VBScript, Python, shell or
//! a compiled helper). This module only knows how to start them as child
//! processes, hand them their parameters and collect what they print.

pub mod binary;
pub mod executor;
pub mod kind;
pub mod python;
pub mod shell;
pub mod subprocess;
pub mod vbscript;

pub use executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
pub use kind::{execute_script, ScriptKind};
