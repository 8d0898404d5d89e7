//! What every automation runtime shares: the launch parameters, the captured
//! result and the ways a launch can go wrong.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Everything a run hands to the automation.
#[derive(Debug, Clone)]
pub struct ScriptInput {
    /// Written to stdin as one JSON document, then stdin is closed.
    pub data: Value,
    /// Extra environment (`RPA_PERIOD_START`, `RPA_OUTPUT_FILE`, ...).
    pub env_vars: Vec<(String, String)>,
    pub working_directory: Option<String>,
    /// Hard limit; the child is killed when it elapses.
    pub timeout: Duration,
    pub cancel: Option<CancellationToken>,
}

/// What the automation printed and how it exited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process ended without an exit code (killed by a signal).
    pub exit_code: i32,
    pub duration_ms: u64,
    /// Stdout as JSON, when it is JSON.
    pub parsed_output: Option<Value>,
}

impl ScriptOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Script not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Execution timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Execution cancelled after {elapsed_ms} ms")]
    Cancelled { elapsed_ms: u64 },

    #[error("Script failed with exit code {exit_code}: {stderr}")]
    ExecutionFailed { exit_code: i32, stderr: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// One implementation per runtime (bash, python, cscript, native).
pub trait ScriptExecutor: Send + Sync {
    fn execute(
        &self,
        script_path: &str,
        input: ScriptInput,
    ) -> impl std::future::Future<Output = Result<ScriptOutput, ScriptError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_code: i32) -> ScriptOutput {
        ScriptOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code,
            duration_ms: 0,
            parsed_output: None,
        }
    }

    #[test]
    fn only_zero_exit_succeeds() {
        assert!(output(0).succeeded());
        assert!(!output(1).succeeded());
        assert!(!output(-1).succeeded());
    }

    #[test]
    fn messages_name_the_script_and_limit() {
        assert_eq!(
            ScriptError::NotFound("C:\\rpa\\compras.vbs".into()).to_string(),
            "Script not found: C:\\rpa\\compras.vbs"
        );
        assert_eq!(
            ScriptError::Timeout { elapsed_ms: 5000 }.to_string(),
            "Execution timed out after 5000 ms"
        );
        assert_eq!(
            ScriptError::ExecutionFailed {
                exit_code: 1,
                stderr: "SAP session not found".into(),
            }
            .to_string(),
            "Script failed with exit code 1: SAP session not found"
        );
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err = ScriptError::from(std::io::Error::other("pipe closed"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&ScriptError::Cancelled { elapsed_ms: 3 }).is_none());
    }
}
