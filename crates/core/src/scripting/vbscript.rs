//! VBScript executor.
//!
//! SAP GUI scripting recordings are VBScript files; they run under the
//! Windows console script host.

use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::subprocess;

/// Console script host binary.
const SCRIPT_HOST: &str = "cscript";

/// Executor for `.vbs` SAP GUI scripts.
pub struct VbScriptExecutor;

impl VbScriptExecutor {
    /// Arguments passed to the script host before the script path.
    pub fn host_args() -> [&'static str; 1] {
        // Interactive mode, so runtime errors reach stderr as the stack trace.
        ["//nologo"]
    }
}

impl ScriptExecutor for VbScriptExecutor {
    async fn execute(
        &self,
        script_path: &str,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        if tokio::fs::metadata(script_path).await.is_err() {
            return Err(ScriptError::NotFound(script_path.to_string()));
        }
        let mut cmd = tokio::process::Command::new(SCRIPT_HOST);
        cmd.args(Self::host_args()).arg(script_path);
        subprocess::run_command(&mut cmd, input).await
    }
}
