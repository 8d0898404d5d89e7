//! Shell script executor.
//!
//! Spawns `bash` with the script path as its argument.

use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::subprocess;

/// Executor for shell (bash) scripts.
pub struct ShellExecutor;

impl ScriptExecutor for ShellExecutor {
    async fn execute(
        &self,
        script_path: &str,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        let mut cmd = tokio::process::Command::new("bash");
        cmd.arg(script_path);
        subprocess::run_command(&mut cmd, input).await
    }
}
