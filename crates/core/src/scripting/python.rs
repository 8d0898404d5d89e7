//! Python script executor.

use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::subprocess;

#[cfg(windows)]
const DEFAULT_INTERPRETER: &str = "python";
#[cfg(not(windows))]
const DEFAULT_INTERPRETER: &str = "python3";

/// Executor for Python automation scripts (e.g. `win32com` SAP GUI macros).
pub struct PythonExecutor {
    interpreter: String,
}

impl PythonExecutor {
    /// Use a specific interpreter, such as the `python.exe` of a virtualenv.
    pub fn with_interpreter(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl Default for PythonExecutor {
    fn default() -> Self {
        Self::with_interpreter(DEFAULT_INTERPRETER)
    }
}

impl ScriptExecutor for PythonExecutor {
    async fn execute(
        &self,
        script_path: &str,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        if tokio::fs::metadata(script_path).await.is_err() {
            return Err(ScriptError::NotFound(script_path.to_string()));
        }
        let mut cmd = tokio::process::Command::new(&self.interpreter);
        // Unbuffered so partial output survives a timeout kill.
        cmd.arg("-u").arg(script_path);
        subprocess::run_command(&mut cmd, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::test_helpers::default_input;

    #[tokio::test]
    async fn test_python_missing_script() {
        let result = PythonExecutor::default()
            .execute("/nonexistent/export_compras.py", default_input())
            .await;
        assert!(matches!(result, Err(ScriptError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_python_missing_interpreter_is_io_error() {
        let script = crate::scripting::test_helpers::write_temp_script(".py", "print('x')\n");
        let result = PythonExecutor::with_interpreter("/nonexistent/python")
            .execute(script.path().to_str().expect("path"), default_input())
            .await;
        assert!(matches!(result, Err(ScriptError::IoError(_))));
    }
}
