//! Script runtime selection by file extension.

use std::path::Path;

use serde::Serialize;

use super::binary::BinaryExecutor;
use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::python::PythonExecutor;
use super::shell::ShellExecutor;
use super::vbscript::VbScriptExecutor;

/// Runtime an automation script needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    Shell,
    Python,
    VbScript,
    Binary,
}

impl ScriptKind {
    /// Infer the runtime from the file extension (case-insensitive).
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("sh") => ScriptKind::Shell,
            Some("py") => ScriptKind::Python,
            Some("vbs") => ScriptKind::VbScript,
            _ => ScriptKind::Binary,
        }
    }
}

/// Run `script_path` with the executor matching its extension.
pub async fn execute_script(
    script_path: &str,
    input: ScriptInput,
) -> Result<ScriptOutput, ScriptError> {
    match ScriptKind::from_path(script_path) {
        ScriptKind::Shell => ShellExecutor.execute(script_path, input).await,
        ScriptKind::Python => PythonExecutor::default().execute(script_path, input).await,
        ScriptKind::VbScript => VbScriptExecutor.execute(script_path, input).await,
        ScriptKind::Binary => BinaryExecutor.execute(script_path, input).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(ScriptKind::from_path("/opt/rpa/compras.sh"), ScriptKind::Shell);
        assert_eq!(ScriptKind::from_path("C:\\rpa\\ventas.PY"), ScriptKind::Python);
        assert_eq!(ScriptKind::from_path("C:/rpa/me80fn.vbs"), ScriptKind::VbScript);
        assert_eq!(ScriptKind::from_path("C:/rpa/ke30.exe"), ScriptKind::Binary);
        assert_eq!(ScriptKind::from_path("/usr/local/bin/export"), ScriptKind::Binary);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dispatches_shell_scripts_to_bash() {
        let script = crate::scripting::test_helpers::write_temp_script(
            ".sh",
            "#!/bin/bash\necho dispatched\n",
        );
        let output = execute_script(
            script.path().to_str().expect("path"),
            crate::scripting::test_helpers::default_input(),
        )
        .await
        .expect("execute");
        assert_eq!(output.stdout.trim(), "dispatched");
    }
}
