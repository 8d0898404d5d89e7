//! Compiled export helpers (`.exe` launchers, native tools).

use std::path::Path;

use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::subprocess;

/// Spawns the helper itself, with no interpreter in between.
pub struct BinaryExecutor;

/// Fail early with a clear error instead of an opaque spawn failure.
async fn ensure_runnable(path: &Path) -> Result<(), ScriptError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|_| ScriptError::NotFound(path.display().to_string()))?;
    if !meta.is_file() {
        return Err(ScriptError::NotFound(path.display().to_string()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(ScriptError::PermissionDenied(format!(
                "{} has no execute bit",
                path.display()
            )));
        }
    }
    Ok(())
}

impl ScriptExecutor for BinaryExecutor {
    async fn execute(
        &self,
        script_path: &str,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        ensure_runnable(Path::new(script_path)).await?;
        subprocess::run_command(&mut tokio::process::Command::new(script_path), input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::test_helpers::default_input;

    #[tokio::test]
    async fn missing_helper_is_not_found() {
        let result = BinaryExecutor
            .execute("/opt/rpa/missing-ke30.exe", default_input())
            .await;
        assert!(matches!(result, Err(ScriptError::NotFound(_))));
    }

    #[tokio::test]
    async fn directory_is_not_a_helper() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = BinaryExecutor
            .execute(dir.path().to_str().expect("path"), default_input())
            .await;
        assert!(matches!(result, Err(ScriptError::NotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_without_execute_bit_is_refused() {
        let f = tempfile::NamedTempFile::new().expect("temp file");
        let result = BinaryExecutor
            .execute(f.path().to_str().expect("path"), default_input())
            .await;
        assert!(matches!(result, Err(ScriptError::PermissionDenied(_))));
    }
}
