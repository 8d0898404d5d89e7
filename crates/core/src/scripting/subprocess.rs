//! Child-process plumbing shared by the executors.
//!
//! Executors build a [`Command`] for their runtime and hand it to
//! [`run_command`], which feeds stdin, drains both pipes and stops the child
//! on timeout or cancellation.

use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::executor::{ScriptError, ScriptInput, ScriptOutput};

/// Per-stream capture limit. Output beyond it is read and discarded.
/// Stderr is stored as the run's stack trace.
const MAX_CAPTURE_BYTES: u64 = 1024 * 1024;

enum Ending {
    Exited(std::process::ExitStatus),
    TimedOut,
    Cancelled,
}

pub async fn run_command(
    cmd: &mut Command,
    input: ScriptInput,
) -> Result<ScriptOutput, ScriptError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .envs(input.env_vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if let Some(dir) = &input.working_directory {
        cmd.current_dir(dir);
    }

    let started = Instant::now();
    let mut child = cmd.spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        let payload = serde_json::to_vec(&input.data).unwrap_or_default();
        // Most SAP macros ignore stdin and exit before reading it.
        let _ = stdin.write_all(&payload).await;
    }

    let stdout = capture(child.stdout.take());
    let stderr = capture(child.stderr.take());

    let cancelled = async {
        match &input.cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };

    let ending = tokio::select! {
        waited = tokio::time::timeout(input.timeout, child.wait()) => match waited {
            Ok(status) => Ending::Exited(status?),
            Err(_) => Ending::TimedOut,
        },
        () = cancelled => Ending::Cancelled,
    };
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match ending {
        Ending::Exited(status) => {
            let stdout = collect(stdout).await;
            let stderr = collect(stderr).await;
            let parsed_output = serde_json::from_str(stdout.trim()).ok();
            Ok(ScriptOutput {
                stdout,
                stderr,
                exit_code: status.code().unwrap_or(-1),
                duration_ms: elapsed_ms,
                parsed_output,
            })
        }
        Ending::TimedOut => {
            stop(&mut child).await;
            Err(ScriptError::Timeout { elapsed_ms })
        }
        Ending::Cancelled => {
            stop(&mut child).await;
            Err(ScriptError::Cancelled { elapsed_ms })
        }
    }
}

/// Kill and reap, so no zombie outlives the run.
async fn stop(child: &mut Child) {
    if child.start_kill().is_ok() {
        let _ = child.wait().await;
    }
}

fn capture<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(stream) = stream {
            let mut head = stream.take(MAX_CAPTURE_BYTES);
            let _ = head.read_to_end(&mut buf).await;
            // Keep reading past the cap; a closed pipe would kill the child.
            let _ = tokio::io::copy(&mut head.into_inner(), &mut tokio::io::sink()).await;
        }
        buf
    })
}

async fn collect(task: JoinHandle<Vec<u8>>) -> String {
    let bytes = task.await.unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::scripting::test_helpers::default_input;

    fn bash(script: &str) -> Command {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn passes_env_and_stdin() {
        let mut input = default_input();
        input.env_vars = vec![("RPA_PROCESS".into(), "sales".into())];
        let output = run_command(&mut bash("echo $RPA_PROCESS; cat"), input)
            .await
            .expect("run");
        assert_eq!(output.stdout, "sales\n{\"process\":\"purchasing\"}");
        assert!(output.succeeded());
    }

    #[tokio::test]
    async fn output_past_the_cap_is_drained() {
        let output = run_command(&mut bash("head -c 3000000 /dev/zero; echo done >&2"), default_input())
            .await
            .expect("run");
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.len() as u64, MAX_CAPTURE_BYTES);
        assert_eq!(output.stderr, "done\n");
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let mut input = default_input();
        input.timeout = Duration::from_millis(100);
        let result = run_command(&mut bash("sleep 5"), input).await;
        assert!(matches!(result, Err(ScriptError::Timeout { .. })));
    }

    #[tokio::test]
    async fn cancellation_stops_the_child() {
        let token = CancellationToken::new();
        let mut input = default_input();
        input.cancel = Some(token.clone());

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = run_command(&mut bash("sleep 5"), input).await;
        assert!(matches!(result, Err(ScriptError::Cancelled { elapsed_ms }) if elapsed_ms < 5000));
    }
}
