//! Bounded polling loop.
//!
//! The desktop automation has no completion events, so every wait is a fixed
//! number of checks separated by a fixed sleep. [`poll_until`] runs such a
//! loop and fails with a descriptive message once the attempts are used up.

use std::future::Future;
use std::time::Duration;

use crate::error::CoreError;

/// Default number of checks before giving up.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;

/// Default sleep between two checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How many times to check and how long to sleep between checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_POLL_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Result<Self, CoreError> {
        if attempts == 0 {
            return Err(CoreError::Validation(
                "Poll attempts must be at least 1".into(),
            ));
        }
        Ok(Self { attempts, interval })
    }

    /// Upper bound of the time spent sleeping (excludes time spent checking).
    pub fn max_wait(&self) -> Duration {
        self.interval * self.attempts.saturating_sub(1)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PollError {
    #[error("{what} not ready after {attempts} attempts")]
    Exhausted { what: String, attempts: u32 },
}

/// Call `check` until it yields `Some`, at most `policy.attempts` times.
///
/// Sleeps `policy.interval` after every failed check except the last one.
pub async fn poll_until<T, F, Fut>(
    policy: PollPolicy,
    what: &str,
    mut check: F,
) -> Result<T, PollError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=policy.attempts {
        if let Some(value) = check(attempt).await {
            return Ok(value);
        }
        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Err(PollError::Exhausted {
        what: what.to_string(),
        attempts: policy.attempts,
    })
}

/// Wait until `path` exists and is non-empty, returning its size in bytes.
///
/// Spreadsheet programs create the file before they finish writing it, so an
/// empty file counts as not ready.
pub async fn wait_for_file(
    policy: PollPolicy,
    path: &std::path::Path,
) -> Result<u64, PollError> {
    let what = format!("Export file {}", path.display());
    poll_until(policy, &what, |_| async move {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Some(meta.len()),
            _ => None,
        }
    })
    .await
}
