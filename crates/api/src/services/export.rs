//! Export orchestrator.
//!
//! One run of a report export:
//! 1. reserve the process (one run per process at a time);
//! 2. record the run as `PENDING`;
//! 3. mark it `RUNNING` and launch the configured automation script;
//! 4. after a clean exit, poll for the spreadsheet in the output directory;
//! 5. record `SUCCESS`, `FAILED` or `CANCELLED`.
//!
//! The desktop session can only drive one SAP screen at a time, so a second
//! trigger for a process that is already running is rejected with a
//! conflict instead of being queued.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rpa_core::error::CoreError;
use rpa_core::execution_status::EXECUTION_PENDING;
use rpa_core::period::Period;
use rpa_core::polling::wait_for_file;
use rpa_core::process::Process;
use rpa_core::scripting::{execute_script, ScriptError, ScriptInput};
use rpa_core::types::DbId;
use rpa_db::models::execution::{CreateExecution, Execution};
use rpa_db::repositories::ExecutionRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::config::ExportConfig;
use crate::error::{AppError, AppResult};

/// Error recorded on runs left unfinished by a previous server process.
pub const STALE_RUN_MESSAGE: &str = "Server restarted before the run finished";

struct ActiveRun {
    /// `None` while the history row is being inserted.
    execution_id: Option<DbId>,
    cancel: CancellationToken,
}

type ActiveRuns = Arc<Mutex<HashMap<Process, ActiveRun>>>;

fn lock(runs: &ActiveRuns) -> MutexGuard<'_, HashMap<Process, ActiveRun>> {
    runs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a process reservation; dropping it frees the process.
struct ProcessSlot {
    runs: ActiveRuns,
    process: Process,
}

impl Drop for ProcessSlot {
    fn drop(&mut self) {
        lock(&self.runs).remove(&self.process);
    }
}

/// A recorded run that has not been executed yet.
pub struct ExportJob {
    pub execution: Execution,
    process: Process,
    period: Period,
    script: String,
    cancel: CancellationToken,
    _slot: ProcessSlot,
}

enum RunOutcome {
    Succeeded { path: PathBuf, file_name: String },
    Failed { message: String, stack_trace: Option<String> },
    Cancelled,
}

pub struct ExportOrchestrator {
    pool: PgPool,
    config: ExportConfig,
    active: ActiveRuns,
}

impl ExportOrchestrator {
    pub fn new(pool: PgPool, config: ExportConfig) -> Self {
        Self {
            pool,
            config,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Fail runs left `PENDING` or `RUNNING` by a process that died.
    ///
    /// Only rows older than [`ExportConfig::max_run_time`] are touched; a
    /// younger one may still be driven by `rpa-export` or another server.
    pub async fn recover_stale(&self) -> AppResult<u64> {
        let count =
            ExecutionRepo::fail_stale(&self.pool, STALE_RUN_MESSAGE, self.config.max_run_time())
                .await?;
        if count > 0 {
            tracing::warn!(count, "Marked unfinished executions as failed");
        }
        Ok(count)
    }

    /// Record a run and execute it in the background. Returns the `PENDING`
    /// row.
    pub async fn start(
        self: &Arc<Self>,
        user_id: DbId,
        process: Process,
        period: Period,
    ) -> AppResult<Execution> {
        let job = self.prepare(user_id, process, period).await?;
        let execution = job.execution.clone();

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let id = job.execution.id;
            if let Err(e) = this.execute(job).await {
                tracing::error!(execution_id = id, error = %e, "Export run could not be recorded");
            }
        });

        Ok(execution)
    }

    /// Reserve `process` and record a `PENDING` run.
    ///
    /// Fails with a conflict if the process is already running and with a
    /// validation error if no script is configured for it.
    pub async fn prepare(
        &self,
        user_id: DbId,
        process: Process,
        period: Period,
    ) -> AppResult<ExportJob> {
        let script = self.script(process)?;

        let cancel = CancellationToken::new();
        let slot = self.reserve(process, cancel.clone())?;

        let execution = ExecutionRepo::create(
            &self.pool,
            &CreateExecution {
                user_id,
                process: process.as_str().to_string(),
                period_start: period.start,
                period_end: period.end,
                file_name: Some(period.export_file_name(process)),
                sap_system: self.config.sap_system.clone(),
                transaction_code: Some(process.default_transaction().to_string()),
                machine: Some(self.config.machine.clone()),
            },
        )
        .await?;

        if let Some(run) = lock(&self.active).get_mut(&process) {
            run.execution_id = Some(execution.id);
        }

        tracing::info!(
            execution_id = execution.id,
            user_id,
            process = %process,
            period_start = %period.start,
            period_end = %period.end,
            "Export run recorded",
        );

        Ok(ExportJob {
            execution,
            process,
            period,
            script,
            cancel,
            _slot: slot,
        })
    }

    /// Run an execution that was recorded earlier and is still `PENDING`.
    ///
    /// A run in any other state is a conflict. The process must be free.
    pub async fn run(&self, execution_id: DbId) -> AppResult<Execution> {
        let execution = self.reload(execution_id).await?;
        if execution.status_id != EXECUTION_PENDING {
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Execution {execution_id} is {}, only pending runs can be started",
                execution.status
            ))));
        }

        let process: Process = execution.process.parse()?;
        let period = Period::new(execution.period_start, execution.period_end)?;
        let script = self.script(process)?;
        let cancel = CancellationToken::new();
        let slot = self.reserve(process, cancel.clone())?;
        if let Some(run) = lock(&self.active).get_mut(&process) {
            run.execution_id = Some(execution.id);
        }

        self.execute(ExportJob {
            execution,
            process,
            period,
            script,
            cancel,
            _slot: slot,
        })
        .await
    }

    /// Run a prepared job to completion and return the final row.
    pub async fn execute(&self, job: ExportJob) -> AppResult<Execution> {
        let id = job.execution.id;

        if !ExecutionRepo::mark_running(&self.pool, id).await? {
            tracing::info!(execution_id = id, "Run is no longer pending, not starting it");
            return self.reload(id).await;
        }

        match self.run_script(&job).await {
            RunOutcome::Succeeded { path, file_name } => {
                tracing::info!(execution_id = id, path = %path.display(), "Export finished");
                ExecutionRepo::succeed(&self.pool, id, &path.to_string_lossy(), &file_name)
                    .await?;
            }
            RunOutcome::Failed {
                message,
                stack_trace,
            } => {
                tracing::warn!(execution_id = id, error = %message, "Export failed");
                ExecutionRepo::fail(&self.pool, id, &message, stack_trace.as_deref()).await?;
            }
            RunOutcome::Cancelled => {
                tracing::info!(execution_id = id, "Export cancelled");
                ExecutionRepo::cancel(&self.pool, id).await?;
            }
        }

        self.reload(id).await
    }

    /// Cancel a `PENDING` or `RUNNING` run, killing its script if one is
    /// active. Returns `false` if the run had already finished.
    pub async fn cancel(&self, execution_id: DbId) -> AppResult<bool> {
        let cancelled = ExecutionRepo::cancel(&self.pool, execution_id).await?;
        if cancelled {
            let runs = lock(&self.active);
            if let Some(run) = runs
                .values()
                .find(|r| r.execution_id == Some(execution_id))
            {
                run.cancel.cancel();
            }
            tracing::info!(execution_id, "Execution cancelled");
        }
        Ok(cancelled)
    }

    /// The execution currently holding `process`, if any.
    pub fn active_execution(&self, process: Process) -> Option<DbId> {
        lock(&self.active)
            .get(&process)
            .and_then(|r| r.execution_id)
    }

    fn script(&self, process: Process) -> AppResult<String> {
        self.config
            .script_for(process)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::Core(CoreError::Validation(format!(
                    "No automation script configured for {process}"
                )))
            })
    }

    fn reserve(&self, process: Process, cancel: CancellationToken) -> AppResult<ProcessSlot> {
        let mut runs = lock(&self.active);
        if let Some(run) = runs.get(&process) {
            let detail = run
                .execution_id
                .map(|id| format!(" (execution {id})"))
                .unwrap_or_default();
            return Err(AppError::Core(CoreError::Conflict(format!(
                "A {process} export is already running{detail}"
            ))));
        }
        runs.insert(
            process,
            ActiveRun {
                execution_id: None,
                cancel,
            },
        );
        Ok(ProcessSlot {
            runs: Arc::clone(&self.active),
            process,
        })
    }

    async fn run_script(&self, job: &ExportJob) -> RunOutcome {
        let file_name = job.period.export_file_name(job.process);
        let output_dir = &self.config.output_dir;
        let output_path = output_dir.join(&file_name);

        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            return RunOutcome::Failed {
                message: format!("Cannot create output directory {}: {e}", output_dir.display()),
                stack_trace: None,
            };
        }
        // A file left by an earlier run of the same period must not count as
        // this run's output.
        if tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::remove_file(&output_path).await {
                return RunOutcome::Failed {
                    message: format!("Cannot replace {}: {e}", output_path.display()),
                    stack_trace: None,
                };
            }
        }

        let input = self.script_input(job, &output_path, &file_name);
        tracing::debug!(execution_id = job.execution.id, script = %job.script, "Launching automation");

        match execute_script(&job.script, input).await {
            Ok(output) if output.succeeded() => {
                tokio::select! {
                    waited = wait_for_file(self.config.poll, &output_path) => match waited {
                        Ok(_) => RunOutcome::Succeeded { path: output_path.clone(), file_name },
                        Err(e) => RunOutcome::Failed {
                            message: e.to_string(),
                            stack_trace: non_empty(output.stderr),
                        },
                    },
                    () = job.cancel.cancelled() => RunOutcome::Cancelled,
                }
            }
            Ok(output) => RunOutcome::Failed {
                message: format!("Automation script exited with code {}", output.exit_code),
                stack_trace: non_empty(output.stderr),
            },
            Err(ScriptError::Cancelled { .. }) => RunOutcome::Cancelled,
            Err(ScriptError::ExecutionFailed { exit_code, stderr }) => RunOutcome::Failed {
                message: format!("Automation script exited with code {exit_code}"),
                stack_trace: non_empty(stderr),
            },
            Err(e) => RunOutcome::Failed {
                message: e.to_string(),
                stack_trace: None,
            },
        }
    }

    fn script_input(
        &self,
        job: &ExportJob,
        output_path: &std::path::Path,
        file_name: &str,
    ) -> ScriptInput {
        let transaction = job.process.default_transaction();
        let output_dir = self.config.output_dir.to_string_lossy().into_owned();

        let mut env_vars = vec![
            ("RPA_EXECUTION_ID".to_string(), job.execution.id.to_string()),
            ("RPA_PROCESS".to_string(), job.process.as_str().to_string()),
            ("RPA_PERIOD_START".to_string(), job.period.sap_start()),
            ("RPA_PERIOD_END".to_string(), job.period.sap_end()),
            ("RPA_OUTPUT_DIR".to_string(), output_dir.clone()),
            ("RPA_OUTPUT_FILE".to_string(), file_name.to_string()),
            ("RPA_TRANSACTION".to_string(), transaction.to_string()),
        ];
        if let Some(system) = &self.config.sap_system {
            env_vars.push(("RPA_SAP_SYSTEM".to_string(), system.clone()));
        }

        ScriptInput {
            data: serde_json::json!({
                "execution_id": job.execution.id,
                "process": job.process,
                "period_start": job.period.sap_start(),
                "period_end": job.period.sap_end(),
                "output_dir": output_dir,
                "output_file": file_name,
                "output_path": output_path.to_string_lossy(),
                "transaction": transaction,
                "sap_system": self.config.sap_system,
            }),
            env_vars,
            working_directory: None,
            timeout: self.config.timeout,
            cancel: Some(job.cancel.clone()),
        }
    }

    async fn reload(&self, id: DbId) -> AppResult<Execution> {
        ExecutionRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Execution",
                id,
            }))
    }
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
