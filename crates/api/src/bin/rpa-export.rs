//! Run one report export in the foreground, e.g. from a scheduled task, or
//! resume a run recorded as `PENDING` with `--execution`.
//!
//! Exits non-zero unless the run ends in `SUCCESS`.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::Parser;
use rpa_api::config::ExportConfig;
use rpa_api::services::export::ExportOrchestrator;
use rpa_core::execution_status::EXECUTION_SUCCESS;
use rpa_core::period::Period;
use rpa_core::process::Process;
use rpa_core::types::DbId;
use rpa_core::validation::normalize_email;
use rpa_db::repositories::UserRepo;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "rpa-export", about = "Run a SAP report export", version)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// `purchasing` or `sales`
    #[arg(long, required_unless_present = "execution")]
    process: Option<Process>,

    /// Start this pending execution instead of recording a new one
    #[arg(long, conflicts_with_all = ["process", "month", "start", "end"])]
    execution: Option<DbId>,

    /// Calendar month as YYYY-MM (default: previous month)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    month: Option<String>,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,

    /// Last day of the range (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,

    /// Account the run is recorded under
    #[arg(long, env = "RPA_USER_EMAIL", required_unless_present = "execution")]
    user_email: Option<String>,
}

impl Cli {
    fn period(&self, today: NaiveDate) -> Result<Period> {
        let period = match (&self.month, self.start, self.end) {
            (Some(month), _, _) => {
                let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
                    .with_context(|| format!("invalid --month '{month}', expected YYYY-MM"))?;
                Period::month(first.year(), first.month())?
            }
            (None, Some(start), Some(end)) => Period::new(start, end)?,
            _ => Period::previous_month(today)?,
        };
        Ok(period)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rpa_api=info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the run succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let pool = rpa_db::create_pool(&cli.database_url)
        .await
        .context("connecting to the database")?;
    let orchestrator = Arc::new(ExportOrchestrator::new(pool.clone(), ExportConfig::from_env()));

    let (execution_id, job) = match (cli.execution, cli.process, &cli.user_email) {
        (Some(id), _, _) => {
            println!("Resuming execution {id}");
            (id, None)
        }
        (None, Some(process), Some(user_email)) => {
            let period = cli.period(Utc::now().date_naive())?;
            let email = normalize_email(user_email);
            let Some(user) = UserRepo::find_by_email(&pool, &email).await? else {
                bail!("no user with email {email}");
            };
            if !user.is_active {
                bail!("user {email} is deactivated");
            }
            let job = orchestrator.prepare(user.id, process, period).await?;
            println!(
                "Execution {}: {process} {} .. {}",
                job.execution.id, period.start, period.end
            );
            (job.execution.id, Some(job))
        }
        _ => bail!("--process and --user-email are required without --execution"),
    };

    // Ctrl-C cancels the run instead of leaving it RUNNING.
    let done = CancellationToken::new();
    let watcher = {
        let orchestrator = Arc::clone(&orchestrator);
        let done = done.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    if let Err(e) = orchestrator.cancel(execution_id).await {
                        tracing::error!(execution_id, error = %e, "Cancel failed");
                    }
                }
                () = done.cancelled() => {}
            }
        })
    };

    let finished = match job {
        Some(job) => orchestrator.execute(job).await,
        None => orchestrator.run(execution_id).await,
    };
    done.cancel();
    let _ = watcher.await;
    let execution = finished?;

    println!("Status: {}", execution.status);
    if let Some(path) = &execution.file_path {
        println!("File: {path}");
    }
    if let Some(message) = &execution.error_message {
        println!("Error: {message}");
    }

    Ok(execution.status_id == EXECUTION_SUCCESS)
}
