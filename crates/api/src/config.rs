use std::path::PathBuf;
use std::time::Duration;

use rpa_core::polling::{PollPolicy, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use rpa_core::process::Process;

use crate::auth::cookie::CookieConfig;
use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Every field except the JWT secret has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub export: ExportConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    ///
    /// See [`JwtConfig::from_env`], [`CookieConfig::from_env`] and
    /// [`ExportConfig::from_env`] for the rest.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            cookie: CookieConfig::from_env(),
            export: ExportConfig::from_env(),
        }
    }
}

/// Where the automation scripts live and how long to wait for them.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub purchasing_script: Option<String>,
    pub sales_script: Option<String>,
    /// Directory the automation saves spreadsheets into.
    pub output_dir: PathBuf,
    /// Kill the script after this long.
    pub timeout: Duration,
    /// How long to wait for the spreadsheet after the script exits.
    pub poll: PollPolicy,
    /// SAP system id recorded on every run (e.g. `PRD`).
    pub sap_system: Option<String>,
    /// Host name recorded on every run.
    pub machine: String,
}

/// Default script timeout: SAP exports of a busy month take minutes.
const DEFAULT_EXPORT_TIMEOUT_SECS: u64 = 600;

impl ExportConfig {
    /// Load from the environment.
    ///
    /// | Env Var                     | Default      |
    /// |-----------------------------|--------------|
    /// | `PURCHASING_SCRIPT`         | unset        |
    /// | `SALES_SCRIPT`              | unset        |
    /// | `EXPORT_OUTPUT_DIR`         | `./exports`  |
    /// | `EXPORT_TIMEOUT_SECS`       | `600`        |
    /// | `EXPORT_POLL_ATTEMPTS`      | `30`         |
    /// | `EXPORT_POLL_INTERVAL_SECS` | `2`          |
    /// | `SAP_SYSTEM`                | unset        |
    ///
    /// The machine name comes from `HOSTNAME` or `COMPUTERNAME`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout_secs: u64 = std::env::var("EXPORT_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_EXPORT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("EXPORT_TIMEOUT_SECS must be a valid u64");

        let attempts: u32 = std::env::var("EXPORT_POLL_ATTEMPTS")
            .unwrap_or_else(|_| DEFAULT_POLL_ATTEMPTS.to_string())
            .parse()
            .expect("EXPORT_POLL_ATTEMPTS must be a valid u32");

        let interval_secs: u64 = std::env::var("EXPORT_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL.as_secs().to_string())
            .parse()
            .expect("EXPORT_POLL_INTERVAL_SECS must be a valid u64");

        let poll = PollPolicy::new(attempts, Duration::from_secs(interval_secs))
            .expect("EXPORT_POLL_ATTEMPTS must be at least 1");

        Self {
            purchasing_script: non_empty("PURCHASING_SCRIPT"),
            sales_script: non_empty("SALES_SCRIPT"),
            output_dir: non_empty("EXPORT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./exports")),
            timeout: Duration::from_secs(timeout_secs),
            poll,
            sap_system: non_empty("SAP_SYSTEM"),
            machine: non_empty("HOSTNAME")
                .or_else(|| non_empty("COMPUTERNAME"))
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }

    /// Longest a run can stay unfinished: the script timeout plus the wait
    /// for its spreadsheet.
    pub fn max_run_time(&self) -> Duration {
        self.timeout + self.poll.max_wait()
    }

    /// The automation script configured for `process`, if any.
    pub fn script_for(&self, process: Process) -> Option<&str> {
        match process {
            Process::Purchasing => self.purchasing_script.as_deref(),
            Process::Sales => self.sales_script.as_deref(),
        }
    }
}
