//! The report-export processes the portal can launch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A report-export automation ("Descargar Compras/Ventas del Mes").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    /// Monthly purchasing report (SAP ME80FN).
    Purchasing,
    /// Monthly sales report (SAP KE30).
    Sales,
}

impl Process {
    pub const ALL: [Process; 2] = [Process::Purchasing, Process::Sales];

    /// Canonical name stored in `execution_history.process`.
    pub fn as_str(self) -> &'static str {
        match self {
            Process::Purchasing => "purchasing",
            Process::Sales => "sales",
        }
    }

    /// SAP transaction the automation drives.
    pub fn default_transaction(self) -> &'static str {
        match self {
            Process::Purchasing => "ME80FN",
            Process::Sales => "KE30",
        }
    }

    /// Prefix of the exported spreadsheet name.
    pub fn file_prefix(self) -> &'static str {
        match self {
            Process::Purchasing => "compras",
            Process::Sales => "ventas",
        }
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Process {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "purchasing" | "compras" => Ok(Process::Purchasing),
            "sales" | "ventas" => Ok(Process::Sales),
            other => Err(CoreError::Validation(format!("Unknown process: '{other}'"))),
        }
    }
}
