//! Reporting periods and export file naming.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::process::Process;

/// Extension of every exported report.
pub const EXPORT_EXTENSION: &str = "xlsx";

/// Date format SAP GUI date fields expect.
const SAP_DATE_FORMAT: &str = "%d.%m.%Y";

/// An inclusive date range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// Build a period, rejecting an end before the start.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if end < start {
            return Err(CoreError::Validation(format!(
                "Period end {end} must not be before period start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The whole calendar month `year-month`.
    pub fn month(year: i32, month: u32) -> Result<Self, CoreError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| CoreError::Validation(format!("Invalid month {year}-{month}")))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| CoreError::Validation(format!("Invalid month {year}-{month}")))?;
        Ok(Self {
            start,
            end: next - Duration::days(1),
        })
    }

    /// The calendar month before the one containing `today`.
    pub fn previous_month(today: NaiveDate) -> Result<Self, CoreError> {
        if today.month() == 1 {
            Self::month(today.year() - 1, 12)
        } else {
            Self::month(today.year(), today.month() - 1)
        }
    }

    /// Whether the period spans exactly one calendar month.
    pub fn is_whole_month(&self) -> bool {
        self.start.day() == 1
            && Self::month(self.start.year(), self.start.month())
                .map(|m| m.end == self.end)
                .unwrap_or(false)
    }

    pub fn sap_start(&self) -> String {
        self.start.format(SAP_DATE_FORMAT).to_string()
    }

    pub fn sap_end(&self) -> String {
        self.end.format(SAP_DATE_FORMAT).to_string()
    }

    /// File name the export for `process` over this period is saved as.
    ///
    /// `compras_2024_01.xlsx` for a whole month,
    /// `compras_20240105_20240120.xlsx` otherwise.
    pub fn export_file_name(&self, process: Process) -> String {
        let prefix = process.file_prefix();
        if self.is_whole_month() {
            format!(
                "{prefix}_{}_{:02}.{EXPORT_EXTENSION}",
                self.start.year(),
                self.start.month()
            )
        } else {
            format!(
                "{prefix}_{}_{}.{EXPORT_EXTENSION}",
                self.start.format("%Y%m%d"),
                self.end.format("%Y%m%d")
            )
        }
    }
}
