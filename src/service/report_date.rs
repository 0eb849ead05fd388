//! Report date resolution
//!
//! A report covers one calendar day. The day is either named by the caller
//! in canonical `YYYY-MM-DD` form or defaults to yesterday.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Local, NaiveDate, Utc};

use crate::config::ReportTimezone;
use crate::error::AppError;

/// Canonical date format shared by registry queries and object keys
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar date of one archive run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportDate(NaiveDate);

impl ReportDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Object key of the archived report, e.g. "2023-06-01.json"
    pub fn object_key(&self) -> String {
        format!("{}.json", self)
    }

    /// The day before `now`, taken in the given timezone
    pub fn yesterday(now: DateTime<Utc>, timezone: ReportTimezone) -> Self {
        let today = match timezone {
            ReportTimezone::Utc => now.date_naive(),
            ReportTimezone::Local => now.with_timezone(&Local).date_naive(),
        };
        // NaiveDate::MIN has no predecessor; stay on it rather than fail.
        Self(today.checked_sub_days(Days::new(1)).unwrap_or(today))
    }
}

impl fmt::Display for ReportDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_DATE_FORMAT))
    }
}

impl FromStr for ReportDate {
    type Err = AppError;

    /// Strict parse: the input must already be in canonical form.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(value, CANONICAL_DATE_FORMAT).map_err(|e| {
            AppError::InvalidDateFormat(format!("parsing {:?} as YYYY-MM-DD: {}", value, e))
        })?;

        let parsed = Self(date);
        if parsed.to_string() != value {
            return Err(AppError::InvalidDateFormat(format!(
                "parsing {:?} as YYYY-MM-DD: not in canonical form",
                value
            )));
        }

        Ok(parsed)
    }
}

/// Source of the invocation time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Resolve the report date for a request
///
/// # Arguments
/// * `param` - Raw `date` query parameter; absent and empty mean "yesterday"
/// * `now` - Invocation time
/// * `timezone` - Timezone used for the "yesterday" default
///
/// # Errors
/// `AppError::InvalidDateFormat` if `param` is not a canonical date
pub fn resolve_report_date(
    param: Option<&str>,
    now: DateTime<Utc>,
    timezone: ReportTimezone,
) -> Result<ReportDate, AppError> {
    match param {
        Some(value) if !value.is_empty() => value.parse(),
        _ => Ok(ReportDate::yesterday(now, timezone)),
    }
}
