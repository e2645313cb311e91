//! Calendar-day helpers
//!
//! Ephemeral keys carry the day as `dd/MM/yyyy`. "Today" comes from a
//! [`Clock`] so callers and tests can pin it.

use chrono::{Days, NaiveDate, Utc};

use crate::error::{TrackerError, TrackerResult};

/// `dd/MM/yyyy`
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Source of the current calendar day
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the system time, using the UTC calendar day
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock that always reports the same day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Format a date as `dd/MM/yyyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// The day `n` days before `today`
pub fn days_ago(today: NaiveDate, n: u32) -> TrackerResult<NaiveDate> {
    today
        .checked_sub_days(Days::new(u64::from(n)))
        .ok_or_else(|| TrackerError::invalid_date(format!("{n} days before {today}")))
}

/// Parse a `dd/MM/yyyy` string
pub fn parse_date(input: &str) -> TrackerResult<NaiveDate> {
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| TrackerError::invalid_date(input))
}
