//! Retention window and calendar granularity.
//!
//! A [`TimeWindow`] captures the reference instant once, when it is built, and
//! derives `oldest = now - age` from it. Every record of a run is classified
//! against that same pair of instants.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use thiserror::Error;

/// Date format used for the `start`/`end` fields of snapshots.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised while building a window or parsing its parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// The grouping is not one of day/week/month/year.
    #[error("Invalid grouping: {0}")]
    InvalidGrouping(String),

    /// The age unit is not one of day/week/month/year.
    #[error("Invalid age unit: {0}")]
    InvalidAgeUnit(String),

    /// The age value is zero or pushes the window outside the supported range.
    #[error("Invalid age value: {0}")]
    InvalidAgeValue(i64),
}

/// Calendar unit shared by window ages and bucket granularities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarUnit {
    Day,
    Week,
    Month,
    Year,
}

impl CalendarUnit {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Some(Self::Day),
            "week" | "weeks" => Some(Self::Week),
            "month" | "months" => Some(Self::Month),
            "year" | "years" => Some(Self::Year),
            _ => None,
        }
    }

    /// Plural name, as accepted on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "days",
            Self::Week => "weeks",
            Self::Month => "months",
            Self::Year => "years",
        }
    }

    fn subtract(self, instant: DateTime<Utc>, amount: u32) -> Option<DateTime<Utc>> {
        match self {
            Self::Day => instant.checked_sub_signed(Duration::days(i64::from(amount))),
            Self::Week => instant.checked_sub_signed(Duration::weeks(i64::from(amount))),
            Self::Month => instant.checked_sub_months(Months::new(amount)),
            Self::Year => amount
                .checked_mul(12)
                .and_then(|months| instant.checked_sub_months(Months::new(months))),
        }
    }
}

impl fmt::Display for CalendarUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retention horizon requested by the caller, e.g. "3 months".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Age {
    value: u32,
    unit: CalendarUnit,
    label: String,
}

impl Age {
    /// Build an age from its raw request parameters.
    ///
    /// The label echoed in snapshots keeps the unit exactly as given.
    pub fn parse(value: i64, unit: &str) -> Result<Self, WindowError> {
        let parsed_unit =
            CalendarUnit::parse(unit).ok_or_else(|| WindowError::InvalidAgeUnit(unit.to_string()))?;
        let parsed_value = u32::try_from(value)
            .ok()
            .filter(|v| *v > 0)
            .ok_or(WindowError::InvalidAgeValue(value))?;

        Ok(Self {
            value: parsed_value,
            unit: parsed_unit,
            label: format!("{} {}", parsed_value, unit.trim()),
        })
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.value
    }

    #[must_use]
    pub fn unit(&self) -> CalendarUnit {
        self.unit
    }

    /// The age as echoed back to clients ("3 months").
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Bucketing granularity for grouping-mode aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Days,
    Weeks,
    Months,
    Years,
}

impl Granularity {
    /// Parse a grouping parameter. Unknown values fail before any fetch.
    pub fn parse(value: &str) -> Result<Self, WindowError> {
        match CalendarUnit::parse(value) {
            Some(CalendarUnit::Day) => Ok(Self::Days),
            Some(CalendarUnit::Week) => Ok(Self::Weeks),
            Some(CalendarUnit::Month) => Ok(Self::Months),
            Some(CalendarUnit::Year) => Ok(Self::Years),
            None => Err(WindowError::InvalidGrouping(value.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Years => "years",
        }
    }

    /// `strftime` pattern producing the bucket key.
    #[must_use]
    pub fn format(self) -> &'static str {
        match self {
            Self::Days => "%Y-%m-%d",
            Self::Weeks => "%G-W%V",
            Self::Months => "%Y-%m",
            Self::Years => "%Y",
        }
    }

    /// Bucket key for an instant.
    #[must_use]
    pub fn key(self, instant: DateTime<Utc>) -> String {
        self.key_for_date(instant.date_naive())
    }

    pub(crate) fn key_for_date(self, date: NaiveDate) -> String {
        date.format(self.format()).to_string()
    }

    /// First day of the calendar unit containing `date`.
    pub(crate) fn unit_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Days => date,
            Self::Weeks => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Self::Months => date.with_day(1).unwrap_or(date),
            Self::Years => date.with_ordinal(1).unwrap_or(date),
        }
    }

    /// Start of the unit immediately before the one starting at `unit_start`.
    pub(crate) fn previous_unit(self, unit_start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Days => unit_start.pred_opt(),
            Self::Weeks => unit_start.checked_sub_signed(Duration::weeks(1)),
            Self::Months => unit_start.checked_sub_months(Months::new(1)),
            Self::Years => unit_start.checked_sub_months(Months::new(12)),
        }
    }
}

impl FromStr for Granularity {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an instant falls relative to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Older than the horizon. Seeing one means the walk has crossed it.
    BeforeWindow,
    /// Within `[oldest, now]`.
    InRange,
    /// Later than the reference instant; has not happened as of this run.
    AfterNow,
}

impl Placement {
    #[inline]
    #[must_use]
    pub fn is_in_range(self) -> bool {
        matches!(self, Self::InRange)
    }
}

/// The `[oldest, now]` interval a run aggregates over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    age: Age,
    now: DateTime<Utc>,
    oldest: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window ending at an explicit reference instant.
    pub fn new(age: Age, now: DateTime<Utc>) -> Result<Self, WindowError> {
        let oldest = age
            .unit()
            .subtract(now, age.value())
            .ok_or(WindowError::InvalidAgeValue(i64::from(age.value())))?;

        Ok(Self { age, now, oldest })
    }

    /// Build a window ending at the current wall-clock time.
    pub fn ending_now(age: Age) -> Result<Self, WindowError> {
        Self::new(age, Utc::now())
    }

    #[must_use]
    pub fn age(&self) -> &Age {
        &self.age
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    #[must_use]
    pub fn oldest(&self) -> DateTime<Utc> {
        self.oldest
    }

    /// Classify a record's creation instant.
    #[must_use]
    pub fn classify(&self, created_at: DateTime<Utc>) -> Placement {
        if created_at < self.oldest {
            Placement::BeforeWindow
        } else if created_at > self.now {
            Placement::AfterNow
        } else {
            Placement::InRange
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.classify(instant).is_in_range()
    }

    /// `start` field of snapshots: the reference date.
    #[must_use]
    pub fn start_label(&self) -> String {
        self.now.format(DATE_FORMAT).to_string()
    }

    /// `end` field of snapshots: the horizon date.
    #[must_use]
    pub fn end_label(&self) -> String {
        self.oldest.format(DATE_FORMAT).to_string()
    }
}
