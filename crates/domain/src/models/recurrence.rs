//! Recurrence rules used to generate class schedules.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Hard upper bound on how many occurrences a single expansion may produce.
pub const MAX_OCCURRENCES: usize = 100;

/// How often a class repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl RecurrencePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrencePattern::Daily => "daily",
            RecurrencePattern::Weekly => "weekly",
            RecurrencePattern::Biweekly => "biweekly",
            RecurrencePattern::Monthly => "monthly",
        }
    }

    /// Returns true if the pattern filters on a weekday set.
    pub fn uses_weekdays(&self) -> bool {
        matches!(self, RecurrencePattern::Weekly | RecurrencePattern::Biweekly)
    }
}

impl FromStr for RecurrencePattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(RecurrencePattern::Daily),
            "weekly" => Ok(RecurrencePattern::Weekly),
            "biweekly" => Ok(RecurrencePattern::Biweekly),
            "monthly" => Ok(RecurrencePattern::Monthly),
            _ => Err(format!("Invalid recurrence pattern: {}", s)),
        }
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurrence rule over an inclusive date range.
///
/// Weekdays use 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RecurrenceSpec {
    pub pattern: RecurrencePattern,

    #[serde(default)]
    #[validate(custom(function = "shared::validation::validate_weekdays"))]
    pub days_of_week: Vec<u8>,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    #[validate(range(max = 23, message = "Hour must be between 0 and 23"))]
    pub hour: u32,

    #[validate(range(max = 59, message = "Minute must be between 0 and 59"))]
    pub minute: u32,
}

impl RecurrenceSpec {
    /// Time of day every occurrence starts at, if hour and minute are in range.
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }
}
