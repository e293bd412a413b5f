//! Domain error types.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Storage failures surfaced through the store traits.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Lost a race with a concurrent writer; the whole unit may be retried.
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Invalid recurrence rules. Reported to the caller, never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("End date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Pattern {0} requires at least one weekday")]
    MissingWeekdays(String),

    #[error("Weekday {0} is outside 0-6")]
    InvalidWeekday(u8),

    #[error("Invalid time of day {hour:02}:{minute:02}")]
    InvalidTimeOfDay { hour: u32, minute: u32 },

    #[error("Recurrence produces at least {count} occurrences, exceeding the limit of {max}")]
    TooManyOccurrences { count: usize, max: usize },
}

/// Rejections and failures of booking operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("Member already holds an active booking for this class")]
    AlreadyBooked,

    #[error("Class is cancelled")]
    ClassCancelled,

    #[error("No active subscription with available sessions")]
    NoActiveSubscription,

    #[error("Class requires a subscription and cannot be booked as drop-in")]
    DropInNotAllowed,

    #[error("Booking is not active")]
    BookingNotActive,

    #[error("Class not found: {0}")]
    ClassNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Returns true if the operation lost a concurrency race and may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, BookingError::Store(err) if err.is_transient())
    }
}

/// Failures of schedule generation as a whole (per-slot failures are reported
/// inside the instantiation report instead).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Class template not found: {0}")]
    TemplateNotFound(Uuid),

    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
