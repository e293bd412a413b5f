//! Booking domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Waitlist,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Waitlist => "waitlist",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    /// Active bookings hold a spot or a waitlist place.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Waitlist)
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "waitlist" => Ok(BookingStatus::Waitlist),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "no_show" => Ok(BookingStatus::NoShow),
            _ => Err(format!("Invalid booking status: {}", s)),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A member's reservation for a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Booking {
    pub id: Uuid,
    pub class_id: Uuid,
    pub member_id: Uuid,
    pub status: BookingStatus,
    /// Set only while the booking is waitlisted; 1 is next in line.
    pub waitlist_position: Option<i32>,
    pub is_drop_in: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    pub fn is_waitlisted(&self) -> bool {
        self.status == BookingStatus::Waitlist
    }
}

/// Data needed to persist a new booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub class_id: Uuid,
    pub member_id: Uuid,
    pub status: BookingStatus,
    pub waitlist_position: Option<i32>,
    pub is_drop_in: bool,
}

/// Request payload for booking a class.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BookClassRequest {
    pub member_id: Uuid,
    #[serde(default)]
    pub is_drop_in: bool,
}

/// Result of an admitted booking request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Admission {
    pub booking: Booking,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

/// A waitlisted booking that was moved into a confirmed spot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Promotion {
    pub booking: Booking,
    /// Position the booking held before promotion.
    pub from_position: i32,
    /// Waitlisted bookings passed over because their member had no session left.
    pub skipped: Vec<Uuid>,
}

/// What happened when a booking left its spot or place.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CancellationOutcome {
    pub booking: Booking,
    pub previous_status: BookingStatus,
    pub session_refunded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Promotion>,
}

/// Result of cancelling a whole class.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassCancellation {
    pub class_id: Uuid,
    pub bookings_cancelled: usize,
    pub sessions_refunded: usize,
    pub already_cancelled: bool,
}

/// Current confirmed list and ordered waitlist for a class.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassRoster {
    pub class_id: Uuid,
    pub capacity: Option<i32>,
    pub confirmed: Vec<Booking>,
    pub waitlist: Vec<Booking>,
    pub spots_left: Option<i64>,
}
