//! Booking entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::BookingStatus;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for booking_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatusDb {
    Confirmed,
    Waitlist,
    Cancelled,
    NoShow,
}

impl From<BookingStatusDb> for BookingStatus {
    fn from(db_status: BookingStatusDb) -> Self {
        match db_status {
            BookingStatusDb::Confirmed => BookingStatus::Confirmed,
            BookingStatusDb::Waitlist => BookingStatus::Waitlist,
            BookingStatusDb::Cancelled => BookingStatus::Cancelled,
            BookingStatusDb::NoShow => BookingStatus::NoShow,
        }
    }
}

impl From<BookingStatus> for BookingStatusDb {
    fn from(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Confirmed => BookingStatusDb::Confirmed,
            BookingStatus::Waitlist => BookingStatusDb::Waitlist,
            BookingStatus::Cancelled => BookingStatusDb::Cancelled,
            BookingStatus::NoShow => BookingStatusDb::NoShow,
        }
    }
}

/// Database row mapping for the bookings table.
#[derive(Debug, Clone, FromRow)]
pub struct BookingEntity {
    pub id: Uuid,
    pub class_id: Uuid,
    pub member_id: Uuid,
    pub status: BookingStatusDb,
    pub waitlist_position: Option<i32>,
    pub is_drop_in: bool,
    pub created_at: DateTime<Utc>,
}

impl From<BookingEntity> for domain::models::Booking {
    fn from(entity: BookingEntity) -> Self {
        Self {
            id: entity.id,
            class_id: entity.class_id,
            member_id: entity.member_id,
            status: entity.status.into(),
            waitlist_position: entity.waitlist_position,
            is_drop_in: entity.is_drop_in,
            created_at: entity.created_at,
        }
    }
}
