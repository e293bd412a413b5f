//! Store traits the scheduling services are written against.
//!
//! Booking mutations always go through a [`BookingTransaction`] opened with
//! [`BookingStore::begin`]. An implementation must guarantee that two units
//! opened for the same class never interleave: a relational backend takes a
//! row lock on the class, an in-memory backend holds a mutex. Backends that can
//! only detect interleaving after the fact report [`StoreError::Conflict`] from
//! any call (usually `commit`) and the services re-run the whole unit.
//!
//! Dropping a transaction without calling `commit` discards every write made
//! through it.

pub mod memory;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{
    Booking, BookingStatus, ClassInstance, ClassTemplate, NewBooking, NewClassInstance,
    NewClassTemplate, SubscriptionBalance,
};

pub use memory::InMemoryStore;

/// Read and create class templates.
#[async_trait::async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_template(&self, id: Uuid) -> Result<Option<ClassTemplate>, StoreError>;

    async fn create_template(&self, data: NewClassTemplate) -> Result<ClassTemplate, StoreError>;
}

/// Read and create scheduled classes.
#[async_trait::async_trait]
pub trait ClassStore: Send + Sync {
    /// Finds the non-cancelled class of an organization starting at exactly `starts_at`.
    async fn find_class_at(
        &self,
        organization_id: Uuid,
        starts_at: NaiveDateTime,
    ) -> Result<Option<ClassInstance>, StoreError>;

    async fn create_class(&self, data: NewClassInstance) -> Result<ClassInstance, StoreError>;

    async fn get_class(&self, id: Uuid) -> Result<Option<ClassInstance>, StoreError>;
}

/// Entry point for booking reads and locked booking units of work.
#[async_trait::async_trait]
pub trait BookingStore: Send + Sync {
    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Unlocked snapshot of a class's active bookings, ordered like
    /// [`BookingTransaction::list_active_bookings`].
    async fn list_active_bookings(&self, class_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    /// Non-cancelled classes starting in `[from, until)` that have free capacity
    /// and at least one waitlisted booking.
    async fn list_classes_awaiting_promotion(
        &self,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Opens a unit of work holding the booking set of `class_id` exclusively.
    async fn begin(&self, class_id: Uuid) -> Result<Box<dyn BookingTransaction>, StoreError>;
}

/// Exclusive, all-or-nothing unit of work over one class's bookings and the
/// session balances of their members.
#[async_trait::async_trait]
pub trait BookingTransaction: Send {
    async fn get_class(&mut self, id: Uuid) -> Result<Option<ClassInstance>, StoreError>;

    async fn set_class_cancelled(&mut self, id: Uuid) -> Result<(), StoreError>;

    async fn get_booking(&mut self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Confirmed bookings first (by creation time), then the waitlist ordered by
    /// position and creation time.
    async fn list_active_bookings(&mut self, class_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    async fn insert_booking(&mut self, data: NewBooking) -> Result<Booking, StoreError>;

    async fn update_booking_status(
        &mut self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<(), StoreError>;

    async fn update_waitlist_position(
        &mut self,
        id: Uuid,
        position: Option<i32>,
    ) -> Result<(), StoreError>;

    async fn get_active_subscription(
        &mut self,
        member_id: Uuid,
    ) -> Result<Option<SubscriptionBalance>, StoreError>;

    /// Adds `delta` to `sessions_used`, never going below zero.
    async fn adjust_sessions_used(
        &mut self,
        subscription_id: Uuid,
        delta: i32,
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Sort key shared by every backend for active booking listings.
pub fn active_booking_order(booking: &Booking) -> (u8, i32, chrono::DateTime<chrono::Utc>, Uuid) {
    let rank = if booking.is_confirmed() { 0 } else { 1 };
    (
        rank,
        booking.waitlist_position.unwrap_or(0),
        booking.created_at,
        booking.id,
    )
}
