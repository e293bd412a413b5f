//! HTTP route handlers.

pub mod bookings;
pub mod classes;
pub mod health;
pub mod schedules;
pub mod templates;
