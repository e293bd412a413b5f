//! Domain layer for the gym scheduler backend.
//!
//! This crate contains:
//! - Domain models (ClassTemplate, ClassInstance, Booking, RecurrenceSpec)
//! - Store traits the services are written against
//! - Business logic services (recurrence expansion, class generation,
//!   booking admission and waitlist promotion)
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;
pub mod stores;
