//! Domain services for the gym scheduler.
//!
//! Services contain business logic that operates on domain models through
//! the store traits.

pub mod booking;
pub mod instantiation;
pub mod recurrence;
pub mod waitlist;

pub use booking::{BookingService, DEFAULT_CONFLICT_RETRIES};
pub use instantiation::{
    ClassInstantiator, FailedSlot, GenerateScheduleRequest, InstantiationReport,
};
pub use recurrence::expand;
