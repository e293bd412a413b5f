//! Domain models for class scheduling and booking.

pub mod booking;
pub mod class_instance;
pub mod class_template;
pub mod recurrence;
pub mod subscription;

pub use booking::{
    Admission, BookClassRequest, Booking, BookingStatus, CancellationOutcome, ClassCancellation,
    ClassRoster, NewBooking, Promotion,
};
pub use class_instance::{
    ClassDetail, ClassInstance, ClassOverrides, CreateClassRequest, NewClassInstance,
};
pub use class_template::{ClassTemplate, CreateClassTemplateRequest, NewClassTemplate};
pub use recurrence::{RecurrencePattern, RecurrenceSpec, MAX_OCCURRENCES};
pub use subscription::SubscriptionBalance;
