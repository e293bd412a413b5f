//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod booking;
pub mod class_instance;
pub mod class_template;
pub mod subscription;

pub use booking::{BookingEntity, BookingStatusDb};
pub use class_instance::ClassEntity;
pub use class_template::ClassTemplateEntity;
pub use subscription::SubscriptionEntity;
