//! Repository implementations for database operations.

pub mod booking;
pub mod class_instance;
pub mod class_template;
pub mod subscription;

pub use booking::BookingRepository;
pub use class_instance::ClassRepository;
pub use class_template::ClassTemplateRepository;
pub use subscription::SubscriptionRepository;
