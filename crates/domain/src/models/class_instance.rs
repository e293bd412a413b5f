//! Scheduled class domain models.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::class_template::ClassTemplate;

/// A concrete, bookable class at a specific local start time.
///
/// The confirmed count is never stored here; it is derived from bookings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassInstance {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// `None` for ad-hoc classes.
    pub template_id: Option<Uuid>,
    pub name: String,
    pub class_type: String,
    /// Organization-local start time.
    pub starts_at: NaiveDateTime,
    pub duration_minutes: i32,
    /// `None` means unlimited spots.
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub requires_subscription: bool,
    pub drop_in_price: Option<i64>,
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
}

impl ClassInstance {
    /// Returns true if another confirmed booking fits next to `confirmed`.
    pub fn has_room_for(&self, confirmed: usize) -> bool {
        match self.capacity {
            None => true,
            Some(capacity) => (confirmed as i64) < i64::from(capacity),
        }
    }

    /// Remaining confirmed spots, `None` when unlimited.
    pub fn spots_left(&self, confirmed: usize) -> Option<i64> {
        self.capacity
            .map(|capacity| (i64::from(capacity) - confirmed as i64).max(0))
    }
}

/// Per-run adjustments applied on top of template defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct ClassOverrides {
    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[validate(range(min = 1, max = 1000, message = "Capacity must be between 1 and 1000"))]
    pub capacity: Option<i32>,

    #[validate(range(min = 5, max = 600, message = "Duration must be between 5 and 600 minutes"))]
    pub duration_minutes: Option<i32>,
}

/// Data needed to persist a new class.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClassInstance {
    pub organization_id: Uuid,
    pub template_id: Option<Uuid>,
    pub name: String,
    pub class_type: String,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub requires_subscription: bool,
    pub drop_in_price: Option<i64>,
}

impl NewClassInstance {
    /// Builds a class from template defaults with overrides applied.
    pub fn from_template(
        template: &ClassTemplate,
        starts_at: NaiveDateTime,
        overrides: &ClassOverrides,
    ) -> Self {
        Self {
            organization_id: template.organization_id,
            template_id: Some(template.id),
            name: template.name.clone(),
            class_type: template.class_type.clone(),
            starts_at,
            duration_minutes: overrides
                .duration_minutes
                .unwrap_or(template.duration_minutes),
            capacity: overrides.capacity.or(template.capacity),
            location: overrides
                .location
                .clone()
                .or_else(|| template.location.clone()),
            requires_subscription: template.requires_subscription,
            drop_in_price: template.drop_in_price,
        }
    }
}

/// Request payload for creating a one-off class without a template.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateClassRequest {
    pub organization_id: Uuid,

    #[validate(
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "Class type must be between 1 and 50 characters"))]
    pub class_type: String,

    pub starts_at: NaiveDateTime,

    #[validate(range(min = 5, max = 600, message = "Duration must be between 5 and 600 minutes"))]
    pub duration_minutes: i32,

    #[validate(range(min = 1, max = 1000, message = "Capacity must be between 1 and 1000"))]
    pub capacity: Option<i32>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[serde(default)]
    pub requires_subscription: bool,

    #[validate(range(min = 0, message = "Drop-in price must be non-negative"))]
    pub drop_in_price: Option<i64>,
}

impl From<CreateClassRequest> for NewClassInstance {
    fn from(request: CreateClassRequest) -> Self {
        Self {
            organization_id: request.organization_id,
            template_id: None,
            name: request.name.trim().to_string(),
            class_type: request.class_type,
            starts_at: request.starts_at,
            duration_minutes: request.duration_minutes,
            capacity: request.capacity,
            location: request.location,
            requires_subscription: request.requires_subscription,
            drop_in_price: request.drop_in_price,
        }
    }
}

/// Class with its derived occupancy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassDetail {
    #[serde(flatten)]
    pub class: ClassInstance,
    pub confirmed_count: i64,
    pub waitlist_count: i64,
    pub spots_left: Option<i64>,
}
