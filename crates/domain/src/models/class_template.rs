//! Class template domain models.
//!
//! A template carries the defaults every generated class starts from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Reusable definition of a class offered by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassTemplate {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub class_type: String,
    pub duration_minutes: i32,
    /// `None` means unlimited spots.
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub requires_subscription: bool,
    /// Price in minor currency units.
    pub drop_in_price: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating a class template.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateClassTemplateRequest {
    pub organization_id: Uuid,

    #[validate(
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "Class type must be between 1 and 50 characters"))]
    pub class_type: String,

    #[validate(range(min = 5, max = 600, message = "Duration must be between 5 and 600 minutes"))]
    pub duration_minutes: i32,

    #[validate(range(min = 1, max = 1000, message = "Capacity must be between 1 and 1000"))]
    pub capacity: Option<i32>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[serde(default = "default_requires_subscription")]
    pub requires_subscription: bool,

    #[validate(range(min = 0, message = "Drop-in price must be non-negative"))]
    pub drop_in_price: Option<i64>,
}

fn default_requires_subscription() -> bool {
    true
}

/// Data needed to persist a new template.
#[derive(Debug, Clone)]
pub struct NewClassTemplate {
    pub organization_id: Uuid,
    pub name: String,
    pub class_type: String,
    pub duration_minutes: i32,
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub requires_subscription: bool,
    pub drop_in_price: Option<i64>,
}

impl From<CreateClassTemplateRequest> for NewClassTemplate {
    fn from(request: CreateClassTemplateRequest) -> Self {
        Self {
            organization_id: request.organization_id,
            name: request.name.trim().to_string(),
            class_type: request.class_type,
            duration_minutes: request.duration_minutes,
            capacity: request.capacity,
            location: request.location,
            requires_subscription: request.requires_subscription,
            drop_in_price: request.drop_in_price,
        }
    }
}
