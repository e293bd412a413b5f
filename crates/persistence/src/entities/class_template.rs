//! Class template entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the class_templates table.
#[derive(Debug, Clone, FromRow)]
pub struct ClassTemplateEntity {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub class_type: String,
    pub duration_minutes: i32,
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub requires_subscription: bool,
    pub drop_in_price: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<ClassTemplateEntity> for domain::models::ClassTemplate {
    fn from(entity: ClassTemplateEntity) -> Self {
        Self {
            id: entity.id,
            organization_id: entity.organization_id,
            name: entity.name,
            class_type: entity.class_type,
            duration_minutes: entity.duration_minutes,
            capacity: entity.capacity,
            location: entity.location,
            requires_subscription: entity.requires_subscription,
            drop_in_price: entity.drop_in_price,
            created_at: entity.created_at,
        }
    }
}
