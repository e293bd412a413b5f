//! Class entity (database row mapping).

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the classes table.
#[derive(Debug, Clone, FromRow)]
pub struct ClassEntity {
    pub id: Uuid,
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
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ClassEntity> for domain::models::ClassInstance {
    fn from(entity: ClassEntity) -> Self {
        Self {
            id: entity.id,
            organization_id: entity.organization_id,
            template_id: entity.template_id,
            name: entity.name,
            class_type: entity.class_type,
            starts_at: entity.starts_at,
            duration_minutes: entity.duration_minutes,
            capacity: entity.capacity,
            location: entity.location,
            requires_subscription: entity.requires_subscription,
            drop_in_price: entity.drop_in_price,
            is_cancelled: entity.is_cancelled,
            created_at: entity.created_at,
        }
    }
}
