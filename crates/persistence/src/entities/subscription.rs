//! Subscription entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the subscriptions table.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub member_id: Uuid,
    pub sessions_total: Option<i32>,
    pub sessions_used: i32,
    pub is_active: bool,
    pub valid_until: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriptionEntity> for domain::models::SubscriptionBalance {
    fn from(entity: SubscriptionEntity) -> Self {
        Self {
            subscription_id: entity.id,
            member_id: entity.member_id,
            sessions_total: entity.sessions_total,
            sessions_used: entity.sessions_used,
        }
    }
}
