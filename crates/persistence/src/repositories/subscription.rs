//! Subscription repository for database operations.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::SubscriptionEntity;
use crate::metrics::QueryTimer;

/// Repository for subscription balance reads and session adjustments.
#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    /// Creates a new SubscriptionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an active subscription. Billing owns these rows in production;
    /// this is used for seeding.
    pub async fn create(
        &self,
        member_id: Uuid,
        sessions_total: Option<i32>,
        sessions_used: i32,
    ) -> Result<SubscriptionEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_subscription");
        let result = sqlx::query_as::<_, SubscriptionEntity>(
            r#"
            INSERT INTO subscriptions (member_id, sessions_total, sessions_used)
            VALUES ($1, $2, $3)
            RETURNING id, member_id, sessions_total, sessions_used, is_active, valid_until, created_at
            "#,
        )
        .bind(member_id)
        .bind(sessions_total)
        .bind(sessions_used)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// The member's current active subscription, if any.
    pub async fn find_active_for_member(
        &self,
        member_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_subscription");
        let result = sqlx::query_as::<_, SubscriptionEntity>(
            r#"
            SELECT id, member_id, sessions_total, sessions_used, is_active, valid_until, created_at
            FROM subscriptions
            WHERE member_id = $1
              AND is_active
              AND (valid_until IS NULL OR valid_until >= CURRENT_DATE)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Same as [`Self::find_active_for_member`] but locks the row, so two
    /// bookings of the same member in different classes cannot both spend
    /// the last session.
    pub async fn lock_active_for_member(
        conn: &mut PgConnection,
        member_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("lock_active_subscription");
        let result = sqlx::query_as::<_, SubscriptionEntity>(
            r#"
            SELECT id, member_id, sessions_total, sessions_used, is_active, valid_until, created_at
            FROM subscriptions
            WHERE member_id = $1
              AND is_active
              AND (valid_until IS NULL OR valid_until >= CURRENT_DATE)
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(member_id)
        .fetch_optional(conn)
        .await;
        timer.record();
        result
    }

    /// Add `delta` to sessions_used, flooring at zero.
    pub async fn adjust_sessions_used_in(
        conn: &mut PgConnection,
        id: Uuid,
        delta: i32,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("adjust_sessions_used");
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET sessions_used = GREATEST(sessions_used + $2, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(delta)
        .execute(conn)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}
