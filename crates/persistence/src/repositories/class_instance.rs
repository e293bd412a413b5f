//! Class repository for database operations.
//!
//! Functions taking a `PgConnection` run inside the caller's transaction.

use chrono::NaiveDateTime;
use domain::models::NewClassInstance;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::ClassEntity;
use crate::metrics::QueryTimer;

/// Repository for scheduled class database operations.
#[derive(Clone)]
pub struct ClassRepository {
    pool: PgPool,
}

impl ClassRepository {
    /// Creates a new ClassRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new class. Fails with a unique violation when the organization
    /// already has a live class at the same start time.
    pub async fn create(&self, data: &NewClassInstance) -> Result<ClassEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_class");
        let result = sqlx::query_as::<_, ClassEntity>(
            r#"
            INSERT INTO classes (
                organization_id, template_id, name, class_type, starts_at, duration_minutes,
                capacity, location, requires_subscription, drop_in_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, organization_id, template_id, name, class_type, starts_at,
                      duration_minutes, capacity, location, requires_subscription,
                      drop_in_price, is_cancelled, created_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.template_id)
        .bind(&data.name)
        .bind(&data.class_type)
        .bind(data.starts_at)
        .bind(data.duration_minutes)
        .bind(data.capacity)
        .bind(&data.location)
        .bind(data.requires_subscription)
        .bind(data.drop_in_price)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a class by ID, cancelled or not.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ClassEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_class_by_id");
        let result = sqlx::query_as::<_, ClassEntity>(
            r#"
            SELECT id, organization_id, template_id, name, class_type, starts_at,
                   duration_minutes, capacity, location, requires_subscription,
                   drop_in_price, is_cancelled, created_at
            FROM classes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find the live class of an organization at an exact start time.
    pub async fn find_active_at(
        &self,
        organization_id: Uuid,
        starts_at: NaiveDateTime,
    ) -> Result<Option<ClassEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_class_at");
        let result = sqlx::query_as::<_, ClassEntity>(
            r#"
            SELECT id, organization_id, template_id, name, class_type, starts_at,
                   duration_minutes, capacity, location, requires_subscription,
                   drop_in_price, is_cancelled, created_at
            FROM classes
            WHERE organization_id = $1 AND starts_at = $2 AND NOT is_cancelled
            "#,
        )
        .bind(organization_id)
        .bind(starts_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Live classes in `[from, until)` with a free spot and someone waiting.
    pub async fn find_awaiting_promotion(
        &self,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("find_classes_awaiting_promotion");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT c.id
            FROM classes c
            WHERE NOT c.is_cancelled
              AND c.starts_at >= $1
              AND c.starts_at < $2
              AND EXISTS (
                  SELECT 1 FROM bookings b
                  WHERE b.class_id = c.id AND b.status = 'waitlist'
              )
              AND (
                  c.capacity IS NULL
                  OR (
                      SELECT COUNT(*) FROM bookings b
                      WHERE b.class_id = c.id AND b.status = 'confirmed'
                  ) < c.capacity
              )
            ORDER BY c.starts_at, c.id
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Take the row lock that serializes booking changes for a class.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<ClassEntity>, sqlx::Error> {
        let timer = QueryTimer::new("lock_class_for_update");
        let result = sqlx::query_as::<_, ClassEntity>(
            r#"
            SELECT id, organization_id, template_id, name, class_type, starts_at,
                   duration_minutes, capacity, location, requires_subscription,
                   drop_in_price, is_cancelled, created_at
            FROM classes
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await;
        timer.record();
        result
    }

    /// Soft-cancel a class.
    pub async fn mark_cancelled(conn: &mut PgConnection, id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("mark_class_cancelled");
        let result = sqlx::query("UPDATE classes SET is_cancelled = TRUE WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}
