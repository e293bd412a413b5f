//! Booking repository for database operations.
//!
//! Mutations take a `PgConnection` and run inside the transaction that holds
//! the class row lock.

use domain::models::{BookingStatus, NewBooking};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{BookingEntity, BookingStatusDb};
use crate::metrics::QueryTimer;

/// Repository for booking database operations.
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Creates a new BookingRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a booking by ID outside any transaction.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<BookingEntity>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_id_in(&mut conn, id).await
    }

    /// Active bookings of a class outside any transaction.
    pub async fn list_active(&self, class_id: Uuid) -> Result<Vec<BookingEntity>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::list_active_in(&mut conn, class_id).await
    }

    pub async fn find_by_id_in(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<BookingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_booking_by_id");
        let result = sqlx::query_as::<_, BookingEntity>(
            r#"
            SELECT id, class_id, member_id, status, waitlist_position, is_drop_in, created_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await;
        timer.record();
        result
    }

    /// Confirmed bookings first, then the waitlist in queue order.
    pub async fn list_active_in(
        conn: &mut PgConnection,
        class_id: Uuid,
    ) -> Result<Vec<BookingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_bookings");
        let result = sqlx::query_as::<_, BookingEntity>(
            r#"
            SELECT id, class_id, member_id, status, waitlist_position, is_drop_in, created_at
            FROM bookings
            WHERE class_id = $1 AND status IN ('confirmed', 'waitlist')
            ORDER BY
                CASE WHEN status = 'confirmed' THEN 0 ELSE 1 END,
                COALESCE(waitlist_position, 0),
                created_at,
                id
            "#,
        )
        .bind(class_id)
        .fetch_all(conn)
        .await;
        timer.record();
        result
    }

    pub async fn insert_in(
        conn: &mut PgConnection,
        data: &NewBooking,
    ) -> Result<BookingEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_booking");
        let result = sqlx::query_as::<_, BookingEntity>(
            r#"
            INSERT INTO bookings (class_id, member_id, status, waitlist_position, is_drop_in)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, class_id, member_id, status, waitlist_position, is_drop_in, created_at
            "#,
        )
        .bind(data.class_id)
        .bind(data.member_id)
        .bind(BookingStatusDb::from(data.status))
        .bind(data.waitlist_position)
        .bind(data.is_drop_in)
        .fetch_one(conn)
        .await;
        timer.record();
        result
    }

    pub async fn update_status_in(
        conn: &mut PgConnection,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("update_booking_status");
        let result = sqlx::query(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(BookingStatusDb::from(status))
        .execute(conn)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    pub async fn update_position_in(
        conn: &mut PgConnection,
        id: Uuid,
        position: Option<i32>,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("update_waitlist_position");
        let result = sqlx::query(
            "UPDATE bookings SET waitlist_position = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(position)
        .execute(conn)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}
