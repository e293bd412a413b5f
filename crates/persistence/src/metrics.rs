//! Database metrics.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record how long a named query took.
pub fn record_query_duration(query_name: &'static str, duration_secs: f64) {
    histogram!("db_query_duration_seconds", "query" => query_name).record(duration_secs);
}

/// Publish connection pool gauges. Called periodically by the pool metrics job.
pub fn record_pool_metrics(pool: &PgPool) {
    let (total, idle, in_use) = pool_usage(pool.size(), pool.num_idle());

    gauge!("db_pool_connections", "state" => "in_use").set(in_use as f64);
    gauge!("db_pool_connections", "state" => "idle").set(idle as f64);
    gauge!("db_pool_connections_total").set(total as f64);
}

fn pool_usage(size: u32, idle: usize) -> (usize, usize, usize) {
    let total = size as usize;
    (total, idle, total.saturating_sub(idle))
}

/// Times one query and records it on [`QueryTimer::record`].
///
/// ```ignore
/// let timer = QueryTimer::new("find_booking_by_id");
/// let result = sqlx::query_as::<_, BookingEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_keeps_name() {
        let timer = QueryTimer::new("list_active_bookings");
        assert_eq!(timer.query_name, "list_active_bookings");
        timer.record();
    }

    #[test]
    fn test_pool_usage() {
        assert_eq!(pool_usage(10, 4), (10, 4, 6));
        // Idle can briefly exceed size while connections are being reaped.
        assert_eq!(pool_usage(2, 3), (2, 3, 0));
    }
}
