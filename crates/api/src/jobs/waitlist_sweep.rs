//! Background promotion for classes that have open spots and a waitlist.
//!
//! Promotion normally happens inside the cancellation that frees a spot. A
//! spot can stay open when every waitlisted member was out of sessions at
//! that moment; the sweep retries those classes once members have topped up.

use chrono::{Duration, Local, NaiveDateTime};
use domain::services::BookingService;
use domain::stores::BookingStore;
use tracing::{debug, warn};
use uuid::Uuid;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_promotion;

/// Totals from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub classes_checked: usize,
    pub promotions: usize,
    pub failures: usize,
}

pub struct WaitlistSweepJob<S> {
    bookings: BookingService<S>,
    horizon: Duration,
    interval_secs: u64,
}

impl<S: BookingStore> WaitlistSweepJob<S> {
    pub fn new(bookings: BookingService<S>, horizon_days: i64, interval_secs: u64) -> Self {
        Self {
            bookings,
            horizon: Duration::days(horizon_days),
            interval_secs,
        }
    }

    /// Promote into every upcoming class that starts before `now + horizon`.
    pub async fn sweep(&self, now: NaiveDateTime) -> anyhow::Result<SweepSummary> {
        let class_ids = self
            .bookings
            .store()
            .list_classes_awaiting_promotion(now, now + self.horizon)
            .await?;

        let mut summary = SweepSummary {
            classes_checked: class_ids.len(),
            ..SweepSummary::default()
        };

        for class_id in class_ids {
            match self.fill_open_spots(class_id).await {
                Ok(promoted) => summary.promotions += promoted,
                Err(e) => {
                    summary.failures += 1;
                    warn!(class_id = %class_id, error = %e, "Waitlist sweep failed for class");
                }
            }
        }

        Ok(summary)
    }

    async fn fill_open_spots(&self, class_id: Uuid) -> Result<usize, domain::errors::BookingError> {
        let mut promoted = 0;
        // Each promotion removes one waitlisted booking, so this terminates.
        while let Some(promotion) = self.bookings.promote(class_id).await? {
            debug!(
                class_id = %class_id,
                booking_id = %promotion.booking.id,
                "Sweep promoted waitlisted booking"
            );
            record_promotion("sweep");
            promoted += 1;
        }
        Ok(promoted)
    }
}

#[async_trait::async_trait]
impl<S: BookingStore + 'static> Job for WaitlistSweepJob<S> {
    fn name(&self) -> &'static str {
        "waitlist_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let summary = self.sweep(Local::now().naive_local()).await?;
        if summary.failures > 0 {
            anyhow::bail!(
                "{} of {} classes could not be swept",
                summary.failures,
                summary.classes_checked
            );
        }
        Ok(())
    }
}
