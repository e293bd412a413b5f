//! Background job scheduler and job implementations.

mod pool_metrics;
mod scheduler;
mod waitlist_sweep;

pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{run_once, Job, JobFrequency, JobScheduler};
pub use waitlist_sweep::{SweepSummary, WaitlistSweepJob};
