use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use domain::services::BookingService;
use gym_scheduler_api::{
    app,
    config::Config,
    jobs::{JobScheduler, PoolMetricsJob, WaitlistSweepJob},
    middleware,
};
use persistence::PgSchedulingStore;

const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting gym scheduler v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;
    persistence::db::run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    if config.booking.waitlist_sweep_interval_secs > 0 {
        let bookings = BookingService::new(PgSchedulingStore::new(pool.clone()))
            .with_conflict_retries(config.booking.conflict_retries);
        scheduler.register(WaitlistSweepJob::new(
            bookings,
            config.booking.sweep_horizon_days,
            config.booking.waitlist_sweep_interval_secs,
        ));
    }
    scheduler.start();

    let addr = config.socket_addr().context("invalid server address")?;
    let app = app::create_app(config, pool);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(JOB_SHUTDOWN_TIMEOUT).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
