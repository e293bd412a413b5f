use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{BookingService, ClassInstantiator};
use persistence::PgSchedulingStore;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{bookings, classes, health, schedules, templates};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub store: PgSchedulingStore,
    pub bookings: BookingService<PgSchedulingStore>,
    pub instantiator: ClassInstantiator<PgSchedulingStore>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        let store = PgSchedulingStore::new(pool.clone());
        let bookings = BookingService::new(store.clone())
            .with_conflict_retries(config.booking.conflict_retries);

        Self {
            instantiator: ClassInstantiator::new(store.clone()),
            bookings,
            store,
            pool,
            config: Arc::new(config),
        }
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let state = AppState::new(config, pool);
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let api_routes = Router::new()
        .route("/api/v1/schedules/preview", post(schedules::preview_schedule))
        .route("/api/v1/templates", post(templates::create_template))
        .route("/api/v1/templates/:template_id", get(templates::get_template))
        .route(
            "/api/v1/templates/:template_id/schedule",
            post(templates::generate_schedule),
        )
        .route("/api/v1/classes", post(classes::create_class))
        .route("/api/v1/classes/:class_id", get(classes::get_class))
        .route("/api/v1/classes/:class_id/cancel", post(classes::cancel_class))
        .route("/api/v1/classes/:class_id/roster", get(classes::get_roster))
        .route("/api/v1/classes/:class_id/promote", post(classes::promote))
        .route(
            "/api/v1/classes/:class_id/bookings",
            post(bookings::book_class),
        )
        .route(
            "/api/v1/bookings/:booking_id/cancel",
            post(bookings::cancel_booking),
        )
        .route(
            "/api/v1/bookings/:booking_id/no-show",
            post(bookings::mark_no_show),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Middleware order: bottom layers run first
    Router::new()
        .merge(api_routes)
        .merge(public_routes)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
