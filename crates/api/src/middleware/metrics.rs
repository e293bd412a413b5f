//! Prometheus metrics: HTTP middleware, business counters and the exporter.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::BookingStatus;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0];

/// Middleware to record HTTP request metrics.
///
/// - `http_requests_total`: counter labelled by method, route and status
/// - `http_request_duration_seconds`: histogram labelled by method and route
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = method_label(req.method());
    // Route templates keep label cardinality bounded.
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    counter!(
        "http_requests_total",
        "method" => method,
        "path" => path.clone(),
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}

fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        _ => "OTHER",
    }
}

/// Count an admission outcome (`confirmed` or `waitlist`).
pub fn record_booking_admitted(status: BookingStatus, is_drop_in: bool) {
    counter!(
        "bookings_admitted_total",
        "status" => status.as_str(),
        "drop_in" => if is_drop_in { "true" } else { "false" }
    )
    .increment(1);
}

/// Count a rejected booking request by error code.
pub fn record_booking_rejected(code: &'static str) {
    counter!("bookings_rejected_total", "reason" => code).increment(1);
}

/// Count a cancellation or no-show.
pub fn record_booking_released(status: BookingStatus) {
    counter!("bookings_released_total", "status" => status.as_str()).increment(1);
}

/// Count waitlist promotions by trigger (`cancellation`, `manual`, `sweep`).
pub fn record_promotion(trigger: &'static str) {
    counter!("waitlist_promotions_total", "trigger" => trigger).increment(1);
}

/// Count the outcome of one schedule generation run.
pub fn record_classes_generated(created: usize, skipped: usize, failed: usize) {
    counter!("classes_generated_total", "result" => "created").increment(created as u64);
    counter!("classes_generated_total", "result" => "skipped").increment(skipped as u64);
    counter!("classes_generated_total", "result" => "failed").increment(failed as u64);
}

/// Handler for `/metrics` returning the Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Install the global Prometheus recorder. Repeated calls are no-ops.
pub fn init_metrics() -> Result<(), BuildError> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(LATENCY_BUCKETS)?
        .install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle);
    Ok(())
}
