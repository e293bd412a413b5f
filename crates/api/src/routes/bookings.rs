//! Booking endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::errors::BookingError;
use domain::models::{Admission, BookClassRequest, CancellationOutcome};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{
    record_booking_admitted, record_booking_rejected, record_booking_released, record_promotion,
};

/// Stable label for a refused booking request.
fn rejection_reason(err: &BookingError) -> Option<&'static str> {
    match err {
        BookingError::AlreadyBooked => Some("already_booked"),
        BookingError::ClassCancelled => Some("class_cancelled"),
        BookingError::NoActiveSubscription => Some("no_active_subscription"),
        BookingError::DropInNotAllowed => Some("drop_in_not_allowed"),
        _ => None,
    }
}

/// Book a member into a class. The booking is confirmed while spots remain
/// and waitlisted afterwards.
///
/// POST /api/v1/classes/:class_id/bookings
pub async fn book_class(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
    Json(request): Json<BookClassRequest>,
) -> Result<(StatusCode, Json<Admission>), ApiError> {
    match state
        .bookings
        .request_booking(class_id, request.member_id, request.is_drop_in)
        .await
    {
        Ok(admission) => {
            record_booking_admitted(admission.status, admission.booking.is_drop_in);
            Ok((StatusCode::CREATED, Json(admission)))
        }
        Err(err) => {
            if let Some(reason) = rejection_reason(&err) {
                record_booking_rejected(reason);
            }
            Err(err.into())
        }
    }
}

/// POST /api/v1/bookings/:booking_id/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<CancellationOutcome>, ApiError> {
    let outcome = state.bookings.cancel_booking(booking_id).await?;
    record_release(&outcome);
    Ok(Json(outcome))
}

/// POST /api/v1/bookings/:booking_id/no-show
pub async fn mark_no_show(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<CancellationOutcome>, ApiError> {
    let outcome = state.bookings.mark_no_show(booking_id).await?;
    record_release(&outcome);
    Ok(Json(outcome))
}

fn record_release(outcome: &CancellationOutcome) {
    record_booking_released(outcome.booking.status);
    if outcome.promotion.is_some() {
        record_promotion("cancellation");
    }
}
