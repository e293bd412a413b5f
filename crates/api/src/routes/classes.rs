//! Class endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    ClassCancellation, ClassDetail, ClassInstance, ClassRoster, CreateClassRequest, Promotion,
};
use domain::stores::ClassStore;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_promotion;

/// Create a one-off class outside any template.
///
/// POST /api/v1/classes
pub async fn create_class(
    State(state): State<AppState>,
    Json(request): Json<CreateClassRequest>,
) -> Result<(StatusCode, Json<ClassInstance>), ApiError> {
    request.validate()?;

    let class = state.store.create_class(request.into()).await?;

    info!(
        class_id = %class.id,
        starts_at = %class.starts_at,
        "Ad-hoc class created"
    );

    Ok((StatusCode::CREATED, Json(class)))
}

/// GET /api/v1/classes/:class_id
pub async fn get_class(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
) -> Result<Json<ClassDetail>, ApiError> {
    Ok(Json(state.bookings.class_detail(class_id).await?))
}

/// GET /api/v1/classes/:class_id/roster
pub async fn get_roster(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
) -> Result<Json<ClassRoster>, ApiError> {
    Ok(Json(state.bookings.roster(class_id).await?))
}

/// POST /api/v1/classes/:class_id/cancel
pub async fn cancel_class(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
) -> Result<Json<ClassCancellation>, ApiError> {
    Ok(Json(state.bookings.cancel_class(class_id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PromoteResponse {
    pub promoted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Promotion>,
}

/// Offer one open spot to the waitlist.
///
/// POST /api/v1/classes/:class_id/promote
pub async fn promote(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
) -> Result<Json<PromoteResponse>, ApiError> {
    let promotion = state.bookings.promote(class_id).await?;
    if promotion.is_some() {
        record_promotion("manual");
    }

    Ok(Json(PromoteResponse {
        promoted: promotion.is_some(),
        promotion,
    }))
}
