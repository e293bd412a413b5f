//! Class template endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{ClassTemplate, CreateClassTemplateRequest};
use domain::services::{GenerateScheduleRequest, InstantiationReport};
use domain::stores::TemplateStore;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_classes_generated;

/// POST /api/v1/templates
pub async fn create_template(
    State(state): State<AppState>,
    Json(request): Json<CreateClassTemplateRequest>,
) -> Result<(StatusCode, Json<ClassTemplate>), ApiError> {
    request.validate()?;

    let template = state.store.create_template(request.into()).await?;

    info!(
        template_id = %template.id,
        organization_id = %template.organization_id,
        name = %template.name,
        "Class template created"
    );

    Ok((StatusCode::CREATED, Json(template)))
}

/// GET /api/v1/templates/:template_id
pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
) -> Result<Json<ClassTemplate>, ApiError> {
    state
        .store
        .get_template(template_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Class template not found: {}", template_id)))
}

/// Expand a recurrence rule and create the template's classes.
///
/// POST /api/v1/templates/:template_id/schedule
///
/// Returns 201 when at least one class was created, 200 otherwise. Slots
/// that failed are listed in the report and can be retried by re-posting.
pub async fn generate_schedule(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    Json(request): Json<GenerateScheduleRequest>,
) -> Result<(StatusCode, Json<InstantiationReport>), ApiError> {
    request.validate()?;

    let report = state
        .instantiator
        .generate_schedule(template_id, &request.recurrence, &request.overrides)
        .await?;

    record_classes_generated(
        report.created.len(),
        report.skipped.len(),
        report.failed.len(),
    );

    let status = if report.created.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(report)))
}
