//! Recurrence preview.

use axum::Json;
use chrono::NaiveDateTime;
use domain::models::RecurrenceSpec;
use domain::services::expand;
use serde::Serialize;
use validator::Validate;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulePreview {
    pub count: usize,
    pub occurrences: Vec<NaiveDateTime>,
}

/// Expand a recurrence rule without creating anything.
///
/// POST /api/v1/schedules/preview
pub async fn preview_schedule(
    Json(request): Json<RecurrenceSpec>,
) -> Result<Json<SchedulePreview>, ApiError> {
    request.validate()?;

    let occurrences = expand(&request)?;
    Ok(Json(SchedulePreview {
        count: occurrences.len(),
        occurrences,
    }))
}
