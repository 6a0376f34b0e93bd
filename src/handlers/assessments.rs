//! Assessment handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::logic::assessment::CancelOutcome;
use crate::models::{Assessment, AssessmentStatus, AssessmentSummary, CreateAssessmentRequest};
use crate::{AppError, AppResult, AppState};

#[derive(Serialize)]
pub struct CreateAssessmentResponse {
    assessment_id: Uuid,
    status: AssessmentStatus,
    status_url: String,
}

#[derive(Serialize)]
pub struct CancelAssessmentResponse {
    assessment_id: Uuid,
    status: AssessmentStatus,
    error: &'static str,
}

/// Start an assessment; runs in the background
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateAssessmentRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreateAssessmentResponse>)> {
    let Json(req) = payload?;
    let id = state.service.create_assessment(req)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateAssessmentResponse {
            assessment_id: id,
            status: AssessmentStatus::InProgress,
            status_url: format!("/api/v1/assessments/{}", id),
        }),
    ))
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<AssessmentSummary>> {
    Json(state.service.list_assessments())
}

/// Status, progress and (once completed) results
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Assessment>> {
    let assessment = state
        .service
        .get_assessment(&id)
        .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    Ok(Json(assessment))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CancelAssessmentResponse>> {
    match state.service.cancel_assessment(&id) {
        CancelOutcome::NotFound => Err(AppError::NotFound("Assessment not found".to_string())),
        CancelOutcome::AlreadyFinished => Err(AppError::Conflict(
            "Assessment has already finished".to_string(),
        )),
        CancelOutcome::Cancelled => Ok(Json(CancelAssessmentResponse {
            assessment_id: id,
            status: AssessmentStatus::Error,
            error: "cancelled",
        })),
    }
}
