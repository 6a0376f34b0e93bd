//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::constants::{APP_NAME, APP_VERSION};
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: i64,
    assessments_running: usize,
    monitoring_active: bool,
    llm_enabled: bool,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: APP_NAME,
        version: APP_VERSION,
        timestamp: chrono::Utc::now().timestamp(),
        assessments_running: state.service.running(),
        monitoring_active: state.monitor.is_running(),
        llm_enabled: state.config.llm_enabled(),
    })
}
