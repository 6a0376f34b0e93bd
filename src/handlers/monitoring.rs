//! Monitoring handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::logic::monitoring::{MonitoredVendor, MonitoringAlert, MonitoringStatus};
use crate::{AppError, AppResult, AppState};

const DEFAULT_ALERT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub limit: Option<usize>,
}

impl AlertQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_ALERT_LIMIT)
    }
}

#[derive(Serialize)]
pub struct RemoveResponse {
    domain: String,
    monitoring: &'static str,
}

pub async fn status(State(state): State<AppState>) -> Json<MonitoringStatus> {
    Json(state.monitor.status())
}

pub async fn recent_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> Json<Vec<MonitoringAlert>> {
    Json(state.monitor.recent_alerts(query.limit()))
}

pub async fn vendor(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> AppResult<Json<MonitoredVendor>> {
    let vendor = state
        .monitor
        .vendor(&domain)
        .ok_or_else(|| AppError::NotFound(format!("{} is not monitored", domain)))?;

    Ok(Json(vendor))
}

pub async fn vendor_alerts(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(query): Query<AlertQuery>,
) -> AppResult<Json<Vec<MonitoringAlert>>> {
    if state.monitor.vendor(&domain).is_none() {
        return Err(AppError::NotFound(format!("{} is not monitored", domain)));
    }

    Ok(Json(state.monitor.alerts_for(&domain, query.limit())))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> AppResult<Json<RemoveResponse>> {
    if !state.monitor.remove(&domain) {
        return Err(AppError::NotFound(format!("{} is not monitored", domain)));
    }

    Ok(Json(RemoveResponse {
        domain,
        monitoring: "stopped",
    }))
}
