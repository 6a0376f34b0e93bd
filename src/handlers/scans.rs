//! Single-scan handler

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;

use crate::logic::scans::{run_scan, ScanKind, ScanReport, ScanTarget};
use crate::models::{check_domain, display_name, normalize_domain};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub domain: String,
    #[serde(default)]
    pub regulations: Vec<String>,
}

/// Run one scan synchronously and return its record
pub async fn run(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> AppResult<Json<ScanReport>> {
    let kind: ScanKind = kind.parse().map_err(AppError::NotFound)?;
    let Json(req) = payload?;

    let domain = normalize_domain(&req.domain);
    check_domain(&domain)
        .map_err(|reason| AppError::ValidationError(format!("Invalid request - domain: {}", reason)))?;

    let target = ScanTarget {
        vendor_name: display_name(&domain),
        regulations: req.regulations.iter().map(|r| r.trim().to_string()).filter(|r| !r.is_empty()).collect(),
        domain,
    };

    tracing::info!("Ad-hoc {} scan for {}", kind, target.domain);
    Ok(Json(run_scan(&state.scans, kind, &target).await))
}
