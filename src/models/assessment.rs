//! Assessment model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::AssessmentRequest;
use super::results::AssessmentResults;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentMode {
    #[serde(alias = "technical")]
    TechnicalDueDiligence,
    #[default]
    #[serde(alias = "business")]
    BusinessRisk,
}

impl AssessmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TechnicalDueDiligence => "technical_due_diligence",
            Self::BusinessRisk => "business_risk",
        }
    }
}

impl fmt::Display for AssessmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    InProgress,
    Completed,
    Error,
}

impl AssessmentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub vendor_domain: String,
    pub vendor_name: String,
    pub requester_email: String,
    pub regulations: Vec<String>,
    pub assessment_mode: AssessmentMode,
    pub continuous_monitoring: bool,
    pub status: AssessmentStatus,
    /// Percent complete, non-decreasing while in progress
    pub progress: f64,
    pub status_message: String,
    pub elapsed_seconds: f64,
    pub estimated_seconds_remaining: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<AssessmentResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Listing row for `GET /api/v1/assessments`
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentSummary {
    pub id: Uuid,
    pub vendor_domain: String,
    pub vendor_name: String,
    pub assessment_mode: AssessmentMode,
    pub status: AssessmentStatus,
    pub progress: f64,
    pub overall_score: Option<f64>,
    pub letter_grade: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assessment {
    pub fn new(request: &AssessmentRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            vendor_domain: request.vendor_domain.clone(),
            vendor_name: request.vendor_name.clone(),
            requester_email: request.requester_email.clone(),
            regulations: request.regulations.clone(),
            assessment_mode: request.assessment_mode,
            continuous_monitoring: request.continuous_monitoring,
            status: AssessmentStatus::InProgress,
            progress: 0.0,
            status_message: "Queued".to_string(),
            elapsed_seconds: 0.0,
            estimated_seconds_remaining: None,
            results: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a progress update. Ignored once terminal; never lowers progress.
    pub fn record_progress(
        &mut self,
        progress: f64,
        message: &str,
        elapsed_seconds: f64,
        remaining: Option<f64>,
    ) -> bool {
        if self.is_terminal() || !progress.is_finite() || progress < self.progress {
            return false;
        }

        self.progress = progress.min(100.0);
        self.status_message = message.to_string();
        self.elapsed_seconds = elapsed_seconds;
        self.estimated_seconds_remaining = remaining;
        self.updated_at = Utc::now();
        true
    }

    /// Transition to `completed`. Only the first terminal transition applies.
    pub fn complete(&mut self, results: AssessmentResults) -> bool {
        if self.is_terminal() {
            return false;
        }

        let now = Utc::now();
        self.status = AssessmentStatus::Completed;
        self.progress = 100.0;
        self.status_message = "Assessment complete".to_string();
        self.estimated_seconds_remaining = Some(0.0);
        self.results = Some(results);
        self.updated_at = now;
        self.completed_at = Some(now);
        true
    }

    /// Transition to `error`, leaving progress where it was
    pub fn fail(&mut self, message: &str) -> bool {
        if self.is_terminal() {
            return false;
        }

        let now = Utc::now();
        self.status = AssessmentStatus::Error;
        self.status_message = "Assessment failed".to_string();
        self.estimated_seconds_remaining = None;
        self.error = Some(message.to_string());
        self.updated_at = now;
        self.completed_at = Some(now);
        true
    }

    pub fn summary(&self) -> AssessmentSummary {
        AssessmentSummary {
            id: self.id,
            vendor_domain: self.vendor_domain.clone(),
            vendor_name: self.vendor_name.clone(),
            assessment_mode: self.assessment_mode,
            status: self.status,
            progress: self.progress,
            overall_score: self.results.as_ref().map(|r| r.overall_score),
            letter_grade: self.results.as_ref().map(|r| r.letter_grade.to_string()),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}
