//! Assessment Module - Orchestration, Scoring & Grading
//!
//! # Components
//! - `progress.rs`: step-weighted progress tracker
//! - `orchestrator.rs`: parallel scan fan-out with bounded join
//! - `scoring.rs`: dimension mapping and weighted aggregation
//! - `grading.rs`: letter grades and recommendations
//! - `report.rs`: findings and the results document
//! - `service.rs`: task ownership, create/get/list/cancel

pub mod grading;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod scoring;
pub mod service;

use uuid::Uuid;

pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use scoring::Dimension;
pub use service::{AssessmentService, CancelOutcome};

/// Orchestration-level failure; ends the assessment in status `error`
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("Non-finite score for dimension {dimension}")]
    NonFiniteScore { dimension: Dimension },

    #[error("Assessment task failed: {0}")]
    TaskFailed(String),

    #[error("cancelled")]
    Cancelled,

    #[error("Assessment {0} not found")]
    Missing(Uuid),
}
