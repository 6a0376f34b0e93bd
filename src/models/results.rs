//! Completed assessment results

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assessment::AssessmentMode;
use crate::logic::assessment::grading::{DimensionGrade, GradeReport, ImprovementSuggestion, LetterGrade};
use crate::logic::assessment::scoring::{Dimension, RiskLevel, ScoreBreakdown};
use crate::logic::scans::ScanBundle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub dimension: Dimension,
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResults {
    pub vendor_domain: String,
    pub vendor_name: String,
    pub assessment_mode: AssessmentMode,
    pub overall_score: f64,
    pub risk_level: RiskLevel,
    pub letter_grade: LetterGrade,
    pub grade: GradeReport,
    /// Dimension name -> score
    pub scores: BTreeMap<String, f64>,
    pub scoring_breakdown: ScoreBreakdown,
    pub dimension_grades: Vec<DimensionGrade>,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
    pub improvement_suggestions: Vec<ImprovementSuggestion>,
    pub summary: String,
    pub scan_results: ScanBundle,
    pub regulations: Vec<String>,
    pub continuous_monitoring: bool,
    pub completed_at: DateTime<Utc>,
}
