//! Grading Layer
//!
//! Letter grades, risk labels and business recommendations for 0..=100
//! scores (higher is better).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::scoring::{display_score, Dimension, ScoreBreakdown};

/// Declared worst to best so the derived ordering follows grade quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    F,
    #[serde(rename = "D-")]
    DMinus,
    D,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "C-")]
    CMinus,
    C,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "B-")]
    BMinus,
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A-")]
    AMinus,
    A,
    #[serde(rename = "A+")]
    APlus,
}

/// Lower bounds, inclusive, best first
const THRESHOLDS: &[(f64, LetterGrade)] = &[
    (97.0, LetterGrade::APlus),
    (93.0, LetterGrade::A),
    (90.0, LetterGrade::AMinus),
    (87.0, LetterGrade::BPlus),
    (83.0, LetterGrade::B),
    (80.0, LetterGrade::BMinus),
    (77.0, LetterGrade::CPlus),
    (73.0, LetterGrade::C),
    (70.0, LetterGrade::CMinus),
    (67.0, LetterGrade::DPlus),
    (63.0, LetterGrade::D),
    (60.0, LetterGrade::DMinus),
];

impl LetterGrade {
    /// NaN falls through every comparison and grades as F
    pub fn from_score(score: f64) -> Self {
        THRESHOLDS
            .iter()
            .find(|(bound, _)| score >= *bound)
            .map(|(_, grade)| *grade)
            .unwrap_or(LetterGrade::F)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::DPlus => "D+",
            Self::D => "D",
            Self::DMinus => "D-",
            Self::F => "F",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::APlus => "Exceptional",
            Self::A => "Excellent",
            Self::AMinus => "Very Good",
            Self::BPlus => "Good",
            Self::B => "Above Average",
            Self::BMinus => "Satisfactory",
            Self::CPlus => "Fair",
            Self::C => "Needs Attention",
            Self::CMinus => "Below Average",
            Self::DPlus => "Poor",
            Self::D => "Very Poor",
            Self::DMinus => "Failing",
            Self::F => "Critical Failure",
        }
    }

    pub fn risk_label(&self) -> &'static str {
        match self {
            Self::APlus | Self::A => "Minimal",
            Self::AMinus => "Very Low",
            Self::BPlus | Self::B => "Low",
            Self::BMinus => "Low-Medium",
            Self::CPlus | Self::C => "Medium",
            Self::CMinus => "Medium-High",
            Self::DPlus | Self::D => "High",
            Self::DMinus | Self::F => "Critical",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            Self::APlus => "Outstanding security and compliance posture. Industry-leading practices.",
            Self::A => "Excellent security and compliance. Very minimal risk.",
            Self::AMinus => "Very good security practices with minor areas for improvement.",
            Self::BPlus => "Good security posture with some room for enhancement.",
            Self::B => "Above average security with standard industry practices.",
            Self::BMinus => "Satisfactory security but several areas need attention.",
            Self::CPlus => "Fair security posture requiring moderate improvements.",
            Self::C => "Average security with significant areas needing attention.",
            Self::CMinus => "Below average security requiring substantial improvements.",
            Self::DPlus => "Poor security posture with major vulnerabilities identified.",
            Self::D => "Very poor security requiring immediate attention.",
            Self::DMinus => "Failing security posture requiring urgent remediation.",
            Self::F => "Critical security failures requiring immediate remediation.",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::APlus => "APPROVED - Excellent vendor choice. Proceed with confidence.",
            Self::A => "APPROVED - Strong vendor with minimal risk. Safe to proceed.",
            Self::AMinus => "APPROVED - Very good vendor choice with minor considerations.",
            Self::BPlus => "APPROVED WITH CONDITIONS - Good vendor, monitor key areas.",
            Self::B => "REVIEW REQUIRED - Acceptable vendor with standard oversight needed.",
            Self::BMinus => "REVIEW REQUIRED - Address identified concerns before proceeding.",
            Self::CPlus => "DETAILED REVIEW - Moderate risk requiring management attention.",
            Self::C => "DETAILED REVIEW - Significant concerns need resolution.",
            Self::CMinus => "HIGH RISK - Major improvements required before approval.",
            Self::DPlus => "NOT RECOMMENDED - Serious security deficiencies identified.",
            Self::D => "NOT RECOMMENDED - Critical security issues require resolution.",
            Self::DMinus => "REJECTED - Failing security posture, do not proceed.",
            Self::F => "REJECTED - Unacceptable risk level. Do not proceed.",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::APlus => "#10b981",
            Self::A => "#059669",
            Self::AMinus => "#047857",
            Self::BPlus => "#22c55e",
            Self::B => "#16a34a",
            Self::BMinus => "#15803d",
            Self::CPlus => "#eab308",
            Self::C => "#ca8a04",
            Self::CMinus => "#a16207",
            Self::DPlus => "#f97316",
            Self::D => "#ea580c",
            Self::DMinus | Self::F => "#dc2626",
        }
    }

    /// C+ and below get improvement suggestions
    pub fn needs_improvement(&self) -> bool {
        *self <= Self::CPlus
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// REPORTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    pub letter: LetterGrade,
    pub score: f64,
    pub description: String,
    pub risk_level: String,
    pub explanation: String,
    pub recommendation: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionGrade {
    pub dimension: Dimension,
    pub score: f64,
    pub letter: LetterGrade,
    pub risk_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementSuggestion {
    pub dimension: Dimension,
    pub current_grade: LetterGrade,
    pub suggestion: String,
}

/// Grade an unrounded score; the report carries it rounded to one decimal
pub fn grade(score: f64) -> GradeReport {
    let letter = LetterGrade::from_score(score);
    GradeReport {
        letter,
        score: display_score(score),
        description: letter.description().to_string(),
        risk_level: letter.risk_label().to_string(),
        explanation: letter.explanation().to_string(),
        recommendation: letter.recommendation().to_string(),
        color: letter.color().to_string(),
    }
}

pub fn dimension_grades(breakdown: &ScoreBreakdown) -> Vec<DimensionGrade> {
    breakdown
        .dimensions
        .iter()
        .map(|d| {
            let letter = LetterGrade::from_score(d.score);
            DimensionGrade {
                dimension: d.dimension,
                score: d.score.round(),
                letter,
                risk_level: letter.risk_label().to_string(),
            }
        })
        .collect()
}

fn improvement_text(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Breach => "Strengthen breach prevention and publish incident response commitments",
        Dimension::Privacy => "Enhance privacy policies and data handling procedures",
        Dimension::Compliance => "Obtain relevant certifications (SOC 2, ISO 27001) and publish evidence",
        Dimension::DataFlow => "Document subprocessors, data residency and transfer safeguards",
        Dimension::AiGovernance => "Publish AI governance and responsible AI commitments",
        Dimension::TrustCenter => "Provide a trust center with security and compliance documentation",
    }
}

pub fn improvement_suggestions(breakdown: &ScoreBreakdown) -> Vec<ImprovementSuggestion> {
    dimension_grades(breakdown)
        .into_iter()
        .filter(|g| g.letter.needs_improvement())
        .map(|g| ImprovementSuggestion {
            dimension: g.dimension,
            current_grade: g.letter,
            suggestion: format!("{}: {}", g.dimension.label(), improvement_text(g.dimension)),
        })
        .collect()
}

pub fn summary(report: &GradeReport) -> String {
    format!(
        "This vendor received a {} grade ({}/100) indicating {} risk.",
        report.letter,
        report.score.round(),
        report.risk_level
    )
}
