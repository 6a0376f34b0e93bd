//! Score Aggregator
//!
//! Maps the six scan records to six dimension scores (0..=100, higher is
//! better), combines them with the mode's fixed weights and buckets the
//! result into a risk level.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::AssessmentError;
use crate::logic::scans::{AnalysisMethod, ScanBundle, ScanKind, ScanOutcome};
use crate::models::AssessmentMode;

// ============================================================================
// DIMENSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Breach,
    Privacy,
    Compliance,
    DataFlow,
    AiGovernance,
    TrustCenter,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Breach,
        Dimension::Privacy,
        Dimension::Compliance,
        Dimension::DataFlow,
        Dimension::AiGovernance,
        Dimension::TrustCenter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breach => "breach",
            Self::Privacy => "privacy",
            Self::Compliance => "compliance",
            Self::DataFlow => "data_flow",
            Self::AiGovernance => "ai_governance",
            Self::TrustCenter => "trust_center",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Breach => "Breach & Security History",
            Self::Privacy => "Privacy Compliance",
            Self::Compliance => "Compliance Documentation",
            Self::DataFlow => "Data Flow Risk",
            Self::AiGovernance => "AI Governance",
            Self::TrustCenter => "Trust Center & Transparency",
        }
    }

    /// Weight in the overall score; each mode's weights sum to 1
    pub fn weight(&self, mode: AssessmentMode) -> f64 {
        match (self, mode) {
            (Self::Breach, AssessmentMode::TechnicalDueDiligence) => 0.30,
            (Self::Breach, AssessmentMode::BusinessRisk) => 0.15,
            (Self::Privacy, AssessmentMode::TechnicalDueDiligence) => 0.20,
            (Self::Privacy, AssessmentMode::BusinessRisk) => 0.15,
            (Self::Compliance, AssessmentMode::TechnicalDueDiligence) => 0.20,
            (Self::Compliance, AssessmentMode::BusinessRisk) => 0.25,
            (Self::DataFlow, _) => 0.15,
            (Self::AiGovernance, _) => 0.10,
            (Self::TrustCenter, AssessmentMode::TechnicalDueDiligence) => 0.05,
            (Self::TrustCenter, AssessmentMode::BusinessRisk) => 0.20,
        }
    }

    /// Score used when the dimension's scan failed
    pub fn default_score(&self) -> f64 {
        match self {
            Self::Breach | Self::AiGovernance => 70.0,
            Self::Privacy | Self::Compliance | Self::DataFlow => 50.0,
            Self::TrustCenter => 40.0,
        }
    }

    pub fn scan_kind(&self) -> ScanKind {
        match self {
            Self::Breach => ScanKind::Breach,
            Self::Privacy => ScanKind::Privacy,
            Self::Compliance => ScanKind::Compliance,
            Self::DataFlow => ScanKind::DataFlow,
            Self::AiGovernance => ScanKind::AiServices,
            Self::TrustCenter => ScanKind::TrustCenter,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a dimension score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Live,
    Heuristic,
    Synthetic,
    Fallback,
}

impl From<AnalysisMethod> for ScoreSource {
    fn from(method: AnalysisMethod) -> Self {
        match method {
            AnalysisMethod::Llm => ScoreSource::Live,
            AnalysisMethod::Keyword => ScoreSource::Heuristic,
            AnalysisMethod::Synthetic => ScoreSource::Synthetic,
            AnalysisMethod::None => ScoreSource::Fallback,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub score: f64,
    pub weight: f64,
    pub weighted_score: f64,
    pub source: ScoreSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub mode: AssessmentMode,
    pub dimensions: Vec<DimensionScore>,
}

// ============================================================================
// RISK LEVEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Bucket an overall score; lower bounds inclusive
    pub fn classify(score: f64, mode: AssessmentMode) -> Self {
        let (low, medium, high) = match mode {
            AssessmentMode::TechnicalDueDiligence => (85.0, 70.0, 50.0),
            AssessmentMode::BusinessRisk => (75.0, 60.0, 40.0),
        };

        if score >= low {
            Self::Low
        } else if score >= medium {
            Self::Medium
        } else if score >= high {
            Self::High
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    /// Display value, one decimal
    pub overall_score: f64,
    /// Unrounded weighted sum; grades and risk levels are taken from this
    pub raw_score: f64,
    pub risk_level: RiskLevel,
    pub breakdown: ScoreBreakdown,
}

// ============================================================================
// MODE MAPPING
// ============================================================================

fn is_technical(mode: AssessmentMode) -> bool {
    mode == AssessmentMode::TechnicalDueDiligence
}

/// Raw (unclamped) score and source for one dimension
fn map_dimension(dimension: Dimension, scans: &ScanBundle, mode: AssessmentMode) -> (f64, ScoreSource) {
    let technical = is_technical(mode);

    match dimension {
        Dimension::Breach => {
            let b = &scans.breach;
            let (penalty, sensitive) = if technical { (25.0, 10.0) } else { (15.0, 5.0) };
            let mut score = 100.0 - penalty * b.breach_count as f64;
            if b.sensitive_data_exposed {
                score -= sensitive;
            }
            (score, ScoreSource::Live)
        }
        Dimension::Privacy => {
            let p = &scans.privacy;
            let mut score = p.privacy_score;
            if technical && !p.policy_found {
                score -= 10.0;
            }
            if !technical && (p.gdpr_mentioned || p.ccpa_mentioned) {
                score += 5.0;
            }
            (score, p.analysis_method.into())
        }
        Dimension::Compliance => {
            let c = &scans.compliance;
            let mut score = c.compliance_score;
            if !technical && !c.compliance_documents.is_empty() {
                score += 5.0;
            }
            (score, ScoreSource::Live)
        }
        Dimension::DataFlow => {
            let d = &scans.data_flow;
            let mut score = d.data_flow_score;
            if technical && !d.encryption_in_transit {
                score -= 10.0;
            }
            (score, d.analysis_method.into())
        }
        Dimension::AiGovernance => {
            let a = &scans.ai_services;
            let score = match (a.offers_ai_services, a.governance_documented, technical) {
                (false, _, _) => 90.0,
                (true, true, true) => 80.0,
                (true, true, false) => 85.0,
                (true, false, true) => 55.0,
                (true, false, false) => 65.0,
            };
            (score, a.detection_method.into())
        }
        Dimension::TrustCenter => {
            let t = &scans.trust_center;
            let mut score = t.transparency_score;
            if !technical && t.trust_center_found {
                score += 10.0;
            }
            let source = if t.trust_center_found {
                ScoreSource::Heuristic
            } else {
                ScoreSource::Synthetic
            };
            (score, source)
        }
    }
}

fn scan_failed(dimension: Dimension, scans: &ScanBundle) -> bool {
    match dimension {
        Dimension::Breach => scans.breach.is_failure(),
        Dimension::Privacy => scans.privacy.is_failure(),
        Dimension::Compliance => scans.compliance.is_failure(),
        Dimension::DataFlow => scans.data_flow.is_failure(),
        Dimension::AiGovernance => scans.ai_services.is_failure(),
        Dimension::TrustCenter => scans.trust_center.is_failure(),
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Per-dimension scores, clamped to [0, 100]
pub fn dimension_scores(scans: &ScanBundle, mode: AssessmentMode) -> Result<Vec<DimensionScore>, AssessmentError> {
    Dimension::ALL
        .iter()
        .map(|&dimension| {
            let (raw, source) = if scan_failed(dimension, scans) {
                (dimension.default_score(), ScoreSource::Fallback)
            } else {
                map_dimension(dimension, scans, mode)
            };

            if !raw.is_finite() {
                return Err(AssessmentError::NonFiniteScore { dimension });
            }

            let score = raw.clamp(0.0, 100.0);
            let weight = dimension.weight(mode);
            Ok(DimensionScore {
                dimension,
                score,
                weight,
                weighted_score: score * weight,
                source,
            })
        })
        .collect()
}

/// Weighted sum clamped to [0, 100]
pub fn combine(scores: &[DimensionScore]) -> f64 {
    let total: f64 = scores.iter().map(|d| d.score * d.weight).sum();
    total.clamp(0.0, 100.0)
}

/// Round to one decimal for display only
pub fn display_score(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

pub fn aggregate(scans: &ScanBundle, mode: AssessmentMode) -> Result<RiskScore, AssessmentError> {
    let dimensions = dimension_scores(scans, mode)?;
    Ok(summarize(dimensions, mode))
}

fn summarize(dimensions: Vec<DimensionScore>, mode: AssessmentMode) -> RiskScore {
    let raw_score = combine(&dimensions);
    let risk_level = RiskLevel::classify(raw_score, mode);
    let overall_score = display_score(raw_score);

    tracing::debug!("Aggregated {} score {} ({:?})", mode, raw_score, risk_level);

    RiskScore {
        overall_score,
        raw_score,
        risk_level,
        breakdown: ScoreBreakdown { mode, dimensions },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scans::{PartialScans, ScanError, ScanTarget};

    fn failed_bundle() -> ScanBundle {
        let target = ScanTarget {
            domain: "example.com".to_string(),
            vendor_name: "Example".to_string(),
            regulations: Vec::new(),
        };
        PartialScans::default().complete(&target, |_| ScanError::Unreachable {
            domain: "example.com".to_string(),
        })
    }

    fn uniform(score: f64, mode: AssessmentMode) -> Vec<DimensionScore> {
        Dimension::ALL
            .iter()
            .map(|&dimension| DimensionScore {
                dimension,
                score,
                weight: dimension.weight(mode),
                weighted_score: score * dimension.weight(mode),
                source: ScoreSource::Live,
            })
            .collect()
    }

    #[test]
    fn test_weights_sum_to_one() {
        for mode in [AssessmentMode::TechnicalDueDiligence, AssessmentMode::BusinessRisk] {
            let sum: f64 = Dimension::ALL.iter().map(|d| d.weight(mode)).sum();
            assert!((sum - 1.0).abs() < 1e-9, "{} weights sum to {}", mode, sum);
        }
    }

    #[test]
    fn test_uniform_scores_pass_through() {
        for mode in [AssessmentMode::TechnicalDueDiligence, AssessmentMode::BusinessRisk] {
            assert_eq!(display_score(combine(&uniform(80.0, mode))), 80.0);
        }
    }

    #[test]
    fn test_level_uses_unrounded_score() {
        let risk = summarize(uniform(59.96, AssessmentMode::BusinessRisk), AssessmentMode::BusinessRisk);
        assert_eq!(risk.overall_score, 60.0);
        assert!(risk.raw_score < 60.0);
        assert_eq!(risk.risk_level, RiskLevel::High, "59.96 must not round up into Medium");
    }

    #[test]
    fn test_all_failed_uses_defaults() {
        let scans = failed_bundle();

        let business = aggregate(&scans, AssessmentMode::BusinessRisk).unwrap();
        assert_eq!(business.overall_score, 53.0);
        assert_eq!(business.risk_level, RiskLevel::High);
        assert!(business
            .breakdown
            .dimensions
            .iter()
            .all(|d| d.source == ScoreSource::Fallback));

        let technical = aggregate(&scans, AssessmentMode::TechnicalDueDiligence).unwrap();
        assert_eq!(technical.overall_score, 57.5);
        assert_eq!(technical.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_breach_mapping_and_clamp() {
        let mut scans = failed_bundle();
        scans.breach.meta.error = None;
        scans.breach.breach_count = 5;
        scans.breach.sensitive_data_exposed = true;

        let technical = dimension_scores(&scans, AssessmentMode::TechnicalDueDiligence).unwrap();
        assert_eq!(technical[0].score, 0.0);

        let business = dimension_scores(&scans, AssessmentMode::BusinessRisk).unwrap();
        assert_eq!(business[0].score, 20.0);
    }

    #[test]
    fn test_ai_governance_mapping() {
        let mut scans = failed_bundle();
        scans.ai_services.meta.error = None;
        scans.ai_services.offers_ai_services = true;

        let score = |mode| {
            dimension_scores(&scans, mode).unwrap()[4].score
        };
        assert_eq!(score(AssessmentMode::TechnicalDueDiligence), 55.0);
        assert_eq!(score(AssessmentMode::BusinessRisk), 65.0);

        scans.ai_services.governance_documented = true;
        let score = |mode| dimension_scores(&scans, mode).unwrap()[4].score;
        assert_eq!(score(AssessmentMode::TechnicalDueDiligence), 80.0);
        assert_eq!(score(AssessmentMode::BusinessRisk), 85.0);
    }

    #[test]
    fn test_non_finite_score_rejected() {
        let mut scans = failed_bundle();
        scans.privacy.meta.error = None;
        scans.privacy.privacy_score = f64::NAN;

        let err = aggregate(&scans, AssessmentMode::BusinessRisk).unwrap_err();
        assert!(matches!(err, AssessmentError::NonFiniteScore { dimension: Dimension::Privacy }));
    }

    #[test]
    fn test_risk_buckets() {
        let tech = AssessmentMode::TechnicalDueDiligence;
        let biz = AssessmentMode::BusinessRisk;
        assert_eq!(RiskLevel::classify(85.0, tech), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(84.9, tech), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(49.9, tech), RiskLevel::Critical);
        assert_eq!(RiskLevel::classify(75.0, biz), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(40.0, biz), RiskLevel::High);
        assert_eq!(RiskLevel::classify(39.9, biz), RiskLevel::Critical);
    }
}
