//! Report Builder
//!
//! Findings and remediation recommendations derived from scan records, plus
//! assembly of the completed results document.

use std::collections::BTreeMap;

use chrono::Utc;

use super::grading::{self, GradeReport};
use super::scoring::{Dimension, RiskScore};
use crate::logic::scans::{canonical_framework, ScanBundle, ScanKind};
use crate::models::{AssessmentRequest, AssessmentResults, Finding, Severity};

fn finding(dimension: Dimension, severity: Severity, title: &str, description: String) -> Finding {
    Finding {
        dimension,
        severity,
        title: title.to_string(),
        description,
    }
}

fn dimension_for(kind: ScanKind) -> Dimension {
    match kind {
        ScanKind::Breach => Dimension::Breach,
        ScanKind::Privacy => Dimension::Privacy,
        ScanKind::AiServices => Dimension::AiGovernance,
        ScanKind::Compliance => Dimension::Compliance,
        ScanKind::TrustCenter => Dimension::TrustCenter,
        ScanKind::DataFlow => Dimension::DataFlow,
    }
}

/// Findings in dimension order; failed scans only contribute "data unavailable"
pub fn build_findings(scans: &ScanBundle) -> Vec<Finding> {
    let mut findings = Vec::new();
    let failed = scans.failures();

    let b = &scans.breach;
    if !failed.contains(&ScanKind::Breach) && b.breaches_found {
        let severity = if b.sensitive_data_exposed { Severity::Critical } else { Severity::High };
        findings.push(finding(
            Dimension::Breach,
            severity,
            "Historical data breaches",
            format!(
                "{} breach(es) on record exposing {} records{}",
                b.breach_count,
                b.total_records_exposed,
                if b.sensitive_data_exposed { ", including sensitive data" } else { "" }
            ),
        ));
    }

    let p = &scans.privacy;
    if !failed.contains(&ScanKind::Privacy) {
        if !p.policy_found {
            findings.push(finding(
                Dimension::Privacy,
                Severity::Medium,
                "No privacy policy found",
                "No privacy policy was found at standard locations".to_string(),
            ));
        } else if p.privacy_score < 60.0 {
            findings.push(finding(
                Dimension::Privacy,
                Severity::Medium,
                "Weak privacy policy",
                format!("Privacy policy scored {:.0}/100", p.privacy_score),
            ));
        }
    }

    let a = &scans.ai_services;
    if !failed.contains(&ScanKind::AiServices) && a.offers_ai_services && !a.governance_documented {
        findings.push(finding(
            Dimension::AiGovernance,
            Severity::Medium,
            "AI services without documented governance",
            format!(
                "Vendor offers AI services ({}) but publishes no AI governance commitments",
                a.ai_service_categories.join(", ")
            ),
        ));
    }

    let c = &scans.compliance;
    if !failed.contains(&ScanKind::Compliance) {
        if c.frameworks_found.is_empty() {
            findings.push(finding(
                Dimension::Compliance,
                Severity::High,
                "No compliance frameworks evidenced",
                "No certifications or regulatory statements were found on the vendor site".to_string(),
            ));
        }
        for missing in &c.frameworks_missing {
            let name = canonical_framework(missing).unwrap_or(missing.as_str());
            findings.push(finding(
                Dimension::Compliance,
                Severity::Medium,
                "Requested framework not evidenced",
                format!("No public evidence of {} compliance", name),
            ));
        }
    }

    let t = &scans.trust_center;
    if !failed.contains(&ScanKind::TrustCenter) && !t.trust_center_found {
        findings.push(finding(
            Dimension::TrustCenter,
            Severity::Low,
            "No trust center",
            "Vendor does not publish a trust center".to_string(),
        ));
    }

    let d = &scans.data_flow;
    if !failed.contains(&ScanKind::DataFlow) {
        if !d.encryption_in_transit {
            findings.push(finding(
                Dimension::DataFlow,
                Severity::High,
                "No encryption in transit",
                "HTTPS handshake with the vendor site failed".to_string(),
            ));
        }
        if d.cross_border_transfers {
            findings.push(finding(
                Dimension::DataFlow,
                Severity::Low,
                "Cross-border data transfers",
                "Vendor documents international transfers of personal data".to_string(),
            ));
        }
    }

    for kind in failed {
        findings.push(finding(
            dimension_for(kind),
            Severity::Low,
            "Data unavailable",
            format!("The {} scan could not complete; default values were used", kind),
        ));
    }

    findings
}

fn remediation(finding: &Finding) -> &'static str {
    match (finding.dimension, finding.title.as_str()) {
        (_, "Data unavailable") => "Re-run the assessment or collect this information directly from the vendor",
        (Dimension::Breach, _) => "Request breach post-mortems and evidence of remediation",
        (Dimension::Privacy, _) => "Request the vendor's full privacy policy and data handling procedures",
        (Dimension::AiGovernance, _) => "Request the vendor's AI governance policy and model risk controls",
        (Dimension::Compliance, "Requested framework not evidenced") => {
            "Request audit reports or certificates for the required frameworks"
        }
        (Dimension::Compliance, _) => "Request SOC 2 or ISO 27001 evidence before onboarding",
        (Dimension::TrustCenter, _) => "Ask the vendor for a security questionnaire response",
        (Dimension::DataFlow, "No encryption in transit") => "Require TLS for all data exchanged with the vendor",
        (Dimension::DataFlow, _) => "Confirm transfer safeguards such as Standard Contractual Clauses in the DPA",
    }
}

/// Grade recommendation first, then one remediation per distinct finding type
pub fn build_recommendations(grade: &GradeReport, findings: &[Finding]) -> Vec<String> {
    let mut recommendations = vec![grade.recommendation.clone()];
    for text in findings.iter().map(remediation) {
        if !recommendations.iter().any(|r| r == text) {
            recommendations.push(text.to_string());
        }
    }
    recommendations
}

pub fn build_results(
    request: &AssessmentRequest,
    scans: ScanBundle,
    risk: RiskScore,
    grade: GradeReport,
) -> AssessmentResults {
    let findings = build_findings(&scans);
    let recommendations = build_recommendations(&grade, &findings);
    let scores: BTreeMap<String, f64> = risk
        .breakdown
        .dimensions
        .iter()
        .map(|d| (d.dimension.to_string(), d.score))
        .collect();

    AssessmentResults {
        vendor_domain: request.vendor_domain.clone(),
        vendor_name: request.vendor_name.clone(),
        assessment_mode: request.assessment_mode,
        overall_score: risk.overall_score,
        risk_level: risk.risk_level,
        letter_grade: grade.letter,
        summary: grading::summary(&grade),
        dimension_grades: grading::dimension_grades(&risk.breakdown),
        improvement_suggestions: grading::improvement_suggestions(&risk.breakdown),
        grade,
        scores,
        scoring_breakdown: risk.breakdown,
        findings,
        recommendations,
        scan_results: scans,
        regulations: request.regulations.clone(),
        continuous_monitoring: request.continuous_monitoring,
        completed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::assessment::scoring;
    use crate::logic::scans::{PartialScans, ScanError, ScanTarget};
    use crate::models::AssessmentMode;

    fn bundle() -> ScanBundle {
        let target = ScanTarget {
            domain: "acme.com".to_string(),
            vendor_name: "Acme".to_string(),
            regulations: vec!["SOC2".to_string(), "HIPAA".to_string()],
        };
        let mut scans = PartialScans::default()
            .complete(&target, |_| ScanError::Unreachable { domain: "acme.com".to_string() });
        for meta in [
            &mut scans.breach.meta,
            &mut scans.privacy.meta,
            &mut scans.ai_services.meta,
            &mut scans.compliance.meta,
            &mut scans.trust_center.meta,
            &mut scans.data_flow.meta,
        ] {
            meta.error = None;
        }
        scans
    }

    #[test]
    fn test_findings_from_live_scans() {
        let mut scans = bundle();
        scans.breach.breaches_found = true;
        scans.breach.breach_count = 2;
        scans.breach.sensitive_data_exposed = true;
        scans.privacy.policy_found = true;
        scans.privacy.privacy_score = 45.0;
        scans.ai_services.offers_ai_services = true;
        scans.compliance.frameworks_found = vec!["SOC 2".to_string()];
        scans.data_flow.encryption_in_transit = true;
        scans.data_flow.cross_border_transfers = true;

        let findings = build_findings(&scans);
        let titles: Vec<(&str, Severity)> = findings.iter().map(|f| (f.title.as_str(), f.severity)).collect();

        assert_eq!(
            titles,
            vec![
                ("Historical data breaches", Severity::Critical),
                ("Weak privacy policy", Severity::Medium),
                ("AI services without documented governance", Severity::Medium),
                ("Requested framework not evidenced", Severity::Medium),
                ("Requested framework not evidenced", Severity::Medium),
                ("No trust center", Severity::Low),
                ("Cross-border data transfers", Severity::Low),
            ]
        );
    }

    #[test]
    fn test_failed_scans_yield_unavailable_findings() {
        let mut scans = bundle();
        scans.trust_center.meta.error = Some("down".to_string());
        scans.data_flow.encryption_in_transit = true;
        scans.compliance.frameworks_found = vec!["SOC 2".to_string(), "HIPAA".to_string()];
        scans.compliance.frameworks_missing.clear();

        let findings = build_findings(&scans);
        let last = findings.last().unwrap();
        assert_eq!(last.title, "Data unavailable");
        assert_eq!(last.dimension, Dimension::TrustCenter);
        assert!(!findings.iter().any(|f| f.title == "No trust center"));
    }

    #[test]
    fn test_recommendations_deduplicated_grade_first() {
        let scans = bundle();
        let findings = build_findings(&scans);
        let grade = grading::grade(53.0);
        let recommendations = build_recommendations(&grade, &findings);

        assert!(recommendations[0].starts_with("REJECTED"));
        let count = recommendations
            .iter()
            .filter(|r| r.starts_with("Request audit reports"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_results_shape() {
        let scans = bundle();
        let request = AssessmentRequest {
            vendor_domain: "acme.com".to_string(),
            vendor_name: "Acme".to_string(),
            requester_email: "a@b.com".to_string(),
            regulations: vec!["SOC2".to_string()],
            assessment_mode: AssessmentMode::BusinessRisk,
            continuous_monitoring: true,
        };
        let risk = scoring::aggregate(&scans, request.assessment_mode).unwrap();
        let grade = grading::grade(risk.raw_score);
        let results = build_results(&request, scans, risk, grade);

        assert_eq!(results.scores.len(), 6);
        assert!(results.scores.contains_key("ai_governance"));
        assert_eq!(results.dimension_grades.len(), 6);
        assert_eq!(results.letter_grade, results.grade.letter);
        assert!(results.summary.starts_with("This vendor received a"));

        let json = serde_json::to_value(&results).unwrap();
        for key in ["overall_score", "risk_level", "letter_grade", "scoring_breakdown", "scan_results", "findings"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
