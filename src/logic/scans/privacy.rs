//! Privacy Practice Scan
//!
//! Locates the vendor's privacy policy and grades it, by LLM when one is
//! configured and by keyword indicators otherwise.

use serde::{Deserialize, Serialize};

use super::fallback::synthetic_fallback_score;
use super::llm::analyze;
use super::types::{settle, AnalysisMethod, ScanError, ScanKind, ScanMeta, ScanOutcome};
use super::web::{candidate_urls, ensure_resolvable, fetch_first, truncate};
use super::ScanContext;

const POLICY_PATHS: &[&str] = &["/privacy", "/privacy-policy", "/legal/privacy", "/privacy-notice"];

/// Policy text sent to the LLM is capped to keep prompts small
const LLM_TEXT_LIMIT: usize = 12_000;

/// (label, any-of keywords)
const INDICATORS: &[(&str, &[&str])] = &[
    ("GDPR addressed", &["gdpr", "general data protection regulation"]),
    ("CCPA addressed", &["ccpa", "california consumer privacy"]),
    ("Retention periods stated", &["retention", "retain your"]),
    ("Deletion rights described", &["right to delete", "erasure", "delete your"]),
    ("Data protection officer named", &["data protection officer"]),
    ("Third-party sharing disclosed", &["third part", "service provider"]),
    ("Cookie usage explained", &["cookie"]),
    ("Opt-out offered", &["opt out", "opt-out", "unsubscribe"]),
    ("Security measures described", &["encrypt", "security measures"]),
    ("International transfers covered", &["international transfer", "standard contractual clauses"]),
    ("Contact channel given", &["contact us", "privacy@"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyScan {
    #[serde(flatten)]
    pub meta: ScanMeta,
    pub policy_found: bool,
    pub policy_url: Option<String>,
    pub privacy_score: f64,
    pub privacy_grade: String,
    pub gdpr_mentioned: bool,
    pub ccpa_mentioned: bool,
    pub key_findings: Vec<String>,
    pub analysis_method: AnalysisMethod,
}

impl ScanOutcome for PrivacyScan {
    const KIND: ScanKind = ScanKind::Privacy;

    fn fallback(domain: &str, error: String) -> Self {
        Self {
            meta: ScanMeta::failed(domain, error),
            policy_found: false,
            policy_url: None,
            privacy_score: 50.0,
            privacy_grade: "Unknown".to_string(),
            gdpr_mentioned: false,
            ccpa_mentioned: false,
            key_findings: Vec::new(),
            analysis_method: AnalysisMethod::None,
        }
    }

    fn meta(&self) -> &ScanMeta {
        &self.meta
    }
}

#[derive(Debug, Deserialize)]
struct LlmVerdict {
    score: f64,
    #[serde(default)]
    key_findings: Vec<String>,
}

const SYSTEM_PROMPT: &str = "You are a privacy analyst grading vendor privacy policies. \
Reply with a JSON object {\"score\": 0-100, \"key_findings\": [string]} where a higher \
score means stronger privacy practices.";

/// Scan privacy practices. Never fails; see `ScanOutcome::fallback`.
pub async fn scan_privacy(ctx: &ScanContext, domain: &str) -> PrivacyScan {
    settle(domain, try_scan(ctx, domain).await)
}

async fn try_scan(ctx: &ScanContext, domain: &str) -> Result<PrivacyScan, ScanError> {
    ensure_resolvable(ctx.web.as_ref(), domain).await?;

    let urls = candidate_urls(domain, POLICY_PATHS);
    let policy = fetch_first(ctx.web.as_ref(), domain, &urls, |page| {
        page.text().contains("privacy")
    })
    .await?;

    let Some(page) = policy else {
        let score = synthetic_fallback_score(domain, "privacy", 40.0, 70.0);
        tracing::info!("No privacy policy found for {}, using placeholder {}", domain, score);
        return Ok(PrivacyScan {
            meta: ScanMeta::ok(domain),
            policy_found: false,
            policy_url: None,
            privacy_score: score,
            privacy_grade: privacy_grade(score).to_string(),
            gdpr_mentioned: false,
            ccpa_mentioned: false,
            key_findings: vec!["No privacy policy found at standard locations".to_string()],
            analysis_method: AnalysisMethod::Synthetic,
        });
    };

    let text = page.text();
    let matched = matched_indicators(&text);
    let gdpr_mentioned = matched.contains(&"GDPR addressed");
    let ccpa_mentioned = matched.contains(&"CCPA addressed");

    let prompt = format!(
        "Vendor: {}\nPrivacy policy ({}):\n{}",
        domain,
        page.url,
        truncate(&text, LLM_TEXT_LIMIT)
    );

    let (privacy_score, key_findings, analysis_method) =
        match analyze::<LlmVerdict>(ctx.llm.as_ref(), SYSTEM_PROMPT, &prompt).await {
            Ok(verdict) if verdict.score.is_finite() => (
                verdict.score.clamp(0.0, 100.0).round(),
                verdict.key_findings,
                AnalysisMethod::Llm,
            ),
            other => {
                if let Err(e) = other {
                    tracing::debug!("Privacy LLM analysis skipped for {}: {}", domain, e);
                }
                (
                    keyword_score(matched.len()),
                    matched.iter().map(|s| s.to_string()).collect(),
                    AnalysisMethod::Keyword,
                )
            }
        };

    Ok(PrivacyScan {
        meta: ScanMeta::ok(domain),
        policy_found: true,
        policy_url: Some(page.url),
        privacy_score,
        privacy_grade: privacy_grade(privacy_score).to_string(),
        gdpr_mentioned,
        ccpa_mentioned,
        key_findings,
        analysis_method,
    })
}

fn matched_indicators(text: &str) -> Vec<&'static str> {
    INDICATORS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(label, _)| *label)
        .collect()
}

fn keyword_score(matches: usize) -> f64 {
    (40.0 + 6.0 * matches as f64).min(100.0)
}

fn privacy_grade(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "A",
        s if s >= 80.0 => "B",
        s if s >= 70.0 => "C",
        s if s >= 60.0 => "D",
        _ => "F",
    }
}
