//! Trust Center Discovery Scan

use serde::{Deserialize, Serialize};

use super::fallback::synthetic_fallback_score;
use super::types::{settle, ScanError, ScanKind, ScanMeta, ScanOutcome};
use super::web::{ensure_resolvable, fetch_all};
use super::ScanContext;

/// Minimum indicator share for a page to count as a trust center
const TRUST_THRESHOLD: f64 = 0.3;

const INDICATORS: &[&[&str]] = &[
    &["trust center", "trust centre", "trust portal"],
    &["security"],
    &["compliance"],
    &["privacy"],
    &["soc 2", "iso 27001", "certif"],
    &["subprocessor", "sub-processor"],
    &["audit report", "security report", "request report", "download report"],
    &["status page", "uptime", "incident"],
    &["penetration test", "pentest", "bug bounty", "vulnerability disclosure"],
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustCenterCandidate {
    pub url: String,
    /// Share of trust indicators present, 0..=1
    pub trust_score: f64,
    pub page_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustCenterScan {
    #[serde(flatten)]
    pub meta: ScanMeta,
    pub trust_center_found: bool,
    pub trust_centers: Vec<TrustCenterCandidate>,
    pub best_url: Option<String>,
    pub access_method: String,
    pub transparency_score: f64,
}

impl ScanOutcome for TrustCenterScan {
    const KIND: ScanKind = ScanKind::TrustCenter;

    fn fallback(domain: &str, error: String) -> Self {
        Self {
            meta: ScanMeta::failed(domain, error),
            trust_center_found: false,
            trust_centers: Vec::new(),
            best_url: None,
            access_method: "manual".to_string(),
            transparency_score: 40.0,
        }
    }

    fn meta(&self) -> &ScanMeta {
        &self.meta
    }
}

fn candidate_urls(domain: &str) -> Vec<String> {
    vec![
        format!("https://trust.{}/", domain),
        format!("https://{}/trust", domain),
        format!("https://{}/trust-center", domain),
        format!("https://security.{}/", domain),
        format!("https://{}/security", domain),
    ]
}

fn trust_score(text: &str) -> f64 {
    let matched = INDICATORS
        .iter()
        .filter(|keywords| keywords.iter().any(|k| text.contains(k)))
        .count();
    let share = matched as f64 / INDICATORS.len() as f64;
    (share * 100.0).round() / 100.0
}

/// Discover a trust center. Never fails; see `ScanOutcome::fallback`.
pub async fn scan_trust_center(ctx: &ScanContext, domain: &str) -> TrustCenterScan {
    settle(domain, try_scan(ctx, domain).await)
}

async fn try_scan(ctx: &ScanContext, domain: &str) -> Result<TrustCenterScan, ScanError> {
    ensure_resolvable(ctx.web.as_ref(), domain).await?;

    let pages = fetch_all(ctx.web.as_ref(), domain, &candidate_urls(domain)).await?;

    let mut best: Option<(f64, String)> = None;
    let mut trust_centers = Vec::new();
    for page in pages {
        let text = page.text();
        let score = trust_score(&text);
        if score < TRUST_THRESHOLD {
            continue;
        }
        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, text));
        }
        trust_centers.push(TrustCenterCandidate {
            page_title: page.title(),
            url: page.url,
            trust_score: score,
        });
    }

    let Some((best_score, best_text)) = best else {
        let score = synthetic_fallback_score(domain, "trust_center", 20.0, 50.0);
        tracing::info!("No trust center found for {}, using placeholder {}", domain, score);
        return Ok(TrustCenterScan {
            meta: ScanMeta::ok(domain),
            trust_center_found: false,
            trust_centers: Vec::new(),
            best_url: None,
            access_method: "manual".to_string(),
            transparency_score: score,
        });
    };

    let best_url = trust_centers
        .iter()
        .find(|c| c.trust_score == best_score)
        .map(|c| c.url.clone());
    let gated = ["request access", "non-disclosure", " nda"]
        .iter()
        .any(|k| best_text.contains(k));
    let access_method = if gated {
        "request_access"
    } else {
        "public"
    };

    Ok(TrustCenterScan {
        meta: ScanMeta::ok(domain),
        trust_center_found: true,
        trust_centers,
        best_url,
        access_method: access_method.to_string(),
        transparency_score: (60.0 + 40.0 * best_score).round(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scans::testing::{context, FakeWeb};

    const PORTAL: &str = "<title>Acme Trust Center</title>\
        <p>Welcome to the Acme Trust Center. Security, compliance and privacy in one place.</p>\
        <p>SOC 2 report available: request access under NDA.</p>";

    #[test]
    fn test_trust_score_share() {
        assert_eq!(trust_score(""), 0.0);
        assert_eq!(trust_score("trust center security compliance"), 0.33);
    }

    #[tokio::test]
    async fn test_trust_center_found() {
        let web = FakeWeb::online()
            .with_page("https://trust.acme.com/", PORTAL)
            .with_page("https://acme.com/security", "<p>We take security seriously.</p>");
        let scan = scan_trust_center(&context(web), "acme.com").await;

        assert!(scan.meta.error.is_none());
        assert!(scan.trust_center_found);
        assert_eq!(scan.trust_centers.len(), 1);
        assert_eq!(scan.best_url.as_deref(), Some("https://trust.acme.com/"));
        assert_eq!(scan.trust_centers[0].page_title.as_deref(), Some("Acme Trust Center"));
        assert_eq!(scan.access_method, "request_access");
        // 5 of 9 indicators
        assert_eq!(scan.trust_centers[0].trust_score, 0.56);
        assert_eq!(scan.transparency_score, 82.0);
    }

    #[tokio::test]
    async fn test_no_trust_center_is_synthetic() {
        let scan = scan_trust_center(&context(FakeWeb::online()), "acme.com").await;

        assert!(scan.meta.error.is_none());
        assert!(!scan.trust_center_found);
        assert_eq!(scan.access_method, "manual");
        assert!((20.0..=50.0).contains(&scan.transparency_score));
    }

    #[tokio::test]
    async fn test_network_down_falls_back() {
        let scan = scan_trust_center(&context(FakeWeb::offline()), "acme.com").await;

        assert!(scan.is_failure());
        assert!(!scan.trust_center_found);
        assert!(scan.trust_centers.is_empty());
        assert!(scan.best_url.is_none());
        assert_eq!(scan.access_method, "manual");
        assert_eq!(scan.transparency_score, 40.0);
    }
}
