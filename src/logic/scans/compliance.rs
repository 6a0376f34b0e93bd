//! Compliance Documentation Scan
//!
//! Looks for published compliance evidence (certifications, attestations,
//! regulatory statements) and a `security.txt` contact file.

use serde::{Deserialize, Serialize};

use super::types::{settle, ScanError, ScanKind, ScanMeta, ScanOutcome};
use super::web::{candidate_urls, ensure_resolvable, fetch_all};
use super::ScanContext;

const DOCUMENT_PATHS: &[&str] = &["/security", "/compliance", "/trust", "/legal"];
const SECURITY_TXT_PATH: &str = "/.well-known/security.txt";

/// (canonical name, keywords as they appear in page text)
pub const FRAMEWORKS: &[(&str, &[&str])] = &[
    ("SOC 2", &["soc 2", "soc2", "soc ii"]),
    ("ISO 27001", &["iso 27001", "iso/iec 27001", "iso27001"]),
    ("GDPR", &["gdpr", "general data protection regulation"]),
    ("HIPAA", &["hipaa"]),
    ("PCI DSS", &["pci dss", "pci-dss", "pci compliance"]),
    ("CCPA", &["ccpa", "california consumer privacy"]),
    ("FedRAMP", &["fedramp"]),
    ("ISO 27701", &["iso 27701", "iso/iec 27701"]),
    ("CSA STAR", &["csa star"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceDocument {
    pub url: String,
    pub title: Option<String>,
    pub frameworks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceScan {
    #[serde(flatten)]
    pub meta: ScanMeta,
    pub frameworks_found: Vec<String>,
    pub frameworks_requested: Vec<String>,
    pub frameworks_missing: Vec<String>,
    pub compliance_documents: Vec<ComplianceDocument>,
    pub security_txt_present: bool,
    pub compliance_score: f64,
}

impl ComplianceScan {
    /// Attach the requested list and, for live results, compute the score
    pub(super) fn finalize(mut self, requested: &[String]) -> Self {
        self.frameworks_requested = requested.to_vec();
        self.frameworks_missing = missing_frameworks(requested, &self.frameworks_found);
        if !self.is_failure() {
            self.compliance_score = score(&self);
        }
        self
    }
}

impl ScanOutcome for ComplianceScan {
    const KIND: ScanKind = ScanKind::Compliance;

    fn fallback(domain: &str, error: String) -> Self {
        Self {
            meta: ScanMeta::failed(domain, error),
            frameworks_found: Vec::new(),
            frameworks_requested: Vec::new(),
            frameworks_missing: Vec::new(),
            compliance_documents: Vec::new(),
            security_txt_present: false,
            compliance_score: 50.0,
        }
    }

    fn meta(&self) -> &ScanMeta {
        &self.meta
    }
}

/// Map a user-supplied framework name ("soc2", "ISO-27001") to its canonical form
pub fn canonical_framework(name: &str) -> Option<&'static str> {
    let key = squash(name);
    if key.is_empty() {
        return None;
    }

    FRAMEWORKS.iter().find_map(|(canonical, keywords)| {
        let canonical_key = squash(canonical);
        let matches = key.starts_with(&canonical_key)
            || keywords.iter().any(|k| squash(k) == key);
        matches.then_some(*canonical)
    })
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn frameworks_in(text: &str) -> Vec<String> {
    FRAMEWORKS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(name, _)| name.to_string())
        .collect()
}

fn missing_frameworks(requested: &[String], found: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|r| match canonical_framework(r) {
            Some(canonical) => !found.iter().any(|f| f == canonical),
            None => true,
        })
        .cloned()
        .collect()
}

/// Discover compliance documentation. Never fails; the fallback still
/// echoes the requested frameworks.
pub async fn scan_compliance(ctx: &ScanContext, domain: &str, requested: &[String]) -> ComplianceScan {
    settle(domain, try_scan(ctx, domain).await).finalize(requested)
}

async fn try_scan(ctx: &ScanContext, domain: &str) -> Result<ComplianceScan, ScanError> {
    ensure_resolvable(ctx.web.as_ref(), domain).await?;

    let mut urls = candidate_urls(domain, DOCUMENT_PATHS);
    let security_txt_url = format!("https://{}{}", domain, SECURITY_TXT_PATH);
    urls.push(security_txt_url.clone());

    let pages = fetch_all(ctx.web.as_ref(), domain, &urls).await?;

    let mut security_txt_present = false;
    let mut frameworks_found: Vec<String> = Vec::new();
    let mut compliance_documents = Vec::new();

    for page in pages {
        if page.url == security_txt_url {
            security_txt_present = page.body.to_lowercase().contains("contact:");
            continue;
        }

        let frameworks = frameworks_in(&page.text());
        if frameworks.is_empty() {
            continue;
        }
        for f in &frameworks {
            if !frameworks_found.contains(f) {
                frameworks_found.push(f.clone());
            }
        }
        compliance_documents.push(ComplianceDocument {
            title: page.title(),
            url: page.url,
            frameworks,
        });
    }

    tracing::info!(
        "Compliance scan for {}: {} framework(s), {} document(s), security.txt={}",
        domain,
        frameworks_found.len(),
        compliance_documents.len(),
        security_txt_present
    );

    Ok(ComplianceScan {
        meta: ScanMeta::ok(domain),
        compliance_score: 0.0,
        frameworks_found,
        frameworks_requested: Vec::new(),
        frameworks_missing: Vec::new(),
        compliance_documents,
        security_txt_present,
    })
}

fn score(scan: &ComplianceScan) -> f64 {
    let found = scan.frameworks_found.len() as f64;
    let mut score = 30.0 + (10.0 * found).min(50.0);

    if scan.security_txt_present {
        score += 10.0;
    }

    let requested = scan.frameworks_requested.len();
    if requested > 0 {
        let evidenced = requested - scan.frameworks_missing.len();
        score += (10.0 * evidenced as f64 / requested as f64).round();
    }

    score.min(100.0)
}
