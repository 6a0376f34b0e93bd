//! Data Flow Scan
//!
//! Characterizes where vendor data goes: subprocessor lists, DPAs, residency
//! and transfer statements, plus transport security of the main site.

use serde::{Deserialize, Serialize};

use super::fallback::synthetic_fallback_score;
use super::llm::analyze;
use super::types::{settle, AnalysisMethod, ScanError, ScanKind, ScanMeta, ScanOutcome};
use super::web::{candidate_urls, ensure_resolvable, fetch_all, truncate};
use super::ScanContext;

const DOCUMENT_PATHS: &[&str] = &[
    "/subprocessors",
    "/legal/subprocessors",
    "/dpa",
    "/legal/dpa",
    "/privacy",
];

const LLM_TEXT_LIMIT: usize = 10_000;

const CATEGORY_MARKERS: &[(&str, &[&str])] = &[
    ("subprocessors", &["subprocessor", "sub-processor"]),
    ("dpa", &["data processing agreement", "data processing addendum", " dpa"]),
    ("data_residency", &["data residency", "data center", "data centre", "hosted in", "stored in"]),
    (
        "transfer_mechanisms",
        &["standard contractual clauses", "data privacy framework", "binding corporate rules", "international transfer"],
    ),
    ("encryption", &["encrypt"]),
    ("retention", &["retention", "retain"]),
];

const DATA_CATEGORY_MARKERS: &[(&str, &[&str])] = &[
    ("Contact details", &["email address", "phone number"]),
    ("Payment data", &["credit card", "payment", "billing"]),
    ("Usage data", &["usage data", "log data", "analytics"]),
    ("Location data", &["ip address", "location data", "geolocation"]),
    ("Health data", &["health data", "medical"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowDocument {
    pub url: String,
    pub title: Option<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowScan {
    #[serde(flatten)]
    pub meta: ScanMeta,
    pub documentation_found: bool,
    pub data_flow_documents: Vec<DataFlowDocument>,
    pub categories_found: Vec<String>,
    pub subprocessor_mentions: u32,
    pub cross_border_transfers: bool,
    pub encryption_in_transit: bool,
    pub hsts_enabled: bool,
    pub data_categories: Vec<String>,
    pub data_flow_score: f64,
    pub analysis_method: AnalysisMethod,
}

impl ScanOutcome for DataFlowScan {
    const KIND: ScanKind = ScanKind::DataFlow;

    fn fallback(domain: &str, error: String) -> Self {
        Self {
            meta: ScanMeta::failed(domain, error),
            documentation_found: false,
            data_flow_documents: Vec::new(),
            categories_found: Vec::new(),
            subprocessor_mentions: 0,
            cross_border_transfers: false,
            encryption_in_transit: false,
            hsts_enabled: false,
            data_categories: Vec::new(),
            data_flow_score: 50.0,
            analysis_method: AnalysisMethod::None,
        }
    }

    fn meta(&self) -> &ScanMeta {
        &self.meta
    }
}

#[derive(Debug, Deserialize)]
struct LlmVerdict {
    #[serde(default)]
    data_categories: Vec<String>,
}

const SYSTEM_PROMPT: &str = "You extract which categories of personal data a vendor processes \
from its legal documents. Reply with a JSON object {\"data_categories\": [string]}.";

/// Characterize data flows. Never fails; see `ScanOutcome::fallback`.
pub async fn scan_data_flows(ctx: &ScanContext, domain: &str) -> DataFlowScan {
    settle(domain, try_scan(ctx, domain).await)
}

async fn try_scan(ctx: &ScanContext, domain: &str) -> Result<DataFlowScan, ScanError> {
    ensure_resolvable(ctx.web.as_ref(), domain).await?;

    let urls = candidate_urls(domain, DOCUMENT_PATHS);
    let pages = fetch_all(ctx.web.as_ref(), domain, &urls).await?;
    let tls = ctx.web.check_tls(domain).await;

    let mut categories_found: Vec<String> = Vec::new();
    let mut data_flow_documents = Vec::new();
    let mut subprocessor_mentions = 0u32;
    let mut corpus = String::new();

    for page in pages {
        let text = page.text();
        let categories = categories_in(&text);
        if categories.is_empty() {
            continue;
        }

        subprocessor_mentions += (text.matches("subprocessor").count()
            + text.matches("sub-processor").count()) as u32;
        for c in &categories {
            if !categories_found.contains(c) {
                categories_found.push(c.clone());
            }
        }
        corpus.push_str(&text);
        corpus.push(' ');
        data_flow_documents.push(DataFlowDocument {
            title: page.title(),
            url: page.url,
            categories,
        });
    }

    let documentation_found = !data_flow_documents.is_empty();
    let cross_border_transfers = categories_found.iter().any(|c| c == "transfer_mechanisms")
        || corpus.contains("cross-border");

    let (data_flow_score, analysis_method) = if documentation_found {
        ((40.0 + 10.0 * categories_found.len() as f64).min(100.0), AnalysisMethod::Keyword)
    } else {
        (synthetic_fallback_score(domain, "data_flow", 35.0, 60.0), AnalysisMethod::Synthetic)
    };

    let data_categories = if documentation_found {
        extract_data_categories(ctx, domain, &corpus).await
    } else {
        Vec::new()
    };

    Ok(DataFlowScan {
        meta: ScanMeta::ok(domain),
        documentation_found,
        data_flow_documents,
        categories_found,
        subprocessor_mentions,
        cross_border_transfers,
        encryption_in_transit: tls.handshake_ok,
        hsts_enabled: tls.hsts,
        data_categories,
        data_flow_score,
        analysis_method,
    })
}

fn categories_in(text: &str) -> Vec<String> {
    CATEGORY_MARKERS
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| text.contains(m)))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// LLM extraction when available, keyword markers otherwise
async fn extract_data_categories(ctx: &ScanContext, domain: &str, corpus: &str) -> Vec<String> {
    let prompt = format!("Vendor: {}\nDocuments:\n{}", domain, truncate(corpus, LLM_TEXT_LIMIT));
    match analyze::<LlmVerdict>(ctx.llm.as_ref(), SYSTEM_PROMPT, &prompt).await {
        Ok(verdict) => verdict.data_categories,
        Err(e) => {
            tracing::debug!("Data category extraction by LLM skipped for {}: {}", domain, e);
            DATA_CATEGORY_MARKERS
                .iter()
                .filter(|(_, markers)| markers.iter().any(|m| corpus.contains(m)))
                .map(|(name, _)| name.to_string())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scans::testing::{context, FakeWeb};
    use crate::logic::scans::web::TlsCheck;

    const SUBPROCESSORS: &str = "<title>Subprocessors</title>\
        <p>Acme uses the following subprocessors. Each sub-processor is bound by our \
        data processing agreement. Data is stored in the EU and encrypted at rest.</p>\
        <p>Transfers rely on Standard Contractual Clauses. We process email address and billing data.</p>";

    #[tokio::test]
    async fn test_documents_classified() {
        let web = FakeWeb::online()
            .with_page("https://acme.com/subprocessors", SUBPROCESSORS)
            .with_tls(TlsCheck { handshake_ok: true, hsts: true, status: Some(200), detail: None });
        let scan = scan_data_flows(&context(web), "acme.com").await;

        assert!(scan.meta.error.is_none());
        assert!(scan.documentation_found);
        assert_eq!(
            scan.categories_found,
            vec!["subprocessors", "dpa", "data_residency", "transfer_mechanisms", "encryption"]
        );
        // title, list intro and "sub-processor"
        assert_eq!(scan.subprocessor_mentions, 3);
        assert!(scan.cross_border_transfers);
        assert!(scan.encryption_in_transit && scan.hsts_enabled);
        assert_eq!(scan.data_categories, vec!["Contact details", "Payment data"]);
        assert_eq!(scan.data_flow_score, 90.0);
    }

    #[tokio::test]
    async fn test_no_documents_is_synthetic() {
        let web = FakeWeb::online().with_tls(TlsCheck::default());
        let scan = scan_data_flows(&context(web), "acme.com").await;

        assert!(!scan.documentation_found);
        assert!(!scan.encryption_in_transit);
        assert_eq!(scan.analysis_method, AnalysisMethod::Synthetic);
        assert!((35.0..=60.0).contains(&scan.data_flow_score));
    }

    #[tokio::test]
    async fn test_network_down_falls_back() {
        let scan = scan_data_flows(&context(FakeWeb::offline()), "acme.com").await;

        assert!(scan.is_failure());
        assert!(!scan.documentation_found);
        assert!(scan.data_flow_documents.is_empty());
        assert!(scan.categories_found.is_empty());
        assert_eq!(scan.subprocessor_mentions, 0);
        assert!(!scan.cross_border_transfers);
        assert!(!scan.encryption_in_transit);
        assert!(!scan.hsts_enabled);
        assert!(scan.data_categories.is_empty());
        assert_eq!(scan.data_flow_score, 50.0);
    }
}
