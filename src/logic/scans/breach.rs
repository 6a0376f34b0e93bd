//! Breach History Scan
//!
//! Looks the vendor domain up in the public breach catalogue.

use serde::{Deserialize, Serialize};

use super::types::{settle, ScanError, ScanKind, ScanMeta, ScanOutcome};
use super::ScanContext;
use crate::constants::BREACH_API_BASE;

/// Data classes that make a breach markedly worse
const SENSITIVE_DATA_CLASSES: &[&str] = &[
    "passwords",
    "credit cards",
    "credit card cvv",
    "bank account numbers",
    "social security numbers",
    "government issued ids",
    "health records",
    "passport numbers",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreachRecord {
    pub name: String,
    pub breach_date: Option<String>,
    pub records_exposed: u64,
    pub data_classes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreachScan {
    #[serde(flatten)]
    pub meta: ScanMeta,
    pub breaches_found: bool,
    pub breach_count: u32,
    pub total_records_exposed: u64,
    pub most_recent_breach: Option<String>,
    pub sensitive_data_exposed: bool,
    pub track_record: String,
    pub breaches: Vec<BreachRecord>,
    pub data_source: String,
}

/// Breach catalogue entry (PascalCase on the wire)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiBreach {
    name: String,
    #[serde(default)]
    breach_date: Option<String>,
    #[serde(default)]
    pwn_count: u64,
    #[serde(default)]
    data_classes: Vec<String>,
}

impl BreachScan {
    fn from_records(domain: &str, breaches: Vec<BreachRecord>) -> Self {
        let breach_count = breaches.len() as u32;
        let total_records_exposed = breaches.iter().map(|b| b.records_exposed).sum();
        let most_recent_breach = breaches
            .iter()
            .filter_map(|b| b.breach_date.clone())
            .max();
        let sensitive_data_exposed = breaches.iter().any(|b| {
            b.data_classes
                .iter()
                .any(|c| SENSITIVE_DATA_CLASSES.contains(&c.to_lowercase().as_str()))
        });

        Self {
            meta: ScanMeta::ok(domain),
            breaches_found: breach_count > 0,
            breach_count,
            total_records_exposed,
            most_recent_breach,
            sensitive_data_exposed,
            track_record: track_record(breach_count).to_string(),
            breaches,
            data_source: "breach_catalogue".to_string(),
        }
    }
}

impl ScanOutcome for BreachScan {
    const KIND: ScanKind = ScanKind::Breach;

    fn fallback(domain: &str, error: String) -> Self {
        Self {
            meta: ScanMeta::failed(domain, error),
            breaches_found: false,
            breach_count: 0,
            total_records_exposed: 0,
            most_recent_breach: None,
            sensitive_data_exposed: false,
            track_record: "Unknown".to_string(),
            breaches: Vec::new(),
            data_source: "unavailable".to_string(),
        }
    }

    fn meta(&self) -> &ScanMeta {
        &self.meta
    }
}

fn track_record(count: u32) -> &'static str {
    match count {
        0 => "Excellent",
        1 => "Good",
        2..=3 => "Concerning",
        _ => "Poor",
    }
}

/// Scan breach history. Never fails; see `ScanOutcome::fallback`.
pub async fn scan_breaches(ctx: &ScanContext, domain: &str) -> BreachScan {
    settle(domain, try_scan(ctx, domain).await)
}

async fn try_scan(ctx: &ScanContext, domain: &str) -> Result<BreachScan, ScanError> {
    let url = breach_catalogue_url(domain);
    let page = ctx.web.fetch(&url).await?;

    // Catalogue answers 404 when the domain has no breaches
    if page.status == 404 {
        return Ok(BreachScan::from_records(domain, Vec::new()));
    }
    if !page.is_success() {
        return Err(ScanError::HttpStatus { url, status: page.status });
    }

    let entries: Vec<ApiBreach> = serde_json::from_str(&page.body).map_err(|e| ScanError::Parse {
        origin: "breach catalogue".to_string(),
        message: e.to_string(),
    })?;

    let records = entries
        .into_iter()
        .map(|b| BreachRecord {
            name: b.name,
            breach_date: b.breach_date,
            records_exposed: b.pwn_count,
            data_classes: b.data_classes,
        })
        .collect::<Vec<_>>();

    tracing::info!("Breach catalogue lists {} breach(es) for {}", records.len(), domain);
    Ok(BreachScan::from_records(domain, records))
}

pub fn breach_catalogue_url(domain: &str) -> String {
    format!("{}/breaches?domain={}", BREACH_API_BASE, domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scans::testing::{context, FakeWeb};

    const TWO_BREACHES: &str = r#"[
        {"Name": "Acme2019", "BreachDate": "2019-04-01", "PwnCount": 1200, "DataClasses": ["Email addresses", "Passwords"]},
        {"Name": "Acme2022", "BreachDate": "2022-11-15", "PwnCount": 300, "DataClasses": ["Email addresses"]}
    ]"#;

    #[tokio::test]
    async fn test_breaches_parsed() {
        let web = FakeWeb::online().with_page(&breach_catalogue_url("acme.com"), TWO_BREACHES);
        let scan = scan_breaches(&context(web), "acme.com").await;

        assert!(scan.meta.error.is_none());
        assert!(scan.breaches_found);
        assert_eq!(scan.breach_count, 2);
        assert_eq!(scan.total_records_exposed, 1500);
        assert_eq!(scan.most_recent_breach.as_deref(), Some("2022-11-15"));
        assert!(scan.sensitive_data_exposed);
        assert_eq!(scan.track_record, "Concerning");
    }

    #[tokio::test]
    async fn test_no_breaches_on_404() {
        let scan = scan_breaches(&context(FakeWeb::online()), "clean.com").await;
        assert!(scan.meta.error.is_none());
        assert_eq!(scan.breach_count, 0);
        assert_eq!(scan.track_record, "Excellent");
    }

    #[tokio::test]
    async fn test_malformed_catalogue_falls_back() {
        let web = FakeWeb::online().with_page(&breach_catalogue_url("acme.com"), "<html>oops</html>");
        let scan = scan_breaches(&context(web), "acme.com").await;

        assert!(scan.meta.error.as_deref().unwrap().contains("parse"));
        assert_eq!(scan.breach_count, 0);
        assert_eq!(scan.track_record, "Unknown");
    }
}
