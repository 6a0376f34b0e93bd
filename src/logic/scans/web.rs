//! Web Access for Vendor Scans
//!
//! HTTP GET, DNS resolution and TLS probing behind the `WebClient` trait,
//! plus the HTML helpers the scans share.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::types::ScanError;
use crate::constants;

// ============================================================================
// TYPES
// ============================================================================

/// One fetched page (any HTTP status)
#[derive(Debug, Clone, Serialize)]
pub struct WebPage {
    pub url: String,
    pub status: u16,
    #[serde(skip)]
    pub body: String,
}

impl WebPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Visible text, lowercased, whitespace collapsed
    pub fn text(&self) -> String {
        html_to_text(&self.body).to_lowercase()
    }

    pub fn title(&self) -> Option<String> {
        page_title(&self.body)
    }
}

/// Result of an HTTPS handshake attempt
#[derive(Debug, Clone, Default, Serialize)]
pub struct TlsCheck {
    pub handshake_ok: bool,
    pub hsts: bool,
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ============================================================================
// CLIENT TRAIT
// ============================================================================

#[async_trait]
pub trait WebClient: Send + Sync {
    /// GET a URL. Any HTTP response is `Ok`; transport failures are `Err`.
    async fn fetch(&self, url: &str) -> Result<WebPage, ScanError>;

    /// Resolve a hostname to its addresses
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>, ScanError>;

    /// HTTPS handshake with certificate verification always on
    async fn check_tls(&self, domain: &str) -> TlsCheck;
}

// ============================================================================
// REQWEST IMPLEMENTATION
// ============================================================================

pub struct HttpWebClient {
    http_client: reqwest::Client,
    strict_client: reqwest::Client,
}

impl HttpWebClient {
    /// Create new web client
    pub fn new(timeout_seconds: u64, verify_tls: bool) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(timeout_seconds);

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(constants::user_agent())
            .redirect(reqwest::redirect::Policy::limited(5))
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        let strict_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(constants::user_agent())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        if !verify_tls {
            tracing::warn!("TLS certificate verification disabled for page fetches");
        }

        Ok(Self { http_client, strict_client })
    }
}

#[async_trait]
impl WebClient for HttpWebClient {
    async fn fetch(&self, url: &str) -> Result<WebPage, ScanError> {
        let mut response = self.http_client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status().as_u16();
        let mut kept: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(url, e))? {
            if append_capped(&mut kept, &chunk, constants::MAX_PAGE_BYTES) {
                tracing::debug!("Body of {} cut at {} bytes", url, constants::MAX_PAGE_BYTES);
                break;
            }
        }

        tracing::debug!("GET {} -> {} ({} bytes)", url, status, kept.len());

        Ok(WebPage {
            url: url.to_string(),
            status,
            body: String::from_utf8_lossy(&kept).into_owned(),
        })
    }

    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>, ScanError> {
        let addrs = tokio::net::lookup_host((domain, 443))
            .await
            .map_err(|e| ScanError::Dns {
                domain: domain.to_string(),
                message: e.to_string(),
            })?;

        let ips: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
        if ips.is_empty() {
            return Err(ScanError::Dns {
                domain: domain.to_string(),
                message: "no addresses returned".to_string(),
            });
        }
        Ok(ips)
    }

    async fn check_tls(&self, domain: &str) -> TlsCheck {
        let url = format!("https://{}/", domain);

        match self.strict_client.get(&url).send().await {
            Ok(response) => TlsCheck {
                handshake_ok: true,
                hsts: response.headers().contains_key("strict-transport-security"),
                status: Some(response.status().as_u16()),
                detail: None,
            },
            Err(e) => TlsCheck {
                handshake_ok: false,
                hsts: false,
                status: None,
                detail: Some(e.to_string()),
            },
        }
    }
}

/// Append up to `cap` bytes in total; `true` once the buffer is full
fn append_capped(kept: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(kept.len());
    kept.extend_from_slice(&chunk[..chunk.len().min(room)]);
    kept.len() >= cap
}

fn transport_error(url: &str, err: reqwest::Error) -> ScanError {
    if err.is_timeout() {
        ScanError::Timeout { url: url.to_string() }
    } else {
        ScanError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// FETCH HELPERS
// ============================================================================

/// `https://{domain}{path}` for each path
pub fn candidate_urls(domain: &str, paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| format!("https://{}{}", domain, p)).collect()
}

/// A DNS failure makes the whole vendor site unreachable
pub async fn ensure_resolvable(web: &dyn WebClient, domain: &str) -> Result<(), ScanError> {
    let addrs = web.resolve(domain).await?;
    tracing::debug!("{} resolves to {} address(es)", domain, addrs.len());
    Ok(())
}

/// First successful page accepted by `accept`.
///
/// `Ok(None)` when the site answered but nothing matched; `Unreachable`
/// when every candidate failed at the transport level.
pub async fn fetch_first<F>(
    web: &dyn WebClient,
    domain: &str,
    urls: &[String],
    accept: F,
) -> Result<Option<WebPage>, ScanError>
where
    F: Fn(&WebPage) -> bool,
{
    let mut answered = false;

    for url in urls {
        match web.fetch(url).await {
            Ok(page) => {
                answered = true;
                if page.is_success() && accept(&page) {
                    return Ok(Some(page));
                }
            }
            Err(e) => tracing::debug!("Candidate {} failed: {}", url, e),
        }
    }

    if answered {
        Ok(None)
    } else {
        Err(ScanError::Unreachable { domain: domain.to_string() })
    }
}

/// Every successful page among `urls`, same reachability rule as `fetch_first`
pub async fn fetch_all(
    web: &dyn WebClient,
    domain: &str,
    urls: &[String],
) -> Result<Vec<WebPage>, ScanError> {
    let mut answered = false;
    let mut pages = Vec::new();

    for url in urls {
        match web.fetch(url).await {
            Ok(page) => {
                answered = true;
                if page.is_success() {
                    pages.push(page);
                }
            }
            Err(e) => tracing::debug!("Candidate {} failed: {}", url, e),
        }
    }

    if answered {
        Ok(pages)
    } else {
        Err(ScanError::Unreachable { domain: domain.to_string() })
    }
}

// ============================================================================
// HTML HELPERS
// ============================================================================

static SCRIPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<!--.*?-->")
        .expect("valid script regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid space regex"));
static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex")
});

/// Strip scripts, styles and tags; collapse whitespace
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"");
    SPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

pub fn page_title(html: &str) -> Option<String> {
    TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| SPACE_RE.replace_all(m.as_str(), " ").trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Cut text to at most `max` bytes on a char boundary
pub fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
