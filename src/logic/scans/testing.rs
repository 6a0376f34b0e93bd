//! In-process fakes for the web and LLM seams

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::llm::LlmClient;
use super::types::ScanError;
use super::web::{TlsCheck, WebClient, WebPage};
use super::ScanContext;

/// Scripted web. Online: unknown URLs answer 404. Offline: every call fails.
pub struct FakeWeb {
    online: RwLock<bool>,
    pages: RwLock<HashMap<String, (u16, String)>>,
    delays: HashMap<String, Duration>,
    panics: HashSet<String>,
    tls: RwLock<TlsCheck>,
}

impl FakeWeb {
    pub fn online() -> Self {
        Self {
            online: RwLock::new(true),
            pages: RwLock::new(HashMap::new()),
            delays: HashMap::new(),
            panics: HashSet::new(),
            tls: RwLock::new(TlsCheck {
                handshake_ok: true,
                hsts: true,
                status: Some(200),
                detail: None,
            }),
        }
    }

    pub fn offline() -> Self {
        let web = Self::online();
        *web.online.write() = false;
        web
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.set_page(url, body);
        self
    }

    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Fetching `url` panics the calling task
    pub fn with_panic(mut self, url: &str) -> Self {
        self.panics.insert(url.to_string());
        self
    }

    pub fn with_tls(self, tls: TlsCheck) -> Self {
        *self.tls.write() = tls;
        self
    }

    pub fn set_page(&self, url: &str, body: &str) {
        self.pages.write().insert(url.to_string(), (200, body.to_string()));
    }

    pub fn set_tls(&self, tls: TlsCheck) {
        *self.tls.write() = tls;
    }
}

#[async_trait]
impl WebClient for FakeWeb {
    async fn fetch(&self, url: &str) -> Result<WebPage, ScanError> {
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.panics.contains(url) {
            panic!("scripted panic fetching {}", url);
        }
        if !*self.online.read() {
            return Err(ScanError::Network {
                url: url.to_string(),
                message: "network unreachable".to_string(),
            });
        }

        let (status, body) = self
            .pages
            .read()
            .get(url)
            .cloned()
            .unwrap_or((404, String::new()));

        Ok(WebPage {
            url: url.to_string(),
            status,
            body,
        })
    }

    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>, ScanError> {
        if *self.online.read() {
            Ok(vec![IpAddr::V4(Ipv4Addr::LOCALHOST)])
        } else {
            Err(ScanError::Dns {
                domain: domain.to_string(),
                message: "no such host".to_string(),
            })
        }
    }

    async fn check_tls(&self, _domain: &str) -> TlsCheck {
        if *self.online.read() {
            self.tls.read().clone()
        } else {
            TlsCheck {
                detail: Some("connection refused".to_string()),
                ..TlsCheck::default()
            }
        }
    }
}

/// LLM that always answers with the same JSON
pub struct FakeLlm {
    reply: Value,
}

impl FakeLlm {
    pub fn replying(reply: Value) -> Self {
        Self { reply }
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn complete_json(&self, _system: &str, _user: &str) -> Result<Value, ScanError> {
        Ok(self.reply.clone())
    }
}

pub fn context(web: FakeWeb) -> ScanContext {
    shared_context(&Arc::new(web))
}

/// Context over a web the test keeps a handle to
pub fn shared_context(web: &Arc<FakeWeb>) -> ScanContext {
    ScanContext::new(web.clone(), Arc::new(super::llm::DisabledLlm))
}

pub fn context_with_llm(web: FakeWeb, llm: FakeLlm) -> ScanContext {
    ScanContext::new(Arc::new(web), Arc::new(llm))
}
