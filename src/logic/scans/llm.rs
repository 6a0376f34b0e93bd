//! LLM Analysis Client
//!
//! OpenAI-compatible chat completions returning JSON. Any failure means
//! "analysis unavailable" and the calling scan falls back to heuristics.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::ScanError;
use crate::constants;

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Run one system + user prompt and parse the reply as JSON
    async fn complete_json(&self, system: &str, user: &str) -> Result<Value, ScanError>;
}

/// Typed wrapper around `complete_json`
pub async fn analyze<T: DeserializeOwned>(
    llm: &dyn LlmClient,
    system: &str,
    user: &str,
) -> Result<T, ScanError> {
    if !llm.is_enabled() {
        return Err(ScanError::LlmUnavailable("no API key configured".to_string()));
    }

    let value = llm.complete_json(system, user).await?;
    serde_json::from_value(value).map_err(|e| ScanError::Parse {
        origin: "llm".to_string(),
        message: e.to_string(),
    })
}

// ============================================================================
// OPENAI-COMPATIBLE CLIENT
// ============================================================================

pub struct OpenAiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout_seconds: u64,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(constants::user_agent())
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete_json(&self, system: &str, user: &str) -> Result<Value, ScanError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ScanError::LlmUnavailable("no API key configured".to_string()))?;

        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: 0.1,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self.http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScanError::LlmUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScanError::LlmUnavailable(format!(
                "completion endpoint returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| ScanError::Parse {
            origin: "llm".to_string(),
            message: e.to_string(),
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ScanError::Parse {
                origin: "llm".to_string(),
                message: "empty completion".to_string(),
            })?;

        extract_json(&content)
    }
}

/// Client used when no LLM is configured
pub struct DisabledLlm;

#[async_trait]
impl LlmClient for DisabledLlm {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn complete_json(&self, _system: &str, _user: &str) -> Result<Value, ScanError> {
        Err(ScanError::LlmUnavailable("LLM analysis disabled".to_string()))
    }
}

/// Parse a completion as JSON, tolerating code fences and surrounding prose
pub fn extract_json(content: &str) -> Result<Value, ScanError> {
    let trimmed = content.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if e > s => serde_json::from_str(&trimmed[s..=e]).map_err(|err| {
            ScanError::Parse {
                origin: "llm".to_string(),
                message: err.to_string(),
            }
        }),
        _ => Err(ScanError::Parse {
            origin: "llm".to_string(),
            message: "no JSON object in completion".to_string(),
        }),
    }
}
