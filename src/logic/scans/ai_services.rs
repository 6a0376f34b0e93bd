//! AI Service Detection Scan

use serde::{Deserialize, Serialize};

use super::llm::analyze;
use super::types::{settle, AnalysisMethod, ScanError, ScanKind, ScanMeta, ScanOutcome};
use super::web::{candidate_urls, ensure_resolvable, fetch_all, truncate};
use super::ScanContext;

const PAGE_PATHS: &[&str] = &["/", "/ai", "/products"];

const LLM_TEXT_LIMIT: usize = 10_000;

/// Keyword hits needed before a vendor counts as offering AI
const MIN_KEYWORD_HITS: usize = 2;

const CATEGORIES: &[(&str, &[&str])] = &[
    ("Generative AI", &["generative ai", "genai", "large language model", "gpt"]),
    ("Machine Learning", &["machine learning", "predictive model", "deep learning"]),
    ("Conversational AI", &["chatbot", "virtual assistant", "conversational ai", "copilot"]),
    ("Computer Vision", &["computer vision", "image recognition", "facial recognition"]),
    ("Natural Language Processing", &["natural language", "sentiment analysis", "speech recognition"]),
    ("AI Platform", &["artificial intelligence", "ai-powered", "ai powered"]),
];

const GOVERNANCE_KEYWORDS: &[&str] = &[
    "responsible ai",
    "ai principles",
    "ai ethics",
    "ai governance",
    "trustworthy ai",
    "model card",
    "ai policy",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiServicesScan {
    #[serde(flatten)]
    pub meta: ScanMeta,
    pub offers_ai_services: bool,
    pub ai_service_categories: Vec<String>,
    pub ai_maturity_level: String,
    pub governance_documented: bool,
    pub confidence: f64,
    pub detection_method: AnalysisMethod,
}

impl ScanOutcome for AiServicesScan {
    const KIND: ScanKind = ScanKind::AiServices;

    fn fallback(domain: &str, error: String) -> Self {
        Self {
            meta: ScanMeta::failed(domain, error),
            offers_ai_services: false,
            ai_service_categories: Vec::new(),
            ai_maturity_level: "Unknown".to_string(),
            governance_documented: false,
            confidence: 0.0,
            detection_method: AnalysisMethod::None,
        }
    }

    fn meta(&self) -> &ScanMeta {
        &self.meta
    }
}

#[derive(Debug, Deserialize)]
struct LlmVerdict {
    offers_ai_services: bool,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    governance_documented: bool,
    #[serde(default)]
    confidence: Option<f64>,
}

const SYSTEM_PROMPT: &str = "You classify whether a company offers AI-based products. \
Reply with a JSON object {\"offers_ai_services\": bool, \"categories\": [string], \
\"governance_documented\": bool, \"confidence\": 0-100}.";

/// Detect AI services. Never fails; see `ScanOutcome::fallback`.
pub async fn scan_ai_services(ctx: &ScanContext, domain: &str) -> AiServicesScan {
    settle(domain, try_scan(ctx, domain).await)
}

async fn try_scan(ctx: &ScanContext, domain: &str) -> Result<AiServicesScan, ScanError> {
    ensure_resolvable(ctx.web.as_ref(), domain).await?;

    let urls = candidate_urls(domain, PAGE_PATHS);
    let pages = fetch_all(ctx.web.as_ref(), domain, &urls).await?;
    let text = pages.iter().map(|p| p.text()).collect::<Vec<_>>().join(" ");

    if !text.is_empty() {
        let prompt = format!("Company: {}\nWebsite text:\n{}", domain, truncate(&text, LLM_TEXT_LIMIT));
        match analyze::<LlmVerdict>(ctx.llm.as_ref(), SYSTEM_PROMPT, &prompt).await {
            Ok(verdict) => return Ok(from_verdict(domain, verdict)),
            Err(e) => tracing::debug!("AI LLM classification skipped for {}: {}", domain, e),
        }
    }

    Ok(from_keywords(domain, &text))
}

fn from_verdict(domain: &str, verdict: LlmVerdict) -> AiServicesScan {
    let categories = if verdict.offers_ai_services { verdict.categories } else { Vec::new() };
    let confidence = verdict
        .confidence
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 100.0))
        .unwrap_or(70.0);

    AiServicesScan {
        meta: ScanMeta::ok(domain),
        offers_ai_services: verdict.offers_ai_services,
        ai_maturity_level: maturity_level(verdict.offers_ai_services, categories.len()).to_string(),
        ai_service_categories: categories,
        governance_documented: verdict.governance_documented,
        confidence,
        detection_method: AnalysisMethod::Llm,
    }
}

fn from_keywords(domain: &str, text: &str) -> AiServicesScan {
    let mut hits = 0usize;
    let mut categories = Vec::new();
    for (category, keywords) in CATEGORIES {
        let matched = keywords.iter().filter(|k| text.contains(*k)).count();
        if matched > 0 {
            hits += matched;
            categories.push(category.to_string());
        }
    }

    let offers = hits >= MIN_KEYWORD_HITS;
    if !offers {
        categories.clear();
    }
    let confidence = if offers {
        (40.0 + 15.0 * hits as f64).min(95.0)
    } else if text.is_empty() {
        30.0
    } else {
        60.0
    };

    AiServicesScan {
        meta: ScanMeta::ok(domain),
        offers_ai_services: offers,
        ai_maturity_level: maturity_level(offers, categories.len()).to_string(),
        ai_service_categories: categories,
        governance_documented: GOVERNANCE_KEYWORDS.iter().any(|k| text.contains(k)),
        confidence,
        detection_method: AnalysisMethod::Keyword,
    }
}

fn maturity_level(offers: bool, categories: usize) -> &'static str {
    match (offers, categories) {
        (false, _) | (true, 0) => "None",
        (true, 1) => "Emerging",
        (true, 2..=3) => "Developing",
        _ => "Advanced",
    }
}
