//! Assessment request model

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::assessment::AssessmentMode;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Registry suffixes like the "co" in "acme.co.uk"
const SECOND_LEVEL_SUFFIXES: &[&str] = &["co", "com", "org", "net", "gov", "ac", "edu"];

/// Incoming request body for `POST /api/v1/assessments`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAssessmentRequest {
    #[validate(custom(function = "validate_domain"))]
    pub vendor_domain: String,

    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub vendor_name: Option<String>,

    #[validate(email(message = "must be a valid e-mail address"))]
    pub requester_email: String,

    #[serde(default, alias = "regulatory_frameworks")]
    #[validate(custom(function = "validate_regulations"))]
    pub regulations: Vec<String>,

    #[serde(default)]
    pub assessment_mode: AssessmentMode,

    #[serde(default)]
    pub enable_continuous_monitoring: bool,
}

/// Validated, normalized request
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentRequest {
    pub vendor_domain: String,
    pub vendor_name: String,
    pub requester_email: String,
    pub regulations: Vec<String>,
    pub assessment_mode: AssessmentMode,
    pub continuous_monitoring: bool,
}

impl CreateAssessmentRequest {
    /// Validate and normalize in one step
    pub fn into_normalized(self) -> Result<AssessmentRequest, validator::ValidationErrors> {
        self.validate()?;

        let vendor_domain = normalize_domain(&self.vendor_domain);
        let vendor_name = self
            .vendor_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| display_name(&vendor_domain));

        Ok(AssessmentRequest {
            vendor_name,
            vendor_domain,
            requester_email: self.requester_email.trim().to_string(),
            regulations: self.regulations.iter().map(|r| r.trim().to_string()).collect(),
            assessment_mode: self.assessment_mode,
            continuous_monitoring: self.enable_continuous_monitoring,
        })
    }
}

// ============================================================================
// DOMAIN NORMALIZATION
// ============================================================================

/// Lowercase, strip scheme, `www.`, port and path
pub fn normalize_domain(raw: &str) -> String {
    let mut domain = raw.trim().to_lowercase();

    if let Some(idx) = domain.find("://") {
        domain = domain[idx + 3..].to_string();
    }
    if let Some(idx) = domain.find(['/', '?', '#']) {
        domain.truncate(idx);
    }
    if let Some(idx) = domain.find(':') {
        domain.truncate(idx);
    }
    let domain = domain.trim_end_matches('.');

    domain.strip_prefix("www.").unwrap_or(domain).to_string()
}

/// Check a normalized domain is a plausible public hostname
pub fn check_domain(domain: &str) -> Result<(), &'static str> {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return Err("must be 1-253 characters");
    }
    if !domain.contains('.') {
        return Err("must contain at least one dot");
    }

    let labels_ok = domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !labels_ok {
        return Err("must be a valid hostname");
    }

    Ok(())
}

/// "acme-corp.co.uk" -> "Acme-corp"
pub fn display_name(domain: &str) -> String {
    let labels: Vec<&str> = domain.split('.').collect();
    let base = match labels.len() {
        0 | 1 => domain,
        n if n >= 3 && SECOND_LEVEL_SUFFIXES.contains(&labels[n - 2]) => labels[n - 3],
        n => labels[n - 2],
    };

    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn validate_domain(raw: &str) -> Result<(), ValidationError> {
    check_domain(&normalize_domain(raw)).map_err(|reason| invalid("invalid_domain", reason))
}

fn validate_regulations(regulations: &[String]) -> Result<(), ValidationError> {
    if regulations.iter().any(|r| r.trim().is_empty()) {
        return Err(invalid("empty_regulation", "entries must not be empty"));
    }
    Ok(())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}
