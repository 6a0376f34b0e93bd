//! Synthetic Fallback Scores
//!
//! Deterministic placeholder scores used when a vendor site is reachable but
//! yields no usable signal and no LLM analysis is available. Same domain and
//! dimension always give the same number. Not a real risk signal.

use sha2::{Digest, Sha256};

/// Placeholder score in [min, max] for a (domain, dimension) pair, rounded to a whole number
pub fn synthetic_fallback_score(domain: &str, dimension: &str, min: f64, max: f64) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(dimension.as_bytes());
    hasher.update(b":");
    hasher.update(domain.trim().to_lowercase().as_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let fraction = u64::from_be_bytes(head) as f64 / u64::MAX as f64;

    (min + fraction * (max - min)).round()
}
