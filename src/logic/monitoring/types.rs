//! Monitoring Types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Severity;

/// A vendor under continuous monitoring
#[derive(Debug, Clone, Serialize)]
pub struct MonitoredVendor {
    pub vendor_domain: String,
    pub vendor_name: String,
    /// Assessment that enrolled the vendor
    pub assessment_id: Uuid,
    pub enabled: bool,
    pub added_at: DateTime<Utc>,
    pub last_checked: Option<DateTime<Utc>>,
    pub next_check: DateTime<Utc>,
    pub check_count: u64,
    pub alert_count: u64,
    /// Last known breach count; `None` until a breach lookup succeeds
    pub baseline_breach_count: Option<u32>,
    pub last_error: Option<String>,
    pub tls_ok: Option<bool>,
    pub hsts_enabled: Option<bool>,
}

impl MonitoredVendor {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_check <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    DomainUnreachable,
    TlsFailure,
    HstsMissing,
    NewBreach,
}

impl AlertType {
    pub fn severity(&self) -> Severity {
        match self {
            AlertType::DomainUnreachable => Severity::Medium,
            AlertType::TlsFailure => Severity::High,
            AlertType::HstsMissing => Severity::Low,
            AlertType::NewBreach => Severity::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::DomainUnreachable => "domain_unreachable",
            AlertType::TlsFailure => "tls_failure",
            AlertType::HstsMissing => "hsts_missing",
            AlertType::NewBreach => "new_breach",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AlertType::DomainUnreachable => "Vendor domain unreachable",
            AlertType::TlsFailure => "TLS handshake failure",
            AlertType::HstsMissing => "HSTS header missing",
            AlertType::NewBreach => "New data breach reported",
        }
    }

    pub fn recommended_actions(&self) -> Vec<String> {
        let actions: &[&str] = match self {
            AlertType::DomainUnreachable => &[
                "Confirm with the vendor whether the service has moved or been retired",
                "Check DNS records for signs of domain expiry or hijacking",
            ],
            AlertType::TlsFailure => &[
                "Suspend data transfers to the vendor until HTTPS is restored",
                "Ask the vendor for the cause and an expected fix date",
            ],
            AlertType::HstsMissing => &[
                "Ask the vendor to enable Strict-Transport-Security on its site",
            ],
            AlertType::NewBreach => &[
                "Request the vendor's incident report and remediation timeline",
                "Determine whether your organization's data was affected",
                "Re-run the vendor risk assessment",
            ],
        };
        actions.iter().map(|a| a.to_string()).collect()
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitoringAlert {
    pub id: Uuid,
    pub vendor_domain: String,
    pub vendor_name: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub recommended_actions: Vec<String>,
}

impl MonitoringAlert {
    pub fn new(vendor: &MonitoredVendor, alert_type: AlertType, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            vendor_domain: vendor.vendor_domain.clone(),
            vendor_name: vendor.vendor_name.clone(),
            alert_type,
            severity: alert_type.severity(),
            title: alert_type.title().to_string(),
            description,
            timestamp: Utc::now(),
            recommended_actions: alert_type.recommended_actions(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitoringStatus {
    pub running: bool,
    pub vendor_count: usize,
    pub vendors: Vec<String>,
    pub interval_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_serialized_shape() {
        let vendor = MonitoredVendor {
            vendor_domain: "acme.com".to_string(),
            vendor_name: "Acme".to_string(),
            assessment_id: Uuid::new_v4(),
            enabled: true,
            added_at: Utc::now(),
            last_checked: None,
            next_check: Utc::now(),
            check_count: 0,
            alert_count: 0,
            baseline_breach_count: Some(0),
            last_error: None,
            tls_ok: None,
            hsts_enabled: None,
        };
        let alert = MonitoringAlert::new(&vendor, AlertType::NewBreach, "2 breaches".to_string());

        let json = serde_json::to_value(&alert).unwrap();
        for key in [
            "id",
            "vendor_domain",
            "vendor_name",
            "alert_type",
            "severity",
            "title",
            "description",
            "timestamp",
            "recommended_actions",
        ] {
            assert!(json.get(key).is_some(), "alert missing {}", key);
        }
        assert_eq!(json["alert_type"], "new_breach");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["title"], "New data breach reported");
        assert_eq!(json["recommended_actions"].as_array().unwrap().len(), 3);

        let json = serde_json::to_value(&vendor).unwrap();
        for key in [
            "vendor_domain",
            "vendor_name",
            "assessment_id",
            "enabled",
            "added_at",
            "last_checked",
            "next_check",
            "check_count",
            "alert_count",
            "baseline_breach_count",
            "last_error",
        ] {
            assert!(json.get(key).is_some(), "vendor missing {}", key);
        }
    }

    #[test]
    fn test_every_alert_type_has_actions() {
        for alert_type in [
            AlertType::DomainUnreachable,
            AlertType::TlsFailure,
            AlertType::HstsMissing,
            AlertType::NewBreach,
        ] {
            assert!(!alert_type.recommended_actions().is_empty());
            assert!(!alert_type.title().is_empty());
        }
    }
}
