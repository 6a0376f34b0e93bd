//! Continuous Monitoring Scheduler
//!
//! Periodically re-checks enrolled vendors (DNS, TLS, breach catalogue) and
//! raises alerts when their posture changes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use super::types::{AlertType, MonitoredVendor, MonitoringAlert, MonitoringStatus};
use crate::constants::{MAX_ALERTS_PER_VENDOR, MONITORING_TICK_SECS};
use crate::logic::scans::{scan_breaches, ScanContext};
use crate::models::normalize_domain;

pub struct MonitoringScheduler {
    ctx: ScanContext,
    interval: chrono::Duration,
    tick: Duration,
    permits: Arc<Semaphore>,
    vendors: RwLock<HashMap<String, MonitoredVendor>>,
    alerts: RwLock<HashMap<String, VecDeque<MonitoringAlert>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MonitoringScheduler {
    pub fn new(ctx: ScanContext, interval_minutes: i64, concurrency: usize) -> Self {
        Self {
            ctx,
            interval: chrono::Duration::minutes(interval_minutes.max(0)),
            tick: Duration::from_secs(MONITORING_TICK_SECS),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            vendors: RwLock::new(HashMap::new()),
            alerts: RwLock::new(HashMap::new()),
            worker: Mutex::new(None),
        }
    }

    // ========================================================================
    // REGISTRY
    // ========================================================================

    /// Enroll (or re-enroll) a vendor; starts the loop on first use
    pub fn register(
        self: &Arc<Self>,
        domain: &str,
        vendor_name: &str,
        assessment_id: Uuid,
        baseline_breach_count: Option<u32>,
    ) {
        let domain = normalize_domain(domain);
        let now = Utc::now();
        let vendor = MonitoredVendor {
            vendor_domain: domain.clone(),
            vendor_name: vendor_name.to_string(),
            assessment_id,
            enabled: true,
            added_at: now,
            last_checked: None,
            next_check: now + self.interval,
            check_count: 0,
            alert_count: 0,
            baseline_breach_count,
            last_error: None,
            tls_ok: None,
            hsts_enabled: None,
        };

        let replaced = self.vendors.write().insert(domain.clone(), vendor).is_some();
        tracing::info!(
            "Monitoring {} {} (assessment {})",
            if replaced { "re-enrolled" } else { "enrolled" },
            domain,
            assessment_id
        );

        self.start();
    }

    pub fn remove(&self, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        let removed = self.vendors.write().remove(&domain).is_some();
        if removed {
            self.alerts.write().remove(&domain);
            tracing::info!("Monitoring stopped for {}", domain);
        }
        removed
    }

    pub fn vendors(&self) -> Vec<MonitoredVendor> {
        let mut vendors: Vec<MonitoredVendor> = self.vendors.read().values().cloned().collect();
        vendors.sort_by(|a, b| a.vendor_domain.cmp(&b.vendor_domain));
        vendors
    }

    pub fn vendor(&self, domain: &str) -> Option<MonitoredVendor> {
        self.vendors.read().get(&normalize_domain(domain)).cloned()
    }

    pub fn status(&self) -> MonitoringStatus {
        let vendors: Vec<String> = self.vendors().into_iter().map(|v| v.vendor_domain).collect();
        MonitoringStatus {
            running: self.is_running(),
            vendor_count: vendors.len(),
            vendors,
            interval_minutes: self.interval.num_minutes(),
        }
    }

    // ========================================================================
    // ALERTS
    // ========================================================================

    /// Newest first
    pub fn alerts_for(&self, domain: &str, limit: usize) -> Vec<MonitoringAlert> {
        self.alerts
            .read()
            .get(&normalize_domain(domain))
            .map(|queue| queue.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Newest first, across all vendors
    pub fn recent_alerts(&self, limit: usize) -> Vec<MonitoringAlert> {
        let mut all: Vec<MonitoringAlert> = self.alerts.read().values().flatten().cloned().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all.truncate(limit);
        all
    }

    fn push_alerts(&self, domain: &str, new_alerts: &[MonitoringAlert]) {
        if new_alerts.is_empty() {
            return;
        }
        let mut alerts = self.alerts.write();
        let queue = alerts.entry(domain.to_string()).or_default();
        for alert in new_alerts {
            queue.push_back(alert.clone());
        }
        while queue.len() > MAX_ALERTS_PER_VENDOR {
            queue.pop_front();
        }
    }

    // ========================================================================
    // CHECKS
    // ========================================================================

    /// Check one vendor now; returns the alerts it raised
    pub async fn check_vendor(&self, domain: &str) -> Vec<MonitoringAlert> {
        let Some(previous) = self.vendor(domain) else {
            return Vec::new();
        };
        let domain = previous.vendor_domain.as_str();
        let mut raised = Vec::new();
        let mut last_error = None;
        let mut tls_ok = previous.tls_ok;
        let mut hsts_enabled = previous.hsts_enabled;
        let mut baseline = previous.baseline_breach_count;

        match self.ctx.web.resolve(domain).await {
            Err(e) => {
                raised.push(MonitoringAlert::new(
                    &previous,
                    AlertType::DomainUnreachable,
                    format!("{} no longer resolves: {}", domain, e),
                ));
                last_error = Some(e.to_string());
            }
            Ok(_) => {
                let tls = self.ctx.web.check_tls(domain).await;

                if !tls.handshake_ok && previous.tls_ok != Some(false) {
                    raised.push(MonitoringAlert::new(
                        &previous,
                        AlertType::TlsFailure,
                        format!(
                            "HTTPS handshake with {} failed{}",
                            domain,
                            tls.detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
                        ),
                    ));
                }
                if tls.handshake_ok && !tls.hsts && previous.hsts_enabled != Some(false) {
                    raised.push(MonitoringAlert::new(
                        &previous,
                        AlertType::HstsMissing,
                        format!("{} serves HTTPS without Strict-Transport-Security", domain),
                    ));
                }
                tls_ok = Some(tls.handshake_ok);
                if tls.handshake_ok {
                    hsts_enabled = Some(tls.hsts);
                }

                let breaches = scan_breaches(&self.ctx, domain).await;
                match breaches.meta.error {
                    Some(error) => last_error = Some(error),
                    None => {
                        if let Some(known) = baseline.filter(|known| breaches.breach_count > *known) {
                            raised.push(MonitoringAlert::new(
                                &previous,
                                AlertType::NewBreach,
                                format!(
                                    "{} breach(es) now on record for {}, up from {}",
                                    breaches.breach_count, domain, known
                                ),
                            ));
                        }
                        baseline = Some(breaches.breach_count);
                    }
                }
            }
        }

        let now = Utc::now();
        let still_enrolled = self
            .vendors
            .write()
            .get_mut(domain)
            .map(|vendor| {
                vendor.tls_ok = tls_ok;
                vendor.hsts_enabled = hsts_enabled;
                vendor.baseline_breach_count = baseline;
                vendor.last_checked = Some(now);
                vendor.next_check = now + self.interval;
                vendor.check_count += 1;
                vendor.alert_count += raised.len() as u64;
                vendor.last_error = last_error.clone();
            })
            .is_some();
        if !still_enrolled {
            return Vec::new();
        }

        if let Some(error) = &last_error {
            tracing::warn!("Monitoring check for {} incomplete: {}", domain, error);
        }
        for alert in &raised {
            tracing::warn!("[{:?}] {}: {}", alert.severity, alert.alert_type, alert.description);
        }
        self.push_alerts(domain, &raised);
        raised
    }

    /// Check every due vendor, at most `concurrency` at a time
    pub async fn run_due_checks(self: &Arc<Self>) -> usize {
        let now = Utc::now();
        let due: Vec<String> = self
            .vendors
            .read()
            .values()
            .filter(|v| v.is_due(now))
            .map(|v| v.vendor_domain.clone())
            .collect();
        if due.is_empty() {
            return 0;
        }

        tracing::debug!("Running {} monitoring check(s)", due.len());
        let mut checks = JoinSet::new();
        for domain in due {
            let scheduler = self.clone();
            let permits = self.permits.clone();
            checks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                scheduler.check_vendor(&domain).await;
            });
        }

        let mut completed = 0;
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok(()) => completed += 1,
                Err(e) => tracing::error!("Monitoring check task failed: {}", e),
            }
        }
        completed
    }

    // ========================================================================
    // LOOP CONTROL
    // ========================================================================

    pub fn is_running(&self) -> bool {
        self.worker.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start the background loop. `false` if it was already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let scheduler = self.clone();
        *worker = Some(tokio::spawn(async move { scheduler.run_loop().await }));
        tracing::info!("Monitoring loop started (interval: {} min)", self.interval.num_minutes());
        true
    }

    pub fn stop(&self) -> bool {
        match self.worker.lock().take() {
            Some(handle) => {
                handle.abort();
                tracing::info!("Monitoring loop stopped");
                true
            }
            None => false,
        }
    }

    async fn run_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_due_checks().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scans::breach::breach_catalogue_url;
    use crate::logic::scans::testing::{shared_context, FakeWeb};
    use crate::logic::scans::web::TlsCheck;
    use crate::models::Severity;

    const ONE_BREACH: &str = r#"[{"Name":"Acme2024","BreachDate":"2024-03-01","PwnCount":1200,"DataClasses":["Email addresses"]}]"#;

    fn scheduler(web: &Arc<FakeWeb>, interval_minutes: i64) -> Arc<MonitoringScheduler> {
        Arc::new(MonitoringScheduler::new(shared_context(web), interval_minutes, 3))
    }

    #[tokio::test]
    async fn test_new_breach_raises_critical_alert() {
        let web = Arc::new(FakeWeb::online());
        let monitor = scheduler(&web, 300);
        monitor.register("acme.com", "Acme", Uuid::new_v4(), Some(0));

        assert!(monitor.check_vendor("acme.com").await.is_empty());

        web.set_page(&breach_catalogue_url("acme.com"), ONE_BREACH);
        let alerts = monitor.check_vendor("acme.com").await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::NewBreach);
        assert_eq!(alerts[0].severity, Severity::Critical);

        let vendor = monitor.vendor("acme.com").unwrap();
        assert_eq!(vendor.baseline_breach_count, Some(1));
        assert_eq!(vendor.check_count, 2);
        assert_eq!(vendor.alert_count, 1);

        // Baseline moved; no repeat
        assert!(monitor.check_vendor("acme.com").await.is_empty());
        monitor.stop();
    }

    #[tokio::test]
    async fn test_unknown_baseline_set_without_alert() {
        let web = Arc::new(FakeWeb::online().with_page(&breach_catalogue_url("acme.com"), ONE_BREACH));
        let monitor = scheduler(&web, 300);
        monitor.register("acme.com", "Acme", Uuid::new_v4(), None);

        assert!(monitor.check_vendor("acme.com").await.is_empty());
        assert_eq!(monitor.vendor("acme.com").unwrap().baseline_breach_count, Some(1));
        monitor.stop();
    }

    #[tokio::test]
    async fn test_tls_alerts_on_state_change_only() {
        let web = Arc::new(FakeWeb::online());
        let monitor = scheduler(&web, 300);
        monitor.register("acme.com", "Acme", Uuid::new_v4(), Some(0));

        web.set_tls(TlsCheck {
            handshake_ok: false,
            hsts: false,
            status: None,
            detail: Some("certificate expired".to_string()),
        });
        let first = monitor.check_vendor("acme.com").await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].alert_type, AlertType::TlsFailure);
        assert!(first[0].description.contains("certificate expired"));
        assert!(monitor.check_vendor("acme.com").await.is_empty());

        web.set_tls(TlsCheck {
            handshake_ok: true,
            hsts: false,
            status: Some(200),
            detail: None,
        });
        let kinds: Vec<AlertType> = monitor.check_vendor("acme.com").await.iter().map(|a| a.alert_type).collect();
        assert_eq!(kinds, vec![AlertType::HstsMissing]);
        monitor.stop();
    }

    #[tokio::test]
    async fn test_alerts_capped_per_vendor() {
        let web = Arc::new(FakeWeb::offline());
        let monitor = scheduler(&web, 300);
        monitor.register("acme.com", "Acme", Uuid::new_v4(), None);

        for _ in 0..(MAX_ALERTS_PER_VENDOR + 20) {
            monitor.check_vendor("acme.com").await;
        }

        let alerts = monitor.alerts_for("acme.com", usize::MAX);
        assert_eq!(alerts.len(), MAX_ALERTS_PER_VENDOR);
        assert!(alerts.iter().all(|a| a.alert_type == AlertType::DomainUnreachable));
        assert_eq!(alerts[0].vendor_name, "Acme");
        assert!(!alerts[0].recommended_actions.is_empty());
        assert_eq!(
            monitor.vendor("acme.com").unwrap().alert_count,
            (MAX_ALERTS_PER_VENDOR + 20) as u64
        );
        assert!(alerts[0].timestamp >= alerts[alerts.len() - 1].timestamp);
        assert!(monitor.vendor("acme.com").unwrap().last_error.is_some());
        assert_eq!(monitor.recent_alerts(5).len(), 5);
        monitor.stop();
    }

    #[tokio::test]
    async fn test_due_checks_and_registry() {
        let web = Arc::new(FakeWeb::online());
        let monitor = scheduler(&web, 0);
        monitor.register("https://www.acme.com/", "Acme", Uuid::new_v4(), Some(0));
        monitor.register("globex.com", "Globex", Uuid::new_v4(), Some(0));

        assert_eq!(monitor.run_due_checks().await, 2);
        assert_eq!(monitor.vendor("acme.com").unwrap().check_count, 1);

        let status = monitor.status();
        assert!(status.running);
        assert_eq!(status.vendors, vec!["acme.com", "globex.com"]);

        assert!(monitor.remove("acme.com"));
        assert!(!monitor.remove("acme.com"));
        assert_eq!(monitor.status().vendor_count, 1);

        assert!(monitor.stop());
        assert!(!monitor.stop());
    }
}
