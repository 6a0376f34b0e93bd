//! Parallel Scan Orchestrator
//!
//! Fans the six scans out on a `JoinSet`, advances the tracker as they land
//! and joins them under a bounded wait. Stragglers are aborted and replaced by
//! their fallback record.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::progress::{ProgressTracker, FINAL_STEP, FIRST_SCAN_STEP, INIT_STEP, LAST_SCAN_STEP, SCORING_STEP};
use super::{grading, report, scoring, AssessmentError};
use crate::config::Config;
use crate::logic::monitoring::MonitoringScheduler;
use crate::logic::scans::{run_scan, PartialScans, ScanBundle, ScanContext, ScanError, ScanKind, ScanTarget};
use crate::models::AssessmentRequest;
use crate::store::AssessmentStore;

/// Within-step advance per poll tick, and its ceiling
const TICK_INCREMENT: f64 = 5.0;
const TICK_CAP: f64 = 90.0;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Bounded wait for the whole scan batch
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_wait: config.scan_timeout(),
            poll_interval: config.progress_poll_interval(),
        }
    }
}

/// Records the scan kind if its task unwinds
struct PanicMarker {
    kind: ScanKind,
    panicked: Arc<Mutex<Vec<ScanKind>>>,
}

impl Drop for PanicMarker {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.panicked.lock().push(self.kind);
        }
    }
}

/// Run all six scans concurrently and join them under `settings.max_wait`
pub async fn run_scans(
    ctx: &ScanContext,
    target: &ScanTarget,
    tracker: &mut ProgressTracker,
    settings: &OrchestratorSettings,
) -> ScanBundle {
    let panicked = Arc::new(Mutex::new(Vec::new()));
    let mut tasks = JoinSet::new();

    for kind in ScanKind::ALL {
        let ctx = ctx.clone();
        let target = target.clone();
        let marker = PanicMarker { kind, panicked: panicked.clone() };
        tasks.spawn(async move {
            let _marker = marker;
            run_scan(&ctx, kind, &target).await
        });
    }

    tracker.start_step(FIRST_SCAN_STEP);

    let mut partial = PartialScans::default();
    let mut ticker = tokio::time::interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    let deadline = tokio::time::sleep(settings.max_wait);
    tokio::pin!(deadline);
    let mut timed_out = false;

    while !tasks.is_empty() {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                Some(Ok(report)) => {
                    tracing::debug!("{} scan finished for {}", report.kind(), target.domain);
                    partial.insert(report);
                    // Heuristic: completed count maps onto the named scan steps
                    let step = (FIRST_SCAN_STEP + partial.filled()).min(LAST_SCAN_STEP);
                    tracker.start_step(step);
                }
                Some(Err(e)) => {
                    tracing::error!("Scan task for {} ended abnormally: {}", target.domain, e);
                }
                None => break,
            },
            _ = ticker.tick() => tracker.nudge(TICK_INCREMENT, TICK_CAP),
            _ = &mut deadline => {
                timed_out = true;
                tracing::warn!(
                    "Scan join for {} hit {:?} with {} task(s) outstanding",
                    target.domain,
                    settings.max_wait,
                    tasks.len()
                );
                tasks.abort_all();
                break;
            }
        }
    }

    // Drain aborted tasks; one may have finished just before the abort
    while let Some(joined) = tasks.join_next().await {
        if let Ok(report) = joined {
            partial.insert(report);
        }
    }

    let panicked = panicked.lock().clone();
    let seconds = settings.max_wait.as_secs_f64();
    if timed_out || !panicked.is_empty() {
        tracing::info!(
            "{} of 6 scans for {} produced results",
            partial.filled(),
            target.domain
        );
    }

    partial.complete(target, |kind| {
        // Without a deadline abort, a missing slot can only be a failed task
        if panicked.contains(&kind) || !timed_out {
            ScanError::TaskFailed("scan task panicked".to_string())
        } else {
            ScanError::TimedOut { seconds }
        }
    })
}

// ============================================================================
// ASSESSMENT PIPELINE
// ============================================================================

/// Runs one assessment end to end against the store
pub struct Orchestrator {
    ctx: ScanContext,
    store: Arc<dyn AssessmentStore>,
    settings: OrchestratorSettings,
    monitor: Option<Arc<MonitoringScheduler>>,
}

impl Orchestrator {
    pub fn new(
        ctx: ScanContext,
        store: Arc<dyn AssessmentStore>,
        settings: OrchestratorSettings,
        monitor: Option<Arc<MonitoringScheduler>>,
    ) -> Self {
        Self { ctx, store, settings, monitor }
    }

    /// Run and record the terminal state; errors end as status `error`
    pub async fn execute(&self, id: Uuid, request: AssessmentRequest) {
        if let Err(e) = self.run(id, &request).await {
            tracing::error!("Assessment {} for {} failed: {}", id, request.vendor_domain, e);
            let message = e.to_string();
            self.store.update(&id, &mut |a| {
                a.fail(&message);
            });
        }
    }

    pub async fn run(&self, id: Uuid, request: &AssessmentRequest) -> Result<(), AssessmentError> {
        let mut tracker = ProgressTracker::new(self.store.clone(), id);
        tracker.start_step(INIT_STEP);

        tracing::info!(
            "Assessment {} started for {} ({})",
            id,
            request.vendor_domain,
            request.assessment_mode
        );

        let target = ScanTarget {
            domain: request.vendor_domain.clone(),
            vendor_name: request.vendor_name.clone(),
            regulations: request.regulations.clone(),
        };
        let scans = run_scans(&self.ctx, &target, &mut tracker, &self.settings).await;

        tracker.start_step(SCORING_STEP);
        let risk = scoring::aggregate(&scans, request.assessment_mode)?;
        let grade = grading::grade(risk.raw_score);

        tracker.start_step(FINAL_STEP);
        let baseline_breaches = scans.breach.meta.error.is_none().then_some(scans.breach.breach_count);
        let results = report::build_results(request, scans, risk, grade);
        let overall = results.overall_score;
        let letter = results.letter_grade;

        let mut pending = Some(results);
        let mut completed = false;
        let found = self.store.update(&id, &mut |a| {
            if let Some(results) = pending.take() {
                completed = a.complete(results);
            }
        });
        if !found {
            return Err(AssessmentError::Missing(id));
        }
        if !completed {
            tracing::info!("Assessment {} already terminal, results discarded", id);
            return Ok(());
        }

        tracing::info!(
            "Assessment {} completed: {} scored {} ({})",
            id,
            request.vendor_domain,
            overall,
            letter
        );

        if request.continuous_monitoring {
            if let Some(monitor) = &self.monitor {
                monitor.register(&request.vendor_domain, &request.vendor_name, id, baseline_breaches);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scans::breach::breach_catalogue_url;
    use crate::logic::scans::testing::{context, FakeWeb};
    use crate::models::{Assessment, AssessmentMode, AssessmentStatus};
    use crate::store::MemoryStore;

    fn settings(max_wait_ms: u64) -> OrchestratorSettings {
        OrchestratorSettings {
            max_wait: Duration::from_millis(max_wait_ms),
            poll_interval: Duration::from_millis(10),
        }
    }

    fn request(domain: &str, mode: AssessmentMode) -> AssessmentRequest {
        AssessmentRequest {
            vendor_domain: domain.to_string(),
            vendor_name: "Example".to_string(),
            requester_email: "a@b.com".to_string(),
            regulations: vec!["SOC 2".to_string()],
            assessment_mode: mode,
            continuous_monitoring: false,
        }
    }

    fn seeded(store: &Arc<MemoryStore>, request: &AssessmentRequest) -> Uuid {
        let assessment = Assessment::new(request);
        let id = assessment.id;
        store.put(assessment);
        id
    }

    #[tokio::test]
    async fn test_network_down_business_end_to_end() {
        let store = Arc::new(MemoryStore::new());
        let req = request("example.com", AssessmentMode::BusinessRisk);
        let id = seeded(&store, &req);

        let orchestrator = Orchestrator::new(context(FakeWeb::offline()), store.clone(), settings(5_000), None);
        orchestrator.execute(id, req).await;

        let a = store.get(&id).unwrap();
        assert_eq!(a.status, AssessmentStatus::Completed);
        assert_eq!(a.progress, 100.0);
        let results = a.results.unwrap();
        assert_eq!(results.overall_score, 53.0);
        assert_eq!(results.letter_grade.as_str(), "F");
        assert_eq!(results.scan_results.failures().len(), 6);
    }

    #[tokio::test]
    async fn test_removed_record_is_missing() {
        let store = Arc::new(MemoryStore::new());
        let req = request("example.com", AssessmentMode::BusinessRisk);
        let id = Uuid::new_v4();

        let orchestrator = Orchestrator::new(context(FakeWeb::offline()), store.clone(), settings(5_000), None);
        let result = orchestrator.run(id, &req).await;

        assert!(matches!(result, Err(AssessmentError::Missing(missing)) if missing == id));
        assert!(store.get(&id).is_none());
    }

    #[tokio::test]
    async fn test_network_down_technical_end_to_end() {
        let store = Arc::new(MemoryStore::new());
        let req = request("example.com", AssessmentMode::TechnicalDueDiligence);
        let id = seeded(&store, &req);

        let orchestrator = Orchestrator::new(context(FakeWeb::offline()), store.clone(), settings(5_000), None);
        orchestrator.execute(id, req).await;

        let results = store.get(&id).unwrap().results.unwrap();
        assert_eq!(results.overall_score, 57.5);
    }

    #[tokio::test]
    async fn test_slow_scan_times_out_batch_completes() {
        let store = Arc::new(MemoryStore::new());
        let req = request("acme.com", AssessmentMode::BusinessRisk);
        let id = seeded(&store, &req);

        let web = FakeWeb::online().with_delay(&breach_catalogue_url("acme.com"), Duration::from_secs(30));
        let orchestrator = Orchestrator::new(context(web), store.clone(), settings(200), None);

        let started = std::time::Instant::now();
        orchestrator.execute(id, req).await;
        assert!(started.elapsed() < Duration::from_secs(5));

        let a = store.get(&id).unwrap();
        assert_eq!(a.status, AssessmentStatus::Completed);
        let scans = a.results.unwrap().scan_results;
        assert_eq!(scans.failures(), vec![ScanKind::Breach]);
        assert!(scans.breach.meta.error.unwrap().contains("did not finish"));
        assert!(scans.privacy.meta.error.is_none());
    }

    #[tokio::test]
    async fn test_panicking_scan_gets_fallback() {
        let store = Arc::new(MemoryStore::new());
        let target = ScanTarget {
            domain: "acme.com".to_string(),
            vendor_name: "Acme".to_string(),
            regulations: Vec::new(),
        };
        let req = request("acme.com", AssessmentMode::BusinessRisk);
        let id = seeded(&store, &req);
        let mut tracker = ProgressTracker::new(store.clone(), id);

        let web = FakeWeb::online().with_panic(&breach_catalogue_url("acme.com"));
        let scans = run_scans(&context(web), &target, &mut tracker, &settings(5_000)).await;

        assert_eq!(scans.failures(), vec![ScanKind::Breach]);
        assert!(scans.breach.meta.error.unwrap().contains("panicked"));
        assert_eq!(tracker.current_step(), Some(LAST_SCAN_STEP));
    }

    #[tokio::test]
    async fn test_cancelled_assessment_keeps_error() {
        let store = Arc::new(MemoryStore::new());
        let req = request("example.com", AssessmentMode::BusinessRisk);
        let id = seeded(&store, &req);
        store.update(&id, &mut |a| {
            a.fail("cancelled");
        });

        let orchestrator = Orchestrator::new(context(FakeWeb::offline()), store.clone(), settings(5_000), None);
        orchestrator.execute(id, req).await;

        let a = store.get(&id).unwrap();
        assert_eq!(a.status, AssessmentStatus::Error);
        assert_eq!(a.error.as_deref(), Some("cancelled"));
        assert!(a.results.is_none());
    }
}
