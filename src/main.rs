//! Vendor Risk Server
//!
//! Vendor risk assessment backend: six parallel scans per vendor domain,
//! weighted scoring, letter grading and optional continuous monitoring.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    VENDOR RISK SERVER                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────────┐  ┌──────────────────┐ │
//! │  │  API      │  │  Assessment      │  │  Monitoring      │ │
//! │  │  (Axum)   │─▶│  Service         │─▶│  Scheduler       │ │
//! │  └─────┬─────┘  │  (orchestrator)  │  │  (interval loop) │ │
//! │        │        └────────┬─────────┘  └────────┬─────────┘ │
//! │        │                 ▼                     │           │
//! │        │        ┌──────────────────┐           │           │
//! │        └───────▶│  Scans (6x)      │◀──────────┘           │
//! │                 │  web / LLM seams │                       │
//! │                 └──────────────────┘                       │
//! │                 ┌──────────────────┐                       │
//! │                 │  Result Store    │ (in-memory)           │
//! │                 └──────────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod constants;
mod error;
mod handlers;
mod logic;
mod models;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::logic::assessment::{AssessmentService, Orchestrator, OrchestratorSettings};
use crate::logic::monitoring::MonitoringScheduler;
use crate::logic::scans::ScanContext;
use crate::store::{AssessmentStore, MemoryStore};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    init_tracing(&config);

    tracing::info!("{} v{} starting...", constants::APP_NAME, constants::APP_VERSION);
    tracing::info!(
        "Environment: {}, scan timeout: {}s, LLM analysis: {}",
        config.environment,
        config.scan_timeout_seconds,
        if config.llm_enabled() { "enabled" } else { "disabled" }
    );

    let scans = ScanContext::from_config(&config).context("Failed to build HTTP clients")?;
    let store: Arc<dyn AssessmentStore> = Arc::new(MemoryStore::new());
    let monitor = Arc::new(MonitoringScheduler::new(
        scans.clone(),
        config.monitoring_interval_minutes,
        config.monitoring_concurrency,
    ));
    let orchestrator = Orchestrator::new(
        scans.clone(),
        store.clone(),
        OrchestratorSettings::from_config(&config),
        Some(monitor.clone()),
    );
    let service = Arc::new(AssessmentService::new(store, Arc::new(orchestrator)));

    // Build application state
    let state = AppState {
        service: service.clone(),
        monitor: monitor.clone(),
        scans,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    monitor.stop();
    service.shutdown();
    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &config::Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vendor_risk=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format == "json" || config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AssessmentService>,
    pub monitor: Arc<MonitoringScheduler>,
    pub scans: ScanContext,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))

        // Assessments
        .route("/api/v1/assessments", post(handlers::assessments::create))
        .route("/api/v1/assessments", get(handlers::assessments::list))
        .route("/api/v1/assessments/:id", get(handlers::assessments::get))
        .route("/api/v1/assessments/:id", delete(handlers::assessments::cancel))

        // Single scans
        .route("/api/v1/scans/:kind", post(handlers::scans::run))

        // Monitoring
        .route("/api/v1/monitoring/status", get(handlers::monitoring::status))
        .route("/api/v1/monitoring/alerts", get(handlers::monitoring::recent_alerts))
        .route("/api/v1/monitoring/:domain", get(handlers::monitoring::vendor))
        .route("/api/v1/monitoring/:domain", delete(handlers::monitoring::remove))
        .route("/api/v1/monitoring/:domain/alerts", get(handlers::monitoring::vendor_alerts))

        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::logic::scans::testing::{context, FakeWeb};

    fn app() -> Router {
        let scans = context(FakeWeb::offline());
        let store: Arc<dyn AssessmentStore> = Arc::new(MemoryStore::new());
        let monitor = Arc::new(MonitoringScheduler::new(scans.clone(), 300, 3));
        let settings = OrchestratorSettings {
            max_wait: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
        };
        let orchestrator = Orchestrator::new(scans.clone(), store.clone(), settings, Some(monitor.clone()));

        create_router(AppState {
            service: Arc::new(AssessmentService::new(store, Arc::new(orchestrator))),
            monitor,
            scans,
            config: config::Config::from_env(),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send_raw(app, method, uri, body.map(|b| b.to_string())).await
    }

    async fn send_raw(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], constants::APP_VERSION);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_domain_with_json_400() {
        let body = json!({ "vendor_domain": "not a domain", "requester_email": "a@b.com" });
        let (status, body) = send(&app(), "POST", "/api/v1/assessments", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body["error"].as_str().unwrap().contains("vendor_domain"));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_email() {
        let body = json!({ "vendor_domain": "acme.com", "requester_email": "nope" });
        let (status, body) = send(&app(), "POST", "/api/v1/assessments", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("requester_email"));
    }

    #[tokio::test]
    async fn test_create_missing_field_is_json_400() {
        let body = json!({ "vendor_domain": "acme.com" });
        let (status, body) = send(&app(), "POST", "/api/v1/assessments", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body["error"].as_str().unwrap().contains("requester_email"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_400() {
        let raw = Some("{\"domain\": ".to_string());
        let (status, body) = send_raw(&app(), "POST", "/api/v1/scans/breach", raw).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);

        let raw = Some("not json".to_string());
        let (status, body) = send_raw(&app(), "POST", "/api/v1/assessments", raw).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_unknown_assessment_is_json_404() {
        let uri = format!("/api/v1/assessments/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app(), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);

        let (status, _) = send(&app(), "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_then_poll_to_completion() {
        let app = app();
        let body = json!({
            "vendor_domain": "example.com",
            "requester_email": "risk@buyer.com",
            "assessment_mode": "business_risk",
            "enable_continuous_monitoring": true,
        });
        let (status, created) = send(&app, "POST", "/api/v1/assessments", Some(body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let url = created["status_url"].as_str().unwrap().to_string();

        let mut snapshot = Value::Null;
        for _ in 0..500 {
            let (_, body) = send(&app, "GET", &url, None).await;
            if body["status"] != "in_progress" {
                snapshot = body;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(snapshot["status"], "completed");
        assert_eq!(snapshot["progress"], 100.0);
        assert_eq!(snapshot["results"]["overall_score"], 53.0);
        assert_eq!(snapshot["results"]["letter_grade"], "F");

        let (_, list) = send(&app, "GET", "/api/v1/assessments", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        // Enrolled for monitoring with an unknown breach baseline
        let (status, vendor) = send(&app, "GET", "/api/v1/monitoring/example.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(vendor["baseline_breach_count"].is_null());

        let (status, _) = send(&app, "DELETE", &url, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_single_scan_endpoint() {
        let body = json!({ "domain": "acme.com", "regulations": ["GDPR"] });
        let (status, report) = send(&app(), "POST", "/api/v1/scans/compliance", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["vendor_domain"], "acme.com");
        assert!(report["error"].is_string());
        assert_eq!(report["frameworks_requested"], json!(["GDPR"]));

        let (status, _) = send(&app(), "POST", "/api/v1/scans/nonsense", Some(json!({ "domain": "acme.com" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_monitoring_routes() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/v1/monitoring/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["vendor_count"], 0);
        assert_eq!(body["running"], false);

        let (status, body) = send(&app, "GET", "/api/v1/monitoring/alerts?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = send(&app, "DELETE", "/api/v1/monitoring/acme.com", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
