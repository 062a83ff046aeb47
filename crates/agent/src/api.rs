//! HTTP API for health checks, Prometheus metrics, and the admission gate

use agent_lib::{
    eviction::{Manager, PodAdmitAttributes},
    health::{HealthStatus, HealthTracker},
    models::Pod,
    observability::AgentMetrics,
    registry::PodRegistry,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health: HealthTracker,
    pub metrics: AgentMetrics,
    pub manager: Arc<Manager>,
    pub pods: Arc<PodRegistry>,
}

impl AppState {
    pub fn new(
        health: HealthTracker,
        metrics: AgentMetrics,
        manager: Arc<Manager>,
        pods: Arc<PodRegistry>,
    ) -> Self {
        Self {
            health,
            metrics,
            manager,
            pods,
        }
    }
}

/// Reported node pressure state
#[derive(Debug, Serialize)]
struct PressureResponse {
    memory_pressure: bool,
    disk_pressure: bool,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health.health().await;

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK, // Still operational
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Reported (dampened) pressure conditions
async fn pressure(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(PressureResponse {
        memory_pressure: state.manager.is_under_memory_pressure(),
        disk_pressure: state.manager.is_under_disk_pressure(),
    })
}

/// Admission gate: the pod lifecycle subsystem posts a candidate pod and
/// reads the decision from the body.
async fn admit(State(state): State<Arc<AppState>>, Json(pod): Json<Pod>) -> impl IntoResponse {
    let result = state.manager.admit(&PodAdmitAttributes { pod: &pod });
    Json(result)
}

/// Replace the active pod set
async fn put_pods(
    State(state): State<Arc<AppState>>,
    Json(pods): Json<Vec<Pod>>,
) -> impl IntoResponse {
    state.metrics.set_pods_tracked(pods.len() as i64);
    state.pods.replace_all(pods);
    StatusCode::NO_CONTENT
}

/// List the active pod set
async fn get_pods(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pods.list())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/pressure", get(pressure))
        .route("/admit", post(admit))
        .route("/pods", put(put_pods).get(get_pods))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
