//! Eviction Agent - node-local pressure eviction daemon
//!
//! This binary runs as a DaemonSet on each Kubernetes node, watching the
//! node's stats summary for memory and filesystem pressure, gating pod
//! admission, and surfacing eviction decisions.

use agent_lib::{
    clock::SystemClock,
    events::{ObjectReference, TracingRecorder},
    eviction::{ActivePodsFunc, EvictionLoopBuilder, ManagerBuilder},
    health::HealthTracker,
    observability::{AgentMetrics, StructuredLogger},
    registry::PodRegistry,
    stats::HttpSummaryProvider,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod providers;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting eviction-agent");

    // Load configuration; invalid eviction flags are a startup error
    let config = config::AgentConfig::load()?;
    let eviction_config = config
        .eviction_config()
        .context("Invalid eviction configuration")?;
    info!(
        node_name = %config.node_name,
        thresholds = eviction_config.thresholds.len(),
        "Agent configured"
    );

    // Initialize health tracking
    let health = HealthTracker::new();

    // Initialize metrics and structured logging
    let metrics = AgentMetrics::new();
    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(AGENT_VERSION, eviction_config.thresholds.len());

    // Active pod set, fed through the API by the hosting system
    let pods = Arc::new(PodRegistry::new(&config.node_name));

    // Build the eviction manager with its collaborators
    let summary_provider = Arc::new(
        HttpSummaryProvider::new(&config.summary_endpoint)
            .context("Invalid summary endpoint")?,
    );
    let manager = Arc::new(
        ManagerBuilder::new(eviction_config)
            .clock(Arc::new(SystemClock))
            .summary_provider(summary_provider)
            .pod_killer(Arc::new(providers::LogPodKiller))
            .recorder(Arc::new(TracingRecorder))
            .node_ref(ObjectReference::node(&config.node_name))
            .metrics(metrics.clone())
            .build()?,
    );

    // Create shared application state and start the API server
    let app_state = Arc::new(api::AppState::new(
        health.clone(),
        metrics.clone(),
        manager.clone(),
        pods.clone(),
    ));
    health.set_initialized().await;
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Start the eviction control loop
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let active_pods: ActivePodsFunc = {
        let pods = pods.clone();
        Arc::new(move || pods.list())
    };
    let eviction_loop = EvictionLoopBuilder::new()
        .manager(manager)
        .disk_info(Arc::new(providers::StaticDiskInfoProvider {
            dedicated_image_fs: config.dedicated_image_fs,
        }))
        .active_pods(active_pods)
        .health(health.clone())
        .metrics(metrics.clone())
        .interval(Duration::from_secs(config.sync_interval_secs))
        .build()?;
    let loop_handle = tokio::spawn(eviction_loop.run(shutdown_rx));

    // Wait for shutdown signal; the loop finishes its cycle before exiting
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());
    let _ = loop_handle.await;
    api_handle.abort();

    Ok(())
}
