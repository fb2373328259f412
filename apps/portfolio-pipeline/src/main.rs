//! Portfolio Pipeline Binary
//!
//! Runs the aggregation pipeline against JSON fixture sources and an
//! in-memory holdings store, logging every statistics update.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin portfolio-pipeline
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `PORTFOLIO_COINS_FIXTURE`: Path to a `/coins/markets` JSON array
//! - `PORTFOLIO_MARKET_FIXTURE`: Path to a `/global` JSON document
//!
//! ## Optional
//! - `PORTFOLIO_SEARCH_DEBOUNCE_MS`: Search quiescence window (default: 600)
//! - `PORTFOLIO_RELOAD_TIMEOUT_SECS`: Reload wait before giving up, 0 = never (default: 30)
//! - `PORTFOLIO_REFRESH_INTERVAL_SECS`: Periodic refresh, 0 = off (default: 60)
//! - `PORTFOLIO_COMMAND_CAPACITY`: Pipeline command queue size (default: 64)
//! - `PORTFOLIO_HEALTH_PORT`: Health check HTTP port (default: 8083)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: portfolio-pipeline)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use portfolio_pipeline::infrastructure::health::{HealthServer, HealthServerState};
use portfolio_pipeline::infrastructure::telemetry;
use portfolio_pipeline::{
    AggregationPipeline, CoinDataSource, FixtureCoinSource, FixtureMarketSource,
    InMemoryHoldingsStore, LogNotifier, MarketDataSource, PipelineConfig, PipelineHandle,
    init_metrics, spawn_periodic_refresh,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting portfolio pipeline");

    let _metrics_handle = init_metrics();

    let config = PipelineConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let coin_source = Arc::new(FixtureCoinSource::new(config.sources.coins_fixture.clone()));
    let market_source = Arc::new(FixtureMarketSource::new(
        config.sources.market_fixture.clone(),
    ));

    let pipeline = AggregationPipeline::new(
        config.pipeline_settings(),
        Arc::clone(&coin_source) as Arc<dyn CoinDataSource>,
        Arc::clone(&market_source) as Arc<dyn MarketDataSource>,
        Arc::new(InMemoryHoldingsStore::new()),
        Arc::new(LogNotifier),
    );
    let (handle, pipeline_task) = pipeline.spawn(shutdown_token.clone());

    // Initial load. With periodic refresh on, the first tick does this instead.
    if config.timing.refresh_interval.is_zero() {
        tokio::join!(coin_source.refresh(), market_source.refresh());
    }
    let refresh_task = spawn_periodic_refresh(
        config.timing.refresh_interval,
        coin_source,
        market_source,
        shutdown_token.clone(),
    );

    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        handle.clone(),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    tokio::spawn(log_statistics(handle, shutdown_token.clone()));

    tracing::info!("Portfolio pipeline ready");

    await_shutdown(shutdown_token).await;

    let drain = async {
        let _ = pipeline_task.await;
        if let Some(task) = refresh_task {
            let _ = task.await;
        }
    };
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
        tracing::warn!("Shutdown timed out waiting for background tasks");
    }

    tracing::info!("Portfolio pipeline stopped");
    Ok(())
}

/// Log every statistics update until shutdown.
async fn log_statistics(handle: PipelineHandle, cancel: CancellationToken) {
    let mut updates = handle.statistics_stream();
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            next = updates.next() => {
                let Some(statistics) = next else { break };
                for item in &statistics {
                    tracing::info!(
                        title = %item.title,
                        value = %item.value,
                        percent_change = ?item.percent_change,
                        "Statistic"
                    );
                }
                tracing::info!(
                    visible = handle.filtered_coins().borrow().len(),
                    held = handle.portfolio_coins().borrow().len(),
                    "Statistics updated"
                );
            }
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &PipelineConfig) {
    tracing::info!(
        coins_fixture = %config.sources.coins_fixture.display(),
        market_fixture = %config.sources.market_fixture.display(),
        search_debounce = ?config.timing.search_debounce,
        reload_timeout = ?config.timing.reload_timeout,
        refresh_interval = ?config.timing.refresh_interval,
        health_port = config.server.health_port,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
