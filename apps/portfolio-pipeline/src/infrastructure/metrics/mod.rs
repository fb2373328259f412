//! Prometheus Metrics Module
//!
//! Exposes pipeline metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Recomputations**: how often each derivation stage ran
//! - **Reloads**: manual refresh triggers and expired fetches
//! - **Holdings**: upsert outcomes
//! - **Sizes**: current lengths of the derived lists
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! before [`init_metrics`] is a no-op.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "portfolio_pipeline_recomputations_total",
        "Derived-state recomputations by stage"
    );
    describe_histogram!(
        "portfolio_pipeline_recompute_seconds",
        "Time spent recomputing a derivation stage"
    );

    describe_counter!(
        "portfolio_pipeline_reloads_total",
        "Manual reload triggers"
    );
    describe_counter!(
        "portfolio_pipeline_reload_expired_total",
        "Reload requests dropped after the timeout, by feed"
    );
    describe_gauge!(
        "portfolio_pipeline_reloading",
        "1 while a manual reload is outstanding"
    );

    describe_counter!(
        "portfolio_pipeline_holdings_upserts_total",
        "Holdings upserts by outcome"
    );

    describe_gauge!(
        "portfolio_pipeline_list_size",
        "Current length of each derived list"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Derivation stage label.
#[derive(Debug, Clone, Copy)]
pub enum Stage {
    /// Search filter.
    Filter,
    /// Holdings enrichment.
    Portfolio,
    /// Headline statistics.
    Statistics,
}

impl Stage {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Portfolio => "portfolio",
            Self::Statistics => "statistics",
        }
    }
}

/// Record one run of `stage` and the list length it produced.
pub fn record_recompute(stage: Stage, len: usize, duration: Duration) {
    counter!(
        "portfolio_pipeline_recomputations_total",
        "stage" => stage.as_str()
    )
    .increment(1);
    histogram!(
        "portfolio_pipeline_recompute_seconds",
        "stage" => stage.as_str()
    )
    .record(duration.as_secs_f64());
    #[allow(clippy::cast_precision_loss)]
    let len = len as f64;
    gauge!(
        "portfolio_pipeline_list_size",
        "stage" => stage.as_str()
    )
    .set(len);
}

/// Record a manual reload trigger.
pub fn record_reload() {
    counter!("portfolio_pipeline_reloads_total").increment(1);
}

/// Record a reload request that timed out waiting on `feed`.
pub fn record_reload_expired(feed: &'static str) {
    counter!(
        "portfolio_pipeline_reload_expired_total",
        "feed" => feed
    )
    .increment(1);
}

/// Update the reloading gauge.
pub fn set_reloading(reloading: bool) {
    gauge!("portfolio_pipeline_reloading").set(if reloading { 1.0 } else { 0.0 });
}

/// Record a holdings upsert outcome.
pub fn record_holdings_upsert(success: bool) {
    counter!(
        "portfolio_pipeline_holdings_upserts_total",
        "outcome" => if success { "ok" } else { "error" }
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_as_str() {
        assert_eq!(Stage::Filter.as_str(), "filter");
        assert_eq!(Stage::Portfolio.as_str(), "portfolio");
        assert_eq!(Stage::Statistics.as_str(), "statistics");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_recompute(Stage::Filter, 3, Duration::from_millis(1));
        record_reload();
        record_reload_expired("coins");
        set_reloading(true);
        record_holdings_upsert(false);
    }
}
