#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Portfolio Pipeline - Reactive Portfolio Aggregation
//!
//! Derives the view state of a crypto portfolio screen from four inputs: the
//! ranked coin list, the global market snapshot, the user's holdings, and the
//! search text. Outputs are a filtered coin list, the held coins annotated
//! with quantities, four headline statistics, and a reloading flag.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure data types and stage functions
//!   - `market`: Coins and global market figures
//!   - `search`: Search-text filter
//!   - `portfolio`: Holdings join and the personalized list
//!   - `statistics`: Headline statistics and portfolio value change
//!   - `format`: Currency, abbreviation, and percent display strings
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Coin/market sources, holdings store, refresh notifier
//!   - `services`: Aggregation loop, reload tracking, periodic refresh
//!
//! - **Infrastructure**: Adapters and process plumbing
//!   - `memory`, `fixture`, `notify`: port implementations
//!   - `config`, `telemetry`, `metrics`, `health`: ambient services
//!
//! # Data Flow
//!
//! ```text
//! CoinDataSource ──┐
//!                  ├─► filter (debounced) ─┐
//! search text ─────┘                       ├─► enrich ─┐
//! HoldingsStore ───────────────────────────┘           ├─► statistics
//! MarketDataSource ────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Data types and pure stage functions.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::market::{Coin, CoinId, GlobalMarketData, GlobalMarketResponse, MarketSnapshot};
pub use domain::portfolio::Holding;
pub use domain::search::SearchQuery;
pub use domain::statistics::{PortfolioSummary, StatisticItem};

// Ports
pub use application::ports::{
    CoinDataSource, HoldingsError, HoldingsStore, MarketDataSource, RefreshNotifier,
};

// Pipeline
pub use application::services::{
    AggregationPipeline, Feed, PipelineError, PipelineHandle, PipelineSettings, ReloadTracker,
    spawn_periodic_refresh,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, PipelineConfig};

// Adapters
pub use infrastructure::fixture::{FixtureCoinSource, FixtureError, FixtureMarketSource};
pub use infrastructure::memory::{InMemoryCoinSource, InMemoryHoldingsStore, InMemoryMarketSource};
pub use infrastructure::notify::{CountingNotifier, LogNotifier};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
