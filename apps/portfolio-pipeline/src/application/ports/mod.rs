//! Port Interfaces
//!
//! Contracts for the collaborators around the aggregation pipeline, following
//! the Hexagonal Architecture pattern. Infrastructure adapters implement
//! these; the pipeline only ever sees the traits.
//!
//! ## Driven Ports (Outbound)
//!
//! - `CoinDataSource`: ranked coin list, refreshed on request
//! - `MarketDataSource`: global market snapshot, refreshed on request
//! - `HoldingsStore`: persisted user holdings, accepts upserts
//! - `RefreshNotifier`: user-facing cue after a manual reload
//!
//! Sources publish through `tokio::sync::watch` so every subscriber always
//! sees the latest snapshot. `refresh()` returns nothing: the result arrives
//! as a new value on the watch channel, or not at all if the fetch failed.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::domain::market::{Coin, MarketSnapshot};
use crate::domain::portfolio::Holding;

/// Provider of the ranked coin list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoinDataSource: Send + Sync {
    /// Subscribe to coin-list snapshots.
    fn subscribe(&self) -> watch::Receiver<Vec<Coin>>;

    /// Request a fresh coin list.
    async fn refresh(&self);
}

/// Provider of global market figures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Subscribe to market snapshots; `None` until the first successful fetch.
    fn subscribe(&self) -> watch::Receiver<Option<MarketSnapshot>>;

    /// Request a fresh snapshot.
    async fn refresh(&self);
}

/// Persisted user holdings, one per coin id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HoldingsStore: Send + Sync {
    /// Subscribe to the holdings collection.
    fn subscribe(&self) -> watch::Receiver<Vec<Holding>>;

    /// Create or replace the holding for `coin_id`.
    ///
    /// An `amount` of zero or below removes the holding.
    ///
    /// # Errors
    ///
    /// Returns `HoldingsError` if the coin id is invalid or the backing
    /// storage rejects the write.
    async fn upsert(&self, coin_id: &str, amount: Decimal) -> Result<(), HoldingsError>;
}

/// Presentation-side cue fired when a manual reload is triggered.
#[cfg_attr(test, mockall::automock)]
pub trait RefreshNotifier: Send + Sync {
    /// Signal that a reload was accepted.
    fn notify_success(&self);
}

/// Errors raised by a [`HoldingsStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HoldingsError {
    /// Coin id was empty or whitespace.
    #[error("invalid coin id: {0:?}")]
    InvalidCoinId(String),

    /// Backing storage failed.
    #[error("holdings storage error: {0}")]
    Storage(String),
}
