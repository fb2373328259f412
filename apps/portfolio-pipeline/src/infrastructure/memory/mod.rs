//! In-Memory Adapters
//!
//! Process-local implementations of the pipeline ports. The holdings store is
//! what the binary runs with; the sources are handy for tests and demos where
//! values are pushed by hand.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::application::ports::{CoinDataSource, HoldingsError, HoldingsStore, MarketDataSource};
use crate::domain::market::{Coin, MarketSnapshot};
use crate::domain::portfolio::Holding;

// =============================================================================
// Holdings Store
// =============================================================================

/// Holdings kept in memory and published over a watch channel.
///
/// Updates preserve insertion order: replacing an amount keeps the holding in
/// place, a new coin is appended.
#[derive(Debug)]
pub struct InMemoryHoldingsStore {
    tx: watch::Sender<Vec<Holding>>,
}

impl InMemoryHoldingsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_holdings(Vec::new())
    }

    /// Create a store seeded with `holdings`.
    #[must_use]
    pub fn with_holdings(holdings: Vec<Holding>) -> Self {
        Self {
            tx: watch::Sender::new(holdings),
        }
    }

    /// Current holdings.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Holding> {
        self.tx.borrow().clone()
    }
}

impl Default for InMemoryHoldingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HoldingsStore for InMemoryHoldingsStore {
    fn subscribe(&self) -> watch::Receiver<Vec<Holding>> {
        self.tx.subscribe()
    }

    async fn upsert(&self, coin_id: &str, amount: Decimal) -> Result<(), HoldingsError> {
        let coin_id = coin_id.trim();
        if coin_id.is_empty() {
            return Err(HoldingsError::InvalidCoinId(coin_id.to_string()));
        }

        // read-modify-write happens under the channel's lock
        self.tx.send_if_modified(|holdings| {
            let position = holdings.iter().position(|h| h.coin_id == coin_id);
            match (position, amount > Decimal::ZERO) {
                (Some(i), true) => {
                    if holdings[i].amount == amount {
                        return false;
                    }
                    holdings[i].amount = amount;
                }
                (None, true) => holdings.push(Holding::new(coin_id, amount)),
                (Some(i), false) => {
                    holdings.remove(i);
                }
                (None, false) => return false,
            }
            true
        });

        Ok(())
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Coin source whose list is set by hand.
#[derive(Debug)]
pub struct InMemoryCoinSource {
    tx: watch::Sender<Vec<Coin>>,
}

impl InMemoryCoinSource {
    /// Create a source publishing `coins`.
    #[must_use]
    pub fn new(coins: Vec<Coin>) -> Self {
        Self {
            tx: watch::Sender::new(coins),
        }
    }

    /// Replace the coin list.
    pub fn publish(&self, coins: Vec<Coin>) {
        self.tx.send_replace(coins);
    }
}

#[async_trait]
impl CoinDataSource for InMemoryCoinSource {
    fn subscribe(&self) -> watch::Receiver<Vec<Coin>> {
        self.tx.subscribe()
    }

    /// Re-publishes the current list as a fresh delivery.
    async fn refresh(&self) {
        self.tx.send_modify(|_| {});
    }
}

/// Market source whose snapshot is set by hand.
#[derive(Debug)]
pub struct InMemoryMarketSource {
    tx: watch::Sender<Option<MarketSnapshot>>,
}

impl InMemoryMarketSource {
    /// Create a source publishing `snapshot`.
    #[must_use]
    pub fn new(snapshot: Option<MarketSnapshot>) -> Self {
        Self {
            tx: watch::Sender::new(snapshot),
        }
    }

    /// Replace the snapshot.
    pub fn publish(&self, snapshot: MarketSnapshot) {
        self.tx.send_replace(Some(snapshot));
    }
}

#[async_trait]
impl MarketDataSource for InMemoryMarketSource {
    fn subscribe(&self) -> watch::Receiver<Option<MarketSnapshot>> {
        self.tx.subscribe()
    }

    /// Re-publishes the current snapshot as a fresh delivery.
    async fn refresh(&self) {
        self.tx.send_modify(|_| {});
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ids_and_amounts(store: &InMemoryHoldingsStore) -> Vec<(String, Decimal)> {
        store
            .snapshot()
            .into_iter()
            .map(|h| (h.coin_id, h.amount))
            .collect()
    }

    #[tokio::test]
    async fn upsert_appends_new_and_replaces_in_place() {
        let store = InMemoryHoldingsStore::new();
        store.upsert("btc", Decimal::ONE).await.unwrap();
        store.upsert("eth", Decimal::from(2)).await.unwrap();
        store.upsert("btc", Decimal::from(3)).await.unwrap();

        assert_eq!(
            ids_and_amounts(&store),
            vec![
                ("btc".to_string(), Decimal::from(3)),
                ("eth".to_string(), Decimal::from(2)),
            ]
        );
    }

    #[tokio::test]
    async fn zero_or_negative_amount_deletes() {
        let store = InMemoryHoldingsStore::with_holdings(vec![
            Holding::new("btc", Decimal::ONE),
            Holding::new("eth", Decimal::ONE),
        ]);
        store.upsert("btc", Decimal::ZERO).await.unwrap();
        store.upsert("eth", Decimal::NEGATIVE_ONE).await.unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn deleting_missing_holding_does_not_notify() {
        let store = InMemoryHoldingsStore::new();
        let mut rx = store.subscribe();
        store.upsert("doge", Decimal::ZERO).await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn same_amount_does_not_notify() {
        let store = InMemoryHoldingsStore::with_holdings(vec![Holding::new("btc", Decimal::ONE)]);
        let mut rx = store.subscribe();
        store.upsert("btc", Decimal::ONE).await.unwrap();
        assert!(!rx.has_changed().unwrap());

        store.upsert("btc", Decimal::TWO).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()[0].amount, Decimal::TWO);
    }

    #[tokio::test]
    async fn blank_coin_id_is_rejected() {
        let store = InMemoryHoldingsStore::new();
        let err = store.upsert("   ", Decimal::ONE).await.unwrap_err();
        assert_eq!(err, HoldingsError::InvalidCoinId(String::new()));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn coin_source_refresh_counts_as_delivery() {
        let source = InMemoryCoinSource::new(Vec::new());
        let mut rx = source.subscribe();
        source.refresh().await;
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        source.publish(vec![Coin::new("btc", "Bitcoin", "BTC", Decimal::ONE)]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[tokio::test]
    async fn market_source_publishes_snapshots() {
        let source = InMemoryMarketSource::new(None);
        let mut rx = source.subscribe();
        assert!(rx.borrow().is_none());

        source.publish(MarketSnapshot {
            market_cap: "$1.00Tr".to_string(),
            volume: "$1.00Bn".to_string(),
            btc_dominance: "50.00%".to_string(),
            market_cap_change_percentage_24h: Decimal::ZERO,
        });
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_some());
    }
}
