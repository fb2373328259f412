//! Periodic Refresh
//!
//! Asks both data sources for fresh snapshots on a fixed interval. This is
//! separate from a manual reload: it raises no reloading flag and fires no
//! user-facing cue.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{CoinDataSource, MarketDataSource};

/// Spawn the refresh loop. The first refresh happens immediately.
///
/// Returns `None` when `interval` is zero (periodic refresh disabled).
#[must_use]
pub fn spawn_periodic_refresh(
    interval: Duration,
    coin_source: Arc<dyn CoinDataSource>,
    market_source: Arc<dyn MarketDataSource>,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("Periodic refresh disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tracing::debug!("Periodic refresh");
                    tokio::join!(coin_source.refresh(), market_source.refresh());
                }
            }
        }

        tracing::info!("Periodic refresh stopped");
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockCoinDataSource, MockMarketDataSource};

    #[tokio::test]
    async fn zero_interval_disables() {
        let coins = Arc::new(MockCoinDataSource::new());
        let market = Arc::new(MockMarketDataSource::new());
        assert!(
            spawn_periodic_refresh(Duration::ZERO, coins, market, CancellationToken::new())
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_on_every_tick_until_cancelled() {
        let mut coins = MockCoinDataSource::new();
        coins.expect_refresh().times(3).returning(|| ());
        let mut market = MockMarketDataSource::new();
        market.expect_refresh().times(3).returning(|| ());

        let cancel = CancellationToken::new();
        let task = spawn_periodic_refresh(
            Duration::from_secs(60),
            Arc::new(coins),
            Arc::new(market),
            cancel.clone(),
        )
        .unwrap();

        // ticks at 0s, 60s, 120s
        time::sleep(Duration::from_secs(150)).await;
        cancel.cancel();
        task.await.unwrap();
    }
}
