//! Aggregation Pipeline
//!
//! Combines the coin list, search text, holdings, and market snapshot into
//! the derived view state the presentation layer renders.
//!
//! # Stages
//!
//! ```text
//! coins ─┐
//!        ├─(debounce)─► filter ─┐
//! search ┘                      ├─► enrich ─┐
//!                   holdings ───┘           ├─► statistics
//!                          market snapshot ─┘
//! ```
//!
//! Every stage runs on one task, so outputs are never observed half-updated.
//! Each stage recomputes its full output from the latest inputs; nothing is
//! patched incrementally. Only the filter stage is debounced: a coin-list or
//! search change re-arms the quiescence timer and the filter runs once the
//! inputs have been quiet for the whole window.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use super::reload::{Feed, ReloadTracker};
use crate::application::ports::{
    CoinDataSource, HoldingsError, HoldingsStore, MarketDataSource, RefreshNotifier,
};
use crate::domain::market::{Coin, MarketSnapshot};
use crate::domain::portfolio::{Holding, enrich_holdings, personalized_list};
use crate::domain::search::filter_coins;
use crate::domain::statistics::{
    PORTFOLIO_TITLE, PORTFOLIO_UNAVAILABLE, StatisticItem, compute_statistics,
};
use crate::infrastructure::metrics::{self, Stage};

// =============================================================================
// Settings
// =============================================================================

/// Default search debounce window.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(600);

/// Tunables for the pipeline loop.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Quiescence window before the filter stage runs.
    pub search_debounce: Duration,
    /// How long a reload waits on a feed before giving up (`None` = forever).
    pub reload_timeout: Option<Duration>,
    /// Capacity of the command channel from handles to the loop.
    pub command_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            reload_timeout: Some(Duration::from_secs(30)),
            command_capacity: 64,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors returned through a [`PipelineHandle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The pipeline task is no longer running.
    #[error("pipeline is not running")]
    Closed,

    /// The holdings store rejected an update.
    #[error(transparent)]
    Holdings(#[from] HoldingsError),
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug)]
enum Command {
    UpdateHolding {
        coin_id: String,
        amount: Decimal,
        reply: oneshot::Sender<Result<(), HoldingsError>>,
    },
    Reload {
        reply: oneshot::Sender<()>,
    },
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable access to a running pipeline: observe outputs, push inputs.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    search_tx: Arc<watch::Sender<String>>,
    commands: mpsc::Sender<Command>,
    filtered: watch::Receiver<Vec<Coin>>,
    portfolio: watch::Receiver<Vec<Coin>>,
    statistics: watch::Receiver<Vec<StatisticItem>>,
    reloading: watch::Receiver<bool>,
}

impl PipelineHandle {
    /// Replace the search text. The filter reruns after the debounce window.
    pub fn set_search_text(&self, text: impl Into<String>) {
        self.search_tx.send_replace(text.into());
    }

    /// Current search text.
    #[must_use]
    pub fn search_text(&self) -> String {
        self.search_tx.borrow().clone()
    }

    /// Set the held amount for a coin; zero or below removes the holding.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Closed` if the pipeline has stopped, or
    /// `PipelineError::Holdings` if the store rejected the write.
    pub async fn update_holding(
        &self,
        coin_id: impl Into<String>,
        amount: Decimal,
    ) -> Result<(), PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::UpdateHolding {
                coin_id: coin_id.into(),
                amount,
                reply,
            })
            .await
            .map_err(|_| PipelineError::Closed)?;

        rx.await.map_err(|_| PipelineError::Closed)?.map_err(Into::into)
    }

    /// Trigger a manual refresh of both sources.
    ///
    /// Resolves once the reload is registered; the reloading flag is already
    /// raised by then.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Closed` if the pipeline has stopped.
    pub async fn reload(&self) -> Result<(), PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Reload { reply })
            .await
            .map_err(|_| PipelineError::Closed)?;

        rx.await.map_err(|_| PipelineError::Closed)
    }

    /// Subscribe to the search-filtered coin list.
    #[must_use]
    pub fn filtered_coins(&self) -> watch::Receiver<Vec<Coin>> {
        self.filtered.clone()
    }

    /// Subscribe to the held coins, annotated with quantities.
    #[must_use]
    pub fn portfolio_coins(&self) -> watch::Receiver<Vec<Coin>> {
        self.portfolio.clone()
    }

    /// Subscribe to the headline statistics.
    #[must_use]
    pub fn statistics(&self) -> watch::Receiver<Vec<StatisticItem>> {
        self.statistics.clone()
    }

    /// Subscribe to the reloading flag.
    #[must_use]
    pub fn reloading(&self) -> watch::Receiver<bool> {
        self.reloading.clone()
    }

    /// Statistics as a `Stream`, starting with the current value.
    #[must_use]
    pub fn statistics_stream(&self) -> WatchStream<Vec<StatisticItem>> {
        WatchStream::new(self.statistics.clone())
    }

    /// Whether the pipeline task is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Held coins first, then every other visible coin.
    #[must_use]
    pub fn personalized_coins(&self) -> Vec<Coin> {
        personalized_list(&self.portfolio.borrow(), &self.filtered.borrow())
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// The aggregation pipeline, ready to be spawned.
pub struct AggregationPipeline {
    settings: PipelineSettings,
    coin_source: Arc<dyn CoinDataSource>,
    market_source: Arc<dyn MarketDataSource>,
    holdings_store: Arc<dyn HoldingsStore>,
    notifier: Arc<dyn RefreshNotifier>,
}

impl AggregationPipeline {
    /// Wire the pipeline to its collaborators.
    #[must_use]
    pub fn new(
        settings: PipelineSettings,
        coin_source: Arc<dyn CoinDataSource>,
        market_source: Arc<dyn MarketDataSource>,
        holdings_store: Arc<dyn HoldingsStore>,
        notifier: Arc<dyn RefreshNotifier>,
    ) -> Self {
        Self {
            settings,
            coin_source,
            market_source,
            holdings_store,
            notifier,
        }
    }

    /// Start the pipeline task.
    ///
    /// The task stops when `cancel` fires or every handle has been dropped.
    #[must_use]
    pub fn spawn(self, cancel: CancellationToken) -> (PipelineHandle, JoinHandle<()>) {
        let (search_tx, search_rx) = watch::channel(String::new());
        let (command_tx, command_rx) = mpsc::channel(self.settings.command_capacity.max(1));
        let (filtered_tx, filtered_rx) = watch::channel(Vec::new());
        let (portfolio_tx, portfolio_rx) = watch::channel(Vec::new());
        let (statistics_tx, statistics_rx) = watch::channel(Vec::new());
        let (reloading_tx, reloading_rx) = watch::channel(false);

        let inputs = Inputs {
            coins: self.coin_source.subscribe(),
            market: self.market_source.subscribe(),
            holdings: self.holdings_store.subscribe(),
            search: search_rx,
            commands: command_rx,
        };

        let outputs = Outputs {
            filtered: filtered_tx,
            portfolio: portfolio_tx,
            statistics: statistics_tx,
            reloading: reloading_tx,
        };

        let state = PipelineLoop {
            reload: ReloadTracker::new(self.settings.reload_timeout),
            settings: self.settings,
            coin_source: self.coin_source,
            market_source: self.market_source,
            holdings_store: self.holdings_store,
            notifier: self.notifier,
            outputs,
            coins: Vec::new(),
            snapshot: None,
            holdings: Vec::new(),
        };

        let task = tokio::spawn(state.run(inputs, cancel));

        let handle = PipelineHandle {
            search_tx: Arc::new(search_tx),
            commands: command_tx,
            filtered: filtered_rx,
            portfolio: portfolio_rx,
            statistics: statistics_rx,
            reloading: reloading_rx,
        };

        (handle, task)
    }
}

impl std::fmt::Debug for AggregationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationPipeline")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Loop
// =============================================================================

struct Inputs {
    coins: watch::Receiver<Vec<Coin>>,
    market: watch::Receiver<Option<MarketSnapshot>>,
    holdings: watch::Receiver<Vec<Holding>>,
    search: watch::Receiver<String>,
    commands: mpsc::Receiver<Command>,
}

struct Outputs {
    filtered: watch::Sender<Vec<Coin>>,
    portfolio: watch::Sender<Vec<Coin>>,
    statistics: watch::Sender<Vec<StatisticItem>>,
    reloading: watch::Sender<bool>,
}

struct PipelineLoop {
    settings: PipelineSettings,
    coin_source: Arc<dyn CoinDataSource>,
    market_source: Arc<dyn MarketDataSource>,
    holdings_store: Arc<dyn HoldingsStore>,
    notifier: Arc<dyn RefreshNotifier>,
    outputs: Outputs,
    reload: ReloadTracker,
    coins: Vec<Coin>,
    snapshot: Option<MarketSnapshot>,
    holdings: Vec<Holding>,
}

impl PipelineLoop {
    #[allow(clippy::too_many_lines)]
    async fn run(mut self, mut inputs: Inputs, cancel: CancellationToken) {
        self.coins = inputs.coins.borrow_and_update().clone();
        self.snapshot = inputs.market.borrow_and_update().clone();
        self.holdings = inputs.holdings.borrow_and_update().clone();

        // Stats depend only on the (still empty) portfolio and the snapshot,
        // so they can go out before the first filter pass.
        self.recompute_statistics();

        let debounce = time::sleep(self.settings.search_debounce);
        tokio::pin!(debounce);
        let mut filter_pending = true;

        let expiry = time::sleep(Duration::ZERO);
        tokio::pin!(expiry);

        let mut coins_open = true;
        let mut market_open = true;
        let mut holdings_open = true;
        let mut search_open = true;

        tracing::info!(
            debounce = ?self.settings.search_debounce,
            coins = self.coins.len(),
            holdings = self.holdings.len(),
            has_snapshot = self.snapshot.is_some(),
            "Aggregation pipeline started"
        );

        loop {
            let expiry_deadline = self.reload.next_deadline();
            if let Some(deadline) = expiry_deadline {
                expiry.as_mut().reset(deadline);
            }

            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::info!("Aggregation pipeline cancelled");
                    break;
                }

                command = inputs.commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("All pipeline handles dropped");
                        break;
                    };
                    self.handle_command(command).await;
                }

                changed = inputs.coins.changed(), if coins_open => {
                    if changed.is_err() {
                        tracing::warn!("Coin source closed; keeping last coin list");
                        coins_open = false;
                        continue;
                    }
                    self.coins = inputs.coins.borrow_and_update().clone();
                    tracing::debug!(coins = self.coins.len(), "Coin list updated");
                    self.delivered(Feed::Coins);
                    debounce.as_mut().reset(Instant::now() + self.settings.search_debounce);
                    filter_pending = true;
                }

                changed = inputs.search.changed(), if search_open => {
                    if changed.is_err() {
                        search_open = false;
                        continue;
                    }
                    debounce.as_mut().reset(Instant::now() + self.settings.search_debounce);
                    filter_pending = true;
                }

                changed = inputs.holdings.changed(), if holdings_open => {
                    if changed.is_err() {
                        tracing::warn!("Holdings store closed; keeping last holdings");
                        holdings_open = false;
                        continue;
                    }
                    self.holdings = inputs.holdings.borrow_and_update().clone();
                    tracing::debug!(holdings = self.holdings.len(), "Holdings updated");
                    self.recompute_portfolio();
                    self.recompute_statistics();
                }

                changed = inputs.market.changed(), if market_open => {
                    if changed.is_err() {
                        tracing::warn!("Market source closed; keeping last snapshot");
                        market_open = false;
                        continue;
                    }
                    self.snapshot = inputs.market.borrow_and_update().clone();
                    tracing::debug!(has_snapshot = self.snapshot.is_some(), "Market snapshot updated");
                    self.delivered(Feed::Market);
                    self.recompute_statistics();
                }

                () = &mut debounce, if filter_pending => {
                    filter_pending = false;
                    let text = inputs.search.borrow().clone();
                    self.recompute_filtered(&text);
                    self.recompute_portfolio();
                    self.recompute_statistics();
                }

                () = &mut expiry, if expiry_deadline.is_some() => {
                    for feed in self.reload.expire(Instant::now()) {
                        tracing::warn!(feed = feed.as_str(), "Reload timed out waiting for fresh data");
                        metrics::record_reload_expired(feed.as_str());
                    }
                    self.publish_reloading();
                }
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::UpdateHolding {
                coin_id,
                amount,
                reply,
            } => {
                let result = self.holdings_store.upsert(&coin_id, amount).await;
                match &result {
                    Ok(()) => tracing::info!(coin_id = %coin_id, amount = %amount, "Holding updated"),
                    Err(e) => tracing::warn!(coin_id = %coin_id, error = %e, "Holding update rejected"),
                }
                metrics::record_holdings_upsert(result.is_ok());
                let _ = reply.send(result);
            }
            Command::Reload { reply } => {
                self.reload.trigger(Instant::now());
                self.publish_reloading();
                metrics::record_reload();

                let coin_source = Arc::clone(&self.coin_source);
                tokio::spawn(async move { coin_source.refresh().await });
                let market_source = Arc::clone(&self.market_source);
                tokio::spawn(async move { market_source.refresh().await });

                self.notifier.notify_success();
                tracing::info!("Reload requested");
                let _ = reply.send(());
            }
        }
    }

    fn delivered(&mut self, feed: Feed) {
        if self.reload.delivered(feed) {
            tracing::debug!(feed = feed.as_str(), "Reload satisfied for feed");
            self.publish_reloading();
        }
    }

    fn publish_reloading(&self) {
        let reloading = self.reload.is_reloading();
        metrics::set_reloading(reloading);
        self.outputs.reloading.send_if_modified(|current| {
            let changed = *current != reloading;
            *current = reloading;
            changed
        });
    }

    fn recompute_filtered(&self, text: &str) {
        let started = std::time::Instant::now();
        let filtered = filter_coins(&self.coins, text);
        metrics::record_recompute(Stage::Filter, filtered.len(), started.elapsed());
        tracing::debug!(search = text, visible = filtered.len(), "Filter recomputed");
        self.outputs.filtered.send_replace(filtered);
    }

    fn recompute_portfolio(&self) {
        let started = std::time::Instant::now();
        let portfolio = enrich_holdings(&self.outputs.filtered.borrow(), &self.holdings);
        metrics::record_recompute(Stage::Portfolio, portfolio.len(), started.elapsed());
        self.outputs.portfolio.send_replace(portfolio);
    }

    fn recompute_statistics(&self) {
        let started = std::time::Instant::now();
        let statistics =
            compute_statistics(self.snapshot.as_ref(), &self.outputs.portfolio.borrow());
        metrics::record_recompute(Stage::Statistics, statistics.len(), started.elapsed());
        if statistics
            .iter()
            .any(|item| item.title == PORTFOLIO_TITLE && item.value == PORTFOLIO_UNAVAILABLE)
        {
            tracing::warn!("Portfolio value out of range; statistic marked unavailable");
        }
        self.outputs.statistics.send_replace(statistics);
    }
}

// =============================================================================
// Tests
// =============================================================================
