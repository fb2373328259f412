//! Pipeline Flow Integration Tests
//!
//! Drives the aggregation pipeline through in-memory adapters with the tokio
//! clock paused, checking the derived outputs and the debounce timing.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use portfolio_pipeline::domain::statistics::{
    BTC_DOMINANCE_TITLE, MARKET_CAP_TITLE, PORTFOLIO_TITLE, PORTFOLIO_UNAVAILABLE, VOLUME_TITLE,
};
use portfolio_pipeline::{
    AggregationPipeline, Coin, CountingNotifier, Holding, InMemoryCoinSource,
    InMemoryHoldingsStore, InMemoryMarketSource, MarketSnapshot, PipelineHandle, PipelineSettings,
};

const DEBOUNCE: Duration = Duration::from_millis(600);

struct Harness {
    handle: PipelineHandle,
    coins: Arc<InMemoryCoinSource>,
    market: Arc<InMemoryMarketSource>,
    cancel: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn coins() -> Vec<Coin> {
    vec![
        Coin::new("btc", "Bitcoin", "BTC", Decimal::from(50_000)).with_rank(1),
        Coin::new("eth", "Ethereum", "ETH", Decimal::from(3000)).with_rank(2),
        Coin::new("usdt", "Tether", "USDT", Decimal::ONE).with_rank(3),
    ]
}

fn snapshot() -> MarketSnapshot {
    MarketSnapshot {
        market_cap: "$2.50Tr".to_string(),
        volume: "$95.00Bn".to_string(),
        btc_dominance: "52.10%".to_string(),
        market_cap_change_percentage_24h: Decimal::new(125, 2),
    }
}

fn start(
    coins: Vec<Coin>,
    snapshot: Option<MarketSnapshot>,
    holdings: Vec<Holding>,
) -> Harness {
    let coin_source = Arc::new(InMemoryCoinSource::new(coins));
    let market_source = Arc::new(InMemoryMarketSource::new(snapshot));
    let cancel = CancellationToken::new();

    let (handle, _task) = AggregationPipeline::new(
        PipelineSettings::default(),
        Arc::clone(&coin_source) as _,
        Arc::clone(&market_source) as _,
        Arc::new(InMemoryHoldingsStore::with_holdings(holdings)),
        Arc::new(CountingNotifier::new()),
    )
    .spawn(cancel.clone());

    Harness {
        handle,
        coins: coin_source,
        market: market_source,
        cancel,
    }
}

fn ids(list: &[Coin]) -> Vec<String> {
    list.iter().map(|c| c.id.clone()).collect()
}

#[tokio::test(start_paused = true)]
async fn search_and_holding_flow_to_statistics() {
    let h = start(coins(), Some(snapshot()), Vec::new());

    h.handle.set_search_text("ethereum");
    h.handle.update_holding("eth", Decimal::from(2)).await.unwrap();
    sleep(DEBOUNCE + Duration::from_millis(50)).await;

    assert_eq!(ids(&h.handle.filtered_coins().borrow()), vec!["eth"]);

    let portfolio = h.handle.portfolio_coins().borrow().clone();
    assert_eq!(ids(&portfolio), vec!["eth"]);
    assert_eq!(portfolio[0].current_holdings, Decimal::from(2));

    let stats = h.handle.statistics().borrow().clone();
    let titles: Vec<&str> = stats.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![MARKET_CAP_TITLE, VOLUME_TITLE, BTC_DOMINANCE_TITLE, PORTFOLIO_TITLE]
    );
    assert_eq!(stats[0].value, "$2.50Tr");
    assert_eq!(stats[0].percent_change, Some(Decimal::new(125, 2)));
    assert_eq!(stats[1].percent_change, None);
    assert_eq!(stats[3].value, "$6,000.00");
    assert_eq!(stats[3].percent_change, Some(Decimal::ZERO));
}

#[tokio::test(start_paused = true)]
async fn debounce_collapses_rapid_search_updates() {
    let h = start(coins(), None, Vec::new());
    let mut filtered = h.handle.filtered_coins();

    sleep(DEBOUNCE + Duration::from_millis(10)).await;
    assert_eq!(filtered.borrow_and_update().len(), 3);

    h.handle.set_search_text("bit");
    sleep(Duration::from_millis(300)).await;
    h.handle.set_search_text("Ethereum");

    sleep(DEBOUNCE - Duration::from_millis(1)).await;
    assert!(!filtered.has_changed().unwrap());

    sleep(Duration::from_millis(2)).await;
    assert!(filtered.has_changed().unwrap());
    assert_eq!(ids(&filtered.borrow_and_update()), vec!["eth"]);

    // only the final text was ever applied
    sleep(Duration::from_secs(2)).await;
    assert!(!filtered.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn coin_list_change_also_waits_for_debounce() {
    let h = start(coins(), None, Vec::new());
    let mut filtered = h.handle.filtered_coins();
    sleep(DEBOUNCE + Duration::from_millis(10)).await;
    filtered.borrow_and_update();

    h.coins.publish(coins().into_iter().take(1).collect());
    sleep(DEBOUNCE / 2).await;
    assert!(!filtered.has_changed().unwrap());

    sleep(DEBOUNCE).await;
    assert_eq!(ids(&filtered.borrow_and_update()), vec!["btc"]);
}

#[tokio::test(start_paused = true)]
async fn portfolio_follows_holdings_order() {
    let holdings = vec![
        Holding::new("usdt", Decimal::from(100)),
        Holding::new("btc", Decimal::ONE),
        Holding::new("unknown", Decimal::from(5)),
    ];
    let h = start(coins(), Some(snapshot()), holdings);
    sleep(DEBOUNCE + Duration::from_millis(10)).await;

    assert_eq!(ids(&h.handle.portfolio_coins().borrow()), vec!["usdt", "btc"]);
    assert_eq!(
        ids(&h.handle.personalized_coins()),
        vec!["usdt", "btc", "eth"]
    );
    assert_eq!(h.handle.statistics().borrow()[3].value, "$50,100.00");
}

#[tokio::test(start_paused = true)]
async fn search_hides_held_coins_from_portfolio() {
    let holdings = vec![Holding::new("btc", Decimal::ONE)];
    let h = start(coins(), Some(snapshot()), holdings);

    h.handle.set_search_text("ether");
    sleep(DEBOUNCE + Duration::from_millis(10)).await;

    assert!(h.handle.portfolio_coins().borrow().is_empty());
    assert_eq!(h.handle.statistics().borrow()[3].value, "$0.00");
}

#[tokio::test(start_paused = true)]
async fn removing_a_holding_updates_without_debounce() {
    let holdings = vec![Holding::new("eth", Decimal::from(2))];
    let h = start(coins(), Some(snapshot()), holdings);
    sleep(DEBOUNCE + Duration::from_millis(10)).await;
    assert_eq!(h.handle.portfolio_coins().borrow().len(), 1);

    let mut portfolio = h.handle.portfolio_coins();
    portfolio.borrow_and_update();
    h.handle.update_holding("eth", Decimal::ZERO).await.unwrap();

    portfolio.changed().await.unwrap();
    assert!(portfolio.borrow().is_empty());
}

#[tokio::test(start_paused = true)]
async fn statistics_wait_for_market_snapshot() {
    let h = start(coins(), None, Vec::new());
    sleep(DEBOUNCE + Duration::from_millis(10)).await;
    assert!(h.handle.statistics().borrow().is_empty());

    let mut stats = h.handle.statistics();
    h.market.publish(snapshot());
    stats.changed().await.unwrap();
    assert_eq!(stats.borrow().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn portfolio_change_uses_implied_previous_value() {
    let coins = vec![
        Coin::new("btc", "Bitcoin", "BTC", Decimal::from(110)).with_price_change(Decimal::from(10)),
    ];
    let holdings = vec![Holding::new("btc", Decimal::ONE)];
    let h = start(coins, Some(snapshot()), holdings);
    sleep(DEBOUNCE + Duration::from_millis(10)).await;

    let portfolio = h.handle.statistics().borrow()[3].clone();
    assert_eq!(portfolio.value, "$110.00");
    assert_eq!(portfolio.percent_change, Some(Decimal::from(10)));
}

#[tokio::test(start_paused = true)]
async fn oversized_holding_marks_portfolio_unavailable_and_keeps_running() {
    let h = start(coins(), Some(snapshot()), Vec::new());
    sleep(DEBOUNCE + Duration::from_millis(10)).await;

    h.handle.update_holding("btc", Decimal::MAX).await.unwrap();
    sleep(Duration::from_millis(10)).await;

    assert!(h.handle.is_running());
    let stats = h.handle.statistics().borrow().clone();
    assert_eq!(stats.len(), 4);
    assert_eq!(stats[0].value, "$2.50Tr");
    assert_eq!(stats[3].value, PORTFOLIO_UNAVAILABLE);
    assert_eq!(stats[3].percent_change, None);
    assert_eq!(h.handle.portfolio_coins().borrow()[0].current_holdings, Decimal::MAX);

    // still serving commands, and recovers once the amount is sane again
    h.handle.reload().await.unwrap();
    h.handle.update_holding("btc", Decimal::ONE).await.unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(h.handle.statistics().borrow()[3].value, "$50,000.00");
}
