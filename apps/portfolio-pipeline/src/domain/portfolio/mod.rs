//! Holdings and Enrichment
//!
//! Joins the visible coin list against the user's holdings.
//!
//! Output order follows the holdings collection, not the coin ranking: the
//! first holding that matches a visible coin comes first.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market::{Coin, CoinId};

/// A user-held quantity of one coin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Coin this holding refers to.
    pub coin_id: CoinId,
    /// Quantity held.
    pub amount: Decimal,
}

impl Holding {
    /// Create a holding.
    #[must_use]
    pub fn new(coin_id: impl Into<CoinId>, amount: Decimal) -> Self {
        Self {
            coin_id: coin_id.into(),
            amount,
        }
    }
}

/// Annotate every visible coin the user holds with its quantity.
///
/// Coins without a holding are dropped, as are holdings whose coin is not in
/// `coins`. A coin id repeated in `holdings` is only emitted once, using the
/// first occurrence.
#[must_use]
pub fn enrich_holdings(coins: &[Coin], holdings: &[Holding]) -> Vec<Coin> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(holdings.len());

    holdings
        .iter()
        .filter(|h| seen.insert(h.coin_id.as_str()))
        .filter_map(|holding| {
            coins
                .iter()
                .find(|coin| coin.id == holding.coin_id)
                .map(|coin| coin.with_holdings(holding.amount))
        })
        .collect()
}

/// Held coins first, then every other visible coin, each in its own order.
#[must_use]
pub fn personalized_list(portfolio: &[Coin], coins: &[Coin]) -> Vec<Coin> {
    let held: HashSet<&str> = portfolio.iter().map(|c| c.id.as_str()).collect();

    portfolio
        .iter()
        .cloned()
        .chain(coins.iter().filter(|c| !held.contains(c.id.as_str())).cloned())
        .collect()
}
