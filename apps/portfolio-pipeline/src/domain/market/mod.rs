//! Market Data Types
//!
//! Canonical coin records and global market figures. Both are snapshots:
//! a source refresh replaces them wholesale, nothing here mutates in place.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::format::{format_abbreviated, format_percent};

// =============================================================================
// Coin
// =============================================================================

/// Unique coin identifier (e.g. `"bitcoin"`).
pub type CoinId = String;

/// A ranked coin with its current price and the user's held quantity.
///
/// Field names follow the CoinGecko `/coins/markets` payload so fixtures and
/// upstream responses deserialize directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Unique identifier.
    pub id: CoinId,
    /// Ticker symbol.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Current price in USD.
    pub current_price: Decimal,
    /// Market capitalisation in USD.
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    /// Rank by market capitalisation.
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    /// 24h price change in percent; absent until the first market-data load.
    #[serde(default)]
    pub price_change_percentage_24h: Option<Decimal>,
    /// Last upstream update.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Quantity held by the user. Only the enrichment stage sets this.
    #[serde(default)]
    pub current_holdings: Decimal,
}

impl Coin {
    /// Create a coin with the required fields and everything optional unset.
    #[must_use]
    pub fn new(
        id: impl Into<CoinId>,
        name: impl Into<String>,
        symbol: impl Into<String>,
        current_price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            current_price,
            market_cap: None,
            market_cap_rank: None,
            price_change_percentage_24h: None,
            last_updated: None,
            current_holdings: Decimal::ZERO,
        }
    }

    /// Set the 24h price change percentage.
    #[must_use]
    pub const fn with_price_change(mut self, percent: Decimal) -> Self {
        self.price_change_percentage_24h = Some(percent);
        self
    }

    /// Set the market-cap rank.
    #[must_use]
    pub const fn with_rank(mut self, rank: u32) -> Self {
        self.market_cap_rank = Some(rank);
        self
    }

    /// Return an annotated copy holding `amount` units.
    #[must_use]
    pub fn with_holdings(&self, amount: Decimal) -> Self {
        Self {
            current_holdings: amount,
            ..self.clone()
        }
    }

    /// Value of the held quantity at the current price.
    ///
    /// `None` when the product does not fit in a `Decimal`.
    #[must_use]
    pub fn current_holdings_value(&self) -> Option<Decimal> {
        self.current_price.checked_mul(self.current_holdings)
    }
}

// =============================================================================
// Market Snapshot
// =============================================================================

/// Headline global market figures, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Total market capitalisation.
    pub market_cap: String,
    /// Total 24h trading volume.
    pub volume: String,
    /// Bitcoin dominance.
    pub btc_dominance: String,
    /// 24h market-cap change in percent.
    pub market_cap_change_percentage_24h: Decimal,
}

/// Raw global market payload as served by CoinGecko's `/global` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMarketData {
    /// Total market cap keyed by currency code.
    #[serde(default)]
    pub total_market_cap: HashMap<String, Decimal>,
    /// Total volume keyed by currency code.
    #[serde(default)]
    pub total_volume: HashMap<String, Decimal>,
    /// Market-cap share keyed by coin symbol.
    #[serde(default)]
    pub market_cap_percentage: HashMap<String, Decimal>,
    /// 24h market-cap change in USD terms, percent.
    #[serde(default)]
    pub market_cap_change_percentage_24h_usd: Decimal,
}

/// Envelope around [`GlobalMarketData`] (`{"data": {...}}`).
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalMarketResponse {
    /// Payload.
    pub data: GlobalMarketData,
}

impl GlobalMarketData {
    /// Format the raw figures into a display snapshot.
    ///
    /// A missing currency or coin key yields an empty display string.
    #[must_use]
    pub fn to_snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            market_cap: self
                .total_market_cap
                .get("usd")
                .map(|v| format!("${}", format_abbreviated(*v)))
                .unwrap_or_default(),
            volume: self
                .total_volume
                .get("usd")
                .map(|v| format!("${}", format_abbreviated(*v)))
                .unwrap_or_default(),
            btc_dominance: self
                .market_cap_percentage
                .get("btc")
                .map(|v| format_percent(*v))
                .unwrap_or_default(),
            market_cap_change_percentage_24h: self.market_cap_change_percentage_24h_usd,
        }
    }
}
