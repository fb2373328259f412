//! Headline Statistics
//!
//! Derives the four headline figures shown above the coin list from the
//! global market snapshot and the enriched (held) coins.
//!
//! # Portfolio change
//!
//! The 24h portfolio change is back-computed: each held coin's value 24h ago
//! is `value / (1 + change% / 100)`, summed across the portfolio, then
//! compared against the current total.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::format::format_currency_2dp;
use crate::domain::market::{Coin, MarketSnapshot};

/// Title of the market-cap statistic.
pub const MARKET_CAP_TITLE: &str = "Market Cap";
/// Title of the volume statistic.
pub const VOLUME_TITLE: &str = "24h Volume";
/// Title of the BTC-dominance statistic.
pub const BTC_DOMINANCE_TITLE: &str = "BTC Dominance";
/// Title of the portfolio-value statistic.
pub const PORTFOLIO_TITLE: &str = "Portfolio";

/// Portfolio value shown when the holdings total cannot be represented.
pub const PORTFOLIO_UNAVAILABLE: &str = "N/A";

/// One headline figure ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticItem {
    /// Label.
    pub title: String,
    /// Formatted value.
    pub value: String,
    /// Signed percent change, `None` when not applicable.
    pub percent_change: Option<Decimal>,
}

impl StatisticItem {
    /// Create a statistic.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        value: impl Into<String>,
        percent_change: Option<Decimal>,
    ) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            percent_change,
        }
    }
}

/// Aggregate value figures for the held coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortfolioSummary {
    /// Current value of all holdings.
    pub current_value: Decimal,
    /// Estimated value of the same holdings 24h ago.
    pub previous_value: Decimal,
    /// Change between the two, in percent. Zero when there is no prior value.
    pub percent_change: Decimal,
}

impl PortfolioSummary {
    /// Summarize the enriched coins.
    ///
    /// Returns `None` if any value, total, or the change figure overflows.
    #[must_use]
    pub fn from_coins(coins: &[Coin]) -> Option<Self> {
        let mut current_value = Decimal::ZERO;
        let mut previous_value = Decimal::ZERO;

        for coin in coins {
            let value = coin.current_holdings_value()?;
            current_value = current_value.checked_add(value)?;
            previous_value = previous_value.checked_add(previous_holdings_value(coin, value))?;
        }

        Some(Self {
            current_value,
            previous_value,
            percent_change: percent_change(current_value, previous_value)?,
        })
    }
}

/// Value of a coin's holdings 24h ago, implied by its price change.
///
/// Falls back to the current `value` when the coin has no change figure, or
/// when the implied division cannot be done: a change of exactly -100% (zero
/// divisor) or one so close to it that the quotient overflows.
fn previous_holdings_value(coin: &Coin, value: Decimal) -> Decimal {
    let change = coin.price_change_percentage_24h.unwrap_or(Decimal::ZERO);

    change
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|ratio| Decimal::ONE.checked_add(ratio))
        .and_then(|divisor| value.checked_div(divisor))
        .unwrap_or(value)
}

fn percent_change(current: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return Some(Decimal::ZERO);
    }

    current
        .checked_sub(previous)?
        .checked_div(previous)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Build the headline statistics.
///
/// Without a snapshot nothing is emitted; with one, exactly four items in
/// fixed order: market cap, volume, BTC dominance, portfolio. A portfolio
/// total too large for a `Decimal` is shown as [`PORTFOLIO_UNAVAILABLE`]
/// with no change figure.
#[must_use]
pub fn compute_statistics(snapshot: Option<&MarketSnapshot>, portfolio: &[Coin]) -> Vec<StatisticItem> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };

    let portfolio_item = PortfolioSummary::from_coins(portfolio).map_or_else(
        || StatisticItem::new(PORTFOLIO_TITLE, PORTFOLIO_UNAVAILABLE, None),
        |summary| {
            StatisticItem::new(
                PORTFOLIO_TITLE,
                format_currency_2dp(summary.current_value),
                Some(summary.percent_change),
            )
        },
    );

    vec![
        StatisticItem::new(
            MARKET_CAP_TITLE,
            snapshot.market_cap.clone(),
            Some(snapshot.market_cap_change_percentage_24h),
        ),
        StatisticItem::new(VOLUME_TITLE, snapshot.volume.clone(), None),
        StatisticItem::new(BTC_DOMINANCE_TITLE, snapshot.btc_dominance.clone(), None),
        portfolio_item,
    ]
}
