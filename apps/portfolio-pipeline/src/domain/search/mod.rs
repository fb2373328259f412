//! Coin Search Filter
//!
//! Case-insensitive substring matching of free text against a coin's name,
//! ticker symbol, and identifier.

use crate::domain::market::Coin;

/// Normalized search text: trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    needle: String,
}

impl SearchQuery {
    /// Normalize raw user input.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self {
            needle: raw.trim().to_lowercase(),
        }
    }

    /// Whether the query matches everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    /// The normalized needle.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.needle
    }

    /// Whether `coin` matches on name, symbol, or id.
    #[must_use]
    pub fn matches(&self, coin: &Coin) -> bool {
        self.is_empty()
            || [&coin.name, &coin.symbol, &coin.id]
                .iter()
                .any(|field| field.to_lowercase().contains(&self.needle))
    }
}

/// Filter `coins` by `text`, preserving input order.
///
/// Blank text (after trimming) returns the input unchanged.
#[must_use]
pub fn filter_coins(coins: &[Coin], text: &str) -> Vec<Coin> {
    let query = SearchQuery::new(text);
    if query.is_empty() {
        return coins.to_vec();
    }

    coins.iter().filter(|c| query.matches(c)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn coins() -> Vec<Coin> {
        vec![
            Coin::new("bitcoin", "Bitcoin", "BTC", Decimal::from(50_000)),
            Coin::new("ethereum", "Ethereum", "ETH", Decimal::from(3000)),
            Coin::new("tether", "Tether", "USDT", Decimal::ONE),
        ]
    }

    fn ids(list: &[Coin]) -> Vec<&str> {
        list.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn empty_text_returns_input() {
        let input = coins();
        assert_eq!(filter_coins(&input, ""), input);
        assert_eq!(filter_coins(&input, "   "), input);
    }

    #[test]
    fn matches_symbol_case_insensitively() {
        assert_eq!(ids(&filter_coins(&coins(), "eth")), vec!["ethereum"]);
        assert_eq!(ids(&filter_coins(&coins(), "  ETH ")), vec!["ethereum"]);
    }

    #[test]
    fn matches_across_fields_and_keeps_order() {
        // "t" hits bitcoin (name), ethereum (name), tether (all)
        assert_eq!(
            ids(&filter_coins(&coins(), "t")),
            vec!["bitcoin", "ethereum", "tether"]
        );
        assert_eq!(ids(&filter_coins(&coins(), "usd")), vec!["tether"]);
    }

    #[test]
    fn no_match_yields_empty() {
        assert!(filter_coins(&coins(), "doge").is_empty());
        assert!(filter_coins(&[], "btc").is_empty());
    }

    #[test]
    fn query_normalizes_input() {
        let query = SearchQuery::new("  BiT ");
        assert_eq!(query.as_str(), "bit");
        assert!(!query.is_empty());
        assert!(SearchQuery::new("\t ").is_empty());
    }
}
