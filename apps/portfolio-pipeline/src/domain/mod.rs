//! Domain Layer - Core market and portfolio types.
//!
//! Pure data types and the stage functions of the aggregation pipeline.
//! Nothing in this layer performs I/O or depends on the async runtime.

/// Display formatting for currency, abbreviations, and percentages.
pub mod format;

/// Coin records and global market figures.
pub mod market;

/// Holdings and the enrichment join.
pub mod portfolio;

/// Search-text filtering of the coin list.
pub mod search;

/// Headline statistics derivation.
pub mod statistics;
