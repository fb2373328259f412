//! Fixture-Backed Sources
//!
//! Coin and market sources that read JSON files on every refresh. The files
//! use the CoinGecko payload shapes: `/coins/markets` (an array of coins) and
//! `/global` (`{"data": {...}}`).
//!
//! A failed read or parse is logged and the previous value stays published,
//! so subscribers never see a failure as an empty list.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::application::ports::{CoinDataSource, MarketDataSource};
use crate::domain::market::{Coin, GlobalMarketResponse, MarketSnapshot};

/// Errors loading a fixture file.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// File could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Fixture path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// File contents did not match the expected shape.
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        /// Fixture path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FixtureError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| FixtureError::Json {
        path: path.to_path_buf(),
        source,
    })
}

// =============================================================================
// Coin Source
// =============================================================================

/// Coin list read from a JSON file.
#[derive(Debug)]
pub struct FixtureCoinSource {
    path: PathBuf,
    tx: watch::Sender<Vec<Coin>>,
    last_loaded: RwLock<Option<DateTime<Utc>>>,
}

impl FixtureCoinSource {
    /// Create a source for `path`. Nothing is published until the first refresh.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tx: watch::Sender::new(Vec::new()),
            last_loaded: RwLock::new(None),
        }
    }

    /// Read and parse the fixture without publishing it.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError` if the file is unreadable or malformed.
    pub async fn load(&self) -> Result<Vec<Coin>, FixtureError> {
        read_json(&self.path).await
    }

    /// Time of the last successful refresh.
    #[must_use]
    pub fn last_loaded(&self) -> Option<DateTime<Utc>> {
        *self.last_loaded.read()
    }
}

#[async_trait]
impl CoinDataSource for FixtureCoinSource {
    fn subscribe(&self) -> watch::Receiver<Vec<Coin>> {
        self.tx.subscribe()
    }

    async fn refresh(&self) {
        match self.load().await {
            Ok(coins) => {
                tracing::debug!(path = %self.path.display(), coins = coins.len(), "Coin fixture loaded");
                *self.last_loaded.write() = Some(Utc::now());
                self.tx.send_replace(coins);
            }
            Err(e) => tracing::warn!(error = %e, "Coin refresh failed; keeping previous list"),
        }
    }
}

// =============================================================================
// Market Source
// =============================================================================

/// Global market snapshot read from a JSON file.
#[derive(Debug)]
pub struct FixtureMarketSource {
    path: PathBuf,
    tx: watch::Sender<Option<MarketSnapshot>>,
    last_loaded: RwLock<Option<DateTime<Utc>>>,
}

impl FixtureMarketSource {
    /// Create a source for `path`. The snapshot is `None` until the first refresh.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tx: watch::Sender::new(None),
            last_loaded: RwLock::new(None),
        }
    }

    /// Read the fixture and convert it to a display snapshot.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError` if the file is unreadable or malformed.
    pub async fn load(&self) -> Result<MarketSnapshot, FixtureError> {
        let response: GlobalMarketResponse = read_json(&self.path).await?;
        Ok(response.data.to_snapshot())
    }

    /// Time of the last successful refresh.
    #[must_use]
    pub fn last_loaded(&self) -> Option<DateTime<Utc>> {
        *self.last_loaded.read()
    }
}

#[async_trait]
impl MarketDataSource for FixtureMarketSource {
    fn subscribe(&self) -> watch::Receiver<Option<MarketSnapshot>> {
        self.tx.subscribe()
    }

    async fn refresh(&self) {
        match self.load().await {
            Ok(snapshot) => {
                tracing::debug!(path = %self.path.display(), market_cap = %snapshot.market_cap, "Market fixture loaded");
                *self.last_loaded.write() = Some(Utc::now());
                self.tx.send_replace(Some(snapshot));
            }
            Err(e) => tracing::warn!(error = %e, "Market refresh failed; keeping previous snapshot"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
