//! Reload Tracking
//!
//! Tracks outstanding manual-refresh requests per source so the "reloading"
//! indicator only clears once every source has delivered fresh data, not as
//! soon as the first one does.

use std::time::Duration;

use tokio::time::Instant;

/// Source whose delivery a reload waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    /// Coin list.
    Coins,
    /// Global market snapshot.
    Market,
}

impl Feed {
    /// Both feeds, in a fixed order.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Coins, Self::Market]
    }

    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coins => "coins",
            Self::Market => "market",
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Outstanding {
    count: u32,
    since: Option<Instant>,
}

impl Outstanding {
    fn push(&mut self, now: Instant) {
        self.count = self.count.saturating_add(1);
        self.since = Some(now);
    }

    fn clear(&mut self) -> bool {
        let had = self.count > 0;
        *self = Self::default();
        had
    }
}

/// Counts outstanding fetches per feed.
///
/// One delivery from a feed settles every request pending on it, since each
/// delivery is a full snapshot.
///
/// # Example
///
/// ```rust
/// use portfolio_pipeline::application::services::reload::{Feed, ReloadTracker};
/// use tokio::time::Instant;
///
/// let mut tracker = ReloadTracker::new(None);
/// tracker.trigger(Instant::now());
/// assert!(tracker.is_reloading());
///
/// tracker.delivered(Feed::Coins);
/// assert!(tracker.is_reloading());
///
/// tracker.delivered(Feed::Market);
/// assert!(!tracker.is_reloading());
/// ```
#[derive(Debug, Clone)]
pub struct ReloadTracker {
    timeout: Option<Duration>,
    coins: Outstanding,
    market: Outstanding,
}

impl ReloadTracker {
    /// Create a tracker. With a `timeout`, requests left unanswered that long
    /// are dropped by [`expire`](Self::expire).
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            coins: Outstanding::default(),
            market: Outstanding::default(),
        }
    }

    /// Record a reload request against every feed.
    pub fn trigger(&mut self, now: Instant) {
        self.coins.push(now);
        self.market.push(now);
    }

    /// Record a delivery. Returns `true` if it settled outstanding requests.
    pub fn delivered(&mut self, feed: Feed) -> bool {
        self.slot_mut(feed).clear()
    }

    /// Drop requests older than the timeout. Returns the feeds that expired.
    ///
    /// A deadline past the clock's range is never reached.
    pub fn expire(&mut self, now: Instant) -> Vec<Feed> {
        let Some(timeout) = self.timeout else {
            return Vec::new();
        };

        Feed::all()
            .into_iter()
            .filter(|feed| {
                let slot = self.slot_mut(*feed);
                let due = slot
                    .since
                    .and_then(|since| since.checked_add(timeout))
                    .is_some_and(|deadline| now >= deadline);
                due && slot.clear()
            })
            .collect()
    }

    /// Earliest instant at which an outstanding request expires.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        let timeout = self.timeout?;
        [self.coins.since, self.market.since]
            .into_iter()
            .flatten()
            .min()
            .and_then(|since| since.checked_add(timeout))
    }

    /// Whether any feed still owes a delivery.
    #[must_use]
    pub const fn is_reloading(&self) -> bool {
        self.coins.count > 0 || self.market.count > 0
    }

    /// Outstanding requests for `feed`.
    #[must_use]
    pub const fn outstanding(&self, feed: Feed) -> u32 {
        match feed {
            Feed::Coins => self.coins.count,
            Feed::Market => self.market.count,
        }
    }

    const fn slot_mut(&mut self, feed: Feed) -> &mut Outstanding {
        match feed {
            Feed::Coins => &mut self.coins,
            Feed::Market => &mut self.market,
        }
    }
}
