//! Refresh Notifier
//!
//! Headless stand-in for the haptic/toast cue a UI fires on manual reload.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::ports::RefreshNotifier;

/// Logs each accepted reload.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl RefreshNotifier for LogNotifier {
    fn notify_success(&self) {
        tracing::info!("Refresh accepted");
    }
}

/// Counts accepted reloads. Useful wherever a test needs to observe the cue.
#[derive(Debug, Default)]
pub struct CountingNotifier {
    count: AtomicU64,
}

impl CountingNotifier {
    /// Create a notifier at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    /// Number of cues fired so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl RefreshNotifier for CountingNotifier {
    fn notify_success(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}
