//! Consumer-side suppression of repeated scan values.

use std::{collections::HashMap, time::Duration};

use tokio::time::Instant;

/// Suppresses a value seen again within `window` of its last emission.
///
/// Each value has its own window, so `A, B, A` inside one window yields
/// `A, B`. A code held in view is emitted again once per window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    emitted: HashMap<String, Instant>,
}

impl Debouncer {
    /// Create a debouncer with the given suppression window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            emitted: HashMap::new(),
        }
    }

    /// Suppression window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `value` observed at `at` should be emitted.
    ///
    /// Observations must arrive in non-decreasing time order.
    pub fn admit(&mut self, value: &str, at: Instant) -> bool {
        let window = self.window;
        self.emitted
            .retain(|_, last| at.saturating_duration_since(*last) < window);
        if self.emitted.contains_key(value) {
            return false;
        }
        self.emitted.insert(value.to_owned(), at);
        true
    }
}
