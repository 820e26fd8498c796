//! Time provider abstraction for gap timeouts
//!
//! The resequencer decides whether a gap has been open long enough by looking
//! at how long the oldest buffered element has been waiting. Routing that
//! through a provider lets tests step time explicitly instead of sleeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic time for measuring element age
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production time provider using the real monotonic clock
#[derive(Debug, Default, Clone)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced time provider for deterministic timeout behaviour
///
/// Clones share the same clock, so a test can hand one clone to a
/// resequencer and advance time through another.
#[derive(Debug, Clone)]
pub struct ManualTimeProvider {
    current_instant: Arc<Mutex<Instant>>,
}

impl Default for ManualTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualTimeProvider {
    /// Create a provider frozen at the current real time
    pub fn new() -> Self {
        Self {
            current_instant: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, duration: Duration) {
        match self.current_instant.lock() {
            Ok(mut instant) => *instant += duration,
            Err(poisoned) => *poisoned.into_inner() += duration,
        }
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now(&self) -> Instant {
        match self.current_instant.lock() {
            Ok(instant) => *instant,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
