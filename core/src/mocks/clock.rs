//! Instant clock for poll-loop tests.

use crate::providers::Clock;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Clock whose sleeps return immediately and are tallied.
#[derive(Clone, Debug, Default)]
pub struct MockClock {
    slept: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Creates a mock clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total duration the clock was asked to sleep.
    #[must_use]
    pub fn total_slept(&self) -> Duration {
        *self
            .slept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Clock for MockClock {
    async fn sleep(&self, duration: Duration) {
        let mut slept = self.slept.lock().unwrap_or_else(PoisonError::into_inner);
        *slept += duration;
    }
}
