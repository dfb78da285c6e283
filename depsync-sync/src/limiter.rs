//! Blocking request pacing for the remote store client.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive requests.
///
/// The lock is held while sleeping, so concurrent callers queue up behind
/// each other instead of bursting once the interval elapses.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `0` disables pacing.
    pub fn per_second(requests: u32) -> Self {
        let interval = if requests == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / requests
        };
        Self {
            interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How long a request issued at `now` has to wait.
    fn delay_at(&self, last: Option<Instant>, now: Instant) -> Duration {
        match last {
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Block until the next request may be sent, then claim the slot.
    pub fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let delay = self.delay_at(*last, Instant::now());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        *last = Some(Instant::now());
    }
}
