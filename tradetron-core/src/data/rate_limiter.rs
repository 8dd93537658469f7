//! Rolling-window rate limiter shared by every upstream call.
//!
//! At most `max_calls` admissions inside any trailing `window`. Callers over
//! quota are delayed, never rejected. All admissions go through one mutex
//! so concurrent callers can never collectively exceed the quota.

use super::provider::DataError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::warn;

/// Longest single sleep in a cancellable wait, so cancellation is noticed promptly.
const CANCEL_POLL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Limiter admitting `max_calls` per `window`. A zero `max_calls` is
    /// treated as one.
    pub fn new(max_calls: u32, window: Duration) -> Self {
        let max_calls = max_calls.max(1) as usize;
        Self {
            max_calls,
            window,
            admitted: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    /// `calls` admissions per rolling 60-second window.
    pub fn per_minute(calls: u32) -> Self {
        Self::new(calls, Duration::from_secs(60))
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit one call now, or report how long until a slot frees up.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut admitted = self.lock();
        self.evict_expired(&mut admitted, now);

        if admitted.len() < self.max_calls {
            admitted.push_back(now);
            return Ok(());
        }

        // Oldest admission leaves the window at oldest + window.
        let wait = admitted
            .front()
            .map(|&oldest| (oldest + self.window).saturating_duration_since(now))
            .unwrap_or_default();
        Err(wait.max(Duration::from_millis(1)))
    }

    /// Block until the window admits the call.
    pub fn acquire(&self) {
        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) => {
                    warn!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
                    std::thread::sleep(wait);
                }
            }
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up with
    /// [`DataError::Cancelled`] once `cancel` is set.
    pub fn acquire_cancellable(&self, cancel: &AtomicBool) -> Result<(), DataError> {
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(DataError::Cancelled);
            }
            match self.try_acquire() {
                Ok(()) => return Ok(()),
                Err(wait) => std::thread::sleep(wait.min(CANCEL_POLL)),
            }
        }
    }

    /// Slots free right now.
    pub fn available(&self) -> usize {
        let mut admitted = self.lock();
        self.evict_expired(&mut admitted, Instant::now());
        self.max_calls - admitted.len()
    }

    fn evict_expired(&self, admitted: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = admitted.front() {
            if now.duration_since(oldest) >= self.window {
                admitted.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // The queue holds plain timestamps; a panic elsewhere cannot leave it inconsistent.
        self.admitted.lock().unwrap_or_else(|e| e.into_inner())
    }
}
