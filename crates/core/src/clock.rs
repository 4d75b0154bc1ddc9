// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A clock that provides both a monotonic instant (for measuring elapsed
/// durations) and a wall-clock timestamp (for persisted/observable fields).
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for deterministic tests.
#[derive(Clone)]
pub struct FakeClock {
    instant: Arc<Mutex<Instant>>,
    utc: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { instant: Arc::new(Mutex::new(Instant::now())), utc: Arc::new(Mutex::new(Utc::now())) }
    }

    pub fn advance(&self, duration: Duration) {
        *self.instant.lock() += duration;
        if let Ok(chrono_dur) = chrono::Duration::from_std(duration) {
            let mut utc = self.utc.lock();
            *utc += chrono_dur;
        }
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.instant.lock()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        *self.utc.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_both_instant_and_utc() {
        let clock = FakeClock::new();
        let i0 = clock.now();
        let u0 = clock.now_utc();
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now() - i0, Duration::from_secs(5));
        assert_eq!((clock.now_utc() - u0).num_seconds(), 5);
    }
}
