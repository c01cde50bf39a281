//! Delta stopwatches driving the interpolation parameter
//!
//! The filter restarts its stopwatch once per accepted position report and
//! reads the elapsed time whenever it evaluates. Production code uses the
//! steady [`Instant`] clock; replays and tests drive time by hand.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Steady stopwatch measuring the time since its last restart.
pub trait Stopwatch {
    /// Time since the last restart (or since creation).
    fn elapsed(&self) -> Duration;

    /// Restart and return the time elapsed since the previous restart.
    fn restart(&mut self) -> Duration;
}

/// Wall-clock-independent stopwatch backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicStopwatch {
    started: Instant,
}

impl MonotonicStopwatch {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for MonotonicStopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch for MonotonicStopwatch {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn restart(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.started);
        self.started = now;
        delta
    }
}

/// Host-driven time source shared between a [`ManualStopwatch`] and whoever
/// advances it.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get().saturating_add(delta));
    }

    /// Jump to an absolute time. Earlier times are ignored so the clock
    /// stays non-decreasing.
    pub fn set(&self, now: Duration) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }

    pub fn stopwatch(&self) -> ManualStopwatch {
        ManualStopwatch {
            clock: self.clone(),
            started: self.now(),
        }
    }
}

/// Stopwatch reading a [`ManualClock`].
#[derive(Debug, Clone)]
pub struct ManualStopwatch {
    clock: ManualClock,
    started: Duration,
}

impl Stopwatch for ManualStopwatch {
    fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.started)
    }

    fn restart(&mut self) -> Duration {
        let now = self.clock.now();
        let delta = now.saturating_sub(self.started);
        self.started = now;
        delta
    }
}
