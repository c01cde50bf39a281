//! Running estimate of the interval between position reports

/// Intervals at or above this are treated as stalls (pen lifted, device idle,
/// reconnect) and never enter the average.
pub const STALL_THRESHOLD_MS: f32 = 150.0;
/// EMA weight applied to each accepted interval.
pub const RATE_SMOOTHING_WEIGHT: f32 = 0.1;
/// Starting estimate before any interval is observed.
pub const DEFAULT_REPORT_MS: f32 = 5.0;

#[derive(Debug, Clone)]
pub struct RateEstimator {
    average_ms: f32,
    stalled_intervals: u64,
}

impl RateEstimator {
    pub fn new() -> Self {
        Self {
            average_ms: DEFAULT_REPORT_MS,
            stalled_intervals: 0,
        }
    }

    /// Feed one inter-report interval and return the updated average.
    pub fn observe(&mut self, elapsed_ms: f32) -> f32 {
        if elapsed_ms < STALL_THRESHOLD_MS {
            self.average_ms += (elapsed_ms - self.average_ms) * RATE_SMOOTHING_WEIGHT;
        } else {
            self.stalled_intervals = self.stalled_intervals.saturating_add(1);
            tracing::trace!(
                "Interval {:.1}ms excluded from rate estimate (avg {:.2}ms)",
                elapsed_ms,
                self.average_ms
            );
        }
        self.average_ms
    }

    pub fn average_ms(&self) -> f32 {
        self.average_ms
    }

    /// Number of intervals skipped as stalls.
    pub fn stalled_intervals(&self) -> u64 {
        self.stalled_intervals
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new()
    }
}
