//! Exponential smoothing for planar channels (position, tilt)

use crate::input::Vec2;

/// Single EMA step: `previous + factor * (raw - previous)`.
pub fn ema_step(previous: Vec2, raw: Vec2, factor: f32) -> Vec2 {
    previous + (raw - previous) * factor
}

/// Single-pole exponential moving average over a 2D value.
///
/// Key behaviors:
/// 1. Cold start - the state starts non-finite, so the first sample passes
///    through unsmoothed instead of being pulled toward an undefined origin.
/// 2. Recovery - whenever the state is observed non-finite (NaN/Inf from
///    upstream), it is re-seeded from the next raw sample.
/// 3. `factor = 1` is identity; smaller factors add lag.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialSmoother {
    value: Vec2,
}

impl ExponentialSmoother {
    /// Create a smoother in cold state.
    pub const fn new() -> Self {
        Self { value: Vec2::NAN }
    }

    /// Smooth a raw sample and return the new state.
    pub fn smooth(&mut self, raw: Vec2, factor: f32) -> Vec2 {
        if !self.value.is_finite() {
            self.value = raw;
        }
        self.value = ema_step(self.value, raw, factor);
        self.value
    }

    /// Current smoothed value (non-finite while cold).
    pub fn value(&self) -> Vec2 {
        self.value
    }

    /// Whether the next sample will be taken as-is.
    pub fn is_initialized(&self) -> bool {
        self.value.is_finite()
    }

    /// Return to cold state.
    pub fn reset(&mut self) {
        self.value = Vec2::NAN;
    }
}

impl Default for ExponentialSmoother {
    fn default() -> Self {
        Self::new()
    }
}
