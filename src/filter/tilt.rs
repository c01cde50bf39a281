//! Tilt target chain - smoothed tilt plus the previous target for lerping

use serde::Serialize;

use super::smoothing::ExponentialSmoother;
use crate::input::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TiltTargets {
    pub previous_tilt_target: Vec2,
    pub tilt_target: Vec2,
}

#[derive(Debug, Clone)]
pub struct TiltTargetChain {
    previous: Vec2,
    target: ExponentialSmoother,
}

impl TiltTargetChain {
    pub fn new() -> Self {
        Self {
            previous: Vec2::NAN,
            target: ExponentialSmoother::new(),
        }
    }

    /// Shift the current target into `previous`, then smooth `raw` into a
    /// new target. On cold start both slots take the raw tilt.
    pub fn advance(&mut self, raw: Vec2, factor: f32) -> TiltTargets {
        if !self.target.is_initialized() {
            self.target.smooth(raw, 1.0);
        }
        self.previous = self.target.value();
        self.target.smooth(raw, factor);
        self.targets()
    }

    pub fn targets(&self) -> TiltTargets {
        TiltTargets {
            previous_tilt_target: self.previous,
            tilt_target: self.target.value(),
        }
    }

    /// Whether the next tilt sample will be taken without smoothing.
    pub fn needs_seed(&self) -> bool {
        !self.target.is_initialized()
    }

    /// Linear blend from the previous to the current target.
    pub fn evaluate(&self, alpha: f32) -> Vec2 {
        let targets = self.targets();
        targets
            .previous_tilt_target
            .lerp(targets.tilt_target, alpha)
    }

    pub fn reset(&mut self) {
        self.previous = Vec2::NAN;
        self.target.reset();
    }
}

impl Default for TiltTargetChain {
    fn default() -> Self {
        Self::new()
    }
}
