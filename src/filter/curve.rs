//! Rolling quadratic Bezier built from successive smoothed samples
//!
//! Each accepted sample becomes the newest control point. The curve runs from
//! the previous midpoint, through the older control point, to the new
//! midpoint, so consecutive segments join smoothly at the midpoints.

use serde::Serialize;

use crate::input::{Vec2, Vec3};

/// Snapshot of the control-point chain. Pressure rides on the `z` axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPoints {
    pub previous_target: Vec3,
    pub control_point: Vec3,
    pub control_point_next: Vec3,
    pub target: Vec3,
}

impl ControlPoints {
    const COLD: Self = Self {
        previous_target: Vec3::NAN,
        control_point: Vec3::NAN,
        control_point_next: Vec3::NAN,
        target: Vec3::NAN,
    };

    fn filled(point: Vec3) -> Self {
        Self {
            previous_target: point,
            control_point: point,
            control_point_next: point,
            target: point,
        }
    }

    /// De Casteljau evaluation of the quadratic Bezier
    /// (`previous_target`, `control_point`, `target`) at `alpha`.
    ///
    /// `alpha` is not clamped; values past 1 extrapolate beyond `target`.
    pub fn evaluate(&self, alpha: f32) -> Vec3 {
        let lerp1 = self.previous_target.lerp(self.control_point, alpha);
        let lerp2 = self.control_point.lerp(self.target, alpha);
        lerp1.lerp(lerp2, alpha)
    }

    pub fn is_finite(&self) -> bool {
        self.previous_target.is_finite()
            && self.control_point.is_finite()
            && self.control_point_next.is_finite()
            && self.target.is_finite()
    }
}

/// Maintains the control-point chain for one pointer.
#[derive(Debug, Clone)]
pub struct CurveTracker {
    points: ControlPoints,
}

impl CurveTracker {
    pub fn new() -> Self {
        Self {
            points: ControlPoints::COLD,
        }
    }

    /// Shift the chain by one slot and recompute the midpoint target.
    ///
    /// If the chain holds a non-finite point (cold start, or a NaN that came
    /// through smoothing) and the new sample is finite, every slot is seeded
    /// with the sample first, so the curve collapses onto it.
    pub fn advance(&mut self, position: Vec2, pressure: f32) -> ControlPoints {
        let point = Vec3::from_planar(position, pressure);
        if self.needs_seed() && point.is_finite() {
            self.points = ControlPoints::filled(point);
        }

        let points = &mut self.points;
        points.control_point = points.control_point_next;
        points.control_point_next = point;
        points.previous_target = points.target;
        points.target = points.control_point.lerp(points.control_point_next, 0.5);
        self.points
    }

    /// Whether the next finite sample will re-seed the chain.
    pub fn needs_seed(&self) -> bool {
        !self.points.is_finite()
    }

    pub fn points(&self) -> ControlPoints {
        self.points
    }

    pub fn evaluate(&self, alpha: f32) -> Vec3 {
        self.points.evaluate(alpha)
    }

    pub fn reset(&mut self) {
        self.points = ControlPoints::COLD;
    }
}

impl Default for CurveTracker {
    fn default() -> Self {
        Self::new()
    }
}
