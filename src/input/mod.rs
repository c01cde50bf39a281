//! Input module - device reports as they flow through the filter pipeline

mod vector;

pub use vector::{Vec2, Vec3};

use serde::{Deserialize, Serialize};

/// Position-bearing part of a report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    /// Position in output space
    pub position: Vec2,
    /// Pressure value (0.0 - 1.0 nominal, passed through as reported)
    pub pressure: f32,
}

/// Capability set of a single report, computed once per report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub position: bool,
    pub tilt: bool,
}

impl Capabilities {
    /// Neither position nor tilt: the report is forwarded untouched.
    pub fn is_empty(self) -> bool {
        !self.position && !self.tilt
    }
}

/// A single report from the device pipeline.
///
/// Position and tilt are optional capabilities; a report may carry either,
/// both or neither. The remaining fields are opaque to the filter and pass
/// through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceReport {
    #[serde(default)]
    pub pointer_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionData>,
    /// Tilt X/Y in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilt: Option<Vec2>,
    /// Button bitmask
    #[serde(default)]
    pub buttons: u32,
    /// Host timestamp in microseconds
    #[serde(default)]
    pub host_time_us: u64,
}

impl DeviceReport {
    /// Create a position report
    pub fn tablet(x: f32, y: f32, pressure: f32) -> Self {
        Self {
            position: Some(PositionData {
                position: Vec2::new(x, y),
                pressure,
            }),
            ..Self::default()
        }
    }

    /// Create a report carrying only tilt
    pub fn tilt_only(tilt_x: f32, tilt_y: f32) -> Self {
        Self {
            tilt: Some(Vec2::new(tilt_x, tilt_y)),
            ..Self::default()
        }
    }

    /// Create a report carrying neither position nor tilt (e.g. aux buttons)
    pub fn auxiliary(buttons: u32) -> Self {
        Self {
            buttons,
            ..Self::default()
        }
    }

    pub fn with_tilt(mut self, tilt_x: f32, tilt_y: f32) -> Self {
        self.tilt = Some(Vec2::new(tilt_x, tilt_y));
        self
    }

    pub fn at_time_us(mut self, host_time_us: u64) -> Self {
        self.host_time_us = host_time_us;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            position: self.position.is_some(),
            tilt: self.tilt.is_some(),
        }
    }
}
