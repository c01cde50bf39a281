//! Filter configuration - smoothing factors clamped at write time

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::CoreError;

/// Factor used when none is configured: no smoothing.
pub const DEFAULT_SMOOTHING_FACTOR: f32 = 1.0;

/// Clamp a smoothing factor into [0, 1]. Non-finite values fall back to the
/// default.
pub fn clamp_factor(value: f32) -> f32 {
    if !value.is_finite() {
        tracing::warn!(
            "Non-finite smoothing factor {}, using {}",
            value,
            DEFAULT_SMOOTHING_FACTOR
        );
        return DEFAULT_SMOOTHING_FACTOR;
    }
    value.clamp(0.0, 1.0)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default = "default_factor")]
    smoothing_factor: f32,
    #[serde(default = "default_factor")]
    tilt_smoothing_factor: f32,
}

fn default_factor() -> f32 {
    DEFAULT_SMOOTHING_FACTOR
}

/// Smoothing factors for the interpolator.
///
/// Both are EMA weights: 1.0 disables smoothing, smaller values add lag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ConfigFile")]
pub struct InterpolatorConfig {
    smoothing_factor: f32,
    tilt_smoothing_factor: f32,
}

impl InterpolatorConfig {
    pub fn new(smoothing_factor: f32, tilt_smoothing_factor: f32) -> Self {
        Self {
            smoothing_factor: clamp_factor(smoothing_factor),
            tilt_smoothing_factor: clamp_factor(tilt_smoothing_factor),
        }
    }

    /// Position smoothing factor
    pub fn smoothing_factor(&self) -> f32 {
        self.smoothing_factor
    }

    pub fn set_smoothing_factor(&mut self, value: f32) {
        self.smoothing_factor = clamp_factor(value);
    }

    /// Tilt smoothing factor
    pub fn tilt_smoothing_factor(&self) -> f32 {
        self.tilt_smoothing_factor
    }

    pub fn set_tilt_smoothing_factor(&mut self, value: f32) {
        self.tilt_smoothing_factor = clamp_factor(value);
    }

    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!("Loaded filter config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            tilt_smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
        }
    }
}

impl From<ConfigFile> for InterpolatorConfig {
    fn from(file: ConfigFile) -> Self {
        Self::new(file.smoothing_factor, file.tilt_smoothing_factor)
    }
}
