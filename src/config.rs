use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RollTrackerError};

/// Unit the gyroscope source reports angular rate in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GyroRateUnit {
    DegreesPerSecond,
    RadiansPerSecond,
}

impl GyroRateUnit {
    /// Convert a rate in this unit to degrees per second
    pub fn to_deg_per_sec(self, rate: f64) -> f64 {
        match self {
            GyroRateUnit::DegreesPerSecond => rate,
            GyroRateUnit::RadiansPerSecond => rate.to_degrees(),
        }
    }
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // ── Complementary filter ──
    /// Weight of the gyro-integrated prediction (0.97 = 97% gyro, 3% accel)
    pub alpha: f64,
    pub gyro_rate_unit: GyroRateUnit,

    // ── Calibration ──
    pub calibration_window_ms: u64,

    // ── Journey path ──
    pub path_min_distance_m: f64,
    pub path_smoothing_window: usize,

    // ── Runtime ──
    pub sensor_channel_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.97,
            gyro_rate_unit: GyroRateUnit::DegreesPerSecond,
            calibration_window_ms: 3000,
            path_min_distance_m: 3.0,
            path_smoothing_window: 2,
            sensor_channel_capacity: 500,
        }
    }
}

impl TrackerConfig {
    /// Load a config file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(RollTrackerError::InvalidConfig(format!(
                "alpha must be within [0, 1], got {}",
                self.alpha
            )));
        }
        if self.calibration_window_ms == 0 {
            return Err(RollTrackerError::InvalidConfig(
                "calibration_window_ms must be positive".to_string(),
            ));
        }
        if !self.path_min_distance_m.is_finite() || self.path_min_distance_m < 0.0 {
            return Err(RollTrackerError::InvalidConfig(format!(
                "path_min_distance_m must be a non-negative distance, got {}",
                self.path_min_distance_m
            )));
        }
        if self.sensor_channel_capacity == 0 {
            return Err(RollTrackerError::InvalidConfig(
                "sensor_channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn calibration_window(&self) -> Duration {
        Duration::from_millis(self.calibration_window_ms)
    }
}
