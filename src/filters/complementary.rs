use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationOffsets;
use crate::config::GyroRateUnit;
use crate::types::{AccelSample, GyroSample};

const NS_TO_S: f64 = 1e-9;

/// Default blend: 97% gyro-integrated prediction, 3% accelerometer correction
pub const DEFAULT_ALPHA: f64 = 0.97;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RollFilterState {
    pub roll_deg: f64,
    pub last_gyro_timestamp_ns: Option<i64>,
    pub fused_samples: u64,
}

/// Complementary filter over the roll axis.
///
/// Each gyro sample drives one fusion step: the calibrated X rate is
/// integrated over the elapsed time and blended with the tilt derived from
/// the latest accelerometer snapshot. Accelerometer samples only refresh the
/// snapshot.
pub struct RollFilter {
    roll_deg: f64,
    last_gyro_timestamp_ns: Option<i64>,
    latest_accel: AccelSample,
    offsets: CalibrationOffsets,
    alpha: f64,
    rate_unit: GyroRateUnit,
    fused_samples: u64,
}

impl RollFilter {
    pub fn new(alpha: f64, offsets: CalibrationOffsets) -> Self {
        Self {
            roll_deg: 0.0,
            last_gyro_timestamp_ns: None,
            latest_accel: AccelSample::default(),
            offsets,
            alpha,
            rate_unit: GyroRateUnit::DegreesPerSecond,
            fused_samples: 0,
        }
    }

    pub fn with_rate_unit(mut self, rate_unit: GyroRateUnit) -> Self {
        self.rate_unit = rate_unit;
        self
    }

    /// Back to level with no timing reference. Offsets are kept.
    pub fn reset(&mut self) {
        self.roll_deg = 0.0;
        self.last_gyro_timestamp_ns = None;
        self.fused_samples = 0;
    }

    /// Drop the accelerometer snapshot so a new session starts from zero axes
    pub fn clear_accel(&mut self) {
        self.latest_accel = AccelSample::default();
    }

    pub fn set_offsets(&mut self, offsets: CalibrationOffsets) {
        self.offsets = offsets;
    }

    pub fn offsets(&self) -> &CalibrationOffsets {
        &self.offsets
    }

    pub fn update_accel(&mut self, sample: &AccelSample) {
        self.latest_accel = *sample;
    }

    /// Run one fusion step. Returns the new roll, or `None` when the sample
    /// only seeds the timing reference.
    pub fn update_gyro(&mut self, sample: &GyroSample) -> Option<f64> {
        let Some(last_ts) = self.last_gyro_timestamp_ns else {
            self.last_gyro_timestamp_ns = Some(sample.timestamp_ns);
            return None;
        };

        // A clock that steps backwards must not integrate negative time
        let dt = (sample.timestamp_ns.saturating_sub(last_ts) as f64 * NS_TO_S).max(0.0);

        let acc_roll = self.latest_accel.roll_deg() - self.offsets.acc_roll_offset;
        let gyro_rate = self
            .rate_unit
            .to_deg_per_sec(sample.x - self.offsets.gyro_bias.x);

        let predicted = self.roll_deg + gyro_rate * dt;
        self.roll_deg = self.alpha * predicted + (1.0 - self.alpha) * acc_roll;

        self.last_gyro_timestamp_ns = Some(sample.timestamp_ns);
        self.fused_samples += 1;
        Some(self.roll_deg)
    }

    pub fn roll_deg(&self) -> f64 {
        self.roll_deg
    }

    pub fn last_gyro_timestamp_ns(&self) -> Option<i64> {
        self.last_gyro_timestamp_ns
    }

    pub fn latest_accel(&self) -> &AccelSample {
        &self.latest_accel
    }

    pub fn get_state(&self) -> RollFilterState {
        RollFilterState {
            roll_deg: self.roll_deg,
            last_gyro_timestamp_ns: self.last_gyro_timestamp_ns,
            fused_samples: self.fused_samples,
        }
    }
}

impl Default for RollFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA, CalibrationOffsets::identity())
    }
}
