//! Stationary calibration window.
//!
//! While the device rests on the vehicle, raw samples are summed and later
//! reduced to a gyro bias per axis and an accelerometer roll offset. Both are
//! subtracted from live readings during tracking.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::types::{AccelSample, GyroSample};

/// Correction constants learned by one calibration window
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOffsets {
    /// Mean gyro reading per axis (raw source units)
    pub gyro_bias: Vector3<f64>,
    /// Mean accelerometer roll in degrees
    pub acc_roll_offset: f64,
}

impl Default for CalibrationOffsets {
    fn default() -> Self {
        Self::identity()
    }
}

impl CalibrationOffsets {
    /// No correction at all
    pub fn identity() -> Self {
        Self {
            gyro_bias: Vector3::zeros(),
            acc_roll_offset: 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.gyro_bias == Vector3::zeros() && self.acc_roll_offset == 0.0
    }
}

/// Running sums for one calibration window.
///
/// Gyro and accelerometer contributions are counted separately so that
/// sensors delivering at different rates are each averaged over their own
/// sample count.
#[derive(Clone, Debug)]
pub struct CalibrationAccumulator {
    gyro_sum: Vector3<f64>,
    gyro_count: u64,
    acc_roll_sum: f64,
    accel_count: u64,
}

impl Default for CalibrationAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationAccumulator {
    pub fn new() -> Self {
        Self {
            gyro_sum: Vector3::zeros(),
            gyro_count: 0,
            acc_roll_sum: 0.0,
            accel_count: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn add_gyro_sample(&mut self, x: f64, y: f64, z: f64) {
        self.gyro_sum += Vector3::new(x, y, z);
        self.gyro_count += 1;
    }

    pub fn add_accel_sample(&mut self, x: f64, y: f64, z: f64) {
        self.acc_roll_sum += AccelSample::new(x, y, z).roll_deg();
        self.accel_count += 1;
    }

    pub fn push_gyro(&mut self, sample: &GyroSample) {
        self.add_gyro_sample(sample.x, sample.y, sample.z);
    }

    pub fn push_accel(&mut self, sample: &AccelSample) {
        self.add_accel_sample(sample.x, sample.y, sample.z);
    }

    pub fn gyro_count(&self) -> u64 {
        self.gyro_count
    }

    pub fn accel_count(&self) -> u64 {
        self.accel_count
    }

    pub fn sample_count(&self) -> u64 {
        self.gyro_count + self.accel_count
    }

    /// Reduce the sums to offsets. A sensor with no samples contributes no
    /// correction.
    pub fn finalize(&self) -> CalibrationOffsets {
        let gyro_bias = if self.gyro_count > 0 {
            self.gyro_sum / self.gyro_count as f64
        } else {
            Vector3::zeros()
        };
        let acc_roll_offset = if self.accel_count > 0 {
            self.acc_roll_sum / self.accel_count as f64
        } else {
            0.0
        };

        CalibrationOffsets {
            gyro_bias,
            acc_roll_offset,
        }
    }
}
