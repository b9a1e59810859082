use serde::{Deserialize, Serialize};

/// Accelerometer sample (linear acceleration, any consistent unit)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Tilt about the forward axis derived from gravity, in degrees.
    ///
    /// `atan2(0, 0)` is 0, so an all-zero reading yields a level angle.
    pub fn roll_deg(&self) -> f64 {
        self.x.atan2(self.z).to_degrees()
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Gyroscope sample with a monotonic timestamp in nanoseconds
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GyroSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp_ns: i64,
}

impl GyroSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ns: i64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_ns,
        }
    }
}

/// Location fix used for the journey path
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
