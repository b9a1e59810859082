//! Simulated sensor source.
//!
//! Produces a motorcycle-like lean oscillation with a constant gyro bias so
//! the whole calibrate-then-track flow can run without hardware. Each loop
//! pushes into the service at a fixed rate and stops once the service is
//! gone.

use std::f64::consts::PI;

use tokio::time::{interval, Duration, Instant};

use crate::service::ServiceHandle;
use crate::types::{AccelSample, GpsFix, GyroSample};

const GRAVITY: f64 = 9.81;

/// Shape of the simulated ride
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatedRide {
    /// Peak lean in degrees
    pub lean_amplitude_deg: f64,
    /// Seconds for one full left-right-left swing
    pub lean_period_s: f64,
    /// Constant offset added to every gyro x reading (deg/s)
    pub gyro_bias_deg_s: f64,
    /// Mount tilt added to the accelerometer roll (degrees)
    pub mount_tilt_deg: f64,
    /// Seconds of standing still before the lean starts
    pub settle_s: f64,
    pub origin: GpsFix,
    /// Northward speed in m/s
    pub speed_m_s: f64,
}

impl Default for SimulatedRide {
    fn default() -> Self {
        Self {
            lean_amplitude_deg: 30.0,
            lean_period_s: 8.0,
            gyro_bias_deg_s: 0.8,
            mount_tilt_deg: 2.0,
            settle_s: 4.0,
            origin: GpsFix::new(45.4642, 9.19),
            speed_m_s: 12.0,
        }
    }
}

impl SimulatedRide {
    /// True lean at `t` seconds after start
    pub fn lean_deg(&self, t: f64) -> f64 {
        if t < self.settle_s {
            return 0.0;
        }
        let phase = 2.0 * PI * (t - self.settle_s) / self.lean_period_s;
        self.lean_amplitude_deg * phase.sin()
    }

    /// Lean rate in deg/s at `t`
    pub fn lean_rate_deg_s(&self, t: f64) -> f64 {
        if t < self.settle_s {
            return 0.0;
        }
        let omega = 2.0 * PI / self.lean_period_s;
        let phase = omega * (t - self.settle_s);
        self.lean_amplitude_deg * omega * phase.cos()
    }

    pub fn accel_at(&self, t: f64) -> AccelSample {
        let tilt = (self.lean_deg(t) + self.mount_tilt_deg).to_radians();
        AccelSample::new(GRAVITY * tilt.sin(), 0.0, GRAVITY * tilt.cos())
    }

    pub fn gyro_at(&self, t: f64) -> GyroSample {
        GyroSample::new(
            self.lean_rate_deg_s(t) + self.gyro_bias_deg_s,
            0.0,
            0.0,
            (t * 1e9) as i64,
        )
    }

    pub fn fix_at(&self, t: f64) -> GpsFix {
        let moving = (t - self.settle_s).max(0.0);
        // ~111.2 km per degree of latitude
        let north_deg = moving * self.speed_m_s / 111_195.0;
        GpsFix::new(self.origin.latitude + north_deg, self.origin.longitude)
    }
}

fn elapsed_s(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

pub async fn accel_loop(handle: ServiceHandle, ride: SimulatedRide, period: Duration) {
    let start = Instant::now();
    let mut interval = interval(period);
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;
        match handle.push_accel(ride.accel_at(elapsed_s(start))) {
            Ok(true) => {
                sample_count += 1;
                if sample_count % 500 == 0 {
                    log::debug!("[accel] {} samples", sample_count);
                }
            }
            // Queue full, drop this sample
            Ok(false) => {}
            Err(_) => {
                log::debug!("[accel] service stopped after {} samples", sample_count);
                break;
            }
        }
    }
}

pub async fn gyro_loop(handle: ServiceHandle, ride: SimulatedRide, period: Duration) {
    let start = Instant::now();
    let mut interval = interval(period);
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;
        match handle.push_gyro(ride.gyro_at(elapsed_s(start))) {
            Ok(true) => {
                sample_count += 1;
                if sample_count % 500 == 0 {
                    log::debug!("[gyro] {} samples", sample_count);
                }
            }
            Ok(false) => {}
            Err(_) => {
                log::debug!("[gyro] service stopped after {} samples", sample_count);
                break;
            }
        }
    }
}

pub async fn gps_loop(handle: ServiceHandle, ride: SimulatedRide, period: Duration) {
    let start = Instant::now();
    let mut interval = interval(period);
    let mut fix_count = 0u64;

    loop {
        interval.tick().await;
        match handle.push_location(ride.fix_at(elapsed_s(start))) {
            Ok(true) => fix_count += 1,
            Ok(false) => {}
            Err(_) => {
                log::debug!("[gps] service stopped after {} fixes", fix_count);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_level_while_settling() {
        let ride = SimulatedRide::default();
        assert_eq!(ride.lean_deg(1.0), 0.0);
        let gyro = ride.gyro_at(1.0);
        assert_abs_diff_eq!(gyro.x, ride.gyro_bias_deg_s);
        assert_eq!(gyro.timestamp_ns, 1_000_000_000);
        assert_abs_diff_eq!(ride.accel_at(1.0).roll_deg(), ride.mount_tilt_deg, epsilon = 1e-9);
    }

    #[test]
    fn test_peak_lean() {
        let ride = SimulatedRide::default();
        let quarter = ride.settle_s + ride.lean_period_s / 4.0;
        assert_abs_diff_eq!(ride.lean_deg(quarter), ride.lean_amplitude_deg, epsilon = 1e-9);
        assert_abs_diff_eq!(ride.lean_rate_deg_s(quarter), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fix_moves_north() {
        let ride = SimulatedRide::default();
        assert_eq!(ride.fix_at(0.0), ride.origin);
        let later = ride.fix_at(ride.settle_s + 10.0);
        assert!(later.latitude > ride.origin.latitude);
        assert_eq!(later.longitude, ride.origin.longitude);
    }
}
