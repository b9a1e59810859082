use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationOffsets;
use crate::config::TrackerConfig;
use crate::extrema::{ExtremaUpdate, RollExtremes};
use crate::filters::RollFilter;
use crate::track::PathRecorder;
use crate::types::{AccelSample, GpsFix, GyroSample};

/// Result of one fusion step inside a session
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RollUpdate {
    pub roll_deg: f64,
    pub extrema: ExtremaUpdate,
}

/// State owned by one journey: fused roll, extremes and recorded path.
/// Built fresh every time tracking starts.
pub struct TrackingSession {
    filter: RollFilter,
    extremes: RollExtremes,
    path: PathRecorder,
    smoothing_window: usize,
    started_at: DateTime<Utc>,
}

impl TrackingSession {
    pub fn new(config: &TrackerConfig, offsets: CalibrationOffsets) -> Self {
        let mut filter =
            RollFilter::new(config.alpha, offsets).with_rate_unit(config.gyro_rate_unit);
        filter.reset();

        TrackingSession {
            filter,
            extremes: RollExtremes::new(),
            path: PathRecorder::new(config.path_min_distance_m),
            smoothing_window: config.path_smoothing_window,
            started_at: Utc::now(),
        }
    }

    pub fn push_accel(&mut self, sample: &AccelSample) {
        self.filter.update_accel(sample);
    }

    pub fn push_gyro(&mut self, sample: &GyroSample) -> Option<RollUpdate> {
        let roll_deg = self.filter.update_gyro(sample)?;
        let extrema = self.extremes.update(roll_deg);
        Some(RollUpdate { roll_deg, extrema })
    }

    pub fn push_fix(&mut self, fix: GpsFix) -> bool {
        self.path.push(fix)
    }

    pub fn roll_deg(&self) -> f64 {
        self.filter.roll_deg()
    }

    pub fn filter(&self) -> &RollFilter {
        &self.filter
    }

    pub fn extremes(&self) -> &RollExtremes {
        &self.extremes
    }

    pub fn path(&self) -> &PathRecorder {
        &self.path
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            started_at: self.started_at,
            ended_at: Utc::now(),
            max_positive_roll: self.extremes.max_positive(),
            max_negative_roll: self.extremes.max_negative_magnitude(),
            final_roll: self.filter.roll_deg(),
            fused_samples: self.filter.get_state().fused_samples,
            distance_km: self.path.distance_km(),
            path: self.path.smoothed(self.smoothing_window),
        }
    }
}

/// Journey summary handed to the display when tracking stops
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Largest lean in the positive direction (degrees)
    pub max_positive_roll: f64,
    /// Largest lean in the negative direction, as a magnitude (degrees)
    pub max_negative_roll: f64,
    pub final_roll: f64,
    pub fused_samples: u64,
    pub distance_km: f64,
    /// Smoothed journey path
    pub path: Vec<GpsFix>,
}

impl SessionSummary {
    pub fn duration_seconds(&self) -> f64 {
        self.ended_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SECOND: i64 = 1_000_000_000;

    #[test]
    fn test_session_tracks_extremes() {
        let mut session =
            TrackingSession::new(&TrackerConfig::default(), CalibrationOffsets::identity());
        session.push_accel(&AccelSample::new(0.0, 0.0, 1.0));
        assert!(session.push_gyro(&GyroSample::new(10.0, 0.0, 0.0, SECOND)).is_none());

        let update = session
            .push_gyro(&GyroSample::new(10.0, 0.0, 0.0, 2 * SECOND))
            .unwrap();
        assert_abs_diff_eq!(update.roll_deg, 9.7, epsilon = 1e-9);
        assert_abs_diff_eq!(update.extrema.max_positive.unwrap(), 9.7, epsilon = 1e-9);
        assert!(update.extrema.max_negative.is_none());

        let update = session
            .push_gyro(&GyroSample::new(-40.0, 0.0, 0.0, 3 * SECOND))
            .unwrap();
        assert!(update.roll_deg < 0.0);
        assert_abs_diff_eq!(update.extrema.max_negative.unwrap(), update.roll_deg.abs());
    }

    #[test]
    fn test_summary_contents() {
        let mut session =
            TrackingSession::new(&TrackerConfig::default(), CalibrationOffsets::identity());
        session.push_fix(GpsFix::new(45.0, 9.0));
        session.push_fix(GpsFix::new(45.001, 9.0));
        session.push_accel(&AccelSample::new(0.0, 0.0, 1.0));
        session.push_gyro(&GyroSample::new(0.0, 0.0, 0.0, SECOND));
        session.push_gyro(&GyroSample::new(-20.0, 0.0, 0.0, 2 * SECOND));

        let summary = session.summary();
        assert_eq!(summary.max_positive_roll, 0.0);
        assert_abs_diff_eq!(summary.max_negative_roll, 19.4, epsilon = 1e-9);
        assert_abs_diff_eq!(summary.final_roll, -19.4, epsilon = 1e-9);
        assert_eq!(summary.fused_samples, 1);
        assert_eq!(summary.path.len(), 2);
        assert!(summary.distance_km > 0.1 && summary.distance_km < 0.12);
        assert!(summary.duration_seconds() >= 0.0);

        let json = summary.to_json().unwrap();
        assert!(json.contains("max_negative_roll"));
        let parsed: SessionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.path.len(), 2);
        assert_eq!(parsed.started_at, summary.started_at);
    }
}
