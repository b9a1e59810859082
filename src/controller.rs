//! Calibration/tracking lifecycle.
//!
//! `Idle -> Calibrating -> Calibrated -> Tracking <-> Calibrated`
//!
//! The controller decides which raw samples reach the calibration
//! accumulator or the live tracking session, and it is the only place that
//! pushes events to the sink. Angle and extrema events can only be produced
//! while a tracking session exists.
//!
//! The calibration window timer is not owned here: `start_calibration`
//! hands back a [`CalibrationWindow`] for the runtime to schedule, and the
//! runtime reports back through [`Controller::on_calibration_elapsed`].
//! Every start or teardown bumps the window generation, so a timer that
//! fires after being cancelled is ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationAccumulator, CalibrationOffsets};
use crate::config::TrackerConfig;
use crate::error::{Result, RollTrackerError};
use crate::events::{RollEvent, RollSink};
use crate::session::{SessionSummary, TrackingSession};
use crate::types::{AccelSample, GpsFix, GyroSample};

/// Lifecycle states visible to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    /// No valid calibration
    Idle,
    /// Collecting the calibration window
    Calibrating,
    /// Offsets available, not tracking
    Calibrated,
    /// Journey in progress
    Tracking,
}

/// One-shot calibration deadline to be scheduled by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationWindow {
    pub generation: u64,
    pub duration: Duration,
}

enum Phase {
    Idle,
    Calibrating {
        accumulator: CalibrationAccumulator,
        generation: u64,
    },
    Calibrated,
    Tracking(TrackingSession),
}

pub struct Controller<S: RollSink> {
    config: TrackerConfig,
    phase: Phase,
    offsets: Option<CalibrationOffsets>,
    window_generation: u64,
    last_summary: Option<SessionSummary>,
    sink: S,
}

impl<S: RollSink + std::fmt::Debug> std::fmt::Debug for Controller<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state())
            .field("offsets", &self.offsets)
            .field("window_generation", &self.window_generation)
            .field("sink", &self.sink)
            .finish()
    }
}

impl<S: RollSink> Controller<S> {
    pub fn new(config: TrackerConfig, sink: S) -> Self {
        Controller {
            config,
            phase: Phase::Idle,
            offsets: None,
            window_generation: 0,
            last_summary: None,
            sink,
        }
    }

    pub fn state(&self) -> ControllerState {
        match self.phase {
            Phase::Idle => ControllerState::Idle,
            Phase::Calibrating { .. } => ControllerState::Calibrating,
            Phase::Calibrated => ControllerState::Calibrated,
            Phase::Tracking(_) => ControllerState::Tracking,
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.phase, Phase::Tracking(_))
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn offsets(&self) -> Option<&CalibrationOffsets> {
        self.offsets.as_ref()
    }

    /// Samples collected by the calibration in progress
    pub fn calibration_sample_count(&self) -> Option<u64> {
        match &self.phase {
            Phase::Calibrating { accumulator, .. } => Some(accumulator.sample_count()),
            _ => None,
        }
    }

    /// Current fused roll while tracking
    pub fn roll_deg(&self) -> Option<f64> {
        match &self.phase {
            Phase::Tracking(session) => Some(session.roll_deg()),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&TrackingSession> {
        match &self.phase {
            Phase::Tracking(session) => Some(session),
            _ => None,
        }
    }

    /// Summary of the most recently ended journey
    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    // ─── Commands ────────────────────────────────────────────────────────────

    /// Begin a calibration window.
    ///
    /// Returns the window to schedule, or `None` when a calibration is
    /// already running (duplicate triggers are ignored).
    pub fn start_calibration(&mut self) -> Result<Option<CalibrationWindow>> {
        match self.phase {
            Phase::Calibrating { .. } => {
                log::debug!("calibration already in progress, ignoring start");
                return Ok(None);
            }
            Phase::Tracking(_) => {
                log::warn!("calibration requested while tracking");
                return Err(RollTrackerError::TrackingActive);
            }
            Phase::Idle | Phase::Calibrated => {}
        }

        self.window_generation += 1;
        self.phase = Phase::Calibrating {
            accumulator: CalibrationAccumulator::new(),
            generation: self.window_generation,
        };
        log::info!(
            "calibration started ({} ms window), keep the device steady",
            self.config.calibration_window_ms
        );

        Ok(Some(CalibrationWindow {
            generation: self.window_generation,
            duration: self.config.calibration_window(),
        }))
    }

    /// Timer callback for a scheduled window. Stale generations are ignored.
    pub fn on_calibration_elapsed(&mut self, generation: u64) -> Option<CalibrationOffsets> {
        match self.phase {
            Phase::Calibrating {
                generation: current,
                ..
            } if current == generation => self.finalize_calibration(),
            _ => {
                log::debug!("ignoring stale calibration window {}", generation);
                None
            }
        }
    }

    /// Close the calibration window now and commit its offsets.
    /// Does nothing unless a calibration is in progress.
    pub fn finalize_calibration(&mut self) -> Option<CalibrationOffsets> {
        let accumulator = match std::mem::replace(&mut self.phase, Phase::Calibrated) {
            Phase::Calibrating { accumulator, .. } => accumulator,
            other => {
                self.phase = other;
                return None;
            }
        };

        let offsets = accumulator.finalize();
        log::info!(
            "calibration complete: gyro bias ({:.4}, {:.4}, {:.4}), accel roll offset {:.2}° ({} gyro / {} accel samples)",
            offsets.gyro_bias.x,
            offsets.gyro_bias.y,
            offsets.gyro_bias.z,
            offsets.acc_roll_offset,
            accumulator.gyro_count(),
            accumulator.accel_count()
        );
        if accumulator.sample_count() == 0 {
            log::warn!("calibration window collected no samples, using identity offsets");
        }

        self.offsets = Some(offsets);
        self.sink.emit(RollEvent::CalibrationComplete(offsets));
        Some(offsets)
    }

    /// Start (`true`) or stop (`false`) a journey.
    ///
    /// Stopping returns the session summary, which is also pushed to the
    /// sink. Starting while a journey is running closes it the same way and
    /// begins a fresh one. Stopping when not tracking is a no-op.
    pub fn set_tracking_mode(&mut self, tracking: bool) -> Result<Option<SessionSummary>> {
        if tracking {
            self.start_tracking()
        } else {
            Ok(self.stop_tracking())
        }
    }

    fn start_tracking(&mut self) -> Result<Option<SessionSummary>> {
        let previous = match self.phase {
            Phase::Tracking(_) => {
                log::info!("journey restarted");
                self.stop_tracking()
            }
            Phase::Calibrated => None,
            Phase::Idle | Phase::Calibrating { .. } => {
                log::warn!("tracking requested before calibration finished");
                return Err(RollTrackerError::NotCalibrated);
            }
        };

        let offsets = self.offsets.unwrap_or_default();
        self.phase = Phase::Tracking(TrackingSession::new(&self.config, offsets));
        log::info!("journey started");
        Ok(previous)
    }

    fn stop_tracking(&mut self) -> Option<SessionSummary> {
        let session = match std::mem::replace(&mut self.phase, Phase::Calibrated) {
            Phase::Tracking(session) => session,
            other => {
                self.phase = other;
                return None;
            }
        };

        let summary = session.summary();
        log::info!(
            "journey stopped: max lean +{:.1}° / -{:.1}°, {:.2} km",
            summary.max_positive_roll,
            summary.max_negative_roll,
            summary.distance_km
        );
        self.last_summary = Some(summary.clone());
        self.sink
            .emit(RollEvent::SessionEnded(Box::new(summary.clone())));
        Some(summary)
    }

    /// The consumer went away (e.g. app moved to background).
    ///
    /// A calibration in progress is abandoned without committing offsets and
    /// the controller returns to `Idle`. A journey in progress is stopped and
    /// its final values are kept in the returned summary.
    pub fn teardown(&mut self) -> Option<SessionSummary> {
        self.window_generation += 1;
        match self.phase {
            Phase::Calibrating { .. } => {
                log::info!("calibration cancelled");
                self.phase = Phase::Idle;
                self.offsets = None;
                None
            }
            Phase::Tracking(_) => self.stop_tracking(),
            Phase::Idle | Phase::Calibrated => None,
        }
    }

    // ─── Sample routing ──────────────────────────────────────────────────────

    pub fn on_accel_sample(&mut self, sample: AccelSample) {
        match &mut self.phase {
            Phase::Calibrating { accumulator, .. } => accumulator.push_accel(&sample),
            Phase::Tracking(session) => session.push_accel(&sample),
            Phase::Idle | Phase::Calibrated => {}
        }
    }

    pub fn on_gyro_sample(&mut self, sample: GyroSample) {
        match &mut self.phase {
            Phase::Calibrating { accumulator, .. } => accumulator.push_gyro(&sample),
            Phase::Tracking(session) => {
                if let Some(update) = session.push_gyro(&sample) {
                    if let Some(value) = update.extrema.max_positive {
                        self.sink.emit(RollEvent::MaxPositiveRoll(value));
                    }
                    if let Some(value) = update.extrema.max_negative {
                        self.sink.emit(RollEvent::MaxNegativeRoll(value));
                    }
                    self.sink.emit(RollEvent::FilteredAngle(update.roll_deg));
                }
            }
            Phase::Idle | Phase::Calibrated => {}
        }
    }

    pub fn on_location(&mut self, fix: GpsFix) {
        if let Phase::Tracking(session) = &mut self.phase {
            session.push_fix(fix);
        }
    }
}
