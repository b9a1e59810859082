//! Recorded sessions and offline replay.
//!
//! A recording is a JSON document `{ "readings": [...] }`, optionally
//! gzip-compressed (`.gz` extension). Replay drives a [`Controller`]
//! synchronously: the first calibration window worth of readings is used to
//! calibrate, the rest is tracked.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::controller::Controller;
use crate::error::{Result, RollTrackerError};
use crate::events::RollSink;
use crate::session::SessionSummary;
use crate::types::{AccelSample, GpsFix, GyroSample};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Monotonic time of the reading in nanoseconds
    pub timestamp_ns: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accel: Option<AccelSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gyro: Option<GyroSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsFix>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub readings: Vec<Reading>,
}

fn is_gz(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

impl Recording {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if is_gz(path) {
            let reader = BufReader::new(GzDecoder::new(file));
            Ok(serde_json::from_reader(reader)?)
        } else {
            let reader = BufReader::new(file);
            Ok(serde_json::from_reader(reader)?)
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        if is_gz(path) {
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            serde_json::to_writer(&mut encoder, self)?;
            encoder.finish()?.flush()?;
        } else {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Span between the first and last reading, in seconds
    pub fn duration_seconds(&self) -> f64 {
        match (self.readings.first(), self.readings.last()) {
            (Some(first), Some(last)) => (last.timestamp_ns - first.timestamp_ns) as f64 * 1e-9,
            _ => 0.0,
        }
    }
}

/// Calibrate over the opening window of `recording`, track the remainder
/// and return the journey summary. Events go to `sink` as they would live.
pub fn replay<S: RollSink>(
    recording: &Recording,
    config: &TrackerConfig,
    sink: S,
) -> Result<(SessionSummary, Controller<S>)> {
    let first = recording
        .readings
        .first()
        .ok_or_else(|| RollTrackerError::Recording("recording has no readings".to_string()))?;
    let window_ns = i64::try_from(config.calibration_window_ms)
        .ok()
        .and_then(|ms| ms.checked_mul(1_000_000))
        .ok_or_else(|| {
            RollTrackerError::InvalidConfig(format!(
                "calibration_window_ms {} is too large",
                config.calibration_window_ms
            ))
        })?;
    let calibration_end = first.timestamp_ns.saturating_add(window_ns);

    let mut controller = Controller::new(config.clone(), sink);
    controller.start_calibration()?;

    let mut tracking = false;
    for reading in &recording.readings {
        if !tracking && reading.timestamp_ns >= calibration_end {
            controller.finalize_calibration();
            controller.set_tracking_mode(true)?;
            tracking = true;
        }
        feed(&mut controller, reading);
    }

    if !tracking {
        log::warn!(
            "recording shorter than the {} ms calibration window, nothing tracked",
            config.calibration_window_ms
        );
        controller.finalize_calibration();
        controller.set_tracking_mode(true)?;
    }

    let summary = controller
        .set_tracking_mode(false)?
        .ok_or_else(|| RollTrackerError::Recording("no tracking session to close".to_string()))?;
    log::info!(
        "replayed {} readings ({:.1} s), {} fused samples",
        recording.len(),
        recording.duration_seconds(),
        summary.fused_samples
    );
    Ok((summary, controller))
}

fn feed<S: RollSink>(controller: &mut Controller<S>, reading: &Reading) {
    if let Some(accel) = reading.accel {
        controller.on_accel_sample(accel);
    }
    if let Some(gyro) = reading.gyro {
        controller.on_gyro_sample(gyro);
    }
    if let Some(fix) = reading.gps {
        controller.on_location(fix);
    }
}
