// Roll Tracker Library
// Lean-angle estimation from accelerometer and gyroscope streams

pub mod calibration;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod extrema;
pub mod filters;
pub mod recording;
pub mod sensors;
pub mod service;
pub mod session;
pub mod track;
pub mod types;

pub use calibration::{CalibrationAccumulator, CalibrationOffsets};
pub use config::{GyroRateUnit, TrackerConfig};
pub use controller::{CalibrationWindow, Controller, ControllerState};
pub use error::{Result, RollTrackerError};
pub use events::{NullSink, RollEvent, RollSink};
pub use extrema::{ExtremaUpdate, RollExtremes};
pub use filters::{RollFilter, RollFilterState, DEFAULT_ALPHA};
pub use recording::{Reading, Recording};
pub use service::{ServiceHandle, ServiceSnapshot};
pub use session::{SessionSummary, TrackingSession};
pub use types::{AccelSample, GpsFix, GyroSample};
