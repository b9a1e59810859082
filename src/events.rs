use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationOffsets;
use crate::session::SessionSummary;

/// Output of the roll tracker, pushed to whatever owns the display
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RollEvent {
    /// Fused roll in degrees (tracking only)
    FilteredAngle(f64),
    /// New positive extreme (tracking only)
    MaxPositiveRoll(f64),
    /// Magnitude of a new negative extreme (tracking only)
    MaxNegativeRoll(f64),
    CalibrationComplete(CalibrationOffsets),
    SessionEnded(Box<SessionSummary>),
}

impl RollEvent {
    /// Angle and extrema events, as opposed to lifecycle notifications
    pub fn is_measurement(&self) -> bool {
        matches!(
            self,
            RollEvent::FilteredAngle(_)
                | RollEvent::MaxPositiveRoll(_)
                | RollEvent::MaxNegativeRoll(_)
        )
    }
}

/// Destination for roll events
pub trait RollSink {
    fn emit(&mut self, event: RollEvent);
}

impl RollSink for Vec<RollEvent> {
    fn emit(&mut self, event: RollEvent) {
        self.push(event);
    }
}

impl RollSink for crossbeam::channel::Sender<RollEvent> {
    fn emit(&mut self, event: RollEvent) {
        if self.send(event).is_err() {
            log::debug!("roll event receiver dropped");
        }
    }
}

impl RollSink for tokio::sync::mpsc::UnboundedSender<RollEvent> {
    fn emit(&mut self, event: RollEvent) {
        if self.send(event).is_err() {
            log::debug!("roll event receiver dropped");
        }
    }
}

/// Discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RollSink for NullSink {
    fn emit(&mut self, _event: RollEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<RollEvent> = Vec::new();
        sink.emit(RollEvent::FilteredAngle(1.5));
        sink.emit(RollEvent::MaxNegativeRoll(2.0));
        assert_eq!(
            sink,
            vec![RollEvent::FilteredAngle(1.5), RollEvent::MaxNegativeRoll(2.0)]
        );
    }

    #[test]
    fn test_crossbeam_sink() {
        let (mut tx, rx) = crossbeam::channel::unbounded();
        tx.emit(RollEvent::MaxPositiveRoll(4.0));
        assert_eq!(rx.try_recv().unwrap(), RollEvent::MaxPositiveRoll(4.0));

        // Disconnected receiver is not an error for the producer
        drop(rx);
        tx.emit(RollEvent::FilteredAngle(0.0));
    }

    #[test]
    fn test_measurement_classification() {
        assert!(RollEvent::FilteredAngle(0.0).is_measurement());
        assert!(!RollEvent::CalibrationComplete(CalibrationOffsets::identity()).is_measurement());
    }
}
