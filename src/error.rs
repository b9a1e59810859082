use thiserror::Error;

/// Roll tracker error types
#[derive(Error, Debug)]
pub enum RollTrackerError {
    #[error("Calibration required before tracking")]
    NotCalibrated,

    #[error("Cannot calibrate while tracking is active")]
    TrackingActive,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("Service stopped")]
    ServiceStopped,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for roll tracker operations
pub type Result<T> = std::result::Result<T, RollTrackerError>;

impl RollTrackerError {
    /// Command rejections leave the controller untouched and can be retried later
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RollTrackerError::NotCalibrated | RollTrackerError::TrackingActive
        )
    }
}
