//! Single event loop around the [`Controller`].
//!
//! Sensor samples, UI commands and calibration timer expiries all arrive on
//! one channel and are handled one at a time, so no two of them ever touch
//! controller state concurrently. The calibration timer is a spawned
//! `sleep` that posts back through a weak sender. It is aborted on teardown
//! and any expiry that still slips through carries a stale generation.

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::calibration::CalibrationOffsets;
use crate::config::TrackerConfig;
use crate::controller::{CalibrationWindow, Controller, ControllerState};
use crate::error::{Result, RollTrackerError};
use crate::events::RollSink;
use crate::session::SessionSummary;
use crate::types::{AccelSample, GpsFix, GyroSample};

/// Point-in-time view of the controller
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceSnapshot {
    pub state: ControllerState,
    pub roll_deg: Option<f64>,
    pub offsets: Option<CalibrationOffsets>,
}

enum Command {
    Accel(AccelSample),
    Gyro(GyroSample),
    Location(GpsFix),
    StartCalibration(oneshot::Sender<Result<bool>>),
    FinalizeCalibration(oneshot::Sender<Option<CalibrationOffsets>>),
    CalibrationElapsed(u64),
    SetTracking(bool, oneshot::Sender<Result<Option<SessionSummary>>>),
    Teardown(oneshot::Sender<Option<SessionSummary>>),
    Snapshot(oneshot::Sender<ServiceSnapshot>),
    Shutdown,
}

/// Cloneable handle used by sensor sources and the UI
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Command>,
}

impl ServiceHandle {
    /// Queue an accelerometer sample. Returns `Ok(false)` when the queue is
    /// full and the sample was dropped.
    pub fn push_accel(&self, sample: AccelSample) -> Result<bool> {
        self.try_push(Command::Accel(sample))
    }

    pub fn push_gyro(&self, sample: GyroSample) -> Result<bool> {
        self.try_push(Command::Gyro(sample))
    }

    pub fn push_location(&self, fix: GpsFix) -> Result<bool> {
        self.try_push(Command::Location(fix))
    }

    /// Returns `true` if a new calibration window was opened, `false` if one
    /// was already running.
    pub async fn start_calibration(&self) -> Result<bool> {
        self.request(Command::StartCalibration).await?
    }

    pub async fn finalize_calibration(&self) -> Result<Option<CalibrationOffsets>> {
        self.request(Command::FinalizeCalibration).await
    }

    pub async fn set_tracking_mode(&self, tracking: bool) -> Result<Option<SessionSummary>> {
        self.request(|reply| Command::SetTracking(tracking, reply))
            .await?
    }

    pub async fn teardown(&self) -> Result<Option<SessionSummary>> {
        self.request(Command::Teardown).await
    }

    pub async fn snapshot(&self) -> Result<ServiceSnapshot> {
        self.request(Command::Snapshot).await
    }

    /// Stop the event loop. Commands already queued are handled first.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| RollTrackerError::ServiceStopped)
    }

    fn try_push(&self, command: Command) -> Result<bool> {
        match self.tx.try_send(command) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Closed(_)) => Err(RollTrackerError::ServiceStopped),
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RollTrackerError::ServiceStopped)?;
        reply_rx.await.map_err(|_| RollTrackerError::ServiceStopped)
    }
}

/// Spawn the event loop on the current tokio runtime.
///
/// The join handle yields the controller (and its sink) once the loop
/// stops, either on [`ServiceHandle::shutdown`] or when every handle has
/// been dropped.
pub fn spawn<S>(config: TrackerConfig, sink: S) -> (ServiceHandle, JoinHandle<Controller<S>>)
where
    S: RollSink + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.sensor_channel_capacity.max(1));
    let weak = tx.downgrade();
    let controller = Controller::new(config, sink);
    let task = tokio::spawn(run(controller, rx, weak));
    (ServiceHandle { tx }, task)
}

async fn run<S: RollSink>(
    mut controller: Controller<S>,
    mut rx: mpsc::Receiver<Command>,
    weak: mpsc::WeakSender<Command>,
) -> Controller<S> {
    let mut timer: Option<JoinHandle<()>> = None;

    while let Some(command) = rx.recv().await {
        match command {
            Command::Accel(sample) => controller.on_accel_sample(sample),
            Command::Gyro(sample) => controller.on_gyro_sample(sample),
            Command::Location(fix) => controller.on_location(fix),
            Command::StartCalibration(reply) => {
                let result = controller.start_calibration();
                if let Ok(Some(window)) = &result {
                    cancel_timer(&mut timer);
                    timer = Some(schedule_window(weak.clone(), *window));
                }
                let _ = reply.send(result.map(|window| window.is_some()));
            }
            Command::FinalizeCalibration(reply) => {
                cancel_timer(&mut timer);
                let _ = reply.send(controller.finalize_calibration());
            }
            Command::CalibrationElapsed(generation) => {
                controller.on_calibration_elapsed(generation);
            }
            Command::SetTracking(tracking, reply) => {
                let _ = reply.send(controller.set_tracking_mode(tracking));
            }
            Command::Teardown(reply) => {
                cancel_timer(&mut timer);
                let _ = reply.send(controller.teardown());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(ServiceSnapshot {
                    state: controller.state(),
                    roll_deg: controller.roll_deg(),
                    offsets: controller.offsets().copied(),
                });
            }
            Command::Shutdown => {
                log::info!("roll tracker service shutting down");
                break;
            }
        }
    }

    cancel_timer(&mut timer);
    controller
}

fn schedule_window(weak: mpsc::WeakSender<Command>, window: CalibrationWindow) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(window.duration).await;
        if let Some(tx) = weak.upgrade() {
            let _ = tx.send(Command::CalibrationElapsed(window.generation)).await;
        }
    })
}

fn cancel_timer(timer: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = timer.take() {
        handle.abort();
    }
}
