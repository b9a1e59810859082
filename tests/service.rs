use approx::assert_abs_diff_eq;
use tokio::time::{sleep, Duration};

use roll_tracker::service;
use roll_tracker::{
    AccelSample, ControllerState, GpsFix, GyroSample, RollEvent, RollTrackerError, TrackerConfig,
};

const MS: i64 = 1_000_000;

fn calibration_events(events: &[RollEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, RollEvent::CalibrationComplete(_)))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_calibration_timer_finalizes_window() {
    let (handle, task) = service::spawn(TrackerConfig::default(), Vec::new());

    assert!(handle.start_calibration().await.unwrap());
    for i in 0..10 {
        assert!(handle
            .push_gyro(GyroSample::new(1.0, 0.0, 0.0, i * 10 * MS))
            .unwrap());
    }

    sleep(Duration::from_millis(2900)).await;
    assert_eq!(
        handle.snapshot().await.unwrap().state,
        ControllerState::Calibrating
    );

    sleep(Duration::from_millis(200)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, ControllerState::Calibrated);
    assert_abs_diff_eq!(snapshot.offsets.unwrap().gyro_bias.x, 1.0, epsilon = 1e-12);

    handle.shutdown().await.unwrap();
    let controller = task.await.unwrap();
    assert_eq!(calibration_events(controller.sink()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_start_keeps_single_window() {
    let (handle, task) = service::spawn(TrackerConfig::default(), Vec::new());

    assert!(handle.start_calibration().await.unwrap());
    sleep(Duration::from_millis(1000)).await;
    assert!(!handle.start_calibration().await.unwrap());

    // The original deadline still applies
    sleep(Duration::from_millis(2100)).await;
    assert_eq!(
        handle.snapshot().await.unwrap().state,
        ControllerState::Calibrated
    );

    handle.shutdown().await.unwrap();
    let controller = task.await.unwrap();
    assert_eq!(calibration_events(controller.sink()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_pending_window() {
    let (handle, task) = service::spawn(TrackerConfig::default(), Vec::new());

    handle.start_calibration().await.unwrap();
    for i in 0..10 {
        handle
            .push_gyro(GyroSample::new(2.0, 0.0, 0.0, i * 10 * MS))
            .unwrap();
    }
    sleep(Duration::from_millis(1000)).await;

    assert!(handle.teardown().await.unwrap().is_none());
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, ControllerState::Idle);
    assert!(snapshot.offsets.is_none());

    // Well past the cancelled deadline
    sleep(Duration::from_millis(5000)).await;
    assert_eq!(handle.snapshot().await.unwrap().state, ControllerState::Idle);

    // Re-entry starts from an empty accumulator
    assert!(handle.start_calibration().await.unwrap());
    sleep(Duration::from_millis(3100)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, ControllerState::Calibrated);
    assert!(snapshot.offsets.unwrap().is_identity());

    handle.shutdown().await.unwrap();
    let controller = task.await.unwrap();
    assert_eq!(calibration_events(controller.sink()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tracking_rejected_until_calibrated() {
    let (handle, task) = service::spawn(TrackerConfig::default(), Vec::new());

    assert!(matches!(
        handle.set_tracking_mode(true).await,
        Err(RollTrackerError::NotCalibrated)
    ));

    handle.start_calibration().await.unwrap();
    assert!(matches!(
        handle.set_tracking_mode(true).await,
        Err(RollTrackerError::NotCalibrated)
    ));

    assert!(handle.finalize_calibration().await.unwrap().is_some());
    handle.set_tracking_mode(true).await.unwrap();
    assert!(matches!(
        handle.start_calibration().await,
        Err(RollTrackerError::TrackingActive)
    ));
    assert_eq!(
        handle.snapshot().await.unwrap().state,
        ControllerState::Tracking
    );

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_full_journey() {
    let (handle, task) = service::spawn(TrackerConfig::default(), Vec::new());

    handle.start_calibration().await.unwrap();
    for i in 0..100 {
        let t = i * 10 * MS;
        handle.push_accel(AccelSample::new(0.0, 0.0, 9.81)).unwrap();
        handle
            .push_gyro(GyroSample::new(0.5, 0.0, 0.0, t))
            .unwrap();
    }
    sleep(Duration::from_millis(3100)).await;

    handle.set_tracking_mode(true).await.unwrap();
    handle.push_accel(AccelSample::new(0.0, 0.0, 9.81)).unwrap();
    handle.push_location(GpsFix::new(45.0, 9.0)).unwrap();
    handle
        .push_gyro(GyroSample::new(0.5, 0.0, 0.0, 4000 * MS))
        .unwrap();
    handle
        .push_gyro(GyroSample::new(10.5, 0.0, 0.0, 5000 * MS))
        .unwrap();
    handle.push_location(GpsFix::new(45.001, 9.0)).unwrap();

    let roll = handle.snapshot().await.unwrap().roll_deg.unwrap();
    assert_abs_diff_eq!(roll, 9.7, epsilon = 1e-9);

    let summary = handle.set_tracking_mode(false).await.unwrap().unwrap();
    assert_abs_diff_eq!(summary.max_positive_roll, 9.7, epsilon = 1e-9);
    assert_eq!(summary.fused_samples, 1);
    assert_eq!(summary.path.len(), 2);

    handle.shutdown().await.unwrap();
    let events = task.await.unwrap().into_sink();

    let measurements: Vec<&RollEvent> = events.iter().filter(|e| e.is_measurement()).collect();
    assert_eq!(measurements.len(), 2);
    assert!(matches!(measurements[0], RollEvent::MaxPositiveRoll(_)));
    assert!(matches!(measurements[1], RollEvent::FilteredAngle(_)));
    assert!(matches!(events.last(), Some(RollEvent::SessionEnded(_))));
}

#[tokio::test(start_paused = true)]
async fn test_handle_after_shutdown() {
    let (handle, task) = service::spawn(TrackerConfig::default(), Vec::new());
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    assert!(matches!(
        handle.snapshot().await,
        Err(RollTrackerError::ServiceStopped)
    ));
    assert!(matches!(
        handle.push_accel(AccelSample::default()),
        Err(RollTrackerError::ServiceStopped)
    ));
}
