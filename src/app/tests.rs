use super::*;
use crate::camera::{
    DeviceCall, SimulatedCamera, SimulatedMonitor, FOCUS_MODE, RELEASE_FULL, RELEASE_IMMEDIATE,
    REMOTE_RELEASE,
};
use crate::config::AstroConfig;
use crate::error::AstroError;
use crate::session::CaptureSummary;
use crate::status::CapturedOutput;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn create_test_config(target: &Path, frames: u32, duration_seconds: u32) -> AstroConfig {
    let mut config = AstroConfig::default();
    config.exposure.frames = frames;
    config.exposure.duration_seconds = duration_seconds;
    config.output.target = target.display().to_string();
    config
}

fn create_orchestrator(config: AstroConfig) -> (SessionOrchestrator, SimulatedMonitor, CapturedOutput) {
    let camera = SimulatedCamera::new().with_existing_files(3);
    let monitor = camera.monitor();
    let output = CapturedOutput::new();

    let orchestrator = SessionOrchestrator::new(config)
        .with_device(Box::new(camera))
        .with_status_output(Arc::new(output.clone()))
        .without_signal_handlers();

    (orchestrator, monitor, output)
}

#[tokio::test]
async fn test_bad_kind_rejected_before_camera_use() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path(), 10, 60);
    config.exposure.kind = "flats".to_string();
    let (mut orchestrator, monitor, _output) = create_orchestrator(config);

    let reason = orchestrator.run().await;

    assert!(matches!(
        reason,
        ShutdownReason::Failed(AstroError::Validation { .. })
    ));
    assert_eq!(reason.exit_code(), EXIT_FAILURE);
    assert!(monitor.calls().is_empty());
    assert!(orchestrator.session().is_none());
}

#[tokio::test]
async fn test_session_ceiling_rejected_before_camera_use() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 10, 3600);
    let (mut orchestrator, monitor, _output) = create_orchestrator(config);

    let reason = orchestrator.run().await;

    assert!(matches!(
        reason,
        ShutdownReason::Failed(AstroError::Validation { .. })
    ));
    assert!(monitor.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_eight_hour_session_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 8, 3600);
    let (mut orchestrator, monitor, _output) = create_orchestrator(config);

    let reason = orchestrator.run().await;

    match reason {
        ShutdownReason::Completed(summary) => assert_eq!(summary.frames_captured, 8),
        other => panic!("Expected completed session, got {:?}", other),
    }
    assert_eq!(monitor.set_count(REMOTE_RELEASE, RELEASE_IMMEDIATE), 8);
}

#[tokio::test(start_paused = true)]
async fn test_three_frames_complete_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 3, 20);
    let (mut orchestrator, monitor, output) = create_orchestrator(config);

    let reason = orchestrator.run().await;
    assert_eq!(reason.exit_code(), EXIT_SUCCESS);

    match reason {
        ShutdownReason::Completed(summary) => {
            assert_eq!(summary.frames_captured, 3);
            assert_eq!(summary.files_downloaded, 3);
        }
        other => panic!("Expected completed session, got {:?}", other),
    }

    assert_eq!(monitor.set_count(REMOTE_RELEASE, RELEASE_IMMEDIATE), 3);
    assert_eq!(monitor.set_count(REMOTE_RELEASE, RELEASE_FULL), 3);
    assert_eq!(monitor.calls().last(), Some(&DeviceCall::Disconnect));

    for name in ["IMG_0004.CR2", "IMG_0005.CR2", "IMG_0006.CR2"] {
        assert!(dir.path().join("lights").join(name).exists());
    }
    // Frames already on the card are left alone
    assert!(!dir.path().join("lights").join("IMG_0001.CR2").exists());

    assert_eq!(output.lines().len(), 60);
    assert_eq!(orchestrator.session().map(|s| s.current), Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_during_exposure_releases_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 5, 30);
    let (mut orchestrator, monitor, _output) = create_orchestrator(config);

    let abort = orchestrator.abort_token();
    tokio::spawn(async move {
        // Second frame, mid-exposure
        tokio::time::sleep(Duration::from_secs(45)).await;
        abort.cancel();
    });

    let reason = orchestrator.run().await;

    assert!(matches!(reason, ShutdownReason::Interrupted));
    assert_eq!(reason.exit_code(), EXIT_INTERRUPTED);

    // One release for the completed first frame, one from the abort path
    assert_eq!(monitor.set_count(REMOTE_RELEASE, RELEASE_IMMEDIATE), 2);
    assert_eq!(monitor.set_count(REMOTE_RELEASE, RELEASE_FULL), 2);
    assert!(!monitor.shutter_open());

    let calls = monitor.calls();
    let n = calls.len();
    assert_eq!(
        calls[n - 2],
        DeviceCall::Set(REMOTE_RELEASE.to_string(), RELEASE_FULL.to_string())
    );
    assert_eq!(calls[n - 1], DeviceCall::Disconnect);
}

#[tokio::test(start_paused = true)]
async fn test_release_failure_after_interrupt_still_exits() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 0, 30);
    let (mut orchestrator, monitor, _output) = create_orchestrator(config);

    let abort = orchestrator.abort_token();
    let fault = monitor.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        fault.fail_setting(REMOTE_RELEASE);
        abort.cancel();
    });

    let reason = orchestrator.run().await;

    assert!(matches!(reason, ShutdownReason::Interrupted));
    assert_eq!(monitor.set_count(REMOTE_RELEASE, RELEASE_FULL), 1);
    assert_eq!(monitor.calls().last(), Some(&DeviceCall::Disconnect));
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_during_last_download_is_not_a_success() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 1, 10);
    let (mut orchestrator, monitor, _output) = create_orchestrator(config);
    monitor.cancel_on_download(orchestrator.abort_token());

    let reason = orchestrator.run().await;

    assert!(matches!(reason, ShutdownReason::Interrupted));
    assert_eq!(reason.exit_code(), EXIT_INTERRUPTED);
    // The transfer in flight completes, then the session unwinds
    assert!(dir.path().join("lights").join("IMG_0004.CR2").exists());
    assert_eq!(monitor.set_count(REMOTE_RELEASE, RELEASE_FULL), 2);
    assert_eq!(monitor.calls().last(), Some(&DeviceCall::Disconnect));
}

#[tokio::test]
async fn test_interrupt_listeners_start_before_validation() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path(), 1, 10);
    config.exposure.kind = "flats".to_string();
    let camera = SimulatedCamera::new();
    let monitor = camera.monitor();

    let mut orchestrator = SessionOrchestrator::new(config)
        .with_device(Box::new(camera))
        .with_status_output(Arc::new(CapturedOutput::new()));

    let reason = orchestrator.run().await;

    assert!(matches!(
        reason,
        ShutdownReason::Failed(AstroError::Validation { .. })
    ));
    // Already listening, so nothing new is installed
    assert!(!orchestrator.abort.listen());
    assert!(monitor.calls().is_empty());
}

#[tokio::test]
async fn test_initialization_failure_disconnects() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 2, 10);
    let (mut orchestrator, monitor, _output) = create_orchestrator(config);
    monitor.fail_setting(FOCUS_MODE);

    let reason = orchestrator.run().await;

    match &reason {
        ShutdownReason::Failed(AstroError::Setting { setting, .. }) => {
            assert_eq!(setting, FOCUS_MODE)
        }
        other => panic!("Expected setting failure, got {:?}", other),
    }
    assert_eq!(reason.exit_code(), EXIT_FAILURE);
    assert_eq!(monitor.set_count(REMOTE_RELEASE, RELEASE_IMMEDIATE), 0);
    assert_eq!(monitor.calls().last(), Some(&DeviceCall::Disconnect));
}

#[tokio::test]
async fn test_unknown_backend_fails_to_connect() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path(), 1, 10);
    config.device.backend = "usb-ptp".to_string();

    let mut orchestrator = SessionOrchestrator::new(config)
        .with_status_output(Arc::new(CapturedOutput::new()))
        .without_signal_handlers();

    let reason = orchestrator.run().await;
    assert!(matches!(
        reason,
        ShutdownReason::Failed(AstroError::Connection { .. })
    ));
}

#[test]
fn test_exit_codes() {
    let aborted: crate::error::Result<CaptureSummary> = Err(AstroError::Aborted);
    assert_eq!(ShutdownReason::from(aborted).exit_code(), EXIT_INTERRUPTED);

    let failed: crate::error::Result<CaptureSummary> = Err(AstroError::system("boom"));
    assert_eq!(ShutdownReason::from(failed).exit_code(), EXIT_FAILURE);

    let completed: crate::error::Result<CaptureSummary> = Ok(CaptureSummary::default());
    assert_eq!(ShutdownReason::from(completed).exit_code(), EXIT_SUCCESS);
}
