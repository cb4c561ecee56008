use super::*;
use crate::config::SessionConfig;
use crate::driver::{CompletionReceiver, DeviceErrorKind, MockBehavior, MockCameraDriver, MockProbe};
use crate::error::{CameraError, SessionError};
use crate::events::{FocusOutcome, UiMessage};
use crate::surface::{Dimensions, SurfaceTarget};
use proptest::prelude::*;
use tokio::sync::mpsc;

struct Harness {
    controller: CameraSessionController,
    completions: CompletionReceiver,
    ui: mpsc::UnboundedReceiver<UiMessage>,
    probe: MockProbe,
}

impl Harness {
    fn new(behavior: MockBehavior) -> Self {
        Self::with_config(behavior, SessionConfig::default())
    }

    fn with_config(behavior: MockBehavior, config: SessionConfig) -> Self {
        let driver = MockCameraDriver::with_behavior(behavior);
        let probe = driver.probe();
        let (ui_tx, ui) = mpsc::unbounded_channel();
        let (controller, completions) = CameraSessionBuilder::new()
            .config(config)
            .driver(driver)
            .notifier(ui_tx)
            .build()
            .unwrap();
        Self {
            controller,
            completions,
            ui,
            probe,
        }
    }

    /// Apply queued hardware completions on the test thread
    fn pump(&mut self) -> usize {
        self.controller.dispatch_pending(&mut self.completions)
    }

    fn ui_messages(&mut self) -> Vec<UiMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.ui.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Surface ready and sized, preview running
    fn start_session(&mut self) {
        self.controller.on_surface_ready(surface());
        self.controller.on_surface_resized(640, 480);
        assert!(self.controller.is_preview_running());
    }
}

fn surface() -> SurfaceTarget {
    SurfaceTarget::new(1, "preview")
}

fn assert_invariants(harness: &Harness) {
    let controller = &harness.controller;
    if controller.is_preview_running() {
        assert!(controller.is_device_held(), "preview running without a device");
        assert!(controller.surface_exists(), "preview running without a surface");
    }
    if !controller.is_device_held() {
        assert_eq!(controller.focus_state(), FocusState::Idle);
        assert!(!controller.capture_state().in_progress);
        assert_eq!(harness.probe.open_devices(), 0);
    }
    assert!(
        !(controller.focus_state() == FocusState::InProgress
            && controller.capture_state().in_progress),
        "focus and capture in flight together"
    );
    assert!(harness.probe.open_devices() <= 1);
}

#[test]
fn test_surface_ready_acquires_without_preview() {
    let mut h = Harness::new(MockBehavior::default());

    h.controller.on_surface_ready(surface());

    assert!(h.controller.is_device_held());
    assert!(!h.controller.is_preview_running());
    let calls = h.probe.calls();
    assert_eq!(calls.opens, 1);
    assert_eq!(calls.bound_surface, Some(surface()));
    assert_eq!(calls.parameter_commits, 0);
    assert_invariants(&h);
}

#[test]
fn test_resize_configures_and_starts_preview() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    let calls = h.probe.calls();
    assert_eq!(calls.preview_starts, 1);
    let parameters = calls.last_parameters.unwrap();
    assert_eq!(parameters.picture_size, Dimensions::new(640, 480));
    assert_eq!(parameters.picture_format, crate::driver::PictureFormat::Jpeg);
    assert_eq!(h.controller.current_dimensions(), Dimensions::new(640, 480));

    // A second resize recommits but does not restart preview
    h.controller.on_surface_resized(800, 600);
    let calls = h.probe.calls();
    assert_eq!(calls.parameter_commits, 2);
    assert_eq!(calls.preview_starts, 1);
}

#[test]
fn test_resize_without_device_records_dimensions_only() {
    let mut h = Harness::new(MockBehavior::default());

    h.controller.on_surface_resized(320, 240);

    assert!(!h.controller.is_device_held());
    assert_eq!(h.controller.current_dimensions(), Dimensions::new(320, 240));
    assert_eq!(h.probe.calls().opens, 0);
}

#[test]
fn test_focus_success_scenario() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    assert_eq!(h.controller.request_auto_focus(), Ok(true));
    assert_eq!(h.controller.focus_state(), FocusState::InProgress);
    assert_eq!(h.pump(), 0);

    assert!(h.probe.complete_focus(true));
    assert_eq!(h.pump(), 1);

    let messages = h.ui_messages();
    assert_eq!(messages.len(), 1);
    assert!(matches!(
        messages[0],
        UiMessage::FocusResult {
            outcome: FocusOutcome::Success,
            ..
        }
    ));
    assert_eq!(h.controller.focus_state(), FocusState::Succeeded);

    assert_eq!(h.controller.request_auto_focus(), Ok(true));
    assert_eq!(h.probe.calls().focus_requests, 2);
}

#[test]
fn test_focus_failure_reported() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    h.controller.request_auto_focus().unwrap();
    h.probe.complete_focus(false);
    h.pump();

    assert_eq!(h.controller.focus_state(), FocusState::Failed);
    assert!(matches!(
        h.ui_messages().as_slice(),
        [UiMessage::FocusResult {
            outcome: FocusOutcome::Failure,
            ..
        }]
    ));
}

#[test]
fn test_back_to_back_focus_requests() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    assert_eq!(h.controller.request_auto_focus(), Ok(true));
    assert_eq!(h.controller.request_auto_focus(), Ok(false));

    assert_eq!(h.probe.calls().focus_requests, 1);
}

#[test]
fn test_capture_rejected_while_focusing() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    h.controller.request_auto_focus().unwrap();
    assert_eq!(h.controller.request_capture(), Ok(false));

    assert!(!h.controller.capture_state().in_progress);
    assert_eq!(h.controller.focus_state(), FocusState::InProgress);
    assert_eq!(h.probe.calls().capture_requests, 0);
}

#[test]
fn test_focus_rejected_while_capturing() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    assert_eq!(h.controller.request_capture(), Ok(true));

    // The shutter recommit must not release the capture early
    h.probe.fire_shutter();
    h.pump();
    assert!(h.controller.capture_state().in_progress);
    assert_eq!(h.controller.request_auto_focus(), Ok(false));
    assert_eq!(h.probe.calls().focus_requests, 0);
}

#[test]
fn test_capture_before_first_resize_survives_shutter() {
    let mut h = Harness::new(MockBehavior::default());
    h.controller.on_surface_ready(surface());
    assert!(!h.controller.is_preview_running());

    assert_eq!(h.controller.request_capture(), Ok(true));

    // Shutter starts preview for the first time; the capture is still pending
    h.probe.fire_shutter();
    h.pump();
    assert!(h.controller.is_preview_running());
    assert!(h.controller.capture_state().in_progress);
    assert_eq!(h.controller.request_auto_focus(), Ok(false));
    assert_eq!(h.probe.calls().focus_requests, 0);

    h.probe.deliver_picture(Some(vec![0xff, 0xd8]));
    h.pump();
    assert!(!h.controller.capture_state().in_progress);
    assert_eq!(h.controller.request_auto_focus(), Ok(true));
}

#[test]
fn test_empty_capture_restarts_preview() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    h.controller.request_capture().unwrap();
    assert!(!h.probe.is_previewing());

    h.probe.fire_shutter();
    h.probe.deliver_picture(Some(Vec::new()));
    assert_eq!(h.pump(), 2);

    assert!(h.ui_messages().is_empty());
    assert!(!h.controller.capture_state().in_progress);
    let calls = h.probe.calls();
    assert_eq!(calls.parameter_commits, 2);
    assert_eq!(calls.preview_starts, 2);
    assert!(h.probe.is_previewing());
    assert!(h.controller.is_preview_running());
}

#[test]
fn test_missing_capture_data_restarts_preview() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    h.controller.request_capture().unwrap();
    h.probe.deliver_picture(None);
    h.pump();

    assert!(h.ui_messages().is_empty());
    assert!(!h.controller.capture_state().in_progress);
    assert!(h.probe.is_previewing());
}

#[test]
fn test_capture_data_posted() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    h.controller.request_capture().unwrap();
    h.probe.fire_shutter();
    h.probe.deliver_picture(Some(vec![0xff, 0xd8, 0xff]));
    h.pump();

    let messages = h.ui_messages();
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        UiMessage::CaptureData { bytes, .. } => assert_eq!(bytes, &vec![0xff, 0xd8, 0xff]),
        other => panic!("Unexpected message: {:?}", other),
    }
    assert!(!h.controller.capture_state().in_progress);
    // Preview is left for the host to restart once it has consumed the image
    assert_eq!(h.probe.calls().preview_starts, 1);

    h.controller.restart_preview().unwrap();
    assert!(h.probe.is_previewing());
    assert_eq!(h.controller.request_auto_focus(), Ok(true));
}

#[test]
fn test_surface_gone_releases_everything() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();
    h.controller.request_auto_focus().unwrap();

    h.controller.on_surface_gone();

    assert!(!h.controller.is_device_held());
    assert!(!h.controller.is_preview_running());
    assert!(!h.controller.surface_exists());
    assert_eq!(h.controller.focus_state(), FocusState::Idle);
    let calls = h.probe.calls();
    assert_eq!(calls.preview_stops, 1);
    assert_eq!(calls.releases, 1);
    assert_invariants(&h);

    // The hardware result arrives after release and is dropped
    h.probe.complete_focus(true);
    assert_eq!(h.pump(), 1);
    assert!(h.ui_messages().is_empty());
    assert_eq!(h.controller.focus_state(), FocusState::Idle);
}

#[test]
fn test_surface_gone_without_device() {
    let mut h = Harness::new(MockBehavior::default());
    h.controller.on_surface_gone();

    assert!(!h.controller.is_device_held());
    assert!(!h.controller.is_preview_running());
    assert_eq!(h.probe.calls().releases, 0);
}

#[test]
fn test_resume_without_surface_does_not_acquire() {
    let mut h = Harness::new(MockBehavior::default());

    h.controller.resume();

    assert!(!h.controller.is_device_held());
    assert_eq!(h.probe.calls().opens, 0);
}

#[test]
fn test_pause_and_resume_reapply_last_dimensions() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();
    let first_session = h.controller.session_id();

    h.controller.pause();
    assert!(!h.controller.is_device_held());
    assert!(!h.controller.is_host_active());
    assert!(h.controller.surface_exists());
    assert_invariants(&h);

    h.controller.resume();
    assert!(h.controller.is_device_held());
    assert!(h.controller.is_preview_running());
    assert_ne!(h.controller.session_id(), first_session);

    let calls = h.probe.calls();
    assert_eq!(calls.opens, 2);
    assert_eq!(calls.releases, 1);
    assert_eq!(
        calls.last_parameters.map(|p| p.picture_size),
        Some(Dimensions::new(640, 480))
    );
}

#[test]
fn test_surface_ready_while_paused_waits_for_resume() {
    let mut config = SessionConfig::default();
    config.session.host_starts_active = false;
    let mut h = Harness::with_config(MockBehavior::default(), config);

    h.controller.on_surface_ready(surface());
    assert!(!h.controller.is_device_held());

    h.controller.resume();
    assert!(h.controller.is_device_held());
    assert!(h.controller.is_preview_running());
}

#[test]
fn test_bind_failure_releases_device() {
    let mut h = Harness::new(MockBehavior {
        fail_bind: true,
        ..Default::default()
    });

    h.controller.on_surface_ready(surface());

    assert!(!h.controller.is_device_held());
    let calls = h.probe.calls();
    assert_eq!(calls.opens, 1);
    assert_eq!(calls.releases, 1);
    assert_eq!(h.probe.open_devices(), 0);

    // Resizing without a device is harmless
    h.controller.on_surface_resized(640, 480);
    assert!(!h.controller.is_preview_running());

    // The next lifecycle trigger is the recovery path
    h.probe.update_behavior(|b| b.fail_bind = false);
    h.controller.pause();
    h.controller.resume();
    assert!(h.controller.is_device_held());
    assert!(h.controller.is_preview_running());
}

#[test]
fn test_open_failure_leaves_no_device() {
    let mut h = Harness::new(MockBehavior {
        fail_open: true,
        ..Default::default()
    });

    h.controller.on_surface_ready(surface());

    assert!(!h.controller.is_device_held());
    assert_eq!(h.probe.calls().releases, 0);
    assert_invariants(&h);
}

#[test]
fn test_requests_without_device() {
    let mut h = Harness::new(MockBehavior::default());

    assert!(matches!(
        h.controller.request_auto_focus(),
        Err(CameraError::NoDevice { .. })
    ));
    assert!(matches!(
        h.controller.request_capture(),
        Err(CameraError::NoDevice { .. })
    ));
    assert!(h.controller.start_preview().is_err());
}

#[test]
fn test_preview_start_failure_is_retried_on_next_resize() {
    let mut h = Harness::new(MockBehavior {
        fail_preview: true,
        ..Default::default()
    });
    h.controller.on_surface_ready(surface());
    h.controller.on_surface_resized(640, 480);

    assert!(h.controller.is_device_held());
    assert!(!h.controller.is_preview_running());
    assert!(matches!(
        h.controller.start_preview(),
        Err(CameraError::Preview { .. })
    ));
    assert_invariants(&h);

    h.probe.update_behavior(|b| b.fail_preview = false);
    h.controller.on_surface_resized(640, 480);
    assert!(h.controller.is_preview_running());
    assert!(h.probe.is_previewing());
}

#[test]
fn test_driver_rejecting_focus_reverts_state() {
    let mut h = Harness::new(MockBehavior {
        fail_focus: true,
        ..Default::default()
    });
    h.start_session();

    assert!(matches!(
        h.controller.request_auto_focus(),
        Err(CameraError::Focus { .. })
    ));
    assert_eq!(h.controller.focus_state(), FocusState::Idle);
    assert_eq!(h.controller.request_capture(), Ok(true));
}

#[test]
fn test_clear_auto_focus_allows_new_request() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    h.controller.request_auto_focus().unwrap();
    h.controller.clear_auto_focus();
    assert_eq!(h.controller.focus_state(), FocusState::Idle);

    // Late result for the abandoned request is still posted but changes nothing
    h.probe.complete_focus(false);
    h.controller.request_capture().unwrap();
    h.pump();

    assert_eq!(h.ui_messages().len(), 1);
    assert!(h.controller.capture_state().in_progress);
    assert_ne!(h.controller.focus_state(), FocusState::InProgress);
}

#[test]
fn test_late_focus_result_does_not_finish_newer_request() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    h.controller.request_auto_focus().unwrap();
    h.controller.clear_auto_focus();
    // Simulate the stale completion arriving while a second focus runs
    h.probe.complete_focus(true);
    h.controller.request_auto_focus().unwrap();
    h.pump();

    assert_eq!(h.controller.focus_state(), FocusState::InProgress);
    h.probe.complete_focus(true);
    h.pump();
    assert_eq!(h.controller.focus_state(), FocusState::Succeeded);
    assert_eq!(h.ui_messages().len(), 2);
}

#[test]
fn test_clear_capture() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    h.controller.request_capture().unwrap();
    h.controller.clear_capture();

    assert!(!h.controller.capture_state().in_progress);
    assert_eq!(h.controller.request_auto_focus(), Ok(true));
}

#[test]
fn test_completion_from_previous_session_is_dropped() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    h.controller.request_capture().unwrap();
    h.controller.pause();
    h.controller.resume();

    h.probe.fire_shutter();
    h.probe.deliver_picture(Some(vec![1, 2, 3]));
    assert_eq!(h.pump(), 2);

    assert!(h.ui_messages().is_empty());
    // No recommit beyond the two configures of each session
    assert_eq!(h.probe.calls().parameter_commits, 2);
    assert!(!h.controller.capture_state().in_progress);
}

#[test]
fn test_device_error_keeps_session_open() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    assert!(h.probe.report_error(DeviceErrorKind::ServerDied));
    assert!(h.probe.report_error(DeviceErrorKind::Unknown(100)));
    assert_eq!(h.pump(), 2);

    assert!(h.controller.is_device_held());
    assert!(h.controller.is_preview_running());
}

#[test]
fn test_current_preview_size() {
    let mut h = Harness::new(MockBehavior {
        preview_size: Some(Dimensions::new(352, 288)),
        ..Default::default()
    });
    assert_eq!(h.controller.current_preview_size(), None);

    h.controller.on_surface_ready(surface());
    assert_eq!(h.controller.current_preview_size(), None);

    h.controller.on_surface_resized(640, 480);
    assert_eq!(
        h.controller.current_preview_size(),
        Some(Dimensions::new(352, 288))
    );

    h.controller.on_surface_gone();
    assert_eq!(h.controller.current_preview_size(), None);
}

#[tokio::test]
async fn test_preview_frame_sink() {
    let mut h = Harness::new(MockBehavior::default());
    let (sink, mut frames) = mpsc::channel(4);

    assert!(!h.controller.set_preview_frame_sink(Some(sink.clone())));

    h.start_session();
    assert!(h.controller.set_preview_frame_sink(Some(sink)));
    assert!(h.probe.push_preview_frame(vec![9; 8]));
    assert_eq!(frames.recv().await.unwrap().data, vec![9; 8]);

    assert!(h.controller.set_preview_frame_sink(None));
    assert!(!h.probe.push_preview_frame(vec![9; 8]));
}

#[test]
fn test_start_preview_is_idempotent() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();

    h.controller.start_preview().unwrap();
    assert_eq!(h.probe.calls().preview_starts, 1);

    h.controller.restart_preview().unwrap();
    assert_eq!(h.probe.calls().preview_starts, 2);
}

#[test]
fn test_parameter_rejection_keeps_device() {
    let mut h = Harness::new(MockBehavior {
        fail_parameters: true,
        ..Default::default()
    });

    h.controller.on_surface_ready(surface());
    h.controller.on_surface_resized(640, 480);

    assert!(h.controller.is_device_held());
    assert!(!h.controller.is_preview_running());
    assert_invariants(&h);
}

#[test]
fn test_snapshot() {
    let mut h = Harness::new(MockBehavior::default());
    h.start_session();
    h.controller.request_auto_focus().unwrap();

    let snapshot = h.controller.snapshot();
    assert!(snapshot.device_held);
    assert_eq!(snapshot.session_id, Some(1));
    assert!(snapshot.preview_running);
    assert!(snapshot.host_active);
    assert_eq!(snapshot.dimensions, Dimensions::new(640, 480));
    assert_eq!(snapshot.focus_state, FocusState::InProgress);
    assert!(!snapshot.capture_in_progress);
}

#[test]
fn test_dropping_controller_releases_device() {
    let h = Harness::new(MockBehavior::default());
    let probe = h.probe.clone();
    let mut controller = h.controller;
    controller.on_surface_ready(surface());

    drop(controller);
    assert_eq!(probe.calls().releases, 1);
}

#[test]
fn test_builder_requires_driver() {
    let (ui_tx, _ui_rx) = mpsc::unbounded_channel::<UiMessage>();
    let result = CameraSessionBuilder::new().notifier(ui_tx).build();

    match result {
        Err(SessionError::System { message }) => {
            assert!(message.contains("Camera driver must be specified"))
        }
        _ => panic!("Expected system error for missing driver"),
    }
}

#[derive(Debug, Clone)]
enum Step {
    Ready,
    Resized(u32, u32),
    Gone,
    Resume,
    Pause,
    Focus,
    Capture,
    ClearFocus,
    ClearCapture,
    CompleteFocus(bool),
    Shutter,
    Picture(bool),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Ready),
        (1u32..2000, 1u32..2000).prop_map(|(w, h)| Step::Resized(w, h)),
        Just(Step::Gone),
        Just(Step::Resume),
        Just(Step::Pause),
        Just(Step::Focus),
        Just(Step::Capture),
        Just(Step::ClearFocus),
        Just(Step::ClearCapture),
        any::<bool>().prop_map(Step::CompleteFocus),
        Just(Step::Shutter),
        any::<bool>().prop_map(Step::Picture),
    ]
}

proptest! {
    #[test]
    fn prop_invariants_hold_for_any_event_sequence(
        steps in prop::collection::vec(step_strategy(), 1..64)
    ) {
        let mut h = Harness::new(MockBehavior::default());

        for step in steps {
            match step {
                Step::Ready => h.controller.on_surface_ready(surface()),
                Step::Resized(w, height) => h.controller.on_surface_resized(w, height),
                Step::Gone => {
                    h.controller.on_surface_gone();
                    prop_assert!(!h.controller.is_device_held());
                    prop_assert!(!h.controller.is_preview_running());
                    prop_assert_eq!(h.probe.open_devices(), 0);
                }
                Step::Resume => h.controller.resume(),
                Step::Pause => h.controller.pause(),
                Step::Focus => {
                    let _ = h.controller.request_auto_focus();
                }
                Step::Capture => {
                    let _ = h.controller.request_capture();
                }
                Step::ClearFocus => h.controller.clear_auto_focus(),
                Step::ClearCapture => h.controller.clear_capture(),
                Step::CompleteFocus(success) => {
                    h.probe.complete_focus(success);
                }
                Step::Shutter => {
                    h.probe.fire_shutter();
                }
                Step::Picture(with_data) => {
                    h.probe.deliver_picture(with_data.then(|| vec![1, 2, 3]));
                }
            }
            h.pump();
            assert_invariants(&h);
        }
    }
}
