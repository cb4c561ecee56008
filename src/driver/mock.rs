use super::completion::{CaptureCompletion, DeviceErrorKind, DeviceErrorReporter, FocusCompletion};
use super::interface::{CameraDevice, CameraDriver, DeviceParameters, PreviewFrame, PreviewSink};
use crate::error::CameraError;
use crate::surface::{Dimensions, SurfaceTarget};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// Completes requests on a background thread after fixed latencies
#[derive(Debug, Clone)]
pub struct AutoComplete {
    pub focus_latency: Duration,
    pub shutter_latency: Duration,
    pub picture_latency: Duration,
    pub focus_succeeds: bool,
    /// Bytes delivered for each capture; `None` simulates a failed capture
    pub picture: Option<Vec<u8>>,
}

impl Default for AutoComplete {
    fn default() -> Self {
        Self {
            focus_latency: Duration::from_millis(150),
            shutter_latency: Duration::from_millis(50),
            picture_latency: Duration::from_millis(200),
            focus_succeeds: true,
            picture: Some(vec![0xff, 0xd8, 0xff, 0xd9]),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    pub fail_open: bool,
    pub fail_bind: bool,
    pub fail_parameters: bool,
    pub fail_preview: bool,
    pub fail_focus: bool,
    pub fail_capture: bool,
    pub preview_size: Option<Dimensions>,
    /// Without this, completions are held until fired through a [`MockProbe`]
    pub auto_complete: Option<AutoComplete>,
}

/// Counters of every driver call, for assertions
#[derive(Debug, Clone, Default)]
pub struct MockCalls {
    pub opens: usize,
    pub binds: usize,
    pub releases: usize,
    pub parameter_commits: usize,
    pub preview_starts: usize,
    pub preview_stops: usize,
    pub focus_requests: usize,
    pub capture_requests: usize,
    pub last_parameters: Option<DeviceParameters>,
    pub bound_surface: Option<SurfaceTarget>,
}

#[derive(Default)]
struct MockShared {
    behavior: MockBehavior,
    calls: MockCalls,
    open_devices: usize,
    previewing: bool,
    pending_focus: Option<FocusCompletion>,
    pending_capture: Option<CaptureCompletion>,
    error_reporter: Option<DeviceErrorReporter>,
    preview_sink: Option<PreviewSink>,
}

/// Simulated camera driver for tests and the demo binary
pub struct MockCameraDriver {
    shared: Arc<Mutex<MockShared>>,
}

impl MockCameraDriver {
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::default())
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            shared: Arc::new(Mutex::new(MockShared {
                behavior,
                ..Default::default()
            })),
        }
    }

    /// Handle for inspecting the simulator and firing completions
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for MockCameraDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDriver for MockCameraDriver {
    fn open(
        &mut self,
        index: u32,
        errors: DeviceErrorReporter,
    ) -> Result<Box<dyn CameraDevice>, CameraError> {
        let mut shared = self.shared.lock();
        shared.calls.opens += 1;

        if shared.behavior.fail_open {
            return Err(CameraError::DeviceOpen {
                index,
                details: "simulated open failure".to_string(),
            });
        }
        if shared.open_devices > 0 {
            return Err(CameraError::DeviceOpen {
                index,
                details: "device already in use".to_string(),
            });
        }

        shared.open_devices += 1;
        shared.error_reporter = Some(errors);
        debug!("Mock camera {} opened", index);

        Ok(Box::new(MockCameraDevice {
            shared: Arc::clone(&self.shared),
            released: false,
        }))
    }
}

struct MockCameraDevice {
    shared: Arc<Mutex<MockShared>>,
    released: bool,
}

impl CameraDevice for MockCameraDevice {
    fn bind_surface(&mut self, target: &SurfaceTarget) -> Result<(), CameraError> {
        let mut shared = self.shared.lock();
        shared.calls.binds += 1;
        if shared.behavior.fail_bind {
            return Err(CameraError::SurfaceBind {
                surface: target.to_string(),
                details: "simulated bind failure".to_string(),
            });
        }
        shared.calls.bound_surface = Some(target.clone());
        Ok(())
    }

    fn apply_parameters(&mut self, parameters: &DeviceParameters) -> Result<(), CameraError> {
        let mut shared = self.shared.lock();
        if shared.behavior.fail_parameters {
            return Err(CameraError::Configuration {
                details: "simulated parameter rejection".to_string(),
            });
        }
        shared.calls.parameter_commits += 1;
        shared.calls.last_parameters = Some(*parameters);
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), CameraError> {
        let mut shared = self.shared.lock();
        if shared.behavior.fail_preview {
            return Err(CameraError::Preview {
                details: "simulated preview start failure".to_string(),
            });
        }
        shared.calls.preview_starts += 1;
        shared.previewing = true;
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        let mut shared = self.shared.lock();
        shared.calls.preview_stops += 1;
        shared.previewing = false;
        Ok(())
    }

    fn preview_size(&self) -> Option<Dimensions> {
        let shared = self.shared.lock();
        Some(
            shared
                .behavior
                .preview_size
                .unwrap_or_else(|| Dimensions::new(640, 480)),
        )
    }

    fn set_preview_sink(&mut self, sink: Option<PreviewSink>) {
        self.shared.lock().preview_sink = sink;
    }

    fn auto_focus(&mut self, completion: FocusCompletion) -> Result<(), CameraError> {
        let mut shared = self.shared.lock();
        shared.calls.focus_requests += 1;
        if shared.behavior.fail_focus {
            return Err(CameraError::Focus {
                details: "simulated autofocus rejection".to_string(),
            });
        }

        match shared.behavior.auto_complete.clone() {
            Some(auto) => {
                thread::spawn(move || {
                    thread::sleep(auto.focus_latency);
                    completion.complete(auto.focus_succeeds);
                });
            }
            None => shared.pending_focus = Some(completion),
        }
        Ok(())
    }

    fn take_picture(&mut self, completion: CaptureCompletion) -> Result<(), CameraError> {
        let mut shared = self.shared.lock();
        shared.calls.capture_requests += 1;
        if shared.behavior.fail_capture {
            return Err(CameraError::Capture {
                details: "simulated capture rejection".to_string(),
            });
        }
        // Taking a still halts the preview stream on real hardware
        shared.previewing = false;

        match shared.behavior.auto_complete.clone() {
            Some(auto) => {
                thread::spawn(move || {
                    thread::sleep(auto.shutter_latency);
                    completion.shutter();
                    thread::sleep(auto.picture_latency);
                    completion.picture_taken(auto.picture);
                });
            }
            None => shared.pending_capture = Some(completion),
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut shared = self.shared.lock();
        shared.calls.releases += 1;
        shared.open_devices = shared.open_devices.saturating_sub(1);
        shared.previewing = false;
        shared.preview_sink = None;
        shared.error_reporter = None;
        debug!("Mock camera released");
    }
}

/// Test-side view of a [`MockCameraDriver`]
#[derive(Clone)]
pub struct MockProbe {
    shared: Arc<Mutex<MockShared>>,
}

impl MockProbe {
    pub fn calls(&self) -> MockCalls {
        self.shared.lock().calls.clone()
    }

    pub fn open_devices(&self) -> usize {
        self.shared.lock().open_devices
    }

    /// Whether the simulated device is currently streaming preview
    pub fn is_previewing(&self) -> bool {
        self.shared.lock().previewing
    }

    pub fn update_behavior<F: FnOnce(&mut MockBehavior)>(&self, update: F) {
        update(&mut self.shared.lock().behavior);
    }

    pub fn has_pending_focus(&self) -> bool {
        self.shared.lock().pending_focus.is_some()
    }

    pub fn has_pending_capture(&self) -> bool {
        self.shared.lock().pending_capture.is_some()
    }

    /// Report the held autofocus result. Returns false if none is pending.
    pub fn complete_focus(&self, success: bool) -> bool {
        let pending = self.shared.lock().pending_focus.take();
        match pending {
            Some(completion) => {
                completion.complete(success);
                true
            }
            None => false,
        }
    }

    pub fn fire_shutter(&self) -> bool {
        let shared = self.shared.lock();
        match shared.pending_capture.as_ref() {
            Some(completion) => {
                completion.shutter();
                true
            }
            None => false,
        }
    }

    pub fn deliver_picture(&self, data: Option<Vec<u8>>) -> bool {
        let pending = self.shared.lock().pending_capture.take();
        match pending {
            Some(completion) => {
                completion.picture_taken(data);
                true
            }
            None => false,
        }
    }

    pub fn report_error(&self, kind: DeviceErrorKind) -> bool {
        let reporter = self.shared.lock().error_reporter.clone();
        match reporter {
            Some(reporter) => {
                reporter.report(kind);
                true
            }
            None => false,
        }
    }

    /// Push a frame to the registered preview sink, if any
    pub fn push_preview_frame(&self, data: Vec<u8>) -> bool {
        let shared = self.shared.lock();
        let size = shared
            .behavior
            .preview_size
            .unwrap_or_else(|| Dimensions::new(640, 480));
        match shared.preview_sink.as_ref() {
            Some(sink) => sink.try_send(PreviewFrame { data, size }).is_ok(),
            None => {
                trace!("No preview sink registered");
                false
            }
        }
    }
}
