use super::coordinator::{CaptureFollowUp, FocusCaptureCoordinator};
use super::preview::PreviewController;
use super::resource::CameraResourceManager;
use super::types::{CaptureState, FocusState, SessionSnapshot};
use crate::config::CameraConfig;
use crate::driver::{
    CameraDriver, CompletionReceiver, CompletionSender, DeviceErrorKind, HardwareEvent,
    PreviewSink, SessionId,
};
use crate::error::CameraError;
use crate::events::UiNotifier;
use crate::surface::{Dimensions, SurfaceTarget, SurfaceTracker};
use tracing::{debug, error, info, warn};

/// Mediates the shared camera between preview, autofocus and still capture.
///
/// All methods, including [`handle_hardware_event`](Self::handle_hardware_event),
/// must run on the one context that owns the controller. Driver threads only
/// ever touch the completion channel, so a completion can never race a release.
pub struct CameraSessionController {
    surface: SurfaceTracker,
    resources: CameraResourceManager,
    preview: PreviewController,
    coordinator: FocusCaptureCoordinator,
    host_active: bool,
}

impl CameraSessionController {
    pub fn new(
        camera: &CameraConfig,
        host_active: bool,
        driver: Box<dyn CameraDriver>,
        notifier: Box<dyn UiNotifier>,
        completions: CompletionSender,
    ) -> Self {
        info!(
            "Creating camera session controller for device {} ({})",
            camera.index, camera.picture_format
        );
        Self {
            surface: SurfaceTracker::new(),
            resources: CameraResourceManager::new(
                driver,
                camera.index,
                camera.picture_format,
                completions,
            ),
            preview: PreviewController::new(),
            coordinator: FocusCaptureCoordinator::new(notifier),
            host_active,
        }
    }

    // Surface lifecycle

    pub fn on_surface_ready(&mut self, target: SurfaceTarget) {
        self.surface.ready(target);
        if !self.host_active {
            debug!("Host is paused; camera acquisition deferred to resume");
            return;
        }
        self.acquire();
    }

    pub fn on_surface_resized(&mut self, width: u32, height: u32) {
        self.surface.resized(width, height);
        if !self.resources.is_held() {
            debug!("No camera device held; surface size recorded only");
            return;
        }
        self.configure();
    }

    pub fn on_surface_gone(&mut self) {
        self.surface.gone();
        self.release();
    }

    // Host foreground transitions

    pub fn resume(&mut self) {
        info!("Host resumed");
        self.host_active = true;
        if self.surface.exists() && !self.resources.is_held() && self.acquire() {
            self.configure();
        }
    }

    pub fn pause(&mut self) {
        info!("Host paused");
        self.host_active = false;
        self.release();
    }

    /// Release the device for good; used when the owner shuts down
    pub fn shutdown(&mut self) {
        info!("Shutting down camera session");
        self.release();
    }

    // Caller requests

    /// Returns `Ok(false)` when another focus or capture is still in flight
    pub fn request_auto_focus(&mut self) -> Result<bool, CameraError> {
        let device = self.resources.device_mut().ok_or(CameraError::NoDevice {
            operation: "autofocus",
        })?;
        self.coordinator.request_auto_focus(device)
    }

    pub fn clear_auto_focus(&mut self) {
        self.coordinator.clear_auto_focus();
    }

    /// Returns `Ok(false)` when another focus or capture is still in flight
    pub fn request_capture(&mut self) -> Result<bool, CameraError> {
        let device = self.resources.device_mut().ok_or(CameraError::NoDevice {
            operation: "capture",
        })?;
        self.coordinator.request_capture(device)
    }

    pub fn clear_capture(&mut self) {
        self.coordinator.clear_capture();
    }

    /// Start preview on the held device; no-op if it is already running
    pub fn start_preview(&mut self) -> Result<(), CameraError> {
        let device = self.resources.device_mut().ok_or(CameraError::NoDevice {
            operation: "start preview",
        })?;
        self.preview.start(device)
    }

    /// Restart the hardware stream, e.g. after consuming a delivered capture
    pub fn restart_preview(&mut self) -> Result<(), CameraError> {
        let device = self.resources.device_mut().ok_or(CameraError::NoDevice {
            operation: "restart preview",
        })?;
        self.preview.restart(device)
    }

    /// Route preview frames to `sink`, or stop with `None`.
    /// Without a device this does nothing and returns false.
    pub fn set_preview_frame_sink(&mut self, sink: Option<PreviewSink>) -> bool {
        let Some(device) = self.resources.device_mut() else {
            debug!("No camera device held; preview sink ignored");
            return false;
        };
        let enabled = sink.is_some();
        device.device_mut().set_preview_sink(sink);
        if enabled {
            info!("Starting to deliver preview frames");
        } else {
            info!("Stopping preview frame delivery");
        }
        true
    }

    pub fn current_preview_size(&self) -> Option<Dimensions> {
        self.preview.current_size(self.resources.device())
    }

    pub fn current_dimensions(&self) -> Dimensions {
        self.surface.dimensions()
    }

    // Hardware completions

    /// Apply one completion from the driver
    pub fn handle_hardware_event(&mut self, event: HardwareEvent) {
        let live = self.resources.session_id();
        if live != Some(event.session()) {
            debug!(
                "Dropping stale {} from session {} (live session: {:?})",
                event.event_type(),
                event.session(),
                live
            );
            return;
        }

        match event {
            HardwareEvent::FocusCompleted {
                request, success, ..
            } => {
                self.coordinator.on_focus_completed(request, success);
            }
            HardwareEvent::Shutter { request, .. } => {
                debug!("Shutter fired for capture {}; recommitting parameters", request);
                self.apply_configuration(true);
            }
            HardwareEvent::PictureTaken { request, data, .. } => {
                if self.coordinator.on_picture_taken(request, data) == CaptureFollowUp::RestartPreview
                {
                    if let Some(device) = self.resources.device_mut() {
                        if let Err(e) = self.preview.restart(device) {
                            warn!("Failed to restart preview after empty capture: {}", e);
                        }
                    }
                }
            }
            HardwareEvent::DeviceError { session, kind } => match kind {
                DeviceErrorKind::ServerDied => {
                    error!("The camera server died (session {})", session);
                }
                DeviceErrorKind::Unknown(code) => {
                    error!("Unknown camera error {} (session {})", code, session);
                }
            },
        }
    }

    /// Apply every completion already queued. Returns how many were handled.
    pub fn dispatch_pending(&mut self, completions: &mut CompletionReceiver) -> usize {
        let mut handled = 0;
        while let Some(event) = completions.try_recv() {
            self.handle_hardware_event(event);
            handled += 1;
        }
        handled
    }

    // State queries

    pub fn is_device_held(&self) -> bool {
        self.resources.is_held()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.resources.session_id()
    }

    pub fn is_preview_running(&self) -> bool {
        self.preview.is_running()
    }

    pub fn is_host_active(&self) -> bool {
        self.host_active
    }

    pub fn surface_exists(&self) -> bool {
        self.surface.exists()
    }

    pub fn focus_state(&self) -> FocusState {
        self.coordinator.focus_state()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.coordinator.capture_state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            device_held: self.resources.is_held(),
            session_id: self.resources.session_id(),
            preview_running: self.preview.is_running(),
            surface_exists: self.surface.exists(),
            host_active: self.host_active,
            dimensions: self.surface.dimensions(),
            focus_state: self.coordinator.focus_state(),
            capture_in_progress: self.coordinator.capture_state().in_progress,
        }
    }

    fn acquire(&mut self) -> bool {
        match self.surface.target() {
            Some(target) => self.resources.acquire(target),
            None => {
                debug!("No surface target to bind the camera to");
                false
            }
        }
    }

    fn configure(&mut self) {
        self.apply_configuration(false);
    }

    fn apply_configuration(&mut self, keep_capture: bool) {
        let dimensions = self.surface.dimensions();
        if let Err(e) = self.resources.configure(
            dimensions,
            &mut self.preview,
            &mut self.coordinator,
            keep_capture,
        ) {
            warn!("Camera configuration failed: {}", e);
        }
    }

    fn release(&mut self) {
        if let Some(session) = self
            .resources
            .release(&mut self.preview, &mut self.coordinator)
        {
            debug!("Session {} closed", session);
        }
    }
}
