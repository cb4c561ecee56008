use super::coordinator::FocusCaptureCoordinator;
use super::preview::PreviewController;
use crate::driver::{
    CameraDevice, CameraDriver, CaptureCompletion, CompletionSender, DeviceErrorReporter,
    DeviceParameters, FocusCompletion, PictureFormat, RequestId, SessionId,
};
use crate::error::CameraError;
use crate::surface::{Dimensions, SurfaceTarget};
use tracing::{debug, info, warn};

/// Exclusive ownership of an opened camera device.
///
/// Dropping the handle releases the device, so every exit path (including a
/// failed surface bind right after opening) gives the hardware back.
pub struct DeviceHandle {
    device: Box<dyn CameraDevice>,
    session: SessionId,
    completions: CompletionSender,
}

impl DeviceHandle {
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn device(&self) -> &dyn CameraDevice {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn CameraDevice {
        self.device.as_mut()
    }

    pub(crate) fn focus_completion(&self, request: RequestId) -> FocusCompletion {
        FocusCompletion::new(self.completions.clone(), self.session, request)
    }

    pub(crate) fn capture_completion(&self, request: RequestId) -> CaptureCompletion {
        CaptureCompletion::new(self.completions.clone(), self.session, request)
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.device.release();
        info!("Camera device released (session {})", self.session);
    }
}

/// Owns the driver and at most one open device
pub struct CameraResourceManager {
    driver: Box<dyn CameraDriver>,
    index: u32,
    picture_format: PictureFormat,
    completions: CompletionSender,
    device: Option<DeviceHandle>,
    last_session: SessionId,
}

impl CameraResourceManager {
    pub fn new(
        driver: Box<dyn CameraDriver>,
        index: u32,
        picture_format: PictureFormat,
        completions: CompletionSender,
    ) -> Self {
        Self {
            driver,
            index,
            picture_format,
            completions,
            device: None,
            last_session: 0,
        }
    }

    pub fn is_held(&self) -> bool {
        self.device.is_some()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.device.as_ref().map(DeviceHandle::session)
    }

    pub fn device(&self) -> Option<&DeviceHandle> {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> Option<&mut DeviceHandle> {
        self.device.as_mut()
    }

    /// Open the device and bind its output to `target`.
    ///
    /// Faults are logged and leave the manager without a device; the next
    /// lifecycle event that calls `acquire` is the retry.
    pub fn acquire(&mut self, target: &SurfaceTarget) -> bool {
        if self.device.is_some() {
            debug!("Camera device already held");
            return true;
        }

        self.last_session += 1;
        let session = self.last_session;
        let errors = DeviceErrorReporter::new(self.completions.clone(), session);

        let device = match self.driver.open(self.index, errors) {
            Ok(device) => device,
            Err(e) => {
                warn!("Failed to open camera {}: {}", self.index, e);
                return false;
            }
        };

        let mut handle = DeviceHandle {
            device,
            session,
            completions: self.completions.clone(),
        };

        if let Err(e) = handle.device_mut().bind_surface(target) {
            warn!("Binding fault on surface {}, releasing device: {}", target, e);
            return false;
        }

        info!(
            "Camera {} acquired and bound to {} (session {})",
            self.index, target, session
        );
        self.device = Some(handle);
        true
    }

    /// Commit size and format to the device and, for a fresh session, start
    /// preview and reset focus/capture bookkeeping as one step.
    ///
    /// With `keep_capture` set (the shutter recommit) an in-flight capture
    /// survives the reset; it only ends at data-ready.
    pub fn configure(
        &mut self,
        dimensions: Dimensions,
        preview: &mut PreviewController,
        coordinator: &mut FocusCaptureCoordinator,
        keep_capture: bool,
    ) -> Result<(), CameraError> {
        let device = self
            .device
            .as_mut()
            .ok_or(CameraError::NoDevice {
                operation: "configure",
            })?;

        let parameters = DeviceParameters {
            picture_size: dimensions,
            picture_format: self.picture_format,
        };
        device.device_mut().apply_parameters(&parameters)?;
        debug!(
            "Applied parameters {} {} (session {})",
            dimensions,
            self.picture_format,
            device.session()
        );

        if !preview.is_running() {
            preview.start(device)?;
            if keep_capture {
                coordinator.reset_keeping_capture();
            } else {
                coordinator.reset();
            }
        }
        Ok(())
    }

    /// Stop preview, drop any in-flight bookkeeping and release the device.
    /// Returns the session that was released, if any.
    pub fn release(
        &mut self,
        preview: &mut PreviewController,
        coordinator: &mut FocusCaptureCoordinator,
    ) -> Option<SessionId> {
        let mut handle = self.device.take()?;
        if let Err(e) = preview.stop(&mut handle) {
            warn!("Failed to stop preview before release: {}", e);
        }
        preview.mark_stopped();
        coordinator.reset();

        let session = handle.session();
        drop(handle);
        Some(session)
    }
}
