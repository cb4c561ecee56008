use super::resource::DeviceHandle;
use crate::error::CameraError;
use crate::surface::Dimensions;
use tracing::{debug, info};

/// Tracks whether continuous preview is running on the held device.
///
/// Taking a `&mut DeviceHandle` for every hardware call means preview can only
/// be driven while a device is held.
#[derive(Debug, Default)]
pub struct PreviewController {
    running: bool,
}

impl PreviewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start preview unless it is already running
    pub fn start(&mut self, device: &mut DeviceHandle) -> Result<(), CameraError> {
        if self.running {
            debug!("Preview already running");
            return Ok(());
        }
        device.device_mut().start_preview()?;
        self.running = true;
        info!("Preview started (session {})", device.session());
        Ok(())
    }

    /// Stop preview if it is running
    pub fn stop(&mut self, device: &mut DeviceHandle) -> Result<(), CameraError> {
        if !self.running {
            return Ok(());
        }
        // The flag is cleared even if the driver complains; the device is
        // usually about to be released.
        self.running = false;
        device.device_mut().stop_preview()?;
        info!("Preview stopped (session {})", device.session());
        Ok(())
    }

    /// Restart the stream on the device regardless of the local flag.
    ///
    /// A still capture halts the hardware preview while `running` stays set,
    /// so a plain `start` would be a no-op afterwards.
    pub fn restart(&mut self, device: &mut DeviceHandle) -> Result<(), CameraError> {
        device.device_mut().start_preview()?;
        self.running = true;
        debug!("Preview restarted (session {})", device.session());
        Ok(())
    }

    /// Forget the running flag once the device has gone away
    pub fn mark_stopped(&mut self) {
        self.running = false;
    }

    /// Negotiated preview size; `None` whenever preview is not running
    pub fn current_size(&self, device: Option<&DeviceHandle>) -> Option<Dimensions> {
        if !self.running {
            return None;
        }
        device.and_then(|device| device.device().preview_size())
    }
}
