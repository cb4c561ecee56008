use super::completion::{CaptureCompletion, DeviceErrorReporter, FocusCompletion};
use crate::error::CameraError;
use crate::surface::{Dimensions, SurfaceTarget};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Still picture encoding requested from the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PictureFormat {
    #[default]
    Jpeg,
    Nv21,
    Yuy2,
}

impl fmt::Display for PictureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PictureFormat::Jpeg => "JPEG",
            PictureFormat::Nv21 => "NV21",
            PictureFormat::Yuy2 => "YUY2",
        };
        f.write_str(name)
    }
}

/// Parameter set committed to the device on every configure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceParameters {
    pub picture_size: Dimensions,
    pub picture_format: PictureFormat,
}

/// A single preview frame forwarded to a registered sink
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub data: Vec<u8>,
    pub size: Dimensions,
}

/// Consumer of preview frames; drivers drop frames when it is full
pub type PreviewSink = mpsc::Sender<PreviewFrame>;

/// Entry point into the camera driver
pub trait CameraDriver: Send {
    /// Open the device for exclusive use. `errors` must be installed as the
    /// device's asynchronous error callback.
    fn open(
        &mut self,
        index: u32,
        errors: DeviceErrorReporter,
    ) -> Result<Box<dyn CameraDevice>, CameraError>;
}

/// An opened camera device.
///
/// Every call is synchronous and returns promptly. Focus and capture
/// completions are reported later, possibly from another thread, through the
/// tokens passed in.
pub trait CameraDevice: Send {
    fn bind_surface(&mut self, target: &SurfaceTarget) -> Result<(), CameraError>;

    fn apply_parameters(&mut self, parameters: &DeviceParameters) -> Result<(), CameraError>;

    fn start_preview(&mut self) -> Result<(), CameraError>;

    fn stop_preview(&mut self) -> Result<(), CameraError>;

    /// Size of the preview stream the device negotiated
    fn preview_size(&self) -> Option<Dimensions>;

    fn set_preview_sink(&mut self, sink: Option<PreviewSink>);

    fn auto_focus(&mut self, completion: FocusCompletion) -> Result<(), CameraError>;

    /// Take a still picture. The driver reports the shutter before the data.
    fn take_picture(&mut self, completion: CaptureCompletion) -> Result<(), CameraError>;

    /// Give the device back to the system. Called exactly once.
    fn release(&mut self);
}
