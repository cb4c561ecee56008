mod builder;
mod controller;
mod coordinator;
mod preview;
mod resource;
mod types;
#[cfg(test)]
mod tests;

pub use builder::CameraSessionBuilder;
pub use controller::CameraSessionController;
pub use coordinator::{CaptureFollowUp, FocusCaptureCoordinator};
pub use preview::PreviewController;
pub use resource::{CameraResourceManager, DeviceHandle};
pub use types::{CaptureState, FocusState, OperationState, SessionSnapshot};
