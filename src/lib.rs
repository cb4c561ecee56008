pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod keyboard_input;
pub mod service;
pub mod session;
pub mod surface;

pub use config::SessionConfig;
pub use driver::{
    completion_channel, CameraDevice, CameraDriver, CompletionReceiver, CompletionSender,
    HardwareEvent, MockCameraDriver, PictureFormat,
};
pub use error::{CameraError, Result, SessionError};
pub use events::{FocusOutcome, UiEventBus, UiEventReceiver, UiMessage, UiMessageFilter, UiNotifier};
pub use keyboard_input::KeyboardInputHandler;
pub use service::{SessionCommand, SessionHandle, SessionService};
pub use session::{
    CameraSessionBuilder, CameraSessionController, CaptureState, FocusState, SessionSnapshot,
};
pub use surface::{Dimensions, SurfaceTarget};
