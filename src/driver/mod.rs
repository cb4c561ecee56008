mod completion;
mod interface;
mod mock;

pub use completion::{
    completion_channel, CaptureCompletion, CompletionReceiver, CompletionSender,
    DeviceErrorKind, DeviceErrorReporter, FocusCompletion, HardwareEvent, RequestId, SessionId,
};
pub use interface::{
    CameraDevice, CameraDriver, DeviceParameters, PictureFormat, PreviewFrame, PreviewSink,
};
pub use mock::{AutoComplete, MockBehavior, MockCalls, MockCameraDriver, MockProbe};
