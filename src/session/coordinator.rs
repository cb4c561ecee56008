use super::resource::DeviceHandle;
use super::types::{CaptureState, FocusState, OperationState};
use crate::driver::RequestId;
use crate::error::CameraError;
use crate::events::{FocusOutcome, UiMessage, UiNotifier};
use tracing::{debug, info, warn};

/// What the controller must do after a capture delivered its data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFollowUp {
    /// Bytes were posted to the UI
    Delivered,
    /// No usable data; preview has to be restarted directly
    RestartPreview,
}

/// Enforces focus/capture exclusion and forwards completions to the UI
pub struct FocusCaptureCoordinator {
    notifier: Box<dyn UiNotifier>,
    operation: OperationState,
    last_focus: Option<FocusOutcome>,
    last_request: RequestId,
}

impl FocusCaptureCoordinator {
    pub fn new(notifier: Box<dyn UiNotifier>) -> Self {
        Self {
            notifier,
            operation: OperationState::Idle,
            last_focus: None,
            last_request: 0,
        }
    }

    pub fn operation(&self) -> OperationState {
        self.operation
    }

    pub fn focus_state(&self) -> FocusState {
        match (self.operation, self.last_focus) {
            (OperationState::Focusing { .. }, _) => FocusState::InProgress,
            (_, Some(FocusOutcome::Success)) => FocusState::Succeeded,
            (_, Some(FocusOutcome::Failure)) => FocusState::Failed,
            (_, None) => FocusState::Idle,
        }
    }

    pub fn capture_state(&self) -> CaptureState {
        CaptureState {
            in_progress: matches!(self.operation, OperationState::Capturing { .. }),
        }
    }

    /// Start autofocus unless another operation is in flight.
    ///
    /// Returns `Ok(false)` when the request was dropped by the guard.
    pub fn request_auto_focus(&mut self, device: &mut DeviceHandle) -> Result<bool, CameraError> {
        if !self.operation.is_idle() {
            debug!("Autofocus request ignored, {:?} in flight", self.operation);
            return Ok(false);
        }

        let request = self.next_request();
        self.operation = OperationState::Focusing { request };
        self.last_focus = None;

        let completion = device.focus_completion(request);
        if let Err(e) = device.device_mut().auto_focus(completion) {
            self.operation = OperationState::Idle;
            return Err(e);
        }

        debug!("Autofocus {} requested (session {})", request, device.session());
        Ok(true)
    }

    pub fn on_focus_completed(&mut self, request: RequestId, success: bool) {
        let outcome = FocusOutcome::from_success(success);

        if self.operation == (OperationState::Focusing { request }) {
            self.operation = OperationState::Idle;
            self.last_focus = Some(outcome);
            info!("Autofocus {} finished: {:?}", request, outcome);
        } else {
            debug!(
                "Late autofocus result {:?} for abandoned request {}",
                outcome, request
            );
        }

        self.notifier.post(UiMessage::focus_result(outcome));
    }

    /// Abandon a pending autofocus. The hardware request is not cancelled.
    pub fn clear_auto_focus(&mut self) {
        if let OperationState::Focusing { request } = self.operation {
            debug!("Autofocus {} cleared by caller", request);
            self.operation = OperationState::Idle;
        }
    }

    /// Start a still capture unless another operation is in flight
    pub fn request_capture(&mut self, device: &mut DeviceHandle) -> Result<bool, CameraError> {
        if !self.operation.is_idle() {
            debug!("Capture request ignored, {:?} in flight", self.operation);
            return Ok(false);
        }

        let request = self.next_request();
        self.operation = OperationState::Capturing { request };

        let completion = device.capture_completion(request);
        if let Err(e) = device.device_mut().take_picture(completion) {
            self.operation = OperationState::Idle;
            return Err(e);
        }

        debug!("Capture {} requested (session {})", request, device.session());
        Ok(true)
    }

    /// Handle the data-ready callback. The capture flag never stays set past this.
    pub fn on_picture_taken(&mut self, request: RequestId, data: Option<Vec<u8>>) -> CaptureFollowUp {
        if self.operation == (OperationState::Capturing { request }) {
            self.operation = OperationState::Idle;
        } else {
            debug!("Picture for abandoned capture {}", request);
        }

        match data {
            Some(bytes) if !bytes.is_empty() => {
                info!("Capture {} produced {} bytes", request, bytes.len());
                self.notifier.post(UiMessage::capture_data(bytes));
                CaptureFollowUp::Delivered
            }
            _ => {
                warn!("Capture {} returned no data", request);
                CaptureFollowUp::RestartPreview
            }
        }
    }

    pub fn clear_capture(&mut self) {
        if let OperationState::Capturing { request } = self.operation {
            debug!("Capture {} cleared by caller", request);
            self.operation = OperationState::Idle;
        }
    }

    /// Back to Idle with no remembered focus outcome
    pub fn reset(&mut self) {
        self.operation = OperationState::Idle;
        self.last_focus = None;
    }

    /// Like [`reset`](Self::reset), but an in-flight capture stays in flight
    pub fn reset_keeping_capture(&mut self) {
        if !matches!(self.operation, OperationState::Capturing { .. }) {
            self.operation = OperationState::Idle;
        }
        self.last_focus = None;
    }

    fn next_request(&mut self) -> RequestId {
        self.last_request += 1;
        self.last_request
    }
}
