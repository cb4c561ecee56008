use crate::driver::{RequestId, SessionId};
use crate::surface::Dimensions;
use serde::Serialize;

/// The single in-flight hardware operation, if any.
///
/// Focus and capture are mutually exclusive, so both can never be in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    Focusing { request: RequestId },
    Capturing { request: RequestId },
}

impl OperationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, OperationState::Idle)
    }
}

/// Caller-facing view of the autofocus bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FocusState {
    Idle,
    InProgress,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureState {
    pub in_progress: bool,
}

/// Point-in-time view of the whole controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub device_held: bool,
    pub session_id: Option<SessionId>,
    pub preview_running: bool,
    pub surface_exists: bool,
    pub host_active: bool,
    pub dimensions: Dimensions,
    pub focus_state: FocusState,
    pub capture_in_progress: bool,
}
