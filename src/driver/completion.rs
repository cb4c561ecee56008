use tokio::sync::mpsc;
use tracing::trace;

/// Identifies one acquisition of the camera device
pub type SessionId = u64;

/// Identifies one focus or capture request within a session
pub type RequestId = u64;

/// Asynchronous error codes the driver may report for an open device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    ServerDied,
    Unknown(i32),
}

/// Hardware callbacks, flattened into one ordered stream
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareEvent {
    FocusCompleted {
        session: SessionId,
        request: RequestId,
        success: bool,
    },
    Shutter {
        session: SessionId,
        request: RequestId,
    },
    PictureTaken {
        session: SessionId,
        request: RequestId,
        data: Option<Vec<u8>>,
    },
    DeviceError {
        session: SessionId,
        kind: DeviceErrorKind,
    },
}

impl HardwareEvent {
    pub fn session(&self) -> SessionId {
        match self {
            HardwareEvent::FocusCompleted { session, .. }
            | HardwareEvent::Shutter { session, .. }
            | HardwareEvent::PictureTaken { session, .. }
            | HardwareEvent::DeviceError { session, .. } => *session,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            HardwareEvent::FocusCompleted { .. } => "focus_completed",
            HardwareEvent::Shutter { .. } => "shutter",
            HardwareEvent::PictureTaken { .. } => "picture_taken",
            HardwareEvent::DeviceError { .. } => "device_error",
        }
    }
}

/// Create the channel hardware completions travel through
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { inner: tx }, CompletionReceiver { inner: rx })
}

/// Thread-safe producer side; usable from any driver thread
#[derive(Debug, Clone)]
pub struct CompletionSender {
    inner: mpsc::UnboundedSender<HardwareEvent>,
}

impl CompletionSender {
    pub fn send(&self, event: HardwareEvent) {
        trace!("Hardware event: {:?}", event.event_type());
        if self.inner.send(event).is_err() {
            trace!("Completion receiver dropped; discarding hardware event");
        }
    }
}

/// Consumer side, owned by whatever context applies completions
#[derive(Debug)]
pub struct CompletionReceiver {
    inner: mpsc::UnboundedReceiver<HardwareEvent>,
}

impl CompletionReceiver {
    pub async fn recv(&mut self) -> Option<HardwareEvent> {
        self.inner.recv().await
    }

    pub fn try_recv(&mut self) -> Option<HardwareEvent> {
        self.inner.try_recv().ok()
    }
}

/// One-shot token handed to the driver with an autofocus request
#[derive(Debug)]
pub struct FocusCompletion {
    sender: CompletionSender,
    session: SessionId,
    request: RequestId,
}

impl FocusCompletion {
    pub(crate) fn new(sender: CompletionSender, session: SessionId, request: RequestId) -> Self {
        Self {
            sender,
            session,
            request,
        }
    }

    pub fn complete(self, success: bool) {
        self.sender.send(HardwareEvent::FocusCompleted {
            session: self.session,
            request: self.request,
            success,
        });
    }
}

/// Token handed to the driver with a still capture request
#[derive(Debug)]
pub struct CaptureCompletion {
    sender: CompletionSender,
    session: SessionId,
    request: RequestId,
}

impl CaptureCompletion {
    pub(crate) fn new(sender: CompletionSender, session: SessionId, request: RequestId) -> Self {
        Self {
            sender,
            session,
            request,
        }
    }

    pub fn shutter(&self) {
        self.sender.send(HardwareEvent::Shutter {
            session: self.session,
            request: self.request,
        });
    }

    /// Deliver the picture. `None` means the hardware produced no data.
    pub fn picture_taken(self, data: Option<Vec<u8>>) {
        self.sender.send(HardwareEvent::PictureTaken {
            session: self.session,
            request: self.request,
            data,
        });
    }
}

/// Error callback installed on a device when it is opened
#[derive(Debug, Clone)]
pub struct DeviceErrorReporter {
    sender: CompletionSender,
    session: SessionId,
}

impl DeviceErrorReporter {
    pub(crate) fn new(sender: CompletionSender, session: SessionId) -> Self {
        Self { sender, session }
    }

    pub fn report(&self, kind: DeviceErrorKind) {
        self.sender.send(HardwareEvent::DeviceError {
            session: self.session,
            kind,
        });
    }
}
