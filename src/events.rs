use crate::error::NotifierError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Outcome reported by the hardware autofocus primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusOutcome {
    Success,
    Failure,
}

impl FocusOutcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            FocusOutcome::Success
        } else {
            FocusOutcome::Failure
        }
    }
}

/// Messages posted to the UI context when hardware operations complete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UiMessage {
    /// An autofocus request finished
    FocusResult {
        outcome: FocusOutcome,
        timestamp: SystemTime,
    },
    /// A still capture produced image data
    CaptureData {
        bytes: Vec<u8>,
        timestamp: SystemTime,
    },
}

impl UiMessage {
    pub fn focus_result(outcome: FocusOutcome) -> Self {
        UiMessage::FocusResult {
            outcome,
            timestamp: SystemTime::now(),
        }
    }

    pub fn capture_data(bytes: Vec<u8>) -> Self {
        UiMessage::CaptureData {
            bytes,
            timestamp: SystemTime::now(),
        }
    }

    /// Get a human-readable description of the message
    pub fn description(&self) -> String {
        match self {
            UiMessage::FocusResult { outcome, .. } => format!("Autofocus finished: {:?}", outcome),
            UiMessage::CaptureData { bytes, .. } => {
                format!("Capture delivered {} bytes", bytes.len())
            }
        }
    }

    /// Get the message type as a string for filtering
    pub fn message_type(&self) -> &'static str {
        match self {
            UiMessage::FocusResult { .. } => "focus_result",
            UiMessage::CaptureData { .. } => "capture_data",
        }
    }
}

/// Fire-and-forget sink for completion messages.
///
/// Implementations must tolerate late messages for operations the caller
/// already abandoned.
pub trait UiNotifier: Send {
    fn post(&self, message: UiMessage);
}

impl<T: UiNotifier + Sync + ?Sized> UiNotifier for Arc<T> {
    fn post(&self, message: UiMessage) {
        (**self).post(message)
    }
}

impl UiNotifier for mpsc::UnboundedSender<UiMessage> {
    fn post(&self, message: UiMessage) {
        if self.send(message).is_err() {
            debug!("UI message receiver dropped; discarding message");
        }
    }
}

/// Broadcast bus delivering UI messages to any number of subscribers
pub struct UiEventBus {
    sender: broadcast::Sender<UiMessage>,
    debug_logging: bool,
}

impl UiEventBus {
    /// Create a new bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiMessage> {
        self.sender.subscribe()
    }

    /// Publish a message to all subscribers
    pub fn publish(&self, message: UiMessage) -> Result<usize, NotifierError> {
        if self.debug_logging {
            debug!("Publishing UI message: {}", message.description());
        }

        match &message {
            UiMessage::FocusResult { outcome, .. } => {
                info!("Autofocus result: {:?}", outcome);
            }
            UiMessage::CaptureData { bytes, .. } => {
                info!("Capture data ready ({} bytes)", bytes.len());
            }
        }

        self.sender
            .send(message)
            .map_err(|e| NotifierError::PublishFailed {
                details: e.to_string(),
            })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for UiEventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

impl UiNotifier for UiEventBus {
    fn post(&self, message: UiMessage) {
        if let Err(e) = self.publish(message) {
            debug!("UI message dropped: {}", e);
        }
    }
}

/// Message filter for selective handling
#[derive(Debug, Clone)]
pub enum UiMessageFilter {
    All,
    /// Accept only specific message types
    MessageTypes(Vec<&'static str>),
    Custom(fn(&UiMessage) -> bool),
}

impl UiMessageFilter {
    pub fn matches(&self, message: &UiMessage) -> bool {
        match self {
            UiMessageFilter::All => true,
            UiMessageFilter::MessageTypes(types) => types.contains(&message.message_type()),
            UiMessageFilter::Custom(filter_fn) => filter_fn(message),
        }
    }
}

/// Receiver side of the bus with filtering
pub struct UiEventReceiver {
    receiver: broadcast::Receiver<UiMessage>,
    filter: UiMessageFilter,
    name: String,
}

impl UiEventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<UiMessage>,
        filter: UiMessageFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next message that passes the filter
    pub async fn recv(&mut self) -> Result<UiMessage, NotifierError> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => {
                    if self.filter.matches(&message) {
                        debug!(
                            "Receiver '{}' received message: {}",
                            self.name,
                            message.description()
                        );
                        return Ok(message);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} messages", self.name, n);
                    return Err(NotifierError::PublishFailed {
                        details: format!("Receiver lagged behind by {} messages", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("UI bus closed for receiver '{}'", self.name);
                    return Err(NotifierError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive a message without waiting
    pub fn try_recv(&mut self) -> Result<Option<UiMessage>, NotifierError> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => {
                    if self.filter.matches(&message) {
                        return Ok(Some(message));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} messages", self.name, n);
                    return Err(NotifierError::PublishFailed {
                        details: format!("Receiver lagged behind by {} messages", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(NotifierError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_bus_publish_and_receive() {
        let bus = UiEventBus::new(10);
        let mut receiver = bus.subscribe();

        let subscriber_count = bus
            .publish(UiMessage::focus_result(FocusOutcome::Success))
            .unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            UiMessage::FocusResult { outcome, .. } => assert_eq!(outcome, FocusOutcome::Success),
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_bus_without_subscribers_tolerated() {
        let bus = UiEventBus::new(4);
        assert!(!bus.has_subscribers());

        assert!(bus.publish(UiMessage::capture_data(vec![1, 2])).is_err());
        // Posting through the notifier seam never fails loudly
        bus.post(UiMessage::capture_data(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let bus = UiEventBus::new(10);
        let filter = UiMessageFilter::MessageTypes(vec!["capture_data"]);
        let mut filtered = UiEventReceiver::new(bus.subscribe(), filter, "test".to_string());

        bus.post(UiMessage::focus_result(FocusOutcome::Failure));
        bus.post(UiMessage::capture_data(vec![0xff, 0xd8]));

        let received = timeout(Duration::from_millis(100), filtered.recv())
            .await
            .unwrap()
            .unwrap();
        match received {
            UiMessage::CaptureData { bytes, .. } => assert_eq!(bytes, vec![0xff, 0xd8]),
            _ => panic!("Unexpected message type"),
        }
        assert!(filtered.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_unbounded_sender_notifier_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.post(UiMessage::focus_result(FocusOutcome::Success));
    }

    #[test]
    fn test_message_properties() {
        let message = UiMessage::capture_data(vec![0; 12]);
        assert_eq!(message.message_type(), "capture_data");
        assert!(message.description().contains("12 bytes"));
        assert_eq!(FocusOutcome::from_success(false), FocusOutcome::Failure);
    }
}
