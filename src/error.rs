use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Notifier error: {0}")]
    Notifier(#[from] NotifierError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl SessionError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Faults reported by (or about) the camera device
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Failed to open camera device {index}: {details}")]
    DeviceOpen { index: u32, details: String },

    #[error("Failed to bind camera output to surface {surface}: {details}")]
    SurfaceBind { surface: String, details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },

    #[error("Preview error: {details}")]
    Preview { details: String },

    #[error("Autofocus error: {details}")]
    Focus { details: String },

    #[error("Still capture error: {details}")]
    Capture { details: String },

    #[error("No camera device is held for {operation}")]
    NoDevice { operation: &'static str },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifierError {
    #[error("Failed to publish UI message: {details}")]
    PublishFailed { details: String },

    #[error("UI message channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, SessionError>;
