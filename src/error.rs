use thiserror::Error;

#[derive(Error, Debug)]
pub enum CambridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("Camera service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },
}

impl CambridgeError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Errors reported by a camera service collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera service is not configured")]
    NotConfigured,

    #[error("Camera service is not running")]
    NotRunning,

    #[error("A photo capture is already in progress")]
    CaptureInProgress,

    #[error("Zoom factor {factor} outside supported range {min}..={max}")]
    ZoomOutOfRange { factor: f32, min: f32, max: f32 },

    #[error("Camera device unavailable: {details}")]
    Unavailable { details: String },
}

#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, CambridgeError>;
