use crate::error::EventBusError;
use crate::state::Photo;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Discrete notifications published by a camera service.
///
/// A capture attempt always opens with `CaptureWillBegin` and closes with
/// exactly one of `CaptureFinished` or `CaptureFailed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServiceEvent {
    /// A capture attempt is about to begin
    CaptureWillBegin { timestamp: SystemTime },
    /// A capture attempt completed and produced a photo
    CaptureFinished { photo: Photo },
    /// A capture attempt ended without producing a photo
    CaptureFailed { timestamp: SystemTime },
    /// The service's pending-capture flag changed
    CapturePending { pending: bool },
    /// A QR code was detected in the preview stream
    CodeDetected {
        code: String,
        timestamp: SystemTime,
    },
}

impl ServiceEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            ServiceEvent::CaptureWillBegin { timestamp } => *timestamp,
            ServiceEvent::CaptureFinished { photo } => photo.captured_at.into(),
            ServiceEvent::CaptureFailed { timestamp } => *timestamp,
            ServiceEvent::CapturePending { .. } => SystemTime::now(),
            ServiceEvent::CodeDetected { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ServiceEvent::CaptureWillBegin { .. } => "Capture will begin".to_string(),
            ServiceEvent::CaptureFinished { photo } => {
                format!(
                    "Capture finished: {} ({}x{}, {} bytes)",
                    photo.id,
                    photo.width,
                    photo.height,
                    photo.size_bytes()
                )
            }
            ServiceEvent::CaptureFailed { .. } => "Capture failed".to_string(),
            ServiceEvent::CapturePending { pending } => {
                format!("Capture pending: {}", pending)
            }
            ServiceEvent::CodeDetected { code, .. } => {
                format!("Code detected: {}", code)
            }
        }
    }

    /// Get the event type as a string for logging and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ServiceEvent::CaptureWillBegin { .. } => "capture_will_begin",
            ServiceEvent::CaptureFinished { .. } => "capture_finished",
            ServiceEvent::CaptureFailed { .. } => "capture_failed",
            ServiceEvent::CapturePending { .. } => "capture_pending",
            ServiceEvent::CodeDetected { .. } => "code_detected",
        }
    }
}

/// Async event bus for service notifications using a broadcast channel
pub struct EventBus {
    sender: broadcast::Sender<ServiceEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: ServiceEvent) -> Result<usize, EventBusError> {
        match &event {
            ServiceEvent::CaptureFailed { .. } => {
                warn!("Capture failed");
            }
            other => {
                debug!("Event: {}", other.description());
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
