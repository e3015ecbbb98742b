use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flash mode as exposed by the camera service.
///
/// The service only ever reports fully on or fully off; automatic flash is
/// resolved on the service side before publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    On,
    Off,
}

impl FlashMode {
    pub fn is_on(&self) -> bool {
        matches!(self, FlashMode::On)
    }

    /// The opposite mode, used by the adapter's flash toggle.
    pub fn toggled(&self) -> Self {
        match self {
            FlashMode::On => FlashMode::Off,
            FlashMode::Off => FlashMode::On,
        }
    }
}

impl Default for FlashMode {
    fn default() -> Self {
        FlashMode::Off
    }
}

/// Which physical camera the service is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    Back,
}

impl CameraFacing {
    pub fn flipped(&self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

/// A captured still photo as delivered by the camera service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    /// Unique identifier for this capture
    pub id: Uuid,
    /// Encoded image bytes (format is the service's concern)
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// When the capture completed
    pub captured_at: DateTime<Utc>,
}

impl Photo {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            width,
            height,
            captured_at: Utc::now(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Opaque alert payload supplied by the service. The adapter passes it
/// through without interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertInfo {
    pub title: String,
    pub message: String,
}

impl AlertInfo {
    pub fn new<S: Into<String>>(title: S, message: S) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Alert level published by the service: a visibility flag plus the payload
/// to present while visible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlertState {
    pub visible: bool,
    pub info: Option<AlertInfo>,
}

impl AlertState {
    pub fn raised(info: AlertInfo) -> Self {
        Self {
            visible: true,
            info: Some(info),
        }
    }

    pub fn cleared() -> Self {
        Self::default()
    }
}

/// The adapter's observable snapshot, consumed by UI bindings.
///
/// Fields are written only by the adapter's projection task; UI code reads
/// the latest snapshot through a watch receiver and never mutates it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    /// Most recently captured photo, if any
    pub photo: Option<Photo>,
    /// Most recently detected QR code payload, if any
    pub detected_code: Option<String>,
    /// Whether an alert should be presented
    pub alert_visible: bool,
    /// Payload for the presented alert
    pub alert: Option<AlertInfo>,
    /// Whether the flash is currently on
    pub flash_on: bool,
    /// Whether a capture attempt is in flight
    pub capturing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_mode_toggle() {
        assert_eq!(FlashMode::Off.toggled(), FlashMode::On);
        assert_eq!(FlashMode::On.toggled(), FlashMode::Off);
        // Two toggles return to the original mode
        assert_eq!(FlashMode::On.toggled().toggled(), FlashMode::On);
        assert!(FlashMode::On.is_on());
        assert!(!FlashMode::Off.is_on());
    }

    #[test]
    fn test_camera_facing_flip() {
        assert_eq!(CameraFacing::Back.flipped(), CameraFacing::Front);
        assert_eq!(CameraFacing::Front.flipped().flipped(), CameraFacing::Front);
    }

    #[test]
    fn test_photo_construction() {
        let photo = Photo::new(vec![0u8; 64], 640, 480);
        assert_eq!(photo.width, 640);
        assert_eq!(photo.height, 480);
        assert_eq!(photo.size_bytes(), 64);

        let other = Photo::new(vec![0u8; 64], 640, 480);
        assert_ne!(photo.id, other.id);
    }

    #[test]
    fn test_alert_state() {
        let cleared = AlertState::cleared();
        assert!(!cleared.visible);
        assert!(cleared.info.is_none());

        let raised = AlertState::raised(AlertInfo::new("Camera error", "Device unavailable"));
        assert!(raised.visible);
        assert_eq!(raised.info.unwrap().title, "Camera error");
    }

    #[test]
    fn test_view_state_default() {
        let state = ViewState::default();
        assert!(state.photo.is_none());
        assert!(state.detected_code.is_none());
        assert!(!state.alert_visible);
        assert!(!state.flash_on);
        assert!(!state.capturing);
    }
}
