use crate::config::CambridgeConfig;
use crate::error::ServiceError;
use crate::events::{EventBus, ServiceEvent};
use crate::state::{AlertInfo, AlertState, CameraFacing, FlashMode, Photo};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// One subscription set onto a camera service's published state.
///
/// All members are created together by [`CameraService::subscribe`] and are
/// torn down together when the holder is dropped.
pub struct ServiceSubscription {
    /// Current flash mode
    pub flash: watch::Receiver<FlashMode>,
    /// Current alert visibility and payload
    pub alert: watch::Receiver<AlertState>,
    /// Discrete capture and detection notifications
    pub events: broadcast::Receiver<ServiceEvent>,
}

/// Contract the adapter consumes from a camera service collaborator.
///
/// The service owns the capture hardware and session; consumers only observe
/// its published state and forward intents.
#[async_trait]
pub trait CameraService: Send + Sync {
    /// Open a subscription set on the service's published state
    fn subscribe(&self) -> ServiceSubscription;

    /// Check (and if needed request) camera permission
    async fn check_permissions(&self) -> Result<(), ServiceError>;

    /// Configure the capture session; expensive, expected to run once
    async fn configure(&self) -> Result<(), ServiceError>;

    /// Start the capture session
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stop the capture session
    async fn stop(&self) -> Result<(), ServiceError>;

    /// Begin a photo capture attempt
    async fn capture_photo(&self) -> Result<(), ServiceError>;

    /// Switch between front and back cameras
    async fn change_camera(&self) -> Result<(), ServiceError>;

    /// Set the zoom factor
    async fn set_zoom(&self, factor: f32) -> Result<(), ServiceError>;

    /// Read the current flash mode
    fn flash_mode(&self) -> FlashMode;

    /// Write the flash mode
    fn set_flash_mode(&self, mode: FlashMode);
}

/// In-memory camera service used by tests and the demo binary.
///
/// Simulates the collaborator contract without hardware: captures complete
/// asynchronously after a configurable delay and produce synthetic photos.
pub struct MockCameraService {
    config: CambridgeConfig,
    permission_checks: AtomicU32,
    configure_calls: AtomicU32,
    configured: AtomicBool,
    running: AtomicBool,
    capturing: Arc<AtomicBool>,
    fail_next_capture: AtomicBool,
    deny_permissions: AtomicBool,
    facing: Mutex<CameraFacing>,
    zoom_factor: Mutex<f32>,
    flash_tx: watch::Sender<FlashMode>,
    alert_tx: watch::Sender<AlertState>,
    events: EventBus,
}

impl MockCameraService {
    /// Create a new mock service from configuration
    pub fn new(config: CambridgeConfig) -> Self {
        let (flash_tx, _) = watch::channel(config.camera.flash);
        let (alert_tx, _) = watch::channel(AlertState::default());
        let events = EventBus::new(config.system.event_bus_capacity);

        info!(
            "Initializing mock camera service for device {} ({}x{} @ {}fps)",
            config.camera.index,
            config.camera.resolution.0,
            config.camera.resolution.1,
            config.camera.fps
        );

        Self {
            config,
            permission_checks: AtomicU32::new(0),
            configure_calls: AtomicU32::new(0),
            configured: AtomicBool::new(false),
            running: AtomicBool::new(false),
            capturing: Arc::new(AtomicBool::new(false)),
            fail_next_capture: AtomicBool::new(false),
            deny_permissions: AtomicBool::new(false),
            facing: Mutex::new(CameraFacing::Back),
            zoom_factor: Mutex::new(1.0),
            flash_tx,
            alert_tx,
            events,
        }
    }

    /// Check if the session is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Number of permission checks performed so far
    pub fn permission_check_count(&self) -> u32 {
        self.permission_checks.load(Ordering::Relaxed)
    }

    /// Number of configure calls performed so far
    pub fn configure_count(&self) -> u32 {
        self.configure_calls.load(Ordering::Relaxed)
    }

    /// Current camera facing
    pub fn facing(&self) -> CameraFacing {
        *self.facing.lock()
    }

    /// Current zoom factor
    pub fn zoom_factor(&self) -> f32 {
        *self.zoom_factor.lock()
    }

    /// Make the next capture attempt fail
    pub fn fail_next_capture(&self) {
        self.fail_next_capture.store(true, Ordering::Relaxed);
    }

    /// Make permission checks fail
    pub fn deny_permissions(&self) {
        self.deny_permissions.store(true, Ordering::Relaxed);
    }

    /// Allow permission checks to succeed again
    pub fn grant_permissions(&self) {
        self.deny_permissions.store(false, Ordering::Relaxed);
    }

    /// Simulate a QR code detection in the preview stream
    pub fn emit_code<S: Into<String>>(&self, code: S) {
        let code = code.into();
        debug!("Mock code detection: {}", code);
        let _ = self.events.publish(ServiceEvent::CodeDetected {
            code,
            timestamp: SystemTime::now(),
        });
    }

    /// Publish an alert to subscribers
    pub fn raise_alert(&self, info: AlertInfo) {
        warn!("Mock service alert: {}: {}", info.title, info.message);
        let _ = self.alert_tx.send(AlertState::raised(info));
    }

    /// Clear the published alert
    pub fn clear_alert(&self) {
        let _ = self.alert_tx.send(AlertState::cleared());
    }

    fn synthetic_photo(&self) -> Photo {
        let (width, height) = self.config.camera.resolution;
        // Solid-gray frame, one byte per pixel is enough for a stand-in
        let data = vec![0x7F; (width * height) as usize];
        Photo::new(data, width, height)
    }
}

#[async_trait]
impl CameraService for MockCameraService {
    fn subscribe(&self) -> ServiceSubscription {
        ServiceSubscription {
            flash: self.flash_tx.subscribe(),
            alert: self.alert_tx.subscribe(),
            events: self.events.subscribe(),
        }
    }

    async fn check_permissions(&self) -> Result<(), ServiceError> {
        self.permission_checks.fetch_add(1, Ordering::Relaxed);

        if self.deny_permissions.load(Ordering::Relaxed) {
            warn!("Camera permission denied");
            self.raise_alert(AlertInfo::new(
                "Camera access denied",
                "Enable camera access in system settings to take photos",
            ));
            return Err(ServiceError::PermissionDenied);
        }

        debug!("Camera permission granted");
        Ok(())
    }

    async fn configure(&self) -> Result<(), ServiceError> {
        self.configure_calls.fetch_add(1, Ordering::Relaxed);

        info!(
            "Configuring capture session: {}x{} @ {}fps",
            self.config.camera.resolution.0,
            self.config.camera.resolution.1,
            self.config.camera.fps
        );
        self.configured.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        if !self.configured.load(Ordering::Relaxed) {
            return Err(ServiceError::NotConfigured);
        }

        if self.running.swap(true, Ordering::Relaxed) {
            debug!("Capture session already running");
            return Ok(());
        }

        info!("Capture session started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        if !self.running.swap(false, Ordering::Relaxed) {
            debug!("Capture session is not running");
            return Ok(());
        }

        info!("Capture session stopped");
        Ok(())
    }

    async fn capture_photo(&self) -> Result<(), ServiceError> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(ServiceError::NotRunning);
        }

        if self.capturing.swap(true, Ordering::Relaxed) {
            return Err(ServiceError::CaptureInProgress);
        }

        let _ = self.events.publish(ServiceEvent::CaptureWillBegin {
            timestamp: SystemTime::now(),
        });
        let _ = self
            .events
            .publish(ServiceEvent::CapturePending { pending: true });

        let delay = Duration::from_millis(self.config.system.capture_delay_ms);
        let fail = self.fail_next_capture.swap(false, Ordering::Relaxed);
        let photo = if fail { None } else { Some(self.synthetic_photo()) };
        let events = self.events.clone();
        let capturing = Arc::clone(&self.capturing);

        // Capture completes off the caller's task, like a real pipeline
        tokio::spawn(async move {
            sleep(delay).await;

            match photo {
                Some(photo) => {
                    debug!("Mock capture finished: {}", photo.id);
                    let _ = events.publish(ServiceEvent::CaptureFinished { photo });
                }
                None => {
                    let _ = events.publish(ServiceEvent::CaptureFailed {
                        timestamp: SystemTime::now(),
                    });
                }
            }
            let _ = events.publish(ServiceEvent::CapturePending { pending: false });
            capturing.store(false, Ordering::Relaxed);
        });

        Ok(())
    }

    async fn change_camera(&self) -> Result<(), ServiceError> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(ServiceError::NotRunning);
        }

        let mut facing = self.facing.lock();
        *facing = facing.flipped();
        info!("Switched to {:?} camera", *facing);
        Ok(())
    }

    async fn set_zoom(&self, factor: f32) -> Result<(), ServiceError> {
        let min = self.config.zoom.min_factor;
        let max = self.config.zoom.max_factor;

        if !(min..=max).contains(&factor) {
            self.raise_alert(AlertInfo::new(
                "Unsupported zoom".to_string(),
                format!("Zoom factor {:.1} is outside {:.1}..{:.1}", factor, min, max),
            ));
            return Err(ServiceError::ZoomOutOfRange { factor, min, max });
        }

        *self.zoom_factor.lock() = factor;
        debug!("Zoom factor set to {:.2}", factor);
        Ok(())
    }

    fn flash_mode(&self) -> FlashMode {
        *self.flash_tx.borrow()
    }

    fn set_flash_mode(&self, mode: FlashMode) {
        debug!("Flash mode set to {:?}", mode);
        let _ = self.flash_tx.send(mode);
    }
}

/// Builder for the mock camera service
pub struct MockCameraServiceBuilder {
    config: Option<CambridgeConfig>,
}

impl MockCameraServiceBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self { config: None }
    }

    /// Set the configuration
    pub fn config(mut self, config: CambridgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the mock service
    pub fn build(self) -> Arc<MockCameraService> {
        Arc::new(MockCameraService::new(self.config.unwrap_or_default()))
    }
}

impl Default for MockCameraServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
