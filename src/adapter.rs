use crate::error::{CambridgeError, Result};
use crate::events::ServiceEvent;
use crate::service::{CameraService, ServiceSubscription};
use crate::state::ViewState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// View-model adapter between a [`CameraService`] and a declarative UI.
///
/// The adapter subscribes to the service's published state once at
/// construction and spawns a projection task that mirrors every update into
/// a single observable [`ViewState`] snapshot. UI code reads snapshots
/// through [`CameraAdapter::observe`] and sends intents through the forwarding
/// methods; it never mutates the snapshot directly.
///
/// The projection task is the sole writer of the snapshot, so readers always
/// see a complete, latest-value view regardless of which task the service
/// publishes from. Dropping the adapter aborts the task and with it every
/// subscription.
pub struct CameraAdapter {
    service: Arc<dyn CameraService>,
    configured: AtomicBool,
    state_rx: watch::Receiver<ViewState>,
    projection: JoinHandle<()>,
}

impl CameraAdapter {
    /// Create an adapter bound to the given service.
    ///
    /// Must be called within a tokio runtime; the projection task starts
    /// immediately.
    pub fn new(service: Arc<dyn CameraService>) -> Self {
        let subscription = service.subscribe();
        let (state_tx, state_rx) = watch::channel(ViewState::default());

        let projection = tokio::spawn(Self::project(subscription, state_tx));

        Self {
            service,
            configured: AtomicBool::new(false),
            state_rx,
            projection,
        }
    }

    /// Get an observation handle for UI binding
    pub fn observe(&self) -> watch::Receiver<ViewState> {
        self.state_rx.clone()
    }

    /// Get the current snapshot by value
    pub fn state(&self) -> ViewState {
        self.state_rx.borrow().clone()
    }

    /// Check whether the one-time configuration has completed
    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Relaxed)
    }

    /// Start the camera session.
    ///
    /// The first successful call checks permissions and configures the
    /// session before starting it; later calls only start. A failed
    /// permission check or configuration leaves the guard unset so the next
    /// call retries.
    pub async fn start(&self) -> Result<()> {
        if !self.configured.load(Ordering::Relaxed) {
            self.service.check_permissions().await?;
            self.service.configure().await?;
            self.configured.store(true, Ordering::Relaxed);
            info!("Camera session configured");
        }

        self.service.start().await?;
        Ok(())
    }

    /// Stop the camera session
    pub async fn stop(&self) -> Result<()> {
        self.service.stop().await?;
        Ok(())
    }

    /// Request a photo capture
    pub async fn capture_photo(&self) -> Result<()> {
        self.service.capture_photo().await?;
        Ok(())
    }

    /// Switch between front and back cameras
    pub async fn flip_camera(&self) -> Result<()> {
        self.service.change_camera().await?;
        Ok(())
    }

    /// Set the zoom factor
    pub async fn zoom(&self, factor: f32) -> Result<()> {
        self.service.set_zoom(factor).await?;
        Ok(())
    }

    /// Toggle the flash mode on the service
    pub fn switch_flash(&self) {
        let toggled = self.service.flash_mode().toggled();
        debug!("Switching flash to {:?}", toggled);
        self.service.set_flash_mode(toggled);
    }

    /// Projection loop: mirror service publications into the snapshot.
    async fn project(mut subscription: ServiceSubscription, state: watch::Sender<ViewState>) {
        // Seed the snapshot from the service's current level state
        {
            let flash_on = subscription.flash.borrow_and_update().is_on();
            let alert = subscription.alert.borrow_and_update().clone();
            state.send_modify(|s| {
                s.flash_on = flash_on;
                s.alert_visible = alert.visible;
                s.alert = alert.info;
            });
        }

        loop {
            tokio::select! {
                changed = subscription.flash.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let flash_on = subscription.flash.borrow_and_update().is_on();
                    state.send_modify(|s| s.flash_on = flash_on);
                }
                changed = subscription.alert.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let alert = subscription.alert.borrow_and_update().clone();
                    state.send_modify(|s| {
                        s.alert_visible = alert.visible;
                        s.alert = alert.info;
                    });
                }
                event = subscription.events.recv() => {
                    match event {
                        Ok(event) => Self::apply_event(&state, event),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Projection lagged behind by {} events", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        debug!("Projection task ended, service channels closed");
    }

    fn apply_event(state: &watch::Sender<ViewState>, event: ServiceEvent) {
        debug!("Projecting event: {}", event.description());

        match event {
            ServiceEvent::CaptureWillBegin { .. } => {
                state.send_modify(|s| s.capturing = true);
            }
            ServiceEvent::CaptureFinished { photo } => {
                state.send_modify(|s| {
                    s.capturing = false;
                    s.photo = Some(photo);
                });
            }
            ServiceEvent::CaptureFailed { .. } => {
                state.send_modify(|s| s.capturing = false);
            }
            ServiceEvent::CapturePending { pending } => {
                state.send_modify(|s| s.capturing = pending);
            }
            ServiceEvent::CodeDetected { code, .. } => {
                state.send_modify(|s| s.detected_code = Some(code));
            }
        }
    }
}

impl Drop for CameraAdapter {
    fn drop(&mut self) {
        // Releases the subscription set; no projection occurs afterwards
        self.projection.abort();
    }
}

/// Builder for the camera adapter
pub struct CameraAdapterBuilder {
    service: Option<Arc<dyn CameraService>>,
}

impl CameraAdapterBuilder {
    /// Create a new adapter builder
    pub fn new() -> Self {
        Self { service: None }
    }

    /// Set the camera service collaborator
    pub fn service(mut self, service: Arc<dyn CameraService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Build the adapter
    pub fn build(self) -> Result<CameraAdapter> {
        let service = self
            .service
            .ok_or_else(|| CambridgeError::system("Camera service must be specified"))?;

        Ok(CameraAdapter::new(service))
    }
}

impl Default for CameraAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CambridgeConfig;
    use crate::service::MockCameraService;
    use crate::state::{AlertInfo, FlashMode};
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_millis(500);

    fn create_test_service() -> Arc<MockCameraService> {
        let mut config = CambridgeConfig::default();
        config.system.capture_delay_ms = 10;
        Arc::new(MockCameraService::new(config))
    }

    fn create_adapter(service: &Arc<MockCameraService>) -> CameraAdapter {
        CameraAdapter::new(Arc::clone(service) as Arc<dyn CameraService>)
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<ViewState>, predicate: F) -> ViewState
    where
        F: FnMut(&ViewState) -> bool,
    {
        timeout(WAIT, rx.wait_for(predicate))
            .await
            .expect("timed out waiting for projected state")
            .expect("projection ended unexpectedly")
            .clone()
    }

    #[tokio::test]
    async fn test_projection_fidelity_flash() {
        let service = create_test_service();
        let adapter = create_adapter(&service);
        let mut observed = adapter.observe();

        service.set_flash_mode(FlashMode::On);
        let state = wait_for(&mut observed, |s| s.flash_on).await;
        assert!(state.flash_on);

        service.set_flash_mode(FlashMode::Off);
        let state = wait_for(&mut observed, |s| !s.flash_on).await;
        assert!(!state.flash_on);
    }

    #[tokio::test]
    async fn test_projection_fidelity_alert() {
        let service = create_test_service();
        let adapter = create_adapter(&service);
        let mut observed = adapter.observe();

        service.raise_alert(AlertInfo::new("Camera error", "Session interrupted"));
        let state = wait_for(&mut observed, |s| s.alert_visible).await;
        assert_eq!(state.alert.unwrap().title, "Camera error");

        service.clear_alert();
        let state = wait_for(&mut observed, |s| !s.alert_visible).await;
        assert!(state.alert.is_none());
    }

    #[tokio::test]
    async fn test_projection_latest_value_wins() {
        let service = create_test_service();
        let adapter = create_adapter(&service);
        let mut observed = adapter.observe();

        // Rapid level-state updates: the snapshot must settle on the last one
        for _ in 0..5 {
            service.set_flash_mode(FlashMode::On);
            service.set_flash_mode(FlashMode::Off);
        }
        service.set_flash_mode(FlashMode::On);

        let state = wait_for(&mut observed, |s| s.flash_on).await;
        assert!(state.flash_on);
        assert_eq!(service.flash_mode(), FlashMode::On);
    }

    #[tokio::test]
    async fn test_start_configures_at_most_once() {
        let service = create_test_service();
        let adapter = create_adapter(&service);

        adapter.start().await.unwrap();
        adapter.start().await.unwrap();

        assert_eq!(service.permission_check_count(), 1);
        assert_eq!(service.configure_count(), 1);
        assert!(service.is_running());
        assert!(adapter.is_configured());
    }

    #[tokio::test]
    async fn test_start_retries_after_permission_denial() {
        let service = create_test_service();
        let adapter = create_adapter(&service);

        service.deny_permissions();
        assert!(adapter.start().await.is_err());
        assert!(!adapter.is_configured());
        assert_eq!(service.configure_count(), 0);

        service.grant_permissions();
        adapter.start().await.unwrap();
        assert!(adapter.is_configured());
        assert_eq!(service.permission_check_count(), 2);
        assert_eq!(service.configure_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_forwards() {
        let service = create_test_service();
        let adapter = create_adapter(&service);

        adapter.start().await.unwrap();
        assert!(service.is_running());

        adapter.stop().await.unwrap();
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn test_switch_flash_toggles_and_restores() {
        let service = create_test_service();
        let adapter = create_adapter(&service);
        let mut observed = adapter.observe();

        assert_eq!(service.flash_mode(), FlashMode::Off);

        adapter.switch_flash();
        assert_eq!(service.flash_mode(), FlashMode::On);
        wait_for(&mut observed, |s| s.flash_on).await;

        // Second toggle returns to the original mode
        adapter.switch_flash();
        assert_eq!(service.flash_mode(), FlashMode::Off);
        wait_for(&mut observed, |s| !s.flash_on).await;
    }

    #[tokio::test]
    async fn test_capture_success_sequence() {
        let service = create_test_service();
        let adapter = create_adapter(&service);
        let mut observed = adapter.observe();

        adapter.start().await.unwrap();
        adapter.capture_photo().await.unwrap();

        // begin -> finished: capturing ends false with the photo stored
        let state = wait_for(&mut observed, |s| s.photo.is_some() && !s.capturing).await;
        assert_eq!(state.photo.unwrap().width, 1280);
        assert!(!state.capturing);
    }

    #[tokio::test]
    async fn test_capture_failure_sequence() {
        let service = create_test_service();
        let adapter = create_adapter(&service);
        let mut observed = adapter.observe();

        adapter.start().await.unwrap();
        service.fail_next_capture();
        adapter.capture_photo().await.unwrap();

        // begin -> failed: capturing goes up, comes back down, no photo
        wait_for(&mut observed, |s| s.capturing).await;
        let state = wait_for(&mut observed, |s| !s.capturing).await;
        assert!(state.photo.is_none());
    }

    #[tokio::test]
    async fn test_code_detection_projection() {
        let service = create_test_service();
        let adapter = create_adapter(&service);
        let mut observed = adapter.observe();

        service.emit_code("https://example.com/menu");
        let state = wait_for(&mut observed, |s| s.detected_code.is_some()).await;
        assert_eq!(state.detected_code.unwrap(), "https://example.com/menu");
    }

    #[tokio::test]
    async fn test_zoom_forwarding() {
        let service = create_test_service();
        let adapter = create_adapter(&service);
        let mut observed = adapter.observe();

        adapter.zoom(3.0).await.unwrap();
        assert_eq!(service.zoom_factor(), 3.0);

        // Out-of-range zoom is rejected and surfaces as a projected alert
        assert!(adapter.zoom(42.0).await.is_err());
        assert_eq!(service.zoom_factor(), 3.0);
        let state = wait_for(&mut observed, |s| s.alert_visible).await;
        assert!(state.alert.is_some());
    }

    #[tokio::test]
    async fn test_flip_camera_forwarding() {
        let service = create_test_service();
        let adapter = create_adapter(&service);

        adapter.start().await.unwrap();
        let before = service.facing();
        adapter.flip_camera().await.unwrap();
        assert_eq!(service.facing(), before.flipped());
    }

    #[tokio::test]
    async fn test_drop_releases_subscriptions() {
        let service = create_test_service();
        let adapter = create_adapter(&service);
        let mut observed = adapter.observe();

        service.set_flash_mode(FlashMode::On);
        wait_for(&mut observed, |s| s.flash_on).await;

        drop(adapter);

        // With the projection gone the snapshot channel closes and no
        // further publication is mirrored
        let closed = timeout(WAIT, async {
            loop {
                if observed.changed().await.is_err() {
                    return true;
                }
            }
        })
        .await
        .unwrap_or(false);
        assert!(closed);

        service.set_flash_mode(FlashMode::Off);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(observed.borrow().flash_on);
    }

    #[tokio::test]
    async fn test_builder_requires_service() {
        assert!(CameraAdapterBuilder::new().build().is_err());

        let service = create_test_service();
        let adapter = CameraAdapterBuilder::new()
            .service(Arc::clone(&service) as Arc<dyn CameraService>)
            .build()
            .unwrap();
        assert!(!adapter.is_configured());
    }
}
