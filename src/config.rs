use crate::state::FlashMode;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CambridgeConfig {
    pub camera: CameraConfig,
    pub zoom: ZoomConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index the service should open
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Capture resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Preview frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Flash mode at startup
    #[serde(default = "default_flash_mode")]
    pub flash: FlashMode,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ZoomConfig {
    /// Minimum zoom factor the service accepts
    #[serde(default = "default_zoom_min")]
    pub min_factor: f32,

    /// Maximum zoom factor the service accepts
    #[serde(default = "default_zoom_max")]
    pub max_factor: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity for service notifications
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Simulated capture latency in milliseconds (mock service only)
    #[serde(default = "default_capture_delay_ms")]
    pub capture_delay_ms: u64,
}

impl CambridgeConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("cambridge.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.flash", "off")?
            .set_default("zoom.min_factor", default_zoom_min() as f64)?
            .set_default("zoom.max_factor", default_zoom_max() as f64)?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default(
                "system.capture_delay_ms",
                default_capture_delay_ms() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with CAMBRIDGE_ prefix
            .add_source(Environment::with_prefix("CAMBRIDGE").separator("_"))
            .build()?;

        let config: CambridgeConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.zoom.min_factor < 1.0 {
            return Err(ConfigError::Message(
                "Zoom min_factor must be at least 1.0".to_string(),
            ));
        }

        if self.zoom.max_factor < self.zoom.min_factor {
            return Err(ConfigError::Message(
                "Zoom max_factor must not be less than min_factor".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CambridgeConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                flash: default_flash_mode(),
            },
            zoom: ZoomConfig {
                min_factor: default_zoom_min(),
                max_factor: default_zoom_max(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                capture_delay_ms: default_capture_delay_ms(),
            },
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_flash_mode() -> FlashMode {
    FlashMode::Off
}

fn default_zoom_min() -> f32 {
    1.0
}
fn default_zoom_max() -> f32 {
    5.0
}

fn default_event_bus_capacity() -> usize {
    64
}
fn default_capture_delay_ms() -> u64 {
    50
}
