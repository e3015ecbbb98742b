pub mod adapter;
pub mod config;
pub mod error;
pub mod events;
pub mod service;
pub mod state;

pub use adapter::{CameraAdapter, CameraAdapterBuilder};
pub use config::{CambridgeConfig, CameraConfig, SystemConfig, ZoomConfig};
pub use error::{CambridgeError, EventBusError, Result, ServiceError};
pub use events::{EventBus, ServiceEvent};
pub use service::{
    CameraService, MockCameraService, MockCameraServiceBuilder, ServiceSubscription,
};
pub use state::{AlertInfo, AlertState, CameraFacing, FlashMode, Photo, ViewState};
