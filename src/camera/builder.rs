use super::handle::DeviceHandle;
use super::interface::CameraDevice;
use super::simulated::SimulatedCamera;
use crate::config::DeviceConfig;
use crate::error::{AstroError, Result};
use tracing::info;

/// Builder that opens a camera and wraps it in a `DeviceHandle`
pub struct CameraDeviceBuilder {
    config: Option<DeviceConfig>,
    device: Option<Box<dyn CameraDevice>>,
}

impl CameraDeviceBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            device: None,
        }
    }

    pub fn config(mut self, config: DeviceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an already opened device instead of connecting through the backend
    pub fn device(mut self, device: Box<dyn CameraDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub async fn build(self) -> Result<DeviceHandle> {
        let config = self
            .config
            .ok_or_else(|| AstroError::system("Camera configuration must be specified"))?;

        let device = match self.device {
            Some(device) => device,
            None => connect(&config).await?,
        };

        Ok(DeviceHandle::spawn(device, display_name(&config)))
    }
}

impl Default for CameraDeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the camera named in `config` through its backend
pub async fn connect(config: &DeviceConfig) -> Result<Box<dyn CameraDevice>> {
    match config.backend.as_str() {
        "simulated" => {
            info!("Connecting to simulated camera '{}'", display_name(config));
            Ok(Box::new(SimulatedCamera::new()))
        }
        other => Err(AstroError::Connection {
            device: display_name(config),
            details: format!("no transport available for backend '{}'", other),
        }),
    }
}

fn display_name(config: &DeviceConfig) -> String {
    if config.name.is_empty() {
        "<first available>".to_string()
    } else {
        config.name.clone()
    }
}
