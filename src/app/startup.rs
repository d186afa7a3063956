use super::SessionOrchestrator;
use crate::camera::{CameraDeviceBuilder, DeviceHandle};
use crate::error::Result;
use crate::session::Session;
use tracing::{error, info};

impl SessionOrchestrator {
    /// Check the configuration. Nothing has touched the camera yet.
    pub(super) fn validate(&self) -> Result<()> {
        self.config.validate().map_err(|e| {
            error!("Configuration validation failed: {}", e);
            e
        })?;

        info!(
            "Configuration validated: {} x {}s {} frames",
            if self.config.exposure.frames == 0 {
                "unlimited".to_string()
            } else {
                self.config.exposure.frames.to_string()
            },
            self.config.exposure.duration_seconds,
            self.config.exposure.kind
        );
        Ok(())
    }

    /// Open the camera and hand it to the command task
    pub(super) async fn connect(&mut self) -> Result<DeviceHandle> {
        let mut builder = CameraDeviceBuilder::new().config(self.config.device.clone());
        if let Some(device) = self.device.take() {
            builder = builder.device(device);
        }

        let camera = builder.build().await.map_err(|e| {
            error!("Failed to connect to camera: {}", e);
            e
        })?;

        info!("Connected to camera '{}'", camera.name());
        self.camera = Some(camera.clone());
        Ok(camera)
    }

    /// Prepare the download directory and the camera for shooting
    pub(super) async fn initialize(&mut self, camera: &DeviceHandle) -> Result<()> {
        let mut session = Session::from_config(&self.config)?;

        let kind_directory = session.kind_directory();
        tokio::fs::create_dir_all(&kind_directory).await?;
        info!("Downloading frames to {}", kind_directory.display());

        print!("Initializing camera... ");
        if let Err(e) = session.initialize(camera).await {
            println!("Error!");
            error!("Camera initialization failed: {}", e);
            return Err(e);
        }
        println!("Done.\n");

        println!("{}", session.banner());
        self.session = Some(session);
        Ok(())
    }
}
