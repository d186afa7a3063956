use crate::camera::{
    CameraFile, DeviceHandle, APERTURE, BATTERY_LEVEL, CAMERA_MODEL, CAPTURE_TARGET,
    FOCUS_MODE, IMAGE_FORMAT, ISO, LENS_NAME, SHUTTER_SPEED, WHITE_BALANCE,
};
use crate::config::{AstroConfig, CameraSettingsConfig, FrameKind};
use crate::error::Result;
use crate::manifest::FileManifest;
use crate::status::FrameStatus;
use std::path::PathBuf;
use tracing::{debug, info};

/// State of one capture run, owned by the caller and lent to each frame cycle
#[derive(Debug, Clone)]
pub struct Session {
    pub model: String,
    pub lens: String,
    /// Last battery level read from the camera
    pub battery: String,
    pub iso: u32,
    pub aperture: f64,
    pub shutter: String,
    /// Exposure length in seconds
    pub duration: u32,
    /// Requested frame count, 0 for no limit
    pub frames: u32,
    /// Index of the frame being (or last) captured, 0 before the first one
    pub current: u32,
    pub target: PathBuf,
    pub kind: FrameKind,
    /// Leave downloaded files on the camera
    pub keep: bool,
    /// Files known to be on the camera
    pub files: FileManifest,
    camera_settings: CameraSettingsConfig,
}

impl Session {
    pub fn from_config(config: &AstroConfig) -> Result<Self> {
        Ok(Self {
            model: String::new(),
            lens: String::new(),
            battery: String::new(),
            iso: config.exposure.iso,
            aperture: config.exposure.aperture,
            shutter: config.exposure.shutter.clone(),
            duration: config.exposure.duration_seconds,
            frames: config.exposure.frames,
            current: 0,
            target: PathBuf::from(&config.output.target),
            kind: config.frame_kind()?,
            keep: config.output.keep,
            files: FileManifest::default(),
            camera_settings: config.camera.clone(),
        })
    }

    /// Identify the camera, record what is already on the card and apply the
    /// fixed shooting settings
    pub async fn initialize(&mut self, camera: &DeviceHandle) -> Result<()> {
        self.model = camera.get_setting(CAMERA_MODEL).await?;
        self.lens = camera.get_setting(LENS_NAME).await?;

        let storage = camera.list_files().await?;
        self.files = FileManifest::from_storage(&storage);
        debug!("{} files already on the camera", self.files.len());

        info!("Initializing camera: {}", self.model);
        let aperture = format!("{:.1}", self.aperture);
        let iso = self.iso.to_string();
        let settings = [
            (FOCUS_MODE, self.camera_settings.focus_mode.as_str()),
            (SHUTTER_SPEED, self.shutter.as_str()),
            (ISO, iso.as_str()),
            (WHITE_BALANCE, self.camera_settings.white_balance.as_str()),
            (IMAGE_FORMAT, self.camera_settings.image_format.as_str()),
            (APERTURE, aperture.as_str()),
            (CAPTURE_TARGET, self.camera_settings.capture_target.as_str()),
        ];
        for (name, value) in settings {
            debug!("Setting {} = {}", name, value);
            camera.set_setting(name, value).await?;
        }

        self.refresh_battery(camera).await?;
        info!("Camera initialized, battery at {}", self.battery);
        Ok(())
    }

    pub async fn refresh_battery(&mut self, camera: &DeviceHandle) -> Result<()> {
        self.battery = camera.get_setting(BATTERY_LEVEL).await?;
        Ok(())
    }

    /// Advance to the next frame index, or `None` once the requested count is done
    pub fn next_frame(&mut self) -> Option<u32> {
        let next = self.current + 1;
        if self.frames != 0 && next > self.frames {
            return None;
        }
        self.current = next;
        Some(next)
    }

    /// Directory frames of this session's kind are written to
    pub fn kind_directory(&self) -> PathBuf {
        self.target.join(self.kind.as_str())
    }

    /// Local path a camera file is downloaded to
    pub fn destination_for(&self, file: &CameraFile) -> PathBuf {
        self.kind_directory().join(&file.name)
    }

    pub fn frame_status(&self) -> FrameStatus {
        FrameStatus {
            kind: self.kind,
            frame: self.current,
            frames: self.frames,
            battery: self.battery.clone(),
        }
    }

    /// Camera summary shown before shooting starts
    pub fn banner(&self) -> String {
        format!(
            "Camera Model:  {}\nLens Model:    {}\nSD Card Files: {}\nBattery Level: {}\n",
            self.model,
            self.lens,
            self.files.len(),
            self.battery
        )
    }
}
