use crate::error::{AstroError, Result};
use crate::manifest::DiffStrategy;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Longest session that may be requested (frames x duration), in seconds
pub const MAX_SESSION_SECONDS: u64 = 8 * 60 * 60;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AstroConfig {
    pub device: DeviceConfig,
    pub exposure: ExposureConfig,
    pub output: OutputConfig,
    pub camera: CameraSettingsConfig,
    pub timing: TimingConfig,
    pub manifest: ManifestConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Camera transport backend
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Name of the camera to open (empty picks the first one found)
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExposureConfig {
    /// Number of frames to take, 0 for no limit
    #[serde(default)]
    pub frames: u32,

    /// Length of each exposure in seconds
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u32,

    /// Shutter speed descriptor applied at session start
    #[serde(default = "default_shutter")]
    pub shutter: String,

    /// Lens aperture ratio
    #[serde(default = "default_aperture")]
    pub aperture: f64,

    #[serde(default = "default_iso")]
    pub iso: u32,

    /// Frame kind, either "lights" or "darks"
    #[serde(default = "default_kind")]
    pub kind: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    /// Directory frames are downloaded into (under a per-kind subdirectory)
    #[serde(default = "default_target")]
    pub target: String,

    /// Keep files on the camera after download
    #[serde(default)]
    pub keep: bool,
}

/// Fixed settings written to the camera once before shooting
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraSettingsConfig {
    #[serde(default = "default_focus_mode")]
    pub focus_mode: String,

    #[serde(default = "default_white_balance")]
    pub white_balance: String,

    #[serde(default = "default_image_format")]
    pub image_format: String,

    #[serde(default = "default_capture_target")]
    pub capture_target: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TimingConfig {
    /// Extra time the shutter stays open past the requested duration
    #[serde(default = "default_settle_margin_ms")]
    pub settle_margin_ms: u64,

    /// Pause after release before the card is listed
    #[serde(default = "default_write_settle_ms")]
    pub write_settle_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ManifestConfig {
    #[serde(default)]
    pub diff_strategy: DiffStrategy,
}

/// Classification of captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Lights,
    Darks,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Lights => "lights",
            FrameKind::Darks => "darks",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FrameKind {
    type Err = AstroError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lights" => Ok(FrameKind::Lights),
            "darks" => Ok(FrameKind::Darks),
            other => Err(AstroError::validation(format!(
                "Bad 'kind' option: {} (must be either 'lights' or 'darks')",
                other
            ))),
        }
    }
}

/// Values given on the command line, applied on top of file and environment sources
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub frames: Option<u32>,
    pub target: Option<String>,
    pub duration_seconds: Option<u32>,
    pub shutter: Option<String>,
    pub aperture: Option<f64>,
    pub iso: Option<u32>,
    pub kind: Option<String>,
    pub keep: bool,
    pub name: Option<String>,
}

impl AstroConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, config::ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("device.backend", default_backend())?
            .set_default("device.name", "")?
            .set_default("exposure.frames", 0)?
            .set_default("exposure.duration_seconds", default_duration_seconds() as i64)?
            .set_default("exposure.shutter", default_shutter())?
            .set_default("exposure.aperture", default_aperture())?
            .set_default("exposure.iso", default_iso() as i64)?
            .set_default("exposure.kind", default_kind())?
            .set_default("output.target", default_target())?
            .set_default("output.keep", false)?
            .set_default("camera.focus_mode", default_focus_mode())?
            .set_default("camera.white_balance", default_white_balance())?
            .set_default("camera.image_format", default_image_format())?
            .set_default("camera.capture_target", default_capture_target())?
            .set_default("timing.settle_margin_ms", default_settle_margin_ms() as i64)?
            .set_default("timing.write_settle_ms", default_write_settle_ms() as i64)?
            .set_default("manifest.diff_strategy", "count_shortcut")?
            .add_source(File::with_name(&path_str).required(false))
            // ASTROCAM_EXPOSURE__FRAMES=10 and friends
            .add_source(
                Environment::with_prefix("ASTROCAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: AstroConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Apply command line values on top of the loaded configuration
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(frames) = overrides.frames {
            self.exposure.frames = frames;
        }
        if let Some(target) = &overrides.target {
            self.output.target = target.clone();
        }
        if let Some(duration) = overrides.duration_seconds {
            self.exposure.duration_seconds = duration;
        }
        if let Some(shutter) = &overrides.shutter {
            self.exposure.shutter = shutter.clone();
        }
        if let Some(aperture) = overrides.aperture {
            self.exposure.aperture = aperture;
        }
        if let Some(iso) = overrides.iso {
            self.exposure.iso = iso;
        }
        if let Some(kind) = &overrides.kind {
            self.exposure.kind = kind.clone();
        }
        if overrides.keep {
            self.output.keep = true;
        }
        if let Some(name) = &overrides.name {
            self.device.name = name.clone();
        }
    }

    /// Validate configuration values. Runs before the camera is touched.
    pub fn validate(&self) -> Result<()> {
        self.frame_kind()?;

        if self.exposure.duration_seconds == 0 {
            return Err(AstroError::validation(
                "Exposure duration must be greater than 0",
            ));
        }

        if self.total_session_seconds() > MAX_SESSION_SECONDS {
            return Err(AstroError::validation(format!(
                "Specified shooting time is longer than 8 hours ({} frames x {}s), aborting",
                self.exposure.frames, self.exposure.duration_seconds
            )));
        }

        if self.exposure.iso == 0 {
            return Err(AstroError::validation("ISO must be greater than 0"));
        }

        if !(self.exposure.aperture.is_finite() && self.exposure.aperture > 0.0) {
            return Err(AstroError::validation(format!(
                "Aperture must be a positive number, got {}",
                self.exposure.aperture
            )));
        }

        Ok(())
    }

    pub fn frame_kind(&self) -> Result<FrameKind> {
        self.exposure.kind.parse()
    }

    pub fn total_session_seconds(&self) -> u64 {
        self.exposure.frames as u64 * self.exposure.duration_seconds as u64
    }
}

impl TimingConfig {
    pub fn settle_margin(&self) -> Duration {
        Duration::from_millis(self.settle_margin_ms)
    }

    pub fn write_settle(&self) -> Duration {
        Duration::from_millis(self.write_settle_ms)
    }
}

impl Default for AstroConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig {
                backend: default_backend(),
                name: String::new(),
            },
            exposure: ExposureConfig {
                frames: 0,
                duration_seconds: default_duration_seconds(),
                shutter: default_shutter(),
                aperture: default_aperture(),
                iso: default_iso(),
                kind: default_kind(),
            },
            output: OutputConfig {
                target: default_target(),
                keep: false,
            },
            camera: CameraSettingsConfig {
                focus_mode: default_focus_mode(),
                white_balance: default_white_balance(),
                image_format: default_image_format(),
                capture_target: default_capture_target(),
            },
            timing: TimingConfig {
                settle_margin_ms: default_settle_margin_ms(),
                write_settle_ms: default_write_settle_ms(),
            },
            manifest: ManifestConfig {
                diff_strategy: DiffStrategy::default(),
            },
        }
    }
}

// Default value functions
fn default_backend() -> String {
    "simulated".to_string()
}

fn default_duration_seconds() -> u32 {
    60
}
fn default_shutter() -> String {
    "bulb".to_string()
}
fn default_aperture() -> f64 {
    2.8
}
fn default_iso() -> u32 {
    800
}
fn default_kind() -> String {
    "lights".to_string()
}

fn default_target() -> String {
    "/tmp/target".to_string()
}

fn default_focus_mode() -> String {
    "Manual".to_string()
}
fn default_white_balance() -> String {
    "Daylight".to_string()
}
fn default_image_format() -> String {
    "RAW".to_string()
}
fn default_capture_target() -> String {
    "Memory card".to_string()
}

fn default_settle_margin_ms() -> u64 {
    100
}
fn default_write_settle_ms() -> u64 {
    2000
}
