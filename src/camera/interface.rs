use crate::error::Result;
use async_trait::async_trait;
use tokio::io::AsyncWrite;

/// Remote shutter release setting (bulb open/close)
pub const REMOTE_RELEASE: &str = "eosremoterelease";
pub const BATTERY_LEVEL: &str = "batterylevel";
pub const CAMERA_MODEL: &str = "cameramodel";
pub const LENS_NAME: &str = "lensname";

pub const FOCUS_MODE: &str = "focusmode";
pub const SHUTTER_SPEED: &str = "shutterspeed";
pub const ISO: &str = "iso";
pub const WHITE_BALANCE: &str = "whitebalance";
pub const IMAGE_FORMAT: &str = "imageformat";
pub const APERTURE: &str = "aperture";
pub const CAPTURE_TARGET: &str = "capturetarget";

/// Value that opens the shutter
pub const RELEASE_IMMEDIATE: &str = "Immediate";
/// Value that closes the shutter
pub const RELEASE_FULL: &str = "Release Full";

/// One file entry as reported by the camera's storage listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFile {
    pub name: String,
    pub folder: String,
    pub is_dir: bool,
}

impl CameraFile {
    pub fn new(name: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: folder.into(),
            is_dir: false,
        }
    }
}

/// Node of the hierarchical storage listing (storage, container, directory, file)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageNode {
    pub file: CameraFile,
    pub children: Vec<StorageNode>,
}

impl StorageNode {
    pub fn file(name: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            file: CameraFile::new(name, folder),
            children: Vec::new(),
        }
    }

    pub fn directory(
        name: impl Into<String>,
        folder: impl Into<String>,
        children: Vec<StorageNode>,
    ) -> Self {
        Self {
            file: CameraFile {
                name: name.into(),
                folder: folder.into(),
                is_dir: true,
            },
            children,
        }
    }
}

/// Command surface of a tethered camera.
///
/// Implementations are driven from a single task (see `DeviceHandle`), so they
/// never see two commands at once.
#[async_trait]
pub trait CameraDevice: Send {
    /// Read the current value of a named setting
    async fn get_setting(&mut self, name: &str) -> Result<String>;

    /// Write a named setting
    async fn set_setting(&mut self, name: &str, value: &str) -> Result<()>;

    /// Fetch the storage hierarchy
    async fn list_files(&mut self) -> Result<Vec<StorageNode>>;

    /// Stream a file's content into `dest`, removing it from the card unless
    /// `leave_on_device` is set
    async fn download_file(
        &mut self,
        file: &CameraFile,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
        leave_on_device: bool,
    ) -> Result<()>;

    /// Reset the connection so the camera refreshes its internal state
    async fn reset(&mut self) -> Result<()>;

    /// Release the camera
    async fn disconnect(&mut self) -> Result<()>;
}
