pub mod abort;
pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod manifest;
pub mod session;
pub mod status;

pub use abort::AbortHandler;
pub use app::{ShutdownReason, SessionOrchestrator};
pub use camera::{CameraDevice, CameraDeviceBuilder, CameraFile, DeviceHandle, SimulatedCamera, StorageNode};
pub use config::{AstroConfig, ConfigOverrides, FrameKind};
pub use error::{AstroError, Result};
pub use manifest::{DiffStrategy, FileManifest};
pub use session::{CaptureLoop, CaptureSummary, CycleState, ExposureCycle, Session};
pub use status::{format_status, StatusReporter};
