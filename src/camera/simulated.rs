use super::interface::*;
use crate::error::{AstroError, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const STORAGE_NAME: &str = "store_00020001";
const CONTAINER_NAME: &str = "DCIM";
const DIRECTORY_NAME: &str = "100CANON";
const LOWEST_BATTERY: u8 = 5;

/// Camera command as observed by the simulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Get(String),
    Set(String, String),
    List,
    Download(String),
    Reset,
    Disconnect,
}

#[derive(Debug)]
struct SimulatedState {
    model: String,
    lens: String,
    battery: u8,
    settings: HashMap<String, String>,
    files: Vec<(String, Vec<u8>)>,
    next_frame: u32,
    shutter_open: bool,
    calls: Vec<DeviceCall>,
    failing_settings: HashSet<String>,
    fail_listing: bool,
    fail_reset: bool,
    fail_download: bool,
    download_interrupt: Option<CancellationToken>,
}

impl SimulatedState {
    fn folder() -> String {
        format!("/{}/{}/{}", STORAGE_NAME, CONTAINER_NAME, DIRECTORY_NAME)
    }

    fn add_frame(&mut self) -> String {
        let extension = match self.settings.get(IMAGE_FORMAT).map(String::as_str) {
            Some("RAW") | None => "CR2",
            Some(_) => "JPG",
        };
        let name = format!("IMG_{:04}.{}", self.next_frame, extension);
        self.next_frame += 1;

        let content = format!(
            "simulated {} exposure {} at {}",
            self.model,
            name,
            Utc::now().to_rfc3339()
        );
        self.files.push((name.clone(), content.into_bytes()));
        name
    }
}

/// In-process bulb camera with a memory card.
///
/// Closing the shutter after opening it writes one new file to the card. Every
/// command is recorded and individual commands can be made to fail, which is
/// what the capture tests are built on.
pub struct SimulatedCamera {
    state: Arc<Mutex<SimulatedState>>,
}

/// Inspection and fault-injection view of a `SimulatedCamera`
#[derive(Clone)]
pub struct SimulatedMonitor {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                model: "Canon EOS 6D".to_string(),
                lens: "EF24-105mm f/4L IS USM".to_string(),
                battery: 100,
                settings: HashMap::new(),
                files: Vec::new(),
                next_frame: 1,
                shutter_open: false,
                calls: Vec::new(),
                failing_settings: HashSet::new(),
                fail_listing: false,
                fail_reset: false,
                fail_download: false,
                download_interrupt: None,
            })),
        }
    }

    /// Start with `count` frames already on the card
    pub fn with_existing_files(self, count: usize) -> Self {
        {
            let mut state = self.state.lock();
            for _ in 0..count {
                state.add_frame();
            }
        }
        self
    }

    pub fn monitor(&self) -> SimulatedMonitor {
        SimulatedMonitor {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedMonitor {
    /// Every command the camera has received, in order
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().calls.clone()
    }

    /// Number of times `setting` was written with `value`
    pub fn set_count(&self, setting: &str, value: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, DeviceCall::Set(s, v) if s == setting && v == value))
            .count()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.state
            .lock()
            .files
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn setting(&self, name: &str) -> Option<String> {
        self.state.lock().settings.get(name).cloned()
    }

    pub fn shutter_open(&self) -> bool {
        self.state.lock().shutter_open
    }

    /// Place a file on the card, as if written outside the session
    pub fn add_file(&self, name: &str) {
        self.state
            .lock()
            .files
            .push((name.to_string(), b"external".to_vec()));
    }

    pub fn remove_file(&self, name: &str) {
        self.state.lock().files.retain(|(n, _)| n != name);
    }

    pub fn fail_setting(&self, name: &str) {
        self.state.lock().failing_settings.insert(name.to_string());
    }

    pub fn fail_listing(&self) {
        self.state.lock().fail_listing = true;
    }

    pub fn fail_reset(&self) {
        self.state.lock().fail_reset = true;
    }

    pub fn fail_download(&self) {
        self.state.lock().fail_download = true;
    }

    /// Cancel `token` when a download starts, as if the user pressed Ctrl+C mid-transfer
    pub fn cancel_on_download(&self, token: CancellationToken) {
        self.state.lock().download_interrupt = Some(token);
    }
}

#[async_trait]
impl CameraDevice for SimulatedCamera {
    async fn get_setting(&mut self, name: &str) -> Result<String> {
        let mut state = self.state.lock();
        state.calls.push(DeviceCall::Get(name.to_string()));

        if state.failing_settings.contains(name) {
            return Err(AstroError::setting_get(name, "camera rejected the request"));
        }

        let value = match name {
            CAMERA_MODEL => Some(state.model.clone()),
            LENS_NAME => Some(state.lens.clone()),
            BATTERY_LEVEL => Some(format!("{}%", state.battery)),
            other => state.settings.get(other).cloned(),
        };

        value.ok_or_else(|| AstroError::setting_get(name, "no such setting"))
    }

    async fn set_setting(&mut self, name: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(DeviceCall::Set(name.to_string(), value.to_string()));

        if state.failing_settings.contains(name) {
            return Err(AstroError::setting_set(name, "camera rejected the request"));
        }

        if name == REMOTE_RELEASE {
            match value {
                RELEASE_IMMEDIATE => {
                    state.shutter_open = true;
                    debug!("Simulated shutter opened");
                }
                RELEASE_FULL => {
                    if state.shutter_open {
                        state.shutter_open = false;
                        state.battery = state.battery.saturating_sub(1).max(LOWEST_BATTERY);
                        let name = state.add_frame();
                        debug!("Simulated shutter closed, wrote {}", name);
                    }
                }
                other => {
                    return Err(AstroError::setting_set(
                        name,
                        format!("unsupported release value '{}'", other),
                    ));
                }
            }
            return Ok(());
        }

        state.settings.insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn list_files(&mut self) -> Result<Vec<StorageNode>> {
        let mut state = self.state.lock();
        state.calls.push(DeviceCall::List);

        if state.fail_listing {
            return Err(AstroError::List {
                details: "storage not ready".to_string(),
            });
        }

        let folder = SimulatedState::folder();
        let files = state
            .files
            .iter()
            .map(|(name, _)| StorageNode::file(name.clone(), folder.clone()))
            .collect();

        let container_path = format!("/{}/{}", STORAGE_NAME, CONTAINER_NAME);
        Ok(vec![StorageNode::directory(
            STORAGE_NAME,
            "/",
            vec![
                StorageNode::directory(
                    CONTAINER_NAME,
                    format!("/{}", STORAGE_NAME),
                    vec![
                        StorageNode::directory(DIRECTORY_NAME, container_path.clone(), files),
                        StorageNode::directory("EOSMISC", container_path, Vec::new()),
                    ],
                ),
                StorageNode::directory("MISC", format!("/{}", STORAGE_NAME), Vec::new()),
            ],
        )])
    }

    async fn download_file(
        &mut self,
        file: &CameraFile,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
        leave_on_device: bool,
    ) -> Result<()> {
        let content = {
            let mut state = self.state.lock();
            state.calls.push(DeviceCall::Download(file.name.clone()));
            if let Some(token) = &state.download_interrupt {
                token.cancel();
            }

            if state.fail_download {
                return Err(AstroError::download(&file.name, "transfer interrupted"));
            }

            state
                .files
                .iter()
                .find(|(name, _)| name == &file.name)
                .map(|(_, content)| content.clone())
                .ok_or_else(|| AstroError::download(&file.name, "file not found on camera"))?
        };

        dest.write_all(&content)
            .await
            .map_err(|e| AstroError::download(&file.name, e))?;

        if !leave_on_device {
            self.state.lock().files.retain(|(name, _)| name != &file.name);
        }

        Ok(())
    }

    async fn reset(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DeviceCall::Reset);

        if state.fail_reset {
            return Err(AstroError::Reset {
                details: "USB port reset refused".to_string(),
            });
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.state.lock().calls.push(DeviceCall::Disconnect);
        info!("Simulated camera disconnected");
        Ok(())
    }
}
