use super::interface::{CameraDevice, CameraFile, StorageNode};
use crate::error::{AstroError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

const COMMAND_QUEUE_DEPTH: usize = 16;

/// Requests accepted by the device task
enum DeviceCommand {
    GetSetting {
        name: String,
        reply: oneshot::Sender<Result<String>>,
    },
    SetSetting {
        name: String,
        value: String,
        reply: oneshot::Sender<Result<()>>,
    },
    ListFiles {
        reply: oneshot::Sender<Result<Vec<StorageNode>>>,
    },
    Download {
        file: CameraFile,
        destination: PathBuf,
        leave_on_device: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    Reset {
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        reply: oneshot::Sender<Result<()>>,
    },
}

impl DeviceCommand {
    fn label(&self) -> &'static str {
        match self {
            DeviceCommand::GetSetting { .. } => "get_setting",
            DeviceCommand::SetSetting { .. } => "set_setting",
            DeviceCommand::ListFiles { .. } => "list_files",
            DeviceCommand::Download { .. } => "download",
            DeviceCommand::Reset { .. } => "reset",
            DeviceCommand::Disconnect { .. } => "disconnect",
        }
    }
}

/// Cloneable handle to the camera.
///
/// A single task owns the device and executes commands in arrival order, so the
/// capture flow and the abort path can never interleave halfway through a
/// command.
#[derive(Clone)]
pub struct DeviceHandle {
    sender: mpsc::Sender<DeviceCommand>,
    name: Arc<str>,
}

impl DeviceHandle {
    /// Move the device into its own task and return a handle to it
    pub fn spawn(device: Box<dyn CameraDevice>, name: impl Into<Arc<str>>) -> Self {
        let (sender, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let name = name.into();

        let actor_name = Arc::clone(&name);
        tokio::spawn(async move {
            run_device_task(device, receiver).await;
            debug!("Camera command task for '{}' stopped", actor_name);
        });

        Self { sender, name }
    }

    /// Identifier the camera was opened with
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get_setting(&self, name: &str) -> Result<String> {
        self.request(|reply| DeviceCommand::GetSetting {
            name: name.to_string(),
            reply,
        })
        .await
    }

    pub async fn set_setting(&self, name: &str, value: &str) -> Result<()> {
        self.request(|reply| DeviceCommand::SetSetting {
            name: name.to_string(),
            value: value.to_string(),
            reply,
        })
        .await
    }

    pub async fn list_files(&self) -> Result<Vec<StorageNode>> {
        self.request(|reply| DeviceCommand::ListFiles { reply }).await
    }

    /// Create `destination` and copy the camera file into it
    pub async fn download(
        &self,
        file: &CameraFile,
        destination: &Path,
        leave_on_device: bool,
    ) -> Result<()> {
        self.request(|reply| DeviceCommand::Download {
            file: file.clone(),
            destination: destination.to_path_buf(),
            leave_on_device,
            reply,
        })
        .await
    }

    pub async fn reset(&self) -> Result<()> {
        self.request(|reply| DeviceCommand::Reset { reply }).await
    }

    /// Close the camera. The command task exits afterwards and later requests fail.
    pub async fn disconnect(&self) -> Result<()> {
        self.request(|reply| DeviceCommand::Disconnect { reply })
            .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> DeviceCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender.send(build(reply)).await.map_err(|_| {
            AstroError::system(format!("Camera '{}' is no longer connected", self.name))
        })?;

        response.await.map_err(|_| {
            AstroError::system(format!(
                "Camera '{}' dropped a command without replying",
                self.name
            ))
        })?
    }
}

async fn run_device_task(
    mut device: Box<dyn CameraDevice>,
    mut receiver: mpsc::Receiver<DeviceCommand>,
) {
    while let Some(command) = receiver.recv().await {
        trace!("Executing camera command: {}", command.label());

        match command {
            DeviceCommand::GetSetting { name, reply } => {
                let _ = reply.send(device.get_setting(&name).await);
            }
            DeviceCommand::SetSetting { name, value, reply } => {
                let _ = reply.send(device.set_setting(&name, &value).await);
            }
            DeviceCommand::ListFiles { reply } => {
                let _ = reply.send(device.list_files().await);
            }
            DeviceCommand::Download {
                file,
                destination,
                leave_on_device,
                reply,
            } => {
                let result =
                    download_to_path(device.as_mut(), &file, &destination, leave_on_device).await;
                let _ = reply.send(result);
            }
            DeviceCommand::Reset { reply } => {
                let _ = reply.send(device.reset().await);
            }
            DeviceCommand::Disconnect { reply } => {
                let _ = reply.send(device.disconnect().await);
                break;
            }
        }
    }
}

async fn download_to_path(
    device: &mut dyn CameraDevice,
    file: &CameraFile,
    destination: &Path,
    leave_on_device: bool,
) -> Result<()> {
    let mut output = tokio::fs::File::create(destination).await.map_err(|e| {
        AstroError::download(
            &file.name,
            format!("cannot create {}: {}", destination.display(), e),
        )
    })?;

    device
        .download_file(file, &mut output, leave_on_device)
        .await?;

    output
        .flush()
        .await
        .map_err(|e| AstroError::download(&file.name, e))?;

    debug!("Downloaded {} to {}", file.name, destination.display());
    Ok(())
}
