use super::{SessionOrchestrator, ShutdownReason};
use crate::abort::AbortHandler;
use chrono::Local;
use tracing::{error, info, warn};

impl SessionOrchestrator {
    /// Close the shutter if the session was interrupted, then release the camera
    pub(super) async fn shutdown(&mut self, reason: ShutdownReason) -> ShutdownReason {
        let mut reason = reason;

        match &reason {
            ShutdownReason::Completed(summary) => {
                let elapsed = Local::now() - self.started_at;
                info!(
                    "Captured {} frames ({} files) in {}s",
                    summary.frames_captured,
                    summary.files_downloaded,
                    elapsed.num_seconds()
                );
            }
            ShutdownReason::Interrupted => {
                println!();
                warn!("Capture interrupted by user");
                if let Some(camera) = &self.camera {
                    AbortHandler::release_shutter(camera).await;
                }
            }
            ShutdownReason::Failed(e) => {
                error!("Capture session failed: {}", e);
            }
        }

        if let Some(camera) = self.camera.take() {
            if let Err(e) = camera.disconnect().await {
                error!("Error disconnecting camera: {}", e);
                if matches!(reason, ShutdownReason::Completed(_)) {
                    reason = ShutdownReason::Failed(e);
                }
            }
        }

        info!("Session ended with exit code {}", reason.exit_code());
        reason
    }
}
