use super::SessionOrchestrator;
use crate::camera::DeviceHandle;
use crate::error::{AstroError, Result};
use crate::session::{CaptureLoop, CaptureSummary, CycleTiming, ExposureCycle};
use std::sync::Arc;
use tracing::info;

impl SessionOrchestrator {
    /// Install the interrupt listeners, which stay up until the orchestrator is dropped
    pub(super) fn listen_for_interrupts(&mut self) {
        if self.listen_for_signals && self.abort.listen() {
            info!("Press Ctrl+C to abort the session");
        }
    }

    /// Shoot every requested frame, stopping early if the abort token fires
    pub(super) async fn capture(&mut self, camera: &DeviceHandle) -> Result<CaptureSummary> {
        let cycle = ExposureCycle::new(camera.clone(), self.abort.token(), Arc::clone(&self.output))
            .with_timing(CycleTiming::from(&self.config.timing))
            .with_diff_strategy(self.config.manifest.diff_strategy);

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| AstroError::system("Capture started before the session was initialized"))?;

        CaptureLoop::new(cycle).run(session).await
    }
}
