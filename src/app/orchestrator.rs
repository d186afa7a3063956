use super::types::ShutdownReason;
use crate::abort::AbortHandler;
use crate::camera::{CameraDevice, DeviceHandle};
use crate::config::AstroConfig;
use crate::session::Session;
use crate::status::{StatusOutput, TerminalOutput};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Runs one capture session from validation to camera disconnect
pub struct SessionOrchestrator {
    pub(super) config: AstroConfig,
    pub(super) session_id: Uuid,
    pub(super) started_at: DateTime<Local>,
    pub(super) abort: AbortHandler,
    pub(super) listen_for_signals: bool,
    pub(super) output: Arc<dyn StatusOutput>,

    /// Pre-opened device, used instead of connecting through the backend
    pub(super) device: Option<Box<dyn CameraDevice>>,
    pub(super) camera: Option<DeviceHandle>,
    pub(super) session: Option<Session>,
}

impl SessionOrchestrator {
    pub fn new(config: AstroConfig) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4(),
            started_at: Local::now(),
            abort: AbortHandler::new(),
            listen_for_signals: true,
            output: Arc::new(TerminalOutput),
            device: None,
            camera: None,
            session: None,
        }
    }

    /// Drive `device` instead of opening one from the configuration
    pub fn with_device(mut self, device: Box<dyn CameraDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_status_output(mut self, output: Arc<dyn StatusOutput>) -> Self {
        self.output = output;
        self
    }

    /// Leave process signals alone. Aborts then come only from `abort_token`.
    pub fn without_signal_handlers(mut self) -> Self {
        self.listen_for_signals = false;
        self
    }

    /// Token that aborts the session when cancelled
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.token()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Run the whole session and report how it ended
    pub async fn run(&mut self) -> ShutdownReason {
        let span = tracing::info_span!("session", id = %self.session_id);

        async move {
            info!(
                "Capture session started at {}",
                self.started_at.format("%Y-%m-%d %H:%M:%S")
            );

            let result = self.run_session().await;
            self.shutdown(ShutdownReason::from(result)).await
        }
        .instrument(span)
        .await
    }

    async fn run_session(&mut self) -> crate::error::Result<crate::session::CaptureSummary> {
        self.listen_for_interrupts();
        self.validate()?;
        let camera = self.connect().await?;
        self.initialize(&camera).await?;
        self.capture(&camera).await
    }
}
