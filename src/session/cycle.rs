use super::state::Session;
use crate::camera::{DeviceHandle, BATTERY_LEVEL, RELEASE_FULL, RELEASE_IMMEDIATE, REMOTE_RELEASE};
use crate::config::TimingConfig;
use crate::error::{AstroError, Result};
use crate::manifest::{DiffStrategy, FileManifest};
use crate::status::{StatusOutput, StatusReporter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Steps of a single bulb exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Arming,
    Exposing,
    Releasing,
    Settling,
    Listing,
    Downloading,
}

/// Fixed delays around the exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTiming {
    /// Added to the exposure so the camera registers the full duration
    pub settle_margin: Duration,
    /// Time given to the camera to write the frame before listing the card
    pub write_settle: Duration,
}

impl Default for CycleTiming {
    fn default() -> Self {
        Self {
            settle_margin: Duration::from_millis(100),
            write_settle: Duration::from_secs(2),
        }
    }
}

impl From<&TimingConfig> for CycleTiming {
    fn from(config: &TimingConfig) -> Self {
        Self {
            settle_margin: config.settle_margin(),
            write_settle: config.write_settle(),
        }
    }
}

/// Outcome of one completed frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u32,
    pub battery: String,
    pub downloaded: Vec<PathBuf>,
}

/// Drives one frame from shutter open to downloaded files.
///
/// The abort token is checked before every state and races both waits. An
/// aborted cycle returns `AstroError::Aborted` without sending any further
/// camera command; closing the shutter is left to the caller.
pub struct ExposureCycle {
    camera: DeviceHandle,
    abort: CancellationToken,
    output: Arc<dyn StatusOutput>,
    timing: CycleTiming,
    strategy: DiffStrategy,
    state: CycleState,
}

impl ExposureCycle {
    pub fn new(
        camera: DeviceHandle,
        abort: CancellationToken,
        output: Arc<dyn StatusOutput>,
    ) -> Self {
        Self {
            camera,
            abort,
            output,
            timing: CycleTiming::default(),
            strategy: DiffStrategy::default(),
            state: CycleState::Idle,
        }
    }

    pub fn with_timing(mut self, timing: CycleTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_diff_strategy(mut self, strategy: DiffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Capture `session.current`. The cycle is back in `Idle` afterwards,
    /// whatever the outcome.
    pub async fn run(&mut self, session: &mut Session) -> Result<FrameReport> {
        let result = self.run_states(session).await;

        if let Err(e) = &result {
            if e.is_aborted() {
                info!("Frame {} aborted while {:?}", session.current, self.state);
            } else {
                warn!("Frame {} failed while {:?}: {}", session.current, self.state, e);
            }
        }

        self.state = CycleState::Idle;
        result
    }

    async fn run_states(&mut self, session: &mut Session) -> Result<FrameReport> {
        self.enter(CycleState::Arming)?;
        session.battery = self.camera.get_setting(BATTERY_LEVEL).await?;
        self.camera
            .set_setting(REMOTE_RELEASE, RELEASE_IMMEDIATE)
            .await?;

        self.enter(CycleState::Exposing)?;
        let seconds = session.duration as u64;
        let reporter = StatusReporter::start(
            session.frame_status(),
            seconds,
            Arc::clone(&self.output),
        );
        let exposed = self
            .wait(Duration::from_secs(seconds) + self.timing.settle_margin)
            .await;
        reporter.stop().await;
        if !exposed {
            return Err(AstroError::Aborted);
        }

        self.enter(CycleState::Releasing)?;
        self.camera.set_setting(REMOTE_RELEASE, RELEASE_FULL).await?;

        self.enter(CycleState::Settling)?;
        if !self.wait(self.timing.write_settle).await {
            return Err(AstroError::Aborted);
        }

        self.enter(CycleState::Listing)?;
        self.camera.reset().await?;
        let listing = FileManifest::from_storage(&self.camera.list_files().await?);

        self.enter(CycleState::Downloading)?;
        let new_files = session.files.find_new(&listing, self.strategy);
        if new_files.is_empty() {
            warn!("No new files found on the camera after frame {}", session.current);
        }

        let mut downloaded = Vec::with_capacity(new_files.len());
        for file in &new_files {
            self.check_abort()?;
            let destination = session.destination_for(file);
            self.camera
                .download(file, &destination, session.keep)
                .await?;
            info!(
                "Frame {}: saved {} to {}",
                session.current,
                file.name,
                destination.display()
            );
            downloaded.push(destination);
        }
        // An interrupt during the last transfer still aborts the session
        self.check_abort()?;

        session.files = if session.keep {
            listing
        } else {
            listing.without(new_files.iter().map(|f| f.name.as_str()))
        };

        Ok(FrameReport {
            frame: session.current,
            battery: session.battery.clone(),
            downloaded,
        })
    }

    fn enter(&mut self, next: CycleState) -> Result<()> {
        self.check_abort()?;
        debug!("Exposure cycle {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    fn check_abort(&self) -> Result<()> {
        if self.abort.is_cancelled() {
            return Err(AstroError::Aborted);
        }
        Ok(())
    }

    /// Sleep for `duration`; false if the abort token fired first
    async fn wait(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.abort.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
