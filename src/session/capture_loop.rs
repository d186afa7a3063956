use super::cycle::{ExposureCycle, FrameReport};
use super::state::Session;
use crate::error::Result;
use tracing::info;

/// Totals for a finished session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureSummary {
    pub frames_captured: u32,
    pub files_downloaded: usize,
    pub last_battery: Option<String>,
}

impl CaptureSummary {
    fn record(&mut self, report: &FrameReport) {
        self.frames_captured += 1;
        self.files_downloaded += report.downloaded.len();
        self.last_battery = Some(report.battery.clone());
    }
}

/// Repeats the exposure cycle until the requested frame count is reached
/// (forever when it is 0). The first failing frame ends the session.
pub struct CaptureLoop {
    cycle: ExposureCycle,
}

impl CaptureLoop {
    pub fn new(cycle: ExposureCycle) -> Self {
        Self { cycle }
    }

    pub async fn run(&mut self, session: &mut Session) -> Result<CaptureSummary> {
        let mut summary = CaptureSummary::default();

        while let Some(frame) = session.next_frame() {
            info!("Starting frame {}", frame);
            let report = self.cycle.run(session).await?;
            summary.record(&report);
        }

        println!("\n\nFrames capture complete.");
        info!(
            "Capture complete: {} frames, {} files downloaded",
            summary.frames_captured, summary.files_downloaded
        );
        Ok(summary)
    }
}
