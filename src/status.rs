use crate::config::FrameKind;
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use parking_lot::Mutex;
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Descriptive fields shown on the progress line
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStatus {
    pub kind: FrameKind,
    pub frame: u32,
    /// Target frame count, 0 when unbounded
    pub frames: u32,
    pub battery: String,
}

impl FrameStatus {
    pub fn line(&self, remaining: u64) -> String {
        format_status(self.kind, self.frame, self.frames, remaining, &self.battery)
    }
}

pub fn format_status(
    kind: FrameKind,
    frame: u32,
    frames: u32,
    remaining: u64,
    battery: &str,
) -> String {
    if frames == 0 {
        format!(
            "Capturing {} frame {:3}; {} seconds remaining; battery: {}",
            kind, frame, remaining, battery
        )
    } else {
        format!(
            "Capturing {} frame {:3}/{}; {} seconds remaining; battery: {}",
            kind, frame, frames, remaining, battery
        )
    }
}

/// Destination for progress lines
pub trait StatusOutput: Send + Sync {
    /// Replace the current progress line with `line`
    fn show(&self, line: &str);
}

/// Rewrites a single stdout line in place
#[derive(Debug, Default)]
pub struct TerminalOutput;

impl StatusOutput for TerminalOutput {
    fn show(&self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        if stdout.is_terminal() {
            let _ = queue!(
                stdout,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(line)
            );
        } else {
            let _ = write!(stdout, "{}\r", line);
        }
        let _ = stdout.flush();
    }
}

/// Keeps every line it is shown
#[derive(Debug, Default, Clone)]
pub struct CapturedOutput {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl StatusOutput for CapturedOutput {
    fn show(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Once-per-second countdown running beside an exposure wait.
///
/// Only displays progress. `stop` cancels the ticker and waits for it, so no
/// line is written after the exposure it describes has ended.
pub struct StatusReporter {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl StatusReporter {
    /// Start counting down from `seconds`
    pub fn start(status: FrameStatus, seconds: u64, output: Arc<dyn StatusOutput>) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            let mut remaining = seconds;

            while remaining > 0 {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let line = status.line(remaining);
                        trace!("{}", line);
                        output.show(&line);
                        remaining -= 1;
                    }
                }
            }
        });

        Self { token, task }
    }

    /// Cancel the countdown and wait for the ticker task to finish
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            debug!("Status reporter task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_status_line() {
        assert_eq!(
            format_status(FrameKind::Lights, 3, 0, 45, "75%"),
            "Capturing lights frame   3; 45 seconds remaining; battery: 75%"
        );
    }

    #[test]
    fn test_bounded_status_line() {
        assert_eq!(
            format_status(FrameKind::Darks, 2, 10, 12, "60%"),
            "Capturing darks frame   2/10; 12 seconds remaining; battery: 60%"
        );
    }

    #[test]
    fn test_wide_frame_numbers_are_not_truncated() {
        let status = FrameStatus {
            kind: FrameKind::Lights,
            frame: 1234,
            frames: 2000,
            battery: "5%".to_string(),
        };
        assert_eq!(
            status.line(1),
            "Capturing lights frame 1234/2000; 1 seconds remaining; battery: 5%"
        );
    }

    fn test_status() -> FrameStatus {
        FrameStatus {
            kind: FrameKind::Lights,
            frame: 1,
            frames: 3,
            battery: "90%".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_counts_down_to_one() {
        let output = CapturedOutput::new();
        let reporter = StatusReporter::start(test_status(), 3, Arc::new(output.clone()));

        tokio::time::sleep(Duration::from_millis(3100)).await;
        reporter.stop().await;

        let lines = output.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("3 seconds remaining"));
        assert!(lines[2].contains("1 seconds remaining"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_stops_when_cancelled() {
        let output = CapturedOutput::new();
        let reporter = StatusReporter::start(test_status(), 60, Arc::new(output.clone()));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        reporter.stop().await;
        let shown = output.lines().len();
        assert_eq!(shown, 3);

        // Nothing is written once stopped
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(output.lines().len(), shown);
    }
}
