mod capture_loop;
mod cycle;
mod state;

pub use capture_loop::{CaptureLoop, CaptureSummary};
pub use cycle::{CycleState, CycleTiming, ExposureCycle, FrameReport};
pub use state::Session;
