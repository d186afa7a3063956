use crate::error::AstroError;
use crate::session::CaptureSummary;

/// Process exit code after a complete session
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code after a validation, device or I/O failure
pub const EXIT_FAILURE: i32 = 1;
/// Process exit code after a user interrupt
pub const EXIT_INTERRUPTED: i32 = 130;

/// Why a capture session ended
#[derive(Debug)]
pub enum ShutdownReason {
    /// Every requested frame was captured
    Completed(CaptureSummary),
    /// The user interrupted the session
    Interrupted,
    Failed(AstroError),
}

impl ShutdownReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::Completed(_) => EXIT_SUCCESS,
            ShutdownReason::Interrupted => EXIT_INTERRUPTED,
            ShutdownReason::Failed(_) => EXIT_FAILURE,
        }
    }
}

impl From<crate::error::Result<CaptureSummary>> for ShutdownReason {
    fn from(result: crate::error::Result<CaptureSummary>) -> Self {
        match result {
            Ok(summary) => ShutdownReason::Completed(summary),
            Err(AstroError::Aborted) => ShutdownReason::Interrupted,
            Err(e) => ShutdownReason::Failed(e),
        }
    }
}
