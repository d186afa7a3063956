mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::SessionOrchestrator;
pub use types::{ShutdownReason, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_SUCCESS};
