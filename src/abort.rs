//! User interrupt handling for a capture session.
//!
//! The first signal only cancels a token. The capture flow notices the token at
//! its next checkpoint (or immediately, while waiting on an exposure) and
//! unwinds; the orchestrator then closes the shutter through the regular
//! command queue. A second signal exits the process on the spot, for when a
//! camera command hangs.

use crate::app::EXIT_INTERRUPTED;
use crate::camera::{DeviceHandle, RELEASE_FULL, REMOTE_RELEASE};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Response to an interrupt signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Unwind the session and close the shutter
    Abort,
    /// The session is already unwinding, exit now
    ForceExit,
}

/// Cancel `token` on the first signal. Any later signal forces the exit.
pub fn on_signal(token: &CancellationToken) -> SignalAction {
    if token.is_cancelled() {
        SignalAction::ForceExit
    } else {
        token.cancel();
        SignalAction::Abort
    }
}

fn handle_signal(token: &CancellationToken, signal: &str) {
    match on_signal(token) {
        SignalAction::Abort => {
            info!(
                "Received {}, aborting capture (send it again to exit immediately)",
                signal
            );
        }
        SignalAction::ForceExit => {
            warn!("Received {} again, exiting without closing the shutter", signal);
            std::process::exit(EXIT_INTERRUPTED);
        }
    }
}

pub struct AbortHandler {
    token: CancellationToken,
    listeners: Vec<JoinHandle<()>>,
}

impl AbortHandler {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            listeners: Vec::new(),
        }
    }

    /// Token cancelled when an interrupt arrives
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Start listening for SIGINT (and SIGTERM on unix) until the handler is
    /// dropped. Returns false if the listeners were already running.
    pub fn listen(&mut self) -> bool {
        if !self.listeners.is_empty() {
            return false;
        }

        let token = self.token.clone();
        self.listeners.push(tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                    return;
                }
                handle_signal(&token, "SIGINT (Ctrl+C)");
            }
        }));

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let token = self.token.clone();
            self.listeners.push(tokio::spawn(async move {
                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        while sigterm.recv().await.is_some() {
                            handle_signal(&token, "SIGTERM");
                        }
                    }
                    Err(e) => warn!("Failed to register SIGTERM handler: {}", e),
                }
            }));
        }

        true
    }

    /// Close the shutter in case a frame was being exposed. The result is
    /// only logged since the session is ending anyway.
    pub async fn release_shutter(camera: &DeviceHandle) {
        info!("Releasing shutter after abort");
        if let Err(e) = camera.set_setting(REMOTE_RELEASE, RELEASE_FULL).await {
            warn!("Shutter release after abort failed: {}", e);
        }
    }
}

impl Default for AbortHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AbortHandler {
    fn drop(&mut self) {
        for listener in &self.listeners {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{SimulatedCamera, RELEASE_IMMEDIATE};

    #[test]
    fn test_first_signal_aborts_second_forces_exit() {
        let handler = AbortHandler::new();
        let token = handler.token();

        assert_eq!(on_signal(&token), SignalAction::Abort);
        assert!(token.is_cancelled());

        assert_eq!(on_signal(&token), SignalAction::ForceExit);
        assert_eq!(on_signal(&token), SignalAction::ForceExit);
    }

    #[tokio::test]
    async fn test_release_closes_open_shutter() {
        let camera = SimulatedCamera::new();
        let monitor = camera.monitor();
        let handle = DeviceHandle::spawn(Box::new(camera), "test-camera");

        handle
            .set_setting(REMOTE_RELEASE, RELEASE_IMMEDIATE)
            .await
            .unwrap();
        AbortHandler::release_shutter(&handle).await;

        assert!(!monitor.shutter_open());
        assert_eq!(monitor.set_count(REMOTE_RELEASE, RELEASE_FULL), 1);
    }

    #[tokio::test]
    async fn test_release_errors_are_swallowed() {
        let camera = SimulatedCamera::new();
        let monitor = camera.monitor();
        monitor.fail_setting(REMOTE_RELEASE);
        let handle = DeviceHandle::spawn(Box::new(camera), "test-camera");

        AbortHandler::release_shutter(&handle).await;
        assert_eq!(monitor.set_count(REMOTE_RELEASE, RELEASE_FULL), 1);

        // Also fine once the camera is gone
        handle.disconnect().await.unwrap();
        AbortHandler::release_shutter(&handle).await;
    }

    #[tokio::test]
    async fn test_listen_is_idempotent() {
        let mut handler = AbortHandler::new();
        assert!(handler.listen());
        let count = handler.listeners.len();

        assert!(!handler.listen());
        assert_eq!(handler.listeners.len(), count);
        assert!(!handler.token().is_cancelled());
    }
}
