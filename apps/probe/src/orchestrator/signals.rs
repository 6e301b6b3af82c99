use tracing::info;

use crate::error::ProbeError;

/// Termination conditions delivered to the probe loop
///
/// Handlers are installed on construction, so a signal that arrives while a
/// probe pass is running is kept until the loop next waits on [`recv`].
///
/// [`recv`]: Termination::recv
#[cfg(unix)]
pub struct Termination {
    interrupt: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Termination {
    pub fn install() -> Result<Self, ProbeError> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).map_err(ProbeError::Signals)?,
            hangup: signal(SignalKind::hangup()).map_err(ProbeError::Signals)?,
            terminate: signal(SignalKind::terminate()).map_err(ProbeError::Signals)?,
        })
    }

    /// Wait for SIGINT, SIGHUP or SIGTERM
    pub async fn recv(&mut self) {
        let name = tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.terminate.recv() => "SIGTERM",
        };
        info!(signal = name, "Application interrupted");
    }
}

#[cfg(not(unix))]
pub struct Termination;

#[cfg(not(unix))]
impl Termination {
    pub fn install() -> Result<Self, ProbeError> {
        Ok(Self)
    }

    /// Wait for Ctrl-C
    pub async fn recv(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!(signal = "ctrl-c", "Application interrupted");
    }
}
