//! Termination signals for graceful shutdown

use std::fmt;
use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::debug;

/// Which signal asked the daemon to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Terminate,
    Interrupt,
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopSignal::Terminate => write!(f, "SIGTERM"),
            StopSignal::Interrupt => write!(f, "SIGINT"),
        }
    }
}

/// SIGTERM (launchd stopping the agent) and SIGINT listeners
///
/// Handlers are installed on construction, so a signal delivered while
/// the daemon is still starting up is not lost.
pub struct ShutdownSignal {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignal {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next stop signal
    pub async fn recv(&mut self) -> StopSignal {
        let received = tokio::select! {
            _ = self.sigterm.recv() => StopSignal::Terminate,
            _ = self.sigint.recv() => StopSignal::Interrupt,
        };
        debug!(signal = %received, "received stop signal");
        received
    }
}
