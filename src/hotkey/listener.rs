//! Hotkey listening loop
//!
//! Waits on either the next key-down from the registered hotkey or the
//! shutdown signal. Accepted activations run the [`ActivationHandler`];
//! a panic in the handler is logged and the loop keeps going.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::debounce::Debouncer;
use crate::lifecycle::supervise::catch_panic;

/// Reacts to an accepted hotkey activation
pub trait ActivationHandler: Send + Sync {
    fn on_activate(&self);
}

/// Why the listening loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenExit {
    /// The shutdown signal fired (or its sender went away)
    Shutdown,
    /// The OS-side event stream ended without a shutdown
    StreamClosed,
}

/// Run until shutdown or until the key-down stream closes
pub async fn listen(
    mut keydowns: mpsc::Receiver<()>,
    mut shutdown: watch::Receiver<bool>,
    debouncer: Arc<Mutex<Debouncer>>,
    handler: Arc<dyn ActivationHandler>,
) -> ListenExit {
    info!("hotkey listener started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.wait_for(|stop| *stop) => {
                info!("hotkey listener shutting down gracefully");
                return ListenExit::Shutdown;
            }

            event = keydowns.recv() => match event {
                Some(()) => dispatch(&debouncer, handler.as_ref()),
                None => {
                    warn!("hotkey event stream closed");
                    return ListenExit::StreamClosed;
                }
            }
        }
    }
}

/// Debounce and run one activation
fn dispatch(debouncer: &Mutex<Debouncer>, handler: &dyn ActivationHandler) {
    let now = Instant::now();
    let (accepted, last) = {
        let mut debouncer = debouncer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let last = debouncer.last_accepted();
        (debouncer.accept(now), last)
    };

    if !accepted {
        debug!(
            since_last_ms = last.map(|last| now.saturating_duration_since(last).as_millis() as u64),
            "hotkey debounced - too soon after last activation"
        );
        return;
    }

    info!("global hotkey activated, showing window");
    if let Err(panic) = catch_panic(|| handler.on_activate()) {
        error!(%panic, "hotkey activation handler panicked");
    }
}
