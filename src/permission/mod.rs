//! Permission gate for the accessibility/automation capability
//!
//! The underlying OS query can hang, so every check runs on its own
//! thread and the caller only waits up to a timeout. A check that times
//! out or panics counts as "not granted".

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::lifecycle::supervise::catch_panic;
use crate::platform::PermissionProvider;

/// Result of a bounded permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionCheck {
    Granted,
    Denied,
    TimedOut,
}

impl PermissionCheck {
    pub fn is_granted(self) -> bool {
        self == PermissionCheck::Granted
    }
}

/// Timeout-bounded access to a [`PermissionProvider`]
#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self { provider }
    }

    /// Check the capability, giving up after `timeout`
    pub async fn check(&self, timeout: Duration) -> PermissionCheck {
        let (tx, rx) = oneshot::channel();
        let provider = Arc::clone(&self.provider);

        // A detached thread rather than the blocking pool: a hung OS call
        // must not hold up runtime shutdown.
        let spawned = thread::Builder::new()
            .name("permission-check".to_string())
            .spawn(move || {
                let granted = match catch_panic(|| provider.has_capability()) {
                    Ok(granted) => granted,
                    Err(panic) => {
                        error!(%panic, "permission check panicked");
                        false
                    }
                };
                let _ = tx.send(granted);
            });

        if let Err(e) = spawned {
            error!(?e, "failed to spawn permission check thread");
            return PermissionCheck::Denied;
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(true)) => PermissionCheck::Granted,
            Ok(Ok(false)) => PermissionCheck::Denied,
            Ok(Err(_)) => {
                error!("permission check ended without a result");
                PermissionCheck::Denied
            }
            Err(_) => {
                error!(timeout_ms = timeout.as_millis() as u64, "permission check timed out");
                PermissionCheck::TimedOut
            }
        }
    }

    /// Ask the OS to prompt for the capability after `delay`
    ///
    /// Returns immediately; the prompt never runs on the caller's path.
    pub fn request_after(&self, delay: Duration) -> JoinHandle<()> {
        let provider = Arc::clone(&self.provider);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!("requesting accessibility permission");
            let request = tokio::task::spawn_blocking(move || {
                catch_panic(|| provider.request_capability())
            });
            match request.await {
                Ok(Ok(())) => {}
                Ok(Err(panic)) => error!(%panic, "permission request panicked"),
                Err(e) => error!(?e, "permission request task failed"),
            }
        })
    }
}
