//! Hotkey lifecycle manager
//!
//! Owns the process-wide hotkey state:
//!
//! ```text
//! Disabled -> Pending -> Enabled
//!                     -> Failed    (registration exhausted / setup timed out)
//!                     -> Disabled  (permission denied or timed out)
//! Enabled  -> Disabled             (shutdown)
//! ```
//!
//! Setup is bounded by `setup_timeout`. The listening loop that follows a
//! successful registration runs outside that bound, under a supervisor
//! that restarts it (re-registering) if it dies unexpectedly.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use super::backend::{HotkeyBackend, HotkeyError, HotkeyRegistration, RegistrationHandle};
use super::debounce::Debouncer;
use super::listener::{listen, ActivationHandler, ListenExit};
use crate::config::HotkeyConfig;
use crate::lifecycle::supervise::join_error_message;
use crate::permission::{PermissionCheck, PermissionGate};
use crate::platform::Notifier;

const REGISTRATION_FAILED_MESSAGE: &str = "Global hotkey registration failed despite having \
     permissions. This may be a system issue. Please try restarting the app.";

/// Current state of global hotkey functionality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotkeyStatus {
    #[default]
    Disabled,
    Pending,
    Enabled,
    Failed,
}

impl fmt::Display for HotkeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HotkeyStatus::Disabled => write!(f, "disabled"),
            HotkeyStatus::Pending => write!(f, "pending"),
            HotkeyStatus::Enabled => write!(f, "enabled"),
            HotkeyStatus::Failed => write!(f, "failed"),
        }
    }
}

/// How the bounded part of setup ended
enum SetupOutcome {
    Registered(HotkeyRegistration),
    PermissionDenied,
    Exhausted { attempts: u32, error: HotkeyError },
    TimedOut,
    Cancelled,
}

/// Mutable state guarded by one lock; never held across an await
struct HotkeyState {
    registration: Option<Box<dyn RegistrationHandle>>,
    /// Shutdown channel of the current setup run
    shutdown_tx: Option<watch::Sender<bool>>,
}

/// Registers the global hotkey and supervises its listener
pub struct HotkeyManager {
    config: HotkeyConfig,
    permission: PermissionGate,
    backend: Arc<dyn HotkeyBackend>,
    handler: Arc<dyn ActivationHandler>,
    notifier: Arc<dyn Notifier>,
    status_tx: watch::Sender<HotkeyStatus>,
    debouncer: Arc<Mutex<Debouncer>>,
    state: Mutex<HotkeyState>,
}

impl HotkeyManager {
    pub fn new(
        config: HotkeyConfig,
        permission: PermissionGate,
        backend: Arc<dyn HotkeyBackend>,
        handler: Arc<dyn ActivationHandler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (status_tx, _) = watch::channel(HotkeyStatus::Disabled);
        let debouncer = Arc::new(Mutex::new(Debouncer::new(config.debounce)));
        Self {
            config,
            permission,
            backend,
            handler,
            notifier,
            status_tx,
            debouncer,
            state: Mutex::new(HotkeyState {
                registration: None,
                shutdown_tx: None,
            }),
        }
    }

    /// Get the current status
    pub fn status(&self) -> HotkeyStatus {
        *self.status_tx.borrow()
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<HotkeyStatus> {
        self.status_tx.subscribe()
    }

    /// Run the setup protocol to completion
    ///
    /// Returns the status once setup has finished; on success the listener
    /// keeps running in the background. A call while setup is already
    /// running or the hotkey is enabled is a no-op.
    pub async fn setup(self: &Arc<Self>) -> HotkeyStatus {
        match self.begin_setup() {
            Some(shutdown_rx) => self.run_setup(shutdown_rx).await,
            None => self.status(),
        }
    }

    /// Start setup in the background, for manual retries
    pub fn retry(self: &Arc<Self>) -> HotkeyStatus {
        match self.begin_setup() {
            Some(shutdown_rx) => {
                let manager = Arc::clone(self);
                tokio::spawn(async move {
                    manager.run_setup(shutdown_rx).await;
                });
                HotkeyStatus::Pending
            }
            None => self.status(),
        }
    }

    /// Stop listening and release the OS registration
    ///
    /// Safe to call repeatedly, before setup, or while setup is running.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();

        if let Some(shutdown_tx) = state.shutdown_tx.as_ref() {
            // A closed receiver only means the loop already exited
            shutdown_tx.send_replace(true);
        }

        if let Some(mut registration) = state.registration.take() {
            info!("shutting down hotkey...");
            registration.unregister();
            info!("hotkey shutdown complete");
        }

        self.set_status(HotkeyStatus::Disabled);
    }

    /// Claim a setup run; the returned receiver is its shutdown signal
    fn begin_setup(&self) -> Option<watch::Receiver<bool>> {
        let mut state = self.lock_state();
        match self.status() {
            HotkeyStatus::Pending | HotkeyStatus::Enabled => {
                debug!(status = %self.status(), "hotkey setup already in progress or complete");
                None
            }
            HotkeyStatus::Disabled | HotkeyStatus::Failed => {
                let (shutdown_tx, shutdown_rx) = watch::channel(false);
                state.shutdown_tx = Some(shutdown_tx);
                self.set_status(HotkeyStatus::Pending);
                Some(shutdown_rx)
            }
        }
    }

    async fn run_setup(self: &Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) -> HotkeyStatus {
        info!("starting hotkey setup...");

        let outcome = {
            let bounded = tokio::time::timeout(
                self.config.setup_timeout,
                self.acquire(shutdown_rx.clone()),
            );
            tokio::select! {
                biased;
                _ = shutdown_rx.wait_for(|stop| *stop) => SetupOutcome::Cancelled,
                result = bounded => result.unwrap_or(SetupOutcome::TimedOut),
            }
        };

        match outcome {
            SetupOutcome::Registered(registration) => {
                if let Some(keydowns) = self.install(registration, &shutdown_rx) {
                    info!("hotkey setup complete, starting listener...");
                    let manager = Arc::clone(self);
                    tokio::spawn(async move { manager.supervise(keydowns, shutdown_rx).await });
                }
            }
            SetupOutcome::PermissionDenied => {
                if self.finish(&shutdown_rx, HotkeyStatus::Disabled) {
                    warn!("accessibility permissions not granted, continuing without hotkeys");
                    let _ = self
                        .permission
                        .request_after(self.config.permission_request_delay);
                }
            }
            SetupOutcome::Exhausted { attempts, error } => {
                if self.finish(&shutdown_rx, HotkeyStatus::Failed) {
                    error!(
                        attempts,
                        %error,
                        "failed to register hotkey, continuing without hotkey support"
                    );
                    self.notifier
                        .alert("Permissions Required", REGISTRATION_FAILED_MESSAGE);
                }
            }
            SetupOutcome::TimedOut => {
                if self.finish(&shutdown_rx, HotkeyStatus::Failed) {
                    error!(
                        timeout_ms = self.config.setup_timeout.as_millis() as u64,
                        "hotkey setup timed out, continuing without hotkey support"
                    );
                }
            }
            SetupOutcome::Cancelled => {
                info!("hotkey setup cancelled by shutdown");
            }
        }

        self.status()
    }

    /// Permission check followed by registration with retries
    async fn acquire(&self, shutdown_rx: watch::Receiver<bool>) -> SetupOutcome {
        info!("checking accessibility permissions...");
        match self.permission.check(self.config.permission_timeout).await {
            PermissionCheck::Granted => {
                info!("accessibility permissions granted");
            }
            PermissionCheck::Denied => return SetupOutcome::PermissionDenied,
            PermissionCheck::TimedOut => {
                warn!("treating permission check timeout as not granted");
                return SetupOutcome::PermissionDenied;
            }
        }
        self.register_with_retry(&shutdown_rx).await
    }

    /// Exponential backoff: `initial_backoff`, then doubling
    async fn register_with_retry(&self, shutdown_rx: &watch::Receiver<bool>) -> SetupOutcome {
        let attempts = self.config.register_attempts.max(1);
        let mut delay = self.config.initial_backoff;
        let mut attempt = 0;

        loop {
            if *shutdown_rx.borrow() {
                return SetupOutcome::Cancelled;
            }
            attempt += 1;

            let error = match self.register_once().await {
                Ok(registration) => {
                    info!(combo = %self.config.combo, attempt, "global hotkey registered successfully");
                    return SetupOutcome::Registered(registration);
                }
                Err(error) => error,
            };

            warn!(attempt, %error, "hotkey registration attempt failed");
            if attempt >= attempts {
                return SetupOutcome::Exhausted { attempts, error };
            }

            debug!(delay_ms = delay.as_millis() as u64, "retrying hotkey registration");
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
        }
    }

    async fn register_once(&self) -> Result<HotkeyRegistration, HotkeyError> {
        let backend = Arc::clone(&self.backend);
        let combo = self.config.combo;
        match tokio::task::spawn_blocking(move || backend.register(combo)).await {
            Ok(result) => result,
            Err(e) => Err(HotkeyError::Task(join_error_message(e))),
        }
    }

    /// Store a fresh registration and mark the hotkey enabled, unless a
    /// shutdown arrived in the meantime
    fn install(
        &self,
        registration: HotkeyRegistration,
        shutdown_rx: &watch::Receiver<bool>,
    ) -> Option<mpsc::Receiver<()>> {
        let (keydowns, mut handle) = registration.into_parts();
        let mut state = self.lock_state();

        if *shutdown_rx.borrow() {
            debug!("shutdown raced registration, releasing hotkey");
            handle.unregister();
            return None;
        }

        if let Some(mut stale) = state.registration.replace(handle) {
            stale.unregister();
        }
        self.set_status(HotkeyStatus::Enabled);
        Some(keydowns)
    }

    /// Apply a terminal setup status unless shutdown already took over
    fn finish(&self, shutdown_rx: &watch::Receiver<bool>, status: HotkeyStatus) -> bool {
        let _state = self.lock_state();
        if *shutdown_rx.borrow() {
            return false;
        }
        self.set_status(status);
        true
    }

    /// Keep a listener running until shutdown, restarting a bounded number
    /// of times after unexpected exits
    async fn supervise(
        self: Arc<Self>,
        mut keydowns: mpsc::Receiver<()>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut restarts = 0;

        loop {
            let listener = tokio::spawn(listen(
                keydowns,
                shutdown_rx.clone(),
                Arc::clone(&self.debouncer),
                Arc::clone(&self.handler),
            ));

            let Some(failure) = listener_failure(listener.await) else {
                return;
            };

            if *shutdown_rx.borrow() {
                return;
            }

            restarts += 1;
            if restarts > self.config.max_listener_restarts {
                error!(%failure, restarts = restarts - 1, "hotkey listener keeps failing, giving up");
                self.release(&shutdown_rx, HotkeyStatus::Failed);
                return;
            }

            error!(
                %failure,
                restart = restarts,
                delay_ms = self.config.restart_delay.as_millis() as u64,
                "hotkey listener terminated, scheduling restart"
            );
            self.release(&shutdown_rx, HotkeyStatus::Pending);

            tokio::select! {
                biased;
                _ = shutdown_rx.wait_for(|stop| *stop) => return,
                _ = tokio::time::sleep(self.config.restart_delay) => {}
            }

            info!("attempting to restart hotkey listener...");
            let watcher = shutdown_rx.clone();
            let outcome = tokio::select! {
                biased;
                _ = shutdown_rx.wait_for(|stop| *stop) => SetupOutcome::Cancelled,
                result = tokio::time::timeout(
                    self.config.setup_timeout,
                    self.register_with_retry(&watcher),
                ) => result.unwrap_or(SetupOutcome::TimedOut),
            };

            keydowns = match outcome {
                SetupOutcome::Registered(registration) => {
                    match self.install(registration, &shutdown_rx) {
                        Some(keydowns) => keydowns,
                        None => return,
                    }
                }
                SetupOutcome::Exhausted { attempts, error } => {
                    if self.finish(&shutdown_rx, HotkeyStatus::Failed) {
                        error!(attempts, %error, "failed to re-register hotkey after listener crash");
                        self.notifier
                            .alert("Permissions Required", REGISTRATION_FAILED_MESSAGE);
                    }
                    return;
                }
                SetupOutcome::TimedOut | SetupOutcome::PermissionDenied => {
                    if self.finish(&shutdown_rx, HotkeyStatus::Failed) {
                        error!("hotkey listener restart timed out");
                    }
                    return;
                }
                SetupOutcome::Cancelled => return,
            };
        }
    }

    /// Drop the current registration after its listener died
    fn release(&self, shutdown_rx: &watch::Receiver<bool>, status: HotkeyStatus) {
        let mut state = self.lock_state();
        if *shutdown_rx.borrow() {
            return;
        }
        if let Some(mut registration) = state.registration.take() {
            registration.unregister();
        }
        self.set_status(status);
    }

    fn set_status(&self, status: HotkeyStatus) {
        let mut previous = status;
        let changed = self.status_tx.send_if_modified(|current| {
            previous = *current;
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            info!(from = %previous, to = %status, "hotkey status changed");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, HotkeyState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Why a listener task ended, or `None` if it stopped on request
fn listener_failure(exit: Result<ListenExit, JoinError>) -> Option<String> {
    match exit {
        Ok(ListenExit::Shutdown) => None,
        Ok(ListenExit::StreamClosed) => Some("hotkey event stream closed".to_string()),
        Err(e) if e.is_cancelled() => None,
        Err(e) => Some(join_error_message(e)),
    }
}
