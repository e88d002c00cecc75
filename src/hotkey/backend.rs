//! OS hotkey registration interface
//!
//! A backend turns a [`HotkeyCombo`] into a live registration: a stream of
//! key-down events plus a handle that releases the OS resources.

use tokio::sync::mpsc;

use super::keys::HotkeyCombo;

/// Capacity of the key-down channel between the OS thread and the listener
#[cfg_attr(not(any(target_os = "macos", test)), allow(dead_code))]
pub const KEYDOWN_CHANNEL_CAPACITY: usize = 16;

/// Registers global key combinations with the operating system
pub trait HotkeyBackend: Send + Sync {
    /// Register `combo`. May block briefly while the OS-side listener
    /// starts, so callers run it off the async executor.
    fn register(&self, combo: HotkeyCombo) -> Result<HotkeyRegistration, HotkeyError>;
}

/// Releases an OS-level registration
///
/// Implementations must tolerate `unregister` being called more than once
/// and should also release on drop.
pub trait RegistrationHandle: Send {
    fn unregister(&mut self);
}

/// A live hotkey registration
pub struct HotkeyRegistration {
    keydowns: mpsc::Receiver<()>,
    handle: Box<dyn RegistrationHandle>,
}

impl HotkeyRegistration {
    #[cfg_attr(not(any(target_os = "macos", test)), allow(dead_code))]
    pub fn new(keydowns: mpsc::Receiver<()>, handle: impl RegistrationHandle + 'static) -> Self {
        Self {
            keydowns,
            handle: Box::new(handle),
        }
    }

    pub fn into_parts(self) -> (mpsc::Receiver<()>, Box<dyn RegistrationHandle>) {
        (self.keydowns, self.handle)
    }
}

impl std::fmt::Debug for HotkeyRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotkeyRegistration").finish_non_exhaustive()
    }
}

/// Errors that can occur while registering or listening for the hotkey
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("hotkey registration rejected: {0}")]
    Rejected(String),

    #[error("global hotkeys are not supported on this platform")]
    Unsupported,

    #[error("hotkey registration task failed: {0}")]
    Task(String),
}
