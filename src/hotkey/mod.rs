//! Global hotkey lifecycle
//!
//! Registers Ctrl+Space with the OS (with retry and backoff), listens for
//! activations with debouncing, and supervises the listener until shutdown.

mod backend;
mod debounce;
mod keys;
mod listener;
mod manager;

pub use backend::{HotkeyBackend, HotkeyError, HotkeyRegistration};
pub use keys::HotkeyCombo;
pub use listener::ActivationHandler;
pub use manager::{HotkeyManager, HotkeyStatus};

// Only the native event tap and the test doubles build registrations
#[cfg_attr(not(any(target_os = "macos", test)), allow(unused_imports))]
pub use backend::{RegistrationHandle, KEYDOWN_CHANNEL_CAPACITY};
#[cfg_attr(not(target_os = "macos"), allow(unused_imports))]
pub use keys::ModifierState;
