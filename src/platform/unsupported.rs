//! Fallback collaborators for platforms without native bindings
//!
//! The daemon still starts and serves IPC; every OS action reports
//! [`PlatformError::Unsupported`] and the hotkey stays disabled.

use std::sync::Arc;

use tracing::warn;

use super::{
    AudioControl, Direction, DisplayDescriptor, DisplayMover, Platform, PermissionProvider,
    PlatformError, Point, SpaceMover,
};
use crate::hotkey::{HotkeyBackend, HotkeyCombo, HotkeyError, HotkeyRegistration};

pub fn platform() -> Platform {
    warn!("no native bindings for this platform, OS actions are disabled");
    let unsupported = Arc::new(Unsupported);
    Platform {
        permission: unsupported.clone(),
        hotkeys: unsupported.clone(),
        audio: unsupported.clone(),
        displays: unsupported.clone(),
        spaces: unsupported,
    }
}

struct Unsupported;

impl PermissionProvider for Unsupported {
    fn has_capability(&self) -> bool {
        false
    }

    fn request_capability(&self) {
        warn!("accessibility permission cannot be requested on this platform");
    }
}

impl HotkeyBackend for Unsupported {
    fn register(&self, _combo: HotkeyCombo) -> Result<HotkeyRegistration, HotkeyError> {
        Err(HotkeyError::Unsupported)
    }
}

impl AudioControl for Unsupported {
    fn toggle_mute(&self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("microphone control"))
    }

    fn is_muted(&self) -> bool {
        false
    }
}

impl DisplayMover for Unsupported {
    fn move_focus(&self, _direction: Direction) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("display navigation"))
    }

    fn list_displays(&self) -> Result<Vec<DisplayDescriptor>, PlatformError> {
        Err(PlatformError::Unsupported("display enumeration"))
    }

    fn pointer_position(&self) -> Point {
        Point::default()
    }
}

impl SpaceMover for Unsupported {
    fn move_space(&self, _direction: Direction) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("space navigation"))
    }
}
