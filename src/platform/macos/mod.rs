//! macOS bindings for the capability traits
//!
//! Hotkeys use a CGEventTap on a dedicated thread, displays and pointer
//! control go through Core Graphics, and space switching and microphone
//! volume go through `osascript`.

mod audio;
mod display;
mod event_tap;
mod permission;
mod spaces;

use std::process::Command;
use std::sync::Arc;

use tracing::debug;

use super::{Platform, PlatformError};

pub fn platform() -> Platform {
    Platform {
        permission: Arc::new(permission::AxPermission),
        hotkeys: Arc::new(event_tap::EventTapBackend),
        audio: Arc::new(audio::InputVolume::new()),
        displays: Arc::new(display::CoreGraphicsDisplays),
        spaces: Arc::new(spaces::KeyboardSpaces),
    }
}

/// Run an AppleScript snippet and return its trimmed stdout
fn run_osascript(script: &str) -> Result<String, PlatformError> {
    debug!(script, "running osascript");
    let output = Command::new("osascript").arg("-e").arg(script).output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(PlatformError::Script(stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
