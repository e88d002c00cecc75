//! Microphone mute through the system input volume

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use super::run_osascript;
use crate::platform::{AudioControl, PlatformError};

/// Input volume restored when unmuting
const UNMUTED_VOLUME: u8 = 70;

/// Muted means an input volume of zero
pub struct InputVolume {
    muted: AtomicBool,
}

impl InputVolume {
    pub fn new() -> Self {
        let muted = match run_osascript("input volume of (get volume settings)") {
            Ok(volume) => volume == "0",
            Err(e) => {
                warn!(error = %e, "could not read input volume, assuming unmuted");
                false
            }
        };

        Self {
            muted: AtomicBool::new(muted),
        }
    }
}

impl AudioControl for InputVolume {
    fn toggle_mute(&self) -> Result<(), PlatformError> {
        let volume = if self.muted.load(Ordering::SeqCst) {
            UNMUTED_VOLUME
        } else {
            0
        };

        run_osascript(&format!("set volume input volume {volume}"))?;
        self.muted.store(volume == 0, Ordering::SeqCst);
        info!(volume, "input volume set");
        Ok(())
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }
}
