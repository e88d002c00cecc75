//! Virtual desktop switching through Mission Control shortcuts

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::display::click_center_of_current_display;
use super::run_osascript;
use crate::platform::{Direction, PlatformError, SpaceMover};

/// Time for the space transition animation to finish
const TRANSITION_DELAY: Duration = Duration::from_millis(300);

/// Sends Control+Left / Control+Right through System Events
pub struct KeyboardSpaces;

fn arrow_keycode(direction: Direction) -> u16 {
    match direction {
        Direction::Left => 123,
        Direction::Right => 124,
    }
}

impl SpaceMover for KeyboardSpaces {
    fn move_space(&self, direction: Direction) -> Result<(), PlatformError> {
        let script = format!(
            "tell application \"System Events\" to key code {} using {{control down}}",
            arrow_keycode(direction)
        );

        run_osascript(&script).map_err(|e| {
            PlatformError::Script(format!(
                "space navigation failed ({e}); grant Accessibility and Automation access"
            ))
        })?;
        info!(%direction, "switched space");

        thread::sleep(TRANSITION_DELAY);

        // Focus a window on the new space
        if let Err(e) = click_center_of_current_display() {
            warn!(error = %e, "could not activate window after space switch");
        }
        Ok(())
    }
}
