//! Overlay window presentation
//!
//! Decides which display the overlay belongs on (always the one under the
//! pointer) and drives the window primitives to put it there.

use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::WindowConfig;
use crate::hotkey::ActivationHandler;
use crate::platform::{DisplayDescriptor, DisplayMover, PlatformError, Point, WindowControl};

/// Pick the display the window should appear on
///
/// One display is used as-is. Otherwise the display containing the pointer
/// wins, then the primary display at the origin, then the first one listed.
/// `pointer` is only queried when there is a choice to make.
pub fn select_display<F>(displays: &[DisplayDescriptor], pointer: F) -> Option<&DisplayDescriptor>
where
    F: FnOnce() -> Point,
{
    if let [only] = displays {
        return Some(only);
    }

    let position = pointer();
    if let Some(hit) = displays.iter().find(|d| d.contains(position)) {
        debug!(id = %hit.id, x = position.x, y = position.y, "pointer is on display");
        return Some(hit);
    }

    if let Some(primary) = displays.iter().find(|d| d.is_at_origin()) {
        debug!(id = %primary.id, "pointer outside all displays, using primary");
        return Some(primary);
    }

    displays.first()
}

/// Debugging view of the display layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    pub mouse_position: Point,
    pub display_count: usize,
    pub displays: Vec<DisplayDescriptor>,
    pub current_display: Option<DisplayDescriptor>,
}

/// Positions and shows the overlay window
pub struct WindowPresenter {
    displays: Arc<dyn DisplayMover>,
    window: Arc<dyn WindowControl>,
    config: WindowConfig,
}

impl WindowPresenter {
    pub fn new(
        displays: Arc<dyn DisplayMover>,
        window: Arc<dyn WindowControl>,
        config: WindowConfig,
    ) -> Self {
        Self {
            displays,
            window,
            config,
        }
    }

    /// The display currently under the pointer, if any can be enumerated
    pub fn current_display(&self) -> Option<DisplayDescriptor> {
        let displays = match self.displays.list_displays() {
            Ok(displays) => displays,
            Err(e) => {
                warn!(error = %e, "failed to list displays");
                return None;
            }
        };

        select_display(&displays, || self.displays.pointer_position()).cloned()
    }

    /// Center the window on `target` and show it
    pub fn position_and_show(&self, target: &DisplayDescriptor) {
        let center = target.center();
        let x = center.x as i32 - (self.config.width / 2) as i32;
        let y = center.y as i32 - (self.config.height / 2) as i32;

        info!(id = %target.id, x, y, "positioning window");

        // Hiding first forces the window manager to honor the new position
        self.window.hide();
        self.window.set_position(x, y);
        self.window.show();
    }

    /// Show the window on the display under the pointer
    pub fn show_on_current_display(&self) {
        match self.current_display() {
            Some(display) => self.position_and_show(&display),
            None => {
                warn!("could not determine current display, using default centering");
                self.window.show();
                self.window.center();
            }
        }
    }

    pub fn hide(&self) {
        self.window.hide();
    }

    pub fn screen_info(&self) -> Result<ScreenInfo, PlatformError> {
        let displays = self.displays.list_displays()?;
        let mouse_position = self.displays.pointer_position();
        let current_display = select_display(&displays, || mouse_position).cloned();

        Ok(ScreenInfo {
            mouse_position,
            display_count: displays.len(),
            displays,
            current_display,
        })
    }

    /// Raise the window above other apps briefly, without pinning it there
    fn raise_briefly(&self) {
        self.window.set_always_on_top(true);

        let window = Arc::clone(&self.window);
        let delay = self.config.always_on_top_clear;
        let clear = move || window.set_always_on_top(false);

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    clear();
                });
            }
            Err(_) => {
                let spawned = thread::Builder::new()
                    .name("always-on-top-clear".to_string())
                    .spawn(move || {
                        thread::sleep(delay);
                        clear();
                    });
                if let Err(e) = spawned {
                    warn!(error = %e, "failed to schedule always-on-top clear");
                }
            }
        }
    }
}

impl ActivationHandler for WindowPresenter {
    fn on_activate(&self) {
        self.show_on_current_display();
        self.raise_briefly();
    }
}
