//! Events pushed to the presentation layer
//!
//! The UI owns the real overlay window. The daemon drives it, and keeps
//! it informed about mode and hotkey changes, through these events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hotkey::HotkeyStatus;
use crate::state::Mode;

/// Events broadcast to subscribed UI clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// Show and unminimise the window
    WindowShow,

    WindowHide,

    /// Center on the UI's default screen
    WindowCenter,

    /// Move the window's top-left corner, in global coordinates
    WindowPosition { x: i32, y: i32 },

    WindowAlwaysOnTop { on_top: bool },

    /// Command mode changed
    ModeChanged { mode: Mode, previous: Mode },

    HotkeyStatusChanged { status: HotkeyStatus },

    /// A condition that needs the user's attention
    Alert { title: String, message: String },
}

impl fmt::Display for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiEvent::WindowShow => write!(f, "WINDOW_SHOW"),
            UiEvent::WindowHide => write!(f, "WINDOW_HIDE"),
            UiEvent::WindowCenter => write!(f, "WINDOW_CENTER"),
            UiEvent::WindowPosition { x, y } => write!(f, "WINDOW_POSITION ({x}, {y})"),
            UiEvent::WindowAlwaysOnTop { on_top } => write!(f, "WINDOW_ALWAYS_ON_TOP ({on_top})"),
            UiEvent::ModeChanged { mode, previous } => {
                write!(f, "MODE_CHANGED ({previous:?} -> {mode:?})")
            }
            UiEvent::HotkeyStatusChanged { status } => write!(f, "HOTKEY_STATUS_CHANGED ({status})"),
            UiEvent::Alert { title, .. } => write!(f, "ALERT ({title})"),
        }
    }
}
