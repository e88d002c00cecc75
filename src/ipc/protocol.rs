//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::UiEvent;
use crate::hotkey::HotkeyStatus;
use crate::state::KeyOutcome;
use crate::status::StatusSnapshot;
use crate::window::ScreenInfo;

/// Largest frame a client may send
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request the current status snapshot
    GetStatus,

    /// Feed one key token to the command processor
    KeyPress { key: String },

    /// Show the window on the display under the pointer
    Show,

    Hide,

    /// Re-run hotkey setup if it is not enabled
    RetryHotkey,

    CheckPermission,

    /// Display layout, for debugging
    ScreenInfo,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to UI event pushes
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current status
    Status(StatusSnapshot),

    KeyResult { outcome: KeyOutcome },

    Shown,

    Hidden,

    /// Hotkey status right after a retry request
    HotkeyRetry { status: HotkeyStatus },

    Permission { granted: bool },

    ScreenInfo(ScreenInfo),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Event { event: UiEvent },
}
