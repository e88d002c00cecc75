//! Read-only status view for the presentation layer
//!
//! Combines the hotkey lifecycle state, the command processor's mode and
//! pending digits, and the microphone mute flag. Each source is owned by
//! its own component; this only reads their published snapshots.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::hotkey::HotkeyStatus;
use crate::platform::AudioControl;
use crate::state::{CommandSnapshot, Mode};

/// Status polled by the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub number_buffer: String,
    pub is_muted: bool,
    pub hotkey_status: HotkeyStatus,
    pub current_mode: Mode,
}

#[derive(Clone)]
pub struct StatusProjection {
    hotkey: watch::Receiver<HotkeyStatus>,
    command: watch::Receiver<CommandSnapshot>,
    audio: Arc<dyn AudioControl>,
}

impl StatusProjection {
    pub fn new(
        hotkey: watch::Receiver<HotkeyStatus>,
        command: watch::Receiver<CommandSnapshot>,
        audio: Arc<dyn AudioControl>,
    ) -> Self {
        Self {
            hotkey,
            command,
            audio,
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let hotkey_status = *self.hotkey.borrow();
        let (current_mode, number_buffer) = {
            let command = self.command.borrow();
            (command.mode, command.number_buffer.clone())
        };

        StatusSnapshot {
            number_buffer,
            is_muted: self.audio.is_muted(),
            hotkey_status,
            current_mode,
        }
    }
}
