//! Modal command processor
//!
//! A finite-state machine over key tokens with two pieces of memory: the
//! current [`Mode`] and a buffer of pending digits forming a repeat count.
//! The processor is owned by a single worker thread fed through a channel,
//! so key presses are handled strictly one at a time.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::token::KeyToken;
use crate::events::UiEvent;
use crate::lifecycle::supervise::catch_panic;
use crate::platform::{AudioControl, Direction, DisplayMover, SpaceMover, WindowControl};

/// Command modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// `w`/`d` switch modes, `m` toggles mute
    #[default]
    #[serde(rename = "main")]
    Main,
    /// `h`/`l` move between virtual desktops
    #[serde(rename = "window")]
    WindowNav,
    /// `h`/`l` move between physical displays
    #[serde(rename = "display")]
    DisplayNav,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Main => write!(f, "Main"),
            Mode::WindowNav => write!(f, "WindowNav"),
            Mode::DisplayNav => write!(f, "DisplayNav"),
        }
    }
}

/// What a navigation command moves between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavTarget {
    Space,
    Display,
}

impl fmt::Display for NavTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavTarget::Space => write!(f, "space"),
            NavTarget::Display => write!(f, "display"),
        }
    }
}

/// Published view of the processor state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSnapshot {
    pub mode: Mode,
    pub number_buffer: String,
}

/// Result of handling one key token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyOutcome {
    /// Digit appended to the repeat count
    Buffered { number_buffer: String },
    /// Mode switched; the window stays visible
    ModeChanged { mode: Mode },
    /// Navigation ran `completed` of `requested` repetitions
    Navigated {
        target: NavTarget,
        direction: Direction,
        requested: u32,
        completed: u32,
    },
    MuteToggled { ok: bool },
    /// Window hidden from main mode
    Cancelled,
    /// Token has no meaning in the current mode
    Invalid { key: String },
}

/// The OS services the processor drives
#[derive(Clone)]
pub struct Collaborators {
    pub audio: Arc<dyn AudioControl>,
    pub displays: Arc<dyn DisplayMover>,
    pub spaces: Arc<dyn SpaceMover>,
    pub window: Arc<dyn WindowControl>,
}

/// Longest repeat count prefix; further digits are dropped
pub const MAX_REPEAT_DIGITS: usize = 4;

/// Parse the pending digits; empty, zero and malformed buffers count once
pub fn repeat_count(number_buffer: &str) -> u32 {
    number_buffer
        .parse::<u32>()
        .ok()
        .filter(|count| *count > 0)
        .unwrap_or(1)
}

/// The modal command state machine
pub struct CommandProcessor {
    mode: Mode,
    number_buffer: String,
    collaborators: Collaborators,
    snapshot_tx: watch::Sender<CommandSnapshot>,
    event_tx: broadcast::Sender<UiEvent>,
}

impl CommandProcessor {
    /// Create a new processor in Main mode
    pub fn new(collaborators: Collaborators, event_tx: broadcast::Sender<UiEvent>) -> Self {
        let (snapshot_tx, _) = watch::channel(CommandSnapshot::default());
        Self {
            mode: Mode::Main,
            number_buffer: String::new(),
            collaborators,
            snapshot_tx,
            event_tx,
        }
    }

    #[cfg(test)]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[cfg(test)]
    pub fn number_buffer(&self) -> &str {
        &self.number_buffer
    }

    /// Watch the mode and pending buffer
    pub fn subscribe(&self) -> watch::Receiver<CommandSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Move the processor onto its own worker thread
    pub fn spawn(self, capacity: usize) -> io::Result<CommandHandle> {
        let (tx, rx) = mpsc::channel(capacity);
        thread::Builder::new()
            .name("command-processor".to_string())
            .spawn(move || self.run(rx))?;
        Ok(CommandHandle { tx })
    }

    /// Handle key requests until every handle is dropped
    fn run(mut self, mut rx: mpsc::Receiver<KeyRequest>) {
        info!("command processor started in Main mode");

        while let Some(request) = rx.blocking_recv() {
            match catch_panic(|| self.process_key(&request.token)) {
                Ok(outcome) => {
                    if let Some(reply) = request.reply {
                        let _ = reply.send(outcome);
                    }
                }
                Err(panic) => {
                    error!(key = %request.token, %panic, "key handling panicked, resetting to Main mode");
                    self.number_buffer.clear();
                    self.transition_to(Mode::Main);
                    self.publish();
                }
            }
        }

        info!("command processor stopped");
    }

    /// Handle one key token
    pub fn process_key(&mut self, token: &KeyToken) -> KeyOutcome {
        if let KeyToken::Digit(digit) = token {
            if self.number_buffer.len() >= MAX_REPEAT_DIGITS {
                warn!(
                    number_buffer = %self.number_buffer,
                    dropped = *digit,
                    "repeat count is at its maximum length, ignoring digit"
                );
            } else {
                self.number_buffer.push(char::from(b'0' + digit));
                debug!(number_buffer = %self.number_buffer, "repeat count buffered");
                self.publish();
            }
            return KeyOutcome::Buffered {
                number_buffer: self.number_buffer.clone(),
            };
        }

        let count = repeat_count(&self.number_buffer);
        self.number_buffer.clear();

        let outcome = match self.mode {
            Mode::Main => self.process_main_key(token),
            Mode::WindowNav => self.process_nav_key(NavTarget::Space, token, count),
            Mode::DisplayNav => self.process_nav_key(NavTarget::Display, token, count),
        };

        self.publish();
        outcome
    }

    fn process_main_key(&mut self, token: &KeyToken) -> KeyOutcome {
        match token {
            KeyToken::WindowMode => self.switch_mode(Mode::WindowNav),
            KeyToken::DisplayMode => self.switch_mode(Mode::DisplayNav),
            KeyToken::Mute => {
                let outcome = self.toggle_mute();
                self.collaborators.window.hide();
                outcome
            }
            KeyToken::Cancel => {
                self.collaborators.window.hide();
                KeyOutcome::Cancelled
            }
            other => self.invalid(other),
        }
    }

    fn process_nav_key(&mut self, target: NavTarget, token: &KeyToken, count: u32) -> KeyOutcome {
        let direction = match token {
            KeyToken::Left => Direction::Left,
            KeyToken::Right => Direction::Right,
            KeyToken::Mute => {
                let outcome = self.toggle_mute();
                self.collaborators.window.hide();
                return outcome;
            }
            KeyToken::Back | KeyToken::Cancel => return self.switch_mode(Mode::Main),
            other => return self.invalid(other),
        };

        let completed = self.navigate(target, direction, count);
        self.transition_to(Mode::Main);
        self.collaborators.window.hide();

        KeyOutcome::Navigated {
            target,
            direction,
            requested: count,
            completed,
        }
    }

    /// Run a navigation up to `count` times, stopping at the first failure
    fn navigate(&self, target: NavTarget, direction: Direction, count: u32) -> u32 {
        let mut completed = 0;
        for _ in 0..count {
            let result = match target {
                NavTarget::Space => self.collaborators.spaces.move_space(direction),
                NavTarget::Display => self.collaborators.displays.move_focus(direction),
            };
            if let Err(e) = result {
                error!(
                    %target,
                    %direction,
                    completed,
                    requested = count,
                    error = %e,
                    "navigation failed, skipping remaining repetitions"
                );
                break;
            }
            completed += 1;
        }
        completed
    }

    fn toggle_mute(&self) -> KeyOutcome {
        match self.collaborators.audio.toggle_mute() {
            Ok(()) => {
                info!(muted = self.collaborators.audio.is_muted(), "microphone mute toggled");
                KeyOutcome::MuteToggled { ok: true }
            }
            Err(e) => {
                error!(error = %e, "failed to toggle microphone mute");
                KeyOutcome::MuteToggled { ok: false }
            }
        }
    }

    fn switch_mode(&mut self, mode: Mode) -> KeyOutcome {
        self.transition_to(mode);
        KeyOutcome::ModeChanged { mode }
    }

    fn invalid(&self, token: &KeyToken) -> KeyOutcome {
        warn!(key = %token, mode = %self.mode, "invalid key");
        KeyOutcome::Invalid {
            key: token.to_string(),
        }
    }

    /// Perform a mode transition
    fn transition_to(&mut self, mode: Mode) {
        let previous = self.mode;
        if previous == mode {
            return;
        }
        info!(from = %previous, to = %mode, "mode transition");
        self.mode = mode;

        let _ = self.event_tx.send(UiEvent::ModeChanged { mode, previous });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(CommandSnapshot {
            mode: self.mode,
            number_buffer: self.number_buffer.clone(),
        });
    }
}

/// A key press queued for the processor
pub struct KeyRequest {
    pub token: KeyToken,
    pub reply: Option<oneshot::Sender<KeyOutcome>>,
}

/// Errors returned to callers of [`CommandHandle`]
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("command processor is not running")]
    Stopped,

    #[error("command processor dropped the key press")]
    Dropped,
}

/// Cloneable sender side of the processor's key queue
#[derive(Clone)]
pub struct CommandHandle {
    tx: mpsc::Sender<KeyRequest>,
}

impl CommandHandle {
    /// Queue a key press and wait for its outcome
    pub async fn press(&self, token: KeyToken) -> Result<KeyOutcome, CommandError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(KeyRequest {
                token,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| CommandError::Stopped)?;
        reply_rx.await.map_err(|_| CommandError::Dropped)
    }
}
