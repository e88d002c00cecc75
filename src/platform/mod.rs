//! Capability interfaces for the OS automation services the daemon drives
//!
//! The core (hotkey lifecycle, modal command processor, window presenter)
//! only ever talks to these traits. Concrete bindings live in the
//! platform-specific submodules; tests substitute recording doubles.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::hotkey::HotkeyBackend;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(not(target_os = "macos"))]
mod unsupported;

#[cfg(test)]
pub mod fake;

/// Horizontal navigation direction for display and space movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

/// A point in global screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Read-only snapshot of one connected display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayDescriptor {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayDescriptor {
    pub fn new(id: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// Edges are inclusive, so a pointer on a shared border matches both displays
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The primary display sits at the global origin
    pub fn is_at_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// The display nearest to `current` on the given side, compared by x origin
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub fn neighbor_display<'a>(
    displays: &'a [DisplayDescriptor],
    current: &DisplayDescriptor,
    direction: Direction,
) -> Option<&'a DisplayDescriptor> {
    let others = displays.iter().filter(|d| d.id != current.id);
    match direction {
        Direction::Left => others
            .filter(|d| d.x < current.x)
            .max_by(|a, b| a.x.total_cmp(&b.x)),
        Direction::Right => others
            .filter(|d| d.x > current.x)
            .min_by(|a, b| a.x.total_cmp(&b.x)),
    }
}

/// Failures reported by OS automation collaborators
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("no displays found")]
    NoDisplays,

    #[error("could not determine current display")]
    UnknownCurrentDisplay,

    #[error("no display found in {0} direction")]
    NoDisplayInDirection(Direction),

    #[error("automation script failed: {0}")]
    Script(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Microphone mute control
pub trait AudioControl: Send + Sync {
    fn toggle_mute(&self) -> Result<(), PlatformError>;
    fn is_muted(&self) -> bool;
}

/// Physical display enumeration and focus movement
pub trait DisplayMover: Send + Sync {
    fn move_focus(&self, direction: Direction) -> Result<(), PlatformError>;
    fn list_displays(&self) -> Result<Vec<DisplayDescriptor>, PlatformError>;
    fn pointer_position(&self) -> Point;
}

/// Virtual desktop (space) switching
pub trait SpaceMover: Send + Sync {
    fn move_space(&self, direction: Direction) -> Result<(), PlatformError>;
}

/// Primitives on the overlay window owned by the presentation layer
pub trait WindowControl: Send + Sync {
    fn show(&self);
    fn hide(&self);
    fn center(&self);
    fn set_position(&self, x: i32, y: i32);
    fn set_always_on_top(&self, on_top: bool);
}

/// Accessibility / automation capability of this process
pub trait PermissionProvider: Send + Sync {
    fn has_capability(&self) -> bool;

    /// May show a system prompt; never waits for the user's answer
    fn request_capability(&self);
}

/// User-visible alerts, reserved for conditions that need user action
pub trait Notifier: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}

/// The set of native collaborators for the current OS
#[derive(Clone)]
pub struct Platform {
    pub permission: Arc<dyn PermissionProvider>,
    pub hotkeys: Arc<dyn HotkeyBackend>,
    pub audio: Arc<dyn AudioControl>,
    pub displays: Arc<dyn DisplayMover>,
    pub spaces: Arc<dyn SpaceMover>,
}

/// Build the collaborators backed by the running operating system
pub fn native() -> Platform {
    #[cfg(target_os = "macos")]
    {
        macos::platform()
    }
    #[cfg(not(target_os = "macos"))]
    {
        unsupported::platform()
    }
}
