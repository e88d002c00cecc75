//! Symbolic key tokens accepted by the command processor

use std::fmt;

/// One key press, already translated from raw UI input
///
/// Letters are named by their role; what a role does depends on the mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyToken {
    /// `0`-`9`, accumulated into the repeat-count prefix
    Digit(u8),
    /// `w`: enter window (space) navigation
    WindowMode,
    /// `d`: enter display navigation
    DisplayMode,
    /// `m`: toggle microphone mute
    Mute,
    /// `h`
    Left,
    /// `l`
    Right,
    /// `b`: back to main mode
    Back,
    /// Escape
    Cancel,
    /// Anything else, kept for logging
    Other(String),
}

impl KeyToken {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "w" => KeyToken::WindowMode,
            "d" => KeyToken::DisplayMode,
            "m" => KeyToken::Mute,
            "h" => KeyToken::Left,
            "l" => KeyToken::Right,
            "b" => KeyToken::Back,
            "Escape" | "Esc" => KeyToken::Cancel,
            _ => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_digit() => KeyToken::Digit(c as u8 - b'0'),
                    _ => KeyToken::Other(raw.to_string()),
                }
            }
        }
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Digit(d) => write!(f, "{d}"),
            KeyToken::WindowMode => write!(f, "w"),
            KeyToken::DisplayMode => write!(f, "d"),
            KeyToken::Mute => write!(f, "m"),
            KeyToken::Left => write!(f, "h"),
            KeyToken::Right => write!(f, "l"),
            KeyToken::Back => write!(f, "b"),
            KeyToken::Cancel => write!(f, "Escape"),
            KeyToken::Other(raw) => write!(f, "{raw}"),
        }
    }
}
