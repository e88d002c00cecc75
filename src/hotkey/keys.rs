//! Hotkey combination and modifier key definitions
//!
//! Platform-neutral description of the global activation key. Backends
//! translate their native event flags into [`ModifierState`] and compare
//! against the registered [`HotkeyCombo`].

use std::fmt;

/// macOS virtual keycode of the Space bar
pub const KEYCODE_SPACE: u16 = 49;

/// Tracks which modifier keys are currently pressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Control key is held
    pub control: bool,
    /// Option/Alt key is held
    pub option: bool,
    /// Command key is held
    pub command: bool,
    /// Shift key is held
    pub shift: bool,
}

impl ModifierState {
    pub const CONTROL: Self = Self {
        control: true,
        option: false,
        command: false,
        shift: false,
    };
}

/// A global key combination: exact modifier set plus one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyCombo {
    pub modifiers: ModifierState,
    pub keycode: u16,
}

impl HotkeyCombo {
    /// The activation key, Ctrl+Space
    pub const CTRL_SPACE: Self = Self {
        modifiers: ModifierState::CONTROL,
        keycode: KEYCODE_SPACE,
    };

    /// Extra modifiers do not match; Ctrl+Shift+Space is not Ctrl+Space
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    pub fn matches(&self, modifiers: ModifierState, keycode: u16) -> bool {
        self.keycode == keycode && self.modifiers == modifiers
    }
}

impl Default for HotkeyCombo {
    fn default() -> Self {
        Self::CTRL_SPACE
    }
}

impl fmt::Display for HotkeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.modifiers;
        for (held, name) in [
            (m.control, "Ctrl"),
            (m.option, "Option"),
            (m.command, "Cmd"),
            (m.shift, "Shift"),
        ] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        match self.keycode {
            KEYCODE_SPACE => write!(f, "Space"),
            other => write!(f, "Key({other})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combo_requires_exact_modifiers() {
        let combo = HotkeyCombo::CTRL_SPACE;
        assert!(combo.matches(ModifierState::CONTROL, KEYCODE_SPACE));
        assert!(!combo.matches(ModifierState::default(), KEYCODE_SPACE));
        assert!(!combo.matches(
            ModifierState {
                control: true,
                command: true,
                ..Default::default()
            },
            KEYCODE_SPACE
        ));
        assert!(!combo.matches(ModifierState::CONTROL, 36));
    }

    #[test]
    fn test_combo_display() {
        assert_eq!(HotkeyCombo::CTRL_SPACE.to_string(), "Ctrl+Space");
    }
}
