//! Modal command processing
//!
//! Key tokens from the UI drive a three-mode state machine:
//! - Main: choose a navigation mode or toggle mute
//! - WindowNav: move between virtual desktops
//! - DisplayNav: move between physical displays
//!
//! A digit prefix repeats the next navigation command.

mod machine;
mod token;

pub use machine::{
    Collaborators, CommandHandle, CommandProcessor, CommandSnapshot, KeyOutcome, Mode,
};
pub use token::KeyToken;
