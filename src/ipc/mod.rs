//! IPC module for daemon-UI communication

mod bridge;
mod protocol;
mod server;

pub use bridge::UiBridge;
pub use server::{Server, Services};
