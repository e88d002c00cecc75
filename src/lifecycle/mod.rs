//! Process lifecycle: launch sequence, signal handling and failure supervision

mod shutdown;
mod startup;
pub mod supervise;

pub use shutdown::ShutdownSignal;
pub use startup::{launch, EnvironmentInfo};
