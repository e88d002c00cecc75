//! Window control and alerts forwarded to the UI process
//!
//! The UI owns the real overlay window, so the daemon's window primitives
//! and user alerts become [`UiEvent`]s broadcast to subscribed clients.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::UiEvent;
use crate::platform::{Notifier, WindowControl};

#[derive(Clone)]
pub struct UiBridge {
    event_tx: broadcast::Sender<UiEvent>,
}

impl UiBridge {
    pub fn new(event_tx: broadcast::Sender<UiEvent>) -> Self {
        Self { event_tx }
    }

    fn emit(&self, event: UiEvent) {
        debug!(%event, "forwarding to UI");
        // No subscribers just means no UI is attached yet
        let _ = self.event_tx.send(event);
    }
}

impl WindowControl for UiBridge {
    fn show(&self) {
        self.emit(UiEvent::WindowShow);
    }

    fn hide(&self) {
        self.emit(UiEvent::WindowHide);
    }

    fn center(&self) {
        self.emit(UiEvent::WindowCenter);
    }

    fn set_position(&self, x: i32, y: i32) {
        self.emit(UiEvent::WindowPosition { x, y });
    }

    fn set_always_on_top(&self, on_top: bool) {
        self.emit(UiEvent::WindowAlwaysOnTop { on_top });
    }
}

impl Notifier for UiBridge {
    fn alert(&self, title: &str, message: &str) {
        warn!(title, message, "user alert");
        self.emit(UiEvent::Alert {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
