//! Global hotkey registration using macOS CGEventTap
//!
//! Each registration runs a listen-only event tap on its own thread with a
//! CFRunLoop, forwarding matching key-downs into a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventTapProxy, CGEventType, EventField,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::hotkey::{
    HotkeyBackend, HotkeyCombo, HotkeyError, HotkeyRegistration, ModifierState,
    RegistrationHandle, KEYDOWN_CHANNEL_CAPACITY,
};

/// How long `register` waits for the tap thread to report in
const TAP_STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct EventTapBackend;

impl HotkeyBackend for EventTapBackend {
    fn register(&self, combo: HotkeyCombo) -> Result<HotkeyRegistration, HotkeyError> {
        let (keydown_tx, keydown_rx) = mpsc::channel(KEYDOWN_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!(%combo, "hotkey listener thread started");
                run_event_loop(combo, keydown_tx, &thread_running, ready_tx);
                thread_running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            })
            .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

        match ready_rx.recv_timeout(TAP_STARTUP_TIMEOUT) {
            Ok(Ok(())) => Ok(HotkeyRegistration::new(keydown_rx, TapHandle { running })),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                running.store(false, Ordering::SeqCst);
                Err(HotkeyError::EventTapCreation)
            }
        }
    }
}

/// Stops the tap thread; the run loop notices within one poll interval
struct TapHandle {
    running: Arc<AtomicBool>,
}

impl RegistrationHandle for TapHandle {
    fn unregister(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            debug!("event tap released");
        }
    }
}

impl Drop for TapHandle {
    fn drop(&mut self) {
        self.unregister();
    }
}

fn modifiers(flags: CGEventFlags) -> ModifierState {
    ModifierState {
        control: flags.contains(CGEventFlags::CGEventFlagControl),
        option: flags.contains(CGEventFlags::CGEventFlagAlternate),
        command: flags.contains(CGEventFlags::CGEventFlagCommand),
        shift: flags.contains(CGEventFlags::CGEventFlagShift),
    }
}

/// Run the CFRunLoop with the event tap until unregistered
fn run_event_loop(
    combo: HotkeyCombo,
    keydown_tx: mpsc::Sender<()>,
    running: &AtomicBool,
    ready_tx: std::sync::mpsc::Sender<Result<(), HotkeyError>>,
) {
    let (callback_tx, callback_rx) = std::sync::mpsc::channel::<()>();
    let tap_disabled = Arc::new(AtomicBool::new(false));
    let callback_disabled = Arc::clone(&tap_disabled);

    // Must be fast and non-blocking
    let callback = move |_proxy: CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
                         -> Option<CGEvent> {
        match event_type {
            CGEventType::KeyDown => {
                let keycode =
                    event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16;
                let repeat = event.get_integer_value_field(EventField::KEYBOARD_EVENT_AUTOREPEAT);
                if repeat == 0 && combo.matches(modifiers(event.get_flags()), keycode) {
                    let _ = callback_tx.send(());
                }
            }
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                callback_disabled.store(true, Ordering::SeqCst);
            }
            _ => {}
        }
        Some(event.clone())
    };

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        callback,
    ) {
        Ok(tap) => tap,
        Err(()) => {
            error!("failed to create event tap - is Accessibility permission granted?");
            let _ = ready_tx.send(Err(HotkeyError::EventTapCreation));
            return;
        }
    };

    let run_loop_source = match tap.mach_port.create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            error!("failed to create run loop source for event tap");
            let _ = ready_tx.send(Err(HotkeyError::EventTapCreation));
            return;
        }
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    tap.enable();

    info!("event tap created and enabled");
    let _ = ready_tx.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, Duration::from_millis(100), true);
        }

        if tap_disabled.swap(false, Ordering::SeqCst) {
            warn!("event tap disabled by macOS, re-enabling");
            tap.enable();
        }

        while callback_rx.try_recv().is_ok() {
            debug!("hotkey pressed");
            match keydown_tx.try_send(()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(())) => {
                    debug!("listener busy, dropping hotkey press");
                }
                Err(mpsc::error::TrySendError::Closed(())) => {
                    warn!("hotkey listener channel closed");
                    return;
                }
            }
        }
    }

    // The tap is released when it goes out of scope
}
