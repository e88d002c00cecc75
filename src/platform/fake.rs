//! Recording test doubles for the capability traits

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use super::{
    AudioControl, Direction, DisplayDescriptor, DisplayMover, Notifier, PermissionProvider,
    PlatformError, Point, SpaceMover, WindowControl,
};
use crate::hotkey::{
    HotkeyBackend, HotkeyCombo, HotkeyError, HotkeyRegistration, RegistrationHandle,
    KEYDOWN_CHANNEL_CAPACITY,
};

pub struct FakePermission {
    granted: bool,
    panics: bool,
    check_delay: Option<Duration>,
    requests: AtomicUsize,
}

impl FakePermission {
    pub fn granted() -> Self {
        Self {
            granted: true,
            panics: false,
            check_delay: None,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: false,
            ..Self::granted()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::granted()
        }
    }

    /// Simulate a slow or hung OS query
    pub fn with_check_delay(mut self, delay: Duration) -> Self {
        self.check_delay = Some(delay);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PermissionProvider for FakePermission {
    fn has_capability(&self) -> bool {
        if let Some(delay) = self.check_delay {
            std::thread::sleep(delay);
        }
        if self.panics {
            panic!("accessibility query crashed");
        }
        self.granted
    }

    fn request_capability(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hotkey backend that fails a scripted number of times, then succeeds
pub struct FakeHotkeys {
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    current: Mutex<Option<(mpsc::Sender<()>, Arc<AtomicBool>)>>,
    unregistered: Arc<AtomicUsize>,
}

impl FakeHotkeys {
    pub fn succeeding() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            current: Mutex::new(None),
            unregistered: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn unregister_count(&self) -> usize {
        self.unregistered.load(Ordering::SeqCst)
    }

    /// Deliver a key-down on the live registration; false if there is none
    pub fn press(&self) -> bool {
        let current = self.current.lock().unwrap();
        match current.as_ref() {
            Some((tx, released)) if !released.load(Ordering::SeqCst) => tx.try_send(()).is_ok(),
            _ => false,
        }
    }

    /// End the key-down stream as if the OS listener thread died
    pub fn close_stream(&self) {
        self.current.lock().unwrap().take();
    }
}

impl HotkeyBackend for FakeHotkeys {
    fn register(&self, _combo: HotkeyCombo) -> Result<HotkeyRegistration, HotkeyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(HotkeyError::Rejected("combination already in use".to_string()));
        }

        let (tx, rx) = mpsc::channel(KEYDOWN_CHANNEL_CAPACITY);
        let released = Arc::new(AtomicBool::new(false));
        *self.current.lock().unwrap() = Some((tx, released.clone()));

        Ok(HotkeyRegistration::new(
            rx,
            FakeHandle {
                released,
                unregistered: self.unregistered.clone(),
            },
        ))
    }
}

struct FakeHandle {
    released: Arc<AtomicBool>,
    unregistered: Arc<AtomicUsize>,
}

impl RegistrationHandle for FakeHandle {
    fn unregister(&mut self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.unregistered.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    alerts: Mutex<Vec<(String, String)>>,
}

impl FakeNotifier {
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for FakeNotifier {
    fn alert(&self, title: &str, message: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

#[derive(Default)]
pub struct FakeAudio {
    muted: AtomicBool,
    toggles: AtomicUsize,
    fails: bool,
}

impl FakeAudio {
    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Default::default()
        }
    }

    pub fn toggle_count(&self) -> usize {
        self.toggles.load(Ordering::SeqCst)
    }
}

impl AudioControl for FakeAudio {
    fn toggle_mute(&self) -> Result<(), PlatformError> {
        self.toggles.fetch_add(1, Ordering::SeqCst);
        if self.fails {
            return Err(PlatformError::Script("input volume unavailable".to_string()));
        }
        self.muted.fetch_xor(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }
}

/// Records navigation calls; call number `fail_on` (1-based) and later fail
#[derive(Default)]
struct MoveRecorder {
    calls: AtomicUsize,
    moves: Mutex<Vec<Direction>>,
    fail_on: Option<usize>,
}

impl MoveRecorder {
    fn record(&self, direction: Direction) -> Result<(), PlatformError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.is_some_and(|fail_on| call >= fail_on) {
            return Err(PlatformError::NoDisplayInDirection(direction));
        }
        self.moves.lock().unwrap().push(direction);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDisplays {
    displays: Vec<DisplayDescriptor>,
    pointer: Point,
    unavailable: bool,
    recorder: MoveRecorder,
    pointer_queries: AtomicUsize,
}

impl FakeDisplays {
    pub fn with_displays(displays: Vec<DisplayDescriptor>) -> Self {
        Self {
            displays,
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn pointer_at(mut self, x: f64, y: f64) -> Self {
        self.pointer = Point::new(x, y);
        self
    }

    pub fn failing_on_move(mut self, call: usize) -> Self {
        self.recorder.fail_on = Some(call);
        self
    }

    /// Successful moves, in order
    pub fn moves(&self) -> Vec<Direction> {
        self.recorder.moves.lock().unwrap().clone()
    }

    pub fn move_calls(&self) -> usize {
        self.recorder.calls.load(Ordering::SeqCst)
    }

    pub fn pointer_queries(&self) -> usize {
        self.pointer_queries.load(Ordering::SeqCst)
    }
}

impl DisplayMover for FakeDisplays {
    fn move_focus(&self, direction: Direction) -> Result<(), PlatformError> {
        self.recorder.record(direction)
    }

    fn list_displays(&self) -> Result<Vec<DisplayDescriptor>, PlatformError> {
        if self.unavailable {
            return Err(PlatformError::NoDisplays);
        }
        Ok(self.displays.clone())
    }

    fn pointer_position(&self) -> Point {
        self.pointer_queries.fetch_add(1, Ordering::SeqCst);
        self.pointer
    }
}

#[derive(Default)]
pub struct FakeSpaces {
    recorder: MoveRecorder,
}

impl FakeSpaces {
    pub fn failing_on_move(call: usize) -> Self {
        Self {
            recorder: MoveRecorder {
                fail_on: Some(call),
                ..Default::default()
            },
        }
    }

    pub fn moves(&self) -> Vec<Direction> {
        self.recorder.moves.lock().unwrap().clone()
    }

    pub fn move_calls(&self) -> usize {
        self.recorder.calls.load(Ordering::SeqCst)
    }
}

impl SpaceMover for FakeSpaces {
    fn move_space(&self, direction: Direction) -> Result<(), PlatformError> {
        self.recorder.record(direction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCall {
    Show,
    Hide,
    Center,
    Position(i32, i32),
    AlwaysOnTop(bool),
}

#[derive(Default)]
pub struct FakeWindow {
    calls: Mutex<Vec<WindowCall>>,
}

impl FakeWindow {
    pub fn calls(&self) -> Vec<WindowCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn hide_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == WindowCall::Hide)
            .count()
    }

    fn push(&self, call: WindowCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl WindowControl for FakeWindow {
    fn show(&self) {
        self.push(WindowCall::Show);
    }

    fn hide(&self) {
        self.push(WindowCall::Hide);
    }

    fn center(&self) {
        self.push(WindowCall::Center);
    }

    fn set_position(&self, x: i32, y: i32) {
        self.push(WindowCall::Position(x, y));
    }

    fn set_always_on_top(&self, on_top: bool) {
        self.push(WindowCall::AlwaysOnTop(on_top));
    }
}
