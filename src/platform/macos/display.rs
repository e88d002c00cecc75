//! Display enumeration and pointer control via Core Graphics

use std::thread;
use std::time::Duration;

use core_graphics::display::CGDisplay;
use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;
use tracing::{debug, info, warn};

use crate::platform::{
    neighbor_display, Direction, DisplayDescriptor, DisplayMover, PlatformError, Point,
};

const CLICK_DELAY: Duration = Duration::from_millis(50);
const SETTLE_DELAY: Duration = Duration::from_millis(100);

pub struct CoreGraphicsDisplays;

impl DisplayMover for CoreGraphicsDisplays {
    fn move_focus(&self, direction: Direction) -> Result<(), PlatformError> {
        let pointer = pointer_location();
        let displays = active_displays()?;

        let current = displays
            .iter()
            .find(|d| d.contains(pointer))
            .ok_or(PlatformError::UnknownCurrentDisplay)?;
        let target = neighbor_display(&displays, current, direction)
            .ok_or(PlatformError::NoDisplayInDirection(direction))?;

        info!(from = %current.id, to = %target.id, %direction, "moving focus to display");

        let center = target.center();
        move_pointer(center);
        thread::sleep(SETTLE_DELAY);
        click(center);
        Ok(())
    }

    fn list_displays(&self) -> Result<Vec<DisplayDescriptor>, PlatformError> {
        active_displays()
    }

    fn pointer_position(&self) -> Point {
        pointer_location()
    }
}

fn active_displays() -> Result<Vec<DisplayDescriptor>, PlatformError> {
    let ids = CGDisplay::active_displays().map_err(|_| PlatformError::NoDisplays)?;
    if ids.is_empty() {
        return Err(PlatformError::NoDisplays);
    }

    Ok(ids
        .into_iter()
        .map(|id| {
            let bounds = CGDisplay::new(id).bounds();
            DisplayDescriptor::new(
                id.to_string(),
                bounds.origin.x,
                bounds.origin.y,
                bounds.size.width,
                bounds.size.height,
            )
        })
        .collect())
}

fn pointer_location() -> Point {
    let location = event_source()
        .and_then(|source| CGEvent::new(source).ok())
        .map(|event| event.location());

    match location {
        Some(location) => Point::new(location.x, location.y),
        None => {
            warn!("could not read pointer location");
            Point::default()
        }
    }
}

/// Click the center of the display under the pointer, activating the
/// frontmost window there
pub(super) fn click_center_of_current_display() -> Result<(), PlatformError> {
    let pointer = pointer_location();
    let displays = active_displays()?;
    let display = displays
        .iter()
        .find(|d| d.contains(pointer))
        .or_else(|| displays.iter().find(|d| d.is_at_origin()))
        .ok_or(PlatformError::UnknownCurrentDisplay)?;

    let center = display.center();
    move_pointer(center);
    thread::sleep(CLICK_DELAY);
    click(center);
    Ok(())
}

fn event_source() -> Option<CGEventSource> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState).ok()
}

fn post_mouse_event(event_type: CGEventType, point: Point) {
    let event = event_source().and_then(|source| {
        CGEvent::new_mouse_event(
            source,
            event_type,
            CGPoint::new(point.x, point.y),
            CGMouseButton::Left,
        )
        .ok()
    });

    match event {
        Some(event) => event.post(CGEventTapLocation::HID),
        None => warn!("failed to create mouse event"),
    }
}

fn move_pointer(point: Point) {
    debug!(x = point.x, y = point.y, "moving pointer");
    post_mouse_event(CGEventType::MouseMoved, point);
}

fn click(point: Point) {
    post_mouse_event(CGEventType::LeftMouseDown, point);
    thread::sleep(CLICK_DELAY);
    post_mouse_event(CGEventType::LeftMouseUp, point);
}
