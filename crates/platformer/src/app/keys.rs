//! Translation of winit window events into pipeline raw events.
//!
//! Physical key codes are reported with their W3C names (`"Space"`,
//! `"ArrowUp"`, `"KeyW"`), which is how winit names its `KeyCode` variants.

use jumpcore::{RawEventKind, RawInputEvent};
use winit::event::{ElementState, KeyEvent, MouseButton, TouchPhase};
use winit::keyboard::{Key, NamedKey, PhysicalKey};

pub(crate) const MOUSE_BUTTON_NAME: &str = "mouse";

pub(crate) fn raw_from_key_event(event: &KeyEvent, focused: bool) -> RawInputEvent {
    raw_from_key_parts(
        event.physical_key,
        logical_key_text(&event.logical_key).as_deref(),
        event.state,
        event.repeat,
        focused,
    )
}

pub(crate) fn raw_from_key_parts(
    physical_key: PhysicalKey,
    logical_key: Option<&str>,
    state: ElementState,
    repeat: bool,
    focused: bool,
) -> RawInputEvent {
    let kind = match state {
        ElementState::Pressed => RawEventKind::KeyDown,
        ElementState::Released => RawEventKind::KeyUp,
    };
    let mut raw = RawInputEvent::new(kind).with_repeat(repeat).with_focus(focused);
    if let Some(code) = physical_code_name(physical_key) {
        raw = raw.with_code(&code);
    }
    if let Some(key) = logical_key {
        raw = raw.with_key(key);
    }
    raw
}

pub(crate) fn physical_code_name(key: PhysicalKey) -> Option<String> {
    match key {
        PhysicalKey::Code(code) => Some(format!("{code:?}")),
        PhysicalKey::Unidentified(_) => None,
    }
}

fn logical_key_text(key: &Key) -> Option<String> {
    match key {
        Key::Character(text) => Some(text.to_string()),
        Key::Named(NamedKey::Space) => Some(" ".to_string()),
        Key::Named(named) => Some(format!("{named:?}")),
        Key::Unidentified(_) | Key::Dead(_) => None,
    }
}

/// Moves carry no jump meaning and are dropped.
pub(crate) fn raw_from_touch(phase: TouchPhase, id: u64, focused: bool) -> Option<RawInputEvent> {
    let raw = match phase {
        TouchPhase::Started => RawInputEvent::touch_start(id),
        TouchPhase::Ended | TouchPhase::Cancelled => RawInputEvent::touch_end(id),
        TouchPhase::Moved => return None,
    };
    Some(raw.with_focus(focused))
}

/// The left mouse button stands in for an on-screen jump button.
pub(crate) fn raw_from_mouse(
    button: MouseButton,
    state: ElementState,
    focused: bool,
) -> Option<RawInputEvent> {
    if button != MouseButton::Left {
        return None;
    }
    let raw = match state {
        ElementState::Pressed => RawInputEvent::button_down(MOUSE_BUTTON_NAME),
        ElementState::Released => RawInputEvent::button_up(MOUSE_BUTTON_NAME),
    };
    Some(raw.with_focus(focused))
}
