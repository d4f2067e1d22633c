//! AppKit `NSEvent`s.

use super::WHEEL_DELTA;
use crate::event::{EventKind, InputEvent, KeyData, Modifiers, MouseData};

// NSEventType
pub const LEFT_MOUSE_DOWN: u64 = 1;
pub const LEFT_MOUSE_UP: u64 = 2;
pub const RIGHT_MOUSE_DOWN: u64 = 3;
pub const RIGHT_MOUSE_UP: u64 = 4;
pub const MOUSE_MOVED: u64 = 5;
pub const LEFT_MOUSE_DRAGGED: u64 = 6;
pub const RIGHT_MOUSE_DRAGGED: u64 = 7;
pub const KEY_DOWN: u64 = 10;
pub const KEY_UP: u64 = 11;
pub const SCROLL_WHEEL: u64 = 22;
pub const OTHER_MOUSE_DOWN: u64 = 25;
pub const OTHER_MOUSE_UP: u64 = 26;
pub const OTHER_MOUSE_DRAGGED: u64 = 27;

// NSEventModifierFlags
pub const SHIFT_FLAG: u64 = 1 << 17;
pub const CONTROL_FLAG: u64 = 1 << 18;
pub const OPTION_FLAG: u64 = 1 << 19;

/// The fields of an `NSEvent` the decoder needs, in the event window's coordinates.
///
/// `location` has AppKit's bottom-left origin; it is flipped with `content_height`.
/// A key down that produced text is reported twice: once as is and once with `text` set,
/// which decodes to [`EventKind::KeyChar`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AppKitEvent {
    pub event_type: u64,
    pub modifier_flags: u64,
    /// `+[NSEvent pressedMouseButtons]` at the time of the event.
    pub pressed_buttons: u64,
    pub button_number: i64,
    pub click_count: i64,
    pub location: (f64, f64),
    pub content_height: f64,
    pub scrolling_delta: (f64, f64),
    pub key_code: u16,
    /// First UTF-32 unit of `characters`.
    pub character: u32,
    /// First UTF-32 unit of `charactersIgnoringModifiers`.
    pub unmodified: u32,
    pub is_repeat: bool,
    pub text: bool,
}

pub fn modifiers(flags: u64, pressed_buttons: u64) -> Modifiers {
    let mut state = Modifiers::empty();
    state.set(Modifiers::CTRL, flags & CONTROL_FLAG != 0);
    state.set(Modifiers::ALT, flags & OPTION_FLAG != 0);
    state.set(Modifiers::SHIFT, flags & SHIFT_FLAG != 0);
    state.set(Modifiers::LBUTTON, pressed_buttons & (1 << 0) != 0);
    state.set(Modifiers::RBUTTON, pressed_buttons & (1 << 1) != 0);
    state.set(Modifiers::MBUTTON, pressed_buttons & (1 << 2) != 0);
    state.set(Modifiers::XBUTTON1, pressed_buttons & (1 << 3) != 0);
    state.set(Modifiers::XBUTTON2, pressed_buttons & (1 << 4) != 0);
    state
}

/// AppKit numbers right as 1 and middle as 2.
fn canonical_button(button_number: i64) -> u8 {
    match button_number {
        0 => 1,
        1 => 3,
        2 => 2,
        n if n > 2 => u8::try_from(n + 1).unwrap_or(u8::MAX),
        _ => 0,
    }
}

pub fn decode(event: &AppKitEvent) -> InputEvent {
    let state = modifiers(event.modifier_flags, event.pressed_buttons);
    match event.event_type {
        KEY_DOWN | KEY_UP => decode_key(event, state),
        _ => decode_mouse(event, state),
    }
}

fn decode_key(event: &AppKitEvent, state: Modifiers) -> InputEvent {
    let kind = match (event.event_type, event.text) {
        (KEY_DOWN, true) => EventKind::KeyChar,
        (KEY_DOWN, false) => EventKind::KeyDown,
        _ => EventKind::KeyUp,
    };
    let data = KeyData {
        vk_code: event.key_code as u32,
        scan_code: event.key_code as u32,
        key_code: event.unmodified,
        char_code: event.character,
    };
    let repeats = if kind == EventKind::KeyUp { 1 } else { 1 + event.is_repeat as u32 };
    InputEvent::key(kind, state, data, repeats)
}

fn decode_mouse(event: &AppKitEvent, state: Modifiers) -> InputEvent {
    let button = canonical_button(event.button_number);
    let (kind, button, repeats) = match event.event_type {
        MOUSE_MOVED | LEFT_MOUSE_DRAGGED | RIGHT_MOUSE_DRAGGED | OTHER_MOUSE_DRAGGED => {
            (EventKind::MouseMove, 0, 0)
        },
        SCROLL_WHEEL => (EventKind::MouseWheel, 0, 0),
        LEFT_MOUSE_DOWN | RIGHT_MOUSE_DOWN | OTHER_MOUSE_DOWN if event.click_count >= 2 => {
            (EventKind::MouseClick, button, event.click_count as u32)
        },
        LEFT_MOUSE_DOWN | RIGHT_MOUSE_DOWN | OTHER_MOUSE_DOWN => (EventKind::MouseDown, button, 0),
        LEFT_MOUSE_UP | RIGHT_MOUSE_UP | OTHER_MOUSE_UP => (EventKind::MouseUp, button, 0),
        _ => return InputEvent::unknown(),
    };

    let mut data = MouseData {
        x: event.location.0.round() as i32,
        y: (event.content_height - event.location.1).round() as i32,
        dx: 0,
        dy: 0,
    };
    if kind == EventKind::MouseWheel {
        data.dx = (event.scrolling_delta.0 * WHEEL_DELTA as f64).round() as i32;
        data.dy = (event.scrolling_delta.1 * WHEEL_DELTA as f64).round() as i32;
    }
    InputEvent::mouse(kind, state, button, data, repeats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse(event_type: u64, button_number: i64) -> AppKitEvent {
        AppKitEvent {
            event_type,
            button_number,
            click_count: 1,
            location: (10.0, 590.0),
            content_height: 600.0,
            ..Default::default()
        }
    }

    #[test]
    fn buttons_and_flipped_coordinates() {
        let table = [
            (LEFT_MOUSE_DOWN, 0, EventKind::MouseDown, 1),
            (LEFT_MOUSE_UP, 0, EventKind::MouseUp, 1),
            (RIGHT_MOUSE_DOWN, 1, EventKind::MouseDown, 3),
            (RIGHT_MOUSE_UP, 1, EventKind::MouseUp, 3),
            (OTHER_MOUSE_DOWN, 2, EventKind::MouseDown, 2),
            (OTHER_MOUSE_UP, 3, EventKind::MouseUp, 4),
            (OTHER_MOUSE_DOWN, 4, EventKind::MouseDown, 5),
            (MOUSE_MOVED, 0, EventKind::MouseMove, 0),
            (LEFT_MOUSE_DRAGGED, 0, EventKind::MouseMove, 0),
        ];
        for (event_type, number, kind, button) in table {
            let event = decode(&mouse(event_type, number));
            assert_eq!(event.kind(), kind, "type {event_type}");
            assert_eq!(event.button(), button, "type {event_type}");
            assert_eq!(event.mouse_data(), Some(&MouseData { x: 10, y: 10, dx: 0, dy: 0 }));
        }
    }

    #[test]
    fn click_count_becomes_click() {
        let mut record = mouse(LEFT_MOUSE_DOWN, 0);
        record.click_count = 3;
        let event = decode(&record);
        assert_eq!(event.kind(), EventKind::MouseClick);
        assert_eq!(event.repeats(), 3);
        assert_eq!(event.button(), 1);
    }

    #[test]
    fn scroll_wheel_scaled() {
        let mut record = mouse(SCROLL_WHEEL, 0);
        record.scrolling_delta = (0.5, -1.0);
        let event = decode(&record);
        assert_eq!(event.kind(), EventKind::MouseWheel);
        assert_eq!(event.mouse_data().map(|m| (m.dx, m.dy)), Some((60, -120)));
    }

    #[test]
    fn modifier_flags() {
        let state = modifiers(SHIFT_FLAG | CONTROL_FLAG | OPTION_FLAG, 0b11111);
        assert_eq!(state, Modifiers::all());
        assert_eq!(modifiers(1 << 20, 0b10), Modifiers::RBUTTON);
    }

    #[test]
    fn keys() {
        let mut record = AppKitEvent {
            event_type: KEY_DOWN,
            key_code: 0,
            character: 'A' as u32,
            unmodified: 'a' as u32,
            modifier_flags: SHIFT_FLAG,
            is_repeat: true,
            ..Default::default()
        };
        let down = decode(&record);
        assert_eq!(down.kind(), EventKind::KeyDown);
        assert_eq!(down.repeats(), 2);
        assert_eq!(down.state(), Modifiers::SHIFT);

        record.text = true;
        let text = decode(&record);
        assert_eq!(text.kind(), EventKind::KeyChar);
        assert_eq!(text.key_data().unwrap().char_code, 'A' as u32);

        record.event_type = KEY_UP;
        record.text = false;
        assert_eq!(decode(&record).kind(), EventKind::KeyUp);
    }

    #[test]
    fn other_types_are_unknown() {
        // NSEventTypeFlagsChanged, NSEventTypeAppKitDefined
        for event_type in [12, 13] {
            assert_eq!(decode(&mouse(event_type, 0)).kind(), EventKind::Unknown);
        }
    }
}
