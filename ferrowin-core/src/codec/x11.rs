//! X11 core input events.
//!
//! The backend reduces `XKeyEvent`, `XButtonEvent` and `XMotionEvent` to an [`X11Input`]
//! after running key presses through the window's input context. A key press that produces
//! text is reported as a [`X11Input::Key`] followed by a [`X11Input::Char`].

use super::{KeyCache, WHEEL_DELTA};
use crate::event::{EventKind, InputEvent, KeyData, Modifiers, MouseData};

pub const SHIFT_MASK: u32 = 1 << 0;
pub const LOCK_MASK: u32 = 1 << 1;
pub const CONTROL_MASK: u32 = 1 << 2;
pub const MOD1_MASK: u32 = 1 << 3;
pub const BUTTON1_MASK: u32 = 1 << 8;
pub const BUTTON2_MASK: u32 = 1 << 9;
pub const BUTTON3_MASK: u32 = 1 << 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum X11Input {
    /// `KeyPress` or `KeyRelease`. `keysym` and `character` are the lookup result of a press
    /// and are ignored on release.
    Key { pressed: bool, keycode: u32, state: u32, keysym: u32, character: u32 },
    /// Text produced by the input context for a key press.
    Char { keycode: u32, state: u32, keysym: u32, character: u32 },
    /// `ButtonPress` or `ButtonRelease` with window relative coordinates.
    Button { pressed: bool, button: u32, state: u32, x: i32, y: i32 },
    /// `MotionNotify`.
    Motion { state: u32, x: i32, y: i32 },
}

/// Translate a core event state mask. X11 has no mask for the extended buttons.
pub fn modifiers(state: u32) -> Modifiers {
    let mut result = Modifiers::empty();
    result.set(Modifiers::CTRL, state & CONTROL_MASK != 0);
    result.set(Modifiers::ALT, state & MOD1_MASK != 0);
    result.set(Modifiers::SHIFT, state & SHIFT_MASK != 0);
    result.set(Modifiers::LBUTTON, state & BUTTON1_MASK != 0);
    result.set(Modifiers::MBUTTON, state & BUTTON2_MASK != 0);
    result.set(Modifiers::RBUTTON, state & BUTTON3_MASK != 0);
    result
}

/// Wheel delta of a core button, if it is a wheel button.
fn wheel_delta(button: u32) -> Option<(i32, i32)> {
    match button {
        4 => Some((0, WHEEL_DELTA)),
        5 => Some((0, -WHEEL_DELTA)),
        6 => Some((-WHEEL_DELTA, 0)),
        7 => Some((WHEEL_DELTA, 0)),
        _ => None,
    }
}

/// Canonical button for a core button that is not a wheel button.
fn canonical_button(button: u32) -> u8 {
    match button {
        1..=3 => button as u8,
        8.. => u8::try_from(button - 4).unwrap_or(u8::MAX),
        _ => 0,
    }
}

/// Decode one record. Key presses update `cache`; releases read it back.
pub fn decode(input: &X11Input, cache: &mut KeyCache) -> InputEvent {
    match *input {
        X11Input::Key { pressed: true, keycode, state, keysym, character } => {
            cache.remember(keysym, character);
            let data = KeyData {
                vk_code: keysym,
                scan_code: keycode,
                key_code: keysym,
                char_code: character,
            };
            InputEvent::key(EventKind::KeyDown, modifiers(state), data, 1)
        },
        X11Input::Key { pressed: false, keycode, state, .. } => {
            let (key_code, char_code) = cache.last_pressed();
            let data = KeyData { vk_code: key_code, scan_code: keycode, key_code, char_code };
            InputEvent::key(EventKind::KeyUp, modifiers(state), data, 1)
        },
        X11Input::Char { keycode, state, keysym, character } => {
            let data = KeyData {
                vk_code: keysym,
                scan_code: keycode,
                key_code: keysym,
                char_code: character,
            };
            InputEvent::key(EventKind::KeyChar, modifiers(state), data, 1)
        },
        X11Input::Button { pressed, button, state, x, y } => match wheel_delta(button) {
            Some((dx, dy)) if pressed => InputEvent::mouse(
                EventKind::MouseWheel,
                modifiers(state),
                0,
                MouseData { x, y, dx, dy },
                0,
            ),
            // The release half of a wheel notch carries nothing new.
            Some(_) => InputEvent::unknown(),
            None => {
                let kind = if pressed { EventKind::MouseDown } else { EventKind::MouseUp };
                let data = MouseData { x, y, dx: 0, dy: 0 };
                InputEvent::mouse(kind, modifiers(state), canonical_button(button), data, 0)
            },
        },
        X11Input::Motion { state, x, y } => InputEvent::mouse(
            EventKind::MouseMove,
            modifiers(state),
            0,
            MouseData { x, y, dx: 0, dy: 0 },
            0,
        ),
    }
}
