//! Win32 window messages.

use dpi::PhysicalPosition;

use super::WHEEL_DELTA;
use crate::event::{EventKind, InputEvent, KeyData, Modifiers, MouseData};

pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_CHAR: u32 = 0x0102;
pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_LBUTTONDBLCLK: u32 = 0x0203;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_RBUTTONDBLCLK: u32 = 0x0206;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MBUTTONUP: u32 = 0x0208;
pub const WM_MBUTTONDBLCLK: u32 = 0x0209;
pub const WM_MOUSEWHEEL: u32 = 0x020A;
pub const WM_XBUTTONDOWN: u32 = 0x020B;
pub const WM_XBUTTONUP: u32 = 0x020C;
pub const WM_XBUTTONDBLCLK: u32 = 0x020D;
pub const WM_MOUSEHWHEEL: u32 = 0x020E;

const MK_LBUTTON: usize = 0x0001;
const MK_RBUTTON: usize = 0x0002;
const MK_SHIFT: usize = 0x0004;
const MK_CONTROL: usize = 0x0008;
const MK_MBUTTON: usize = 0x0010;
const MK_XBUTTON1: usize = 0x0020;
const MK_XBUTTON2: usize = 0x0040;

/// A window message as read from the queue.
///
/// `key_state` is the keyboard and button state sampled by the backend when the message was
/// read (`GetAsyncKeyState`). Key messages take their whole state from it; mouse messages only
/// take ALT from it, the rest comes from the `MK_*` bits of `wparam`. `client_origin` is the
/// screen position of the client area, used to bring wheel coordinates into client space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Win32Message {
    pub message: u32,
    pub wparam: usize,
    pub lparam: isize,
    pub key_state: Modifiers,
    pub client_origin: PhysicalPosition<i32>,
}

#[inline]
fn loword(value: usize) -> u16 {
    (value & 0xffff) as u16
}

#[inline]
fn hiword(value: usize) -> u16 {
    ((value >> 16) & 0xffff) as u16
}

#[inline]
fn get_x_lparam(lparam: isize) -> i32 {
    loword(lparam as usize) as i16 as i32
}

#[inline]
fn get_y_lparam(lparam: isize) -> i32 {
    hiword(lparam as usize) as i16 as i32
}

#[inline]
fn get_wheel_delta(wparam: usize) -> i32 {
    hiword(wparam) as i16 as i32
}

/// Decode one message. Anything outside the mouse and key ranges is [`EventKind::Unknown`].
pub fn decode(msg: &Win32Message) -> InputEvent {
    match msg.message {
        WM_MOUSEMOVE..=WM_MOUSEHWHEEL => decode_mouse(msg),
        WM_KEYDOWN..=WM_CHAR => decode_key(msg),
        _ => InputEvent::unknown(),
    }
}

fn decode_mouse(msg: &Win32Message) -> InputEvent {
    let xbutton = 3u8.saturating_add(hiword(msg.wparam) as u8);
    let (kind, button) = match msg.message {
        WM_MOUSEMOVE => (EventKind::MouseMove, 0),
        WM_MOUSEWHEEL | WM_MOUSEHWHEEL => (EventKind::MouseWheel, 0),
        WM_LBUTTONDOWN => (EventKind::MouseDown, 1),
        WM_MBUTTONDOWN => (EventKind::MouseDown, 2),
        WM_RBUTTONDOWN => (EventKind::MouseDown, 3),
        WM_XBUTTONDOWN => (EventKind::MouseDown, xbutton),
        WM_LBUTTONUP => (EventKind::MouseUp, 1),
        WM_MBUTTONUP => (EventKind::MouseUp, 2),
        WM_RBUTTONUP => (EventKind::MouseUp, 3),
        WM_XBUTTONUP => (EventKind::MouseUp, xbutton),
        WM_LBUTTONDBLCLK => (EventKind::MouseClick, 1),
        WM_MBUTTONDBLCLK => (EventKind::MouseClick, 2),
        WM_RBUTTONDBLCLK => (EventKind::MouseClick, 3),
        WM_XBUTTONDBLCLK => (EventKind::MouseClick, xbutton),
        _ => return InputEvent::unknown(),
    };

    let mut data =
        MouseData { x: get_x_lparam(msg.lparam), y: get_y_lparam(msg.lparam), dx: 0, dy: 0 };
    if kind == EventKind::MouseWheel {
        // Wheel messages carry screen coordinates.
        data.x -= msg.client_origin.x;
        data.y -= msg.client_origin.y;
        let delta = get_wheel_delta(msg.wparam);
        if msg.message == WM_MOUSEHWHEEL {
            data.dx = delta;
        } else {
            data.dy = delta;
        }
    }

    let repeats = if kind == EventKind::MouseClick { 2 } else { 0 };
    InputEvent::mouse(kind, mouse_state(msg), button, data, repeats)
}

fn mouse_state(msg: &Win32Message) -> Modifiers {
    let keys = loword(msg.wparam) as usize;
    let mut state = Modifiers::empty();
    state.set(Modifiers::CTRL, keys & MK_CONTROL != 0);
    state.set(Modifiers::ALT, msg.key_state.contains(Modifiers::ALT));
    state.set(Modifiers::SHIFT, keys & MK_SHIFT != 0);
    state.set(Modifiers::LBUTTON, keys & MK_LBUTTON != 0);
    state.set(Modifiers::MBUTTON, keys & MK_MBUTTON != 0);
    state.set(Modifiers::RBUTTON, keys & MK_RBUTTON != 0);
    state.set(Modifiers::XBUTTON1, keys & MK_XBUTTON1 != 0);
    state.set(Modifiers::XBUTTON2, keys & MK_XBUTTON2 != 0);
    state
}

fn decode_key(msg: &Win32Message) -> InputEvent {
    let kind = match msg.message {
        WM_KEYDOWN => EventKind::KeyDown,
        WM_KEYUP => EventKind::KeyUp,
        WM_CHAR => EventKind::KeyChar,
        _ => return InputEvent::unknown(),
    };
    let code = msg.wparam as u32;
    let data = KeyData {
        vk_code: code,
        scan_code: msg.lparam as u32,
        key_code: code,
        char_code: if kind == EventKind::KeyChar { code } else { 0 },
    };
    let repeats = loword(msg.lparam as usize) as u32;
    InputEvent::key(kind, msg.key_state, data, repeats)
}

/// Pack client coordinates the way mouse messages carry them in `lparam`.
pub fn make_lparam(x: i32, y: i32) -> isize {
    (((y as u16 as u32) << 16) | (x as u16 as u32)) as i32 as isize
}

/// Wheel delta shifted into the high word of `wparam`, as `WM_MOUSEWHEEL` carries it.
pub fn wheel_wparam(notches: i32, keys: usize) -> usize {
    (((notches * WHEEL_DELTA) as i16 as u16 as usize) << 16) | (keys & 0xffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(message: u32, wparam: usize, lparam: isize) -> Win32Message {
        Win32Message { message, wparam, lparam, ..Default::default() }
    }

    #[test]
    fn left_button_down_without_modifiers() {
        let event = decode(&msg(WM_LBUTTONDOWN, MK_LBUTTON, make_lparam(10, 20)));
        assert_eq!(event.kind(), EventKind::MouseDown);
        assert_eq!(event.button(), 1);
        assert_eq!(event.state(), Modifiers::LBUTTON);
        assert_eq!(event.mouse_data(), Some(&MouseData { x: 10, y: 20, dx: 0, dy: 0 }));
        assert_eq!(event.repeats(), 0);
    }

    #[test]
    fn button_table() {
        let table = [
            (WM_MOUSEMOVE, 0, EventKind::MouseMove, 0),
            (WM_LBUTTONUP, 0, EventKind::MouseUp, 1),
            (WM_MBUTTONDOWN, 0, EventKind::MouseDown, 2),
            (WM_MBUTTONUP, 0, EventKind::MouseUp, 2),
            (WM_RBUTTONDOWN, 0, EventKind::MouseDown, 3),
            (WM_RBUTTONUP, 0, EventKind::MouseUp, 3),
            (WM_XBUTTONDOWN, 1 << 16, EventKind::MouseDown, 4),
            (WM_XBUTTONUP, 2 << 16, EventKind::MouseUp, 5),
            (WM_XBUTTONDBLCLK, 1 << 16, EventKind::MouseClick, 4),
            (WM_RBUTTONDBLCLK, 0, EventKind::MouseClick, 3),
        ];
        for (message, wparam, kind, button) in table {
            let event = decode(&msg(message, wparam, 0));
            assert_eq!(event.kind(), kind, "message {message:#x}");
            assert_eq!(event.button(), button, "message {message:#x}");
        }
    }

    #[test]
    fn double_click_counts_two() {
        let event = decode(&msg(WM_LBUTTONDBLCLK, 0, make_lparam(1, 1)));
        assert_eq!(event.kind(), EventKind::MouseClick);
        assert_eq!(event.repeats(), 2);
    }

    #[test]
    fn mouse_state_from_wparam_and_alt_from_sample() {
        let mut message = msg(
            WM_MOUSEMOVE,
            MK_CONTROL | MK_SHIFT | MK_RBUTTON | MK_XBUTTON2,
            make_lparam(-5, 7),
        );
        message.key_state = Modifiers::ALT | Modifiers::CTRL | Modifiers::MBUTTON;
        let event = decode(&message);
        assert_eq!(
            event.state(),
            Modifiers::CTRL
                | Modifiers::ALT
                | Modifiers::SHIFT
                | Modifiers::RBUTTON
                | Modifiers::XBUTTON2
        );
        let data = event.mouse_data().unwrap();
        assert_eq!((data.x, data.y), (-5, 7));
    }

    #[test]
    fn wheel_converts_to_client_coordinates() {
        let mut message = msg(WM_MOUSEWHEEL, wheel_wparam(-1, 0), make_lparam(600, 400));
        message.client_origin = PhysicalPosition::new(560, 240);
        let event = decode(&message);
        assert_eq!(event.kind(), EventKind::MouseWheel);
        assert_eq!(event.button(), 0);
        assert_eq!(event.mouse_data(), Some(&MouseData { x: 40, y: 160, dx: 0, dy: -120 }));

        message.message = WM_MOUSEHWHEEL;
        message.wparam = wheel_wparam(2, 0);
        let event = decode(&message);
        assert_eq!(event.mouse_data(), Some(&MouseData { x: 40, y: 160, dx: 240, dy: 0 }));
    }

    #[test]
    fn key_messages() {
        let mut message = msg(WM_KEYDOWN, 0x41, 0x001e_0003);
        message.key_state = Modifiers::SHIFT;
        let event = decode(&message);
        assert_eq!(event.kind(), EventKind::KeyDown);
        assert_eq!(event.state(), Modifiers::SHIFT);
        assert_eq!(event.repeats(), 3);
        assert_eq!(
            event.key_data(),
            Some(&KeyData { vk_code: 0x41, scan_code: 0x001e_0003, key_code: 0x41, char_code: 0 })
        );

        message.message = WM_CHAR;
        let event = decode(&message);
        assert_eq!(event.kind(), EventKind::KeyChar);
        assert_eq!(event.key_data().unwrap().char_code, 0x41);

        message.message = WM_KEYUP;
        assert_eq!(decode(&message).kind(), EventKind::KeyUp);
    }

    #[test]
    fn unrelated_messages_are_unknown() {
        for message in [0x0005u32, 0x000F, 0x0010, 0x0103, 0x0020] {
            assert_eq!(decode(&msg(message, 0, 0)).kind(), EventKind::Unknown);
        }
    }

    #[test]
    fn decoding_is_repeatable() {
        let message = msg(WM_XBUTTONDOWN, (2 << 16) | MK_XBUTTON2, make_lparam(3, 4));
        assert_eq!(decode(&message), decode(&message));
    }
}
