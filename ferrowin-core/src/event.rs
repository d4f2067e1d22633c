//! The canonical input event shared by every backend.
//!
//! An [`InputEvent`] packs its kind, mouse button and modifier state into a single 32-bit word
//! with a fixed layout, so hosts never see platform specific values:
//!
//! ```text
//!  31            16 15      8 7       0
//! +----------------+---------+---------+
//! |     state      | button  |  type   |
//! +----------------+---------+---------+
//! ```
//!
//! The payload is a tagged [`EventData`] whose arm always matches the kind.

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

const TYPE_MASK: u32 = 0x0000_00ff;
const BUTTON_MASK: u32 = 0x0000_ff00;
const BUTTON_SHIFT: u32 = 8;
const STATE_MASK: u32 = 0xffff_0000;
const STATE_SHIFT: u32 = 16;

/// What happened.
///
/// Keyboard kinds and mouse kinds each occupy a contiguous range so [`EventKind::is_key`] and
/// [`EventKind::is_mouse`] are range comparisons.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum EventKind {
    #[default]
    Unknown = 0,
    KeyDown = 1,
    KeyUp = 2,
    KeyChar = 3,
    MouseMove = 4,
    MouseWheel = 5,
    MouseDown = 6,
    MouseUp = 7,
    MouseClick = 8,
}

impl EventKind {
    const ALL: [EventKind; 9] = [
        EventKind::Unknown,
        EventKind::KeyDown,
        EventKind::KeyUp,
        EventKind::KeyChar,
        EventKind::MouseMove,
        EventKind::MouseWheel,
        EventKind::MouseDown,
        EventKind::MouseUp,
        EventKind::MouseClick,
    ];

    #[inline]
    pub fn is_key(self) -> bool {
        (EventKind::KeyDown..=EventKind::KeyChar).contains(&self)
    }

    #[inline]
    pub fn is_mouse(self) -> bool {
        (EventKind::MouseMove..=EventKind::MouseClick).contains(&self)
    }

    /// The host-facing name, also used as the callback event name.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Unknown => "unknown",
            EventKind::KeyDown => "keydown",
            EventKind::KeyUp => "keyup",
            EventKind::KeyChar => "char",
            EventKind::MouseMove => "mousemove",
            EventKind::MouseWheel => "mousewheel",
            EventKind::MouseDown => "mousedown",
            EventKind::MouseUp => "mouseup",
            EventKind::MouseClick => "mouseclick",
        }
    }

    /// Inverse of [`EventKind::name`]; anything unrecognized is [`EventKind::Unknown`].
    pub fn from_name(name: &str) -> Self {
        Self::ALL.into_iter().find(|kind| kind.name() == name).unwrap_or(EventKind::Unknown)
    }

    fn from_bits(bits: u32) -> Self {
        Self::ALL.get((bits & TYPE_MASK) as usize).copied().unwrap_or(EventKind::Unknown)
    }
}

bitflags! {
    /// Modifier keys and mouse buttons held while the event was generated.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct Modifiers: u16 {
        const CTRL = 0x0001;
        const ALT = 0x0002;
        const SHIFT = 0x0004;
        const LBUTTON = 0x0008;
        const MBUTTON = 0x0010;
        const RBUTTON = 0x0020;
        const XBUTTON1 = 0x0040;
        const XBUTTON2 = 0x0080;
    }
}

/// Pointer position in client coordinates plus wheel deltas (120 per notch).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseData {
    pub x: i32,
    pub y: i32,
    pub dx: i32,
    pub dy: i32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyData {
    pub vk_code: u32,
    pub scan_code: u32,
    pub key_code: u32,
    pub char_code: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventData {
    #[default]
    None,
    Mouse(MouseData),
    Key(KeyData),
}

/// One normalized input event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InputEvent {
    type_and_state: u32,
    data: EventData,
    repeats: u32,
}

impl InputEvent {
    /// An event that could not be translated.
    #[inline]
    pub const fn unknown() -> Self {
        Self { type_and_state: 0, data: EventData::None, repeats: 0 }
    }

    /// A mouse event. A non-mouse `kind` yields [`InputEvent::unknown`].
    pub fn mouse(
        kind: EventKind,
        state: Modifiers,
        button: u8,
        data: MouseData,
        repeats: u32,
    ) -> Self {
        if !kind.is_mouse() {
            return Self::unknown();
        }
        Self { type_and_state: pack(kind, button, state), data: EventData::Mouse(data), repeats }
    }

    /// A keyboard event. A non-key `kind` yields [`InputEvent::unknown`].
    pub fn key(kind: EventKind, state: Modifiers, data: KeyData, repeats: u32) -> Self {
        if !kind.is_key() {
            return Self::unknown();
        }
        Self { type_and_state: pack(kind, 0, state), data: EventData::Key(data), repeats }
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        EventKind::from_bits(self.type_and_state)
    }

    #[inline]
    pub fn state(&self) -> Modifiers {
        Modifiers::from_bits_truncate(((self.type_and_state & STATE_MASK) >> STATE_SHIFT) as u16)
    }

    /// Canonical button: 0 none, 1 left, 2 middle, 3 right, 4 and up extended.
    #[inline]
    pub fn button(&self) -> u8 {
        ((self.type_and_state & BUTTON_MASK) >> BUTTON_SHIFT) as u8
    }

    /// Key repeat count for key events, click count for [`EventKind::MouseClick`].
    #[inline]
    pub fn repeats(&self) -> u32 {
        self.repeats
    }

    #[inline]
    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn mouse_data(&self) -> Option<&MouseData> {
        match &self.data {
            EventData::Mouse(data) => Some(data),
            _ => None,
        }
    }

    pub fn key_data(&self) -> Option<&KeyData> {
        match &self.data {
            EventData::Key(data) => Some(data),
            _ => None,
        }
    }

    /// The packed type, button and state word.
    #[inline]
    pub fn packed(&self) -> u32 {
        self.type_and_state
    }

    #[inline]
    pub fn is_key(&self) -> bool {
        self.kind().is_key()
    }

    #[inline]
    pub fn is_mouse(&self) -> bool {
        self.kind().is_mouse()
    }

    /// Convert to the plain shape handed to host callbacks. Unknown events carry only their type.
    pub fn to_payload(&self) -> InputPayload {
        let mut payload =
            InputPayload { kind: SmolStr::new_static(self.kind().name()), ..Default::default() };
        if self.kind() == EventKind::Unknown {
            return payload;
        }
        payload.modifiers = Some(self.state().into());
        payload.repeats = Some(self.repeats);
        match self.data {
            EventData::Key(key) => {
                payload.vk_code = Some(key.vk_code);
                payload.scan_code = Some(key.scan_code);
                payload.key_code = Some(key.key_code);
                // Empty for no character.
                let character = char::from_u32(key.char_code).filter(|&c| c != '\0');
                payload.character = Some(character.map(String::from).unwrap_or_default());
            },
            EventData::Mouse(mouse) => {
                let button = self.button();
                if button != 0 {
                    payload.button = Some(button as u32);
                }
                payload.x = Some(mouse.x);
                payload.y = Some(mouse.y);
                payload.dx = Some(mouse.dx);
                payload.dy = Some(mouse.dy);
            },
            EventData::None => {},
        }
        payload
    }

    /// Rebuild an event from a host payload. Missing fields read as zero.
    pub fn from_payload(payload: &InputPayload) -> Self {
        let kind = EventKind::from_name(&payload.kind);
        let state = Modifiers::from(payload.modifiers.unwrap_or_default());
        let repeats = payload.repeats.unwrap_or_default();
        if kind.is_key() {
            let data = KeyData {
                vk_code: payload.vk_code.unwrap_or_default(),
                scan_code: payload.scan_code.unwrap_or_default(),
                key_code: payload.key_code.unwrap_or_default(),
                char_code: payload
                    .character
                    .as_deref()
                    .and_then(|text| text.chars().next())
                    .map_or(0, u32::from),
            };
            InputEvent::key(kind, state, data, repeats)
        } else if kind.is_mouse() {
            let button = (payload.button.unwrap_or_default() & 0xff) as u8;
            let data = MouseData {
                x: payload.x.unwrap_or_default(),
                y: payload.y.unwrap_or_default(),
                dx: payload.dx.unwrap_or_default(),
                dy: payload.dy.unwrap_or_default(),
            };
            InputEvent::mouse(kind, state, button, data, repeats)
        } else {
            InputEvent::unknown()
        }
    }
}

fn pack(kind: EventKind, button: u8, state: Modifiers) -> u32 {
    (kind as u32 & TYPE_MASK)
        | (((button as u32) << BUTTON_SHIFT) & BUTTON_MASK)
        | (((state.bits() as u32) << STATE_SHIFT) & STATE_MASK)
}

/// Modifier state spelled out as booleans for hosts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModifierPayload {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub lbutton: bool,
    pub mbutton: bool,
    pub rbutton: bool,
    pub xbutton1: bool,
    pub xbutton2: bool,
}

impl From<Modifiers> for ModifierPayload {
    fn from(state: Modifiers) -> Self {
        Self {
            ctrl: state.contains(Modifiers::CTRL),
            alt: state.contains(Modifiers::ALT),
            shift: state.contains(Modifiers::SHIFT),
            lbutton: state.contains(Modifiers::LBUTTON),
            mbutton: state.contains(Modifiers::MBUTTON),
            rbutton: state.contains(Modifiers::RBUTTON),
            xbutton1: state.contains(Modifiers::XBUTTON1),
            xbutton2: state.contains(Modifiers::XBUTTON2),
        }
    }
}

impl From<ModifierPayload> for Modifiers {
    fn from(payload: ModifierPayload) -> Self {
        let mut state = Modifiers::empty();
        state.set(Modifiers::CTRL, payload.ctrl);
        state.set(Modifiers::ALT, payload.alt);
        state.set(Modifiers::SHIFT, payload.shift);
        state.set(Modifiers::LBUTTON, payload.lbutton);
        state.set(Modifiers::MBUTTON, payload.mbutton);
        state.set(Modifiers::RBUTTON, payload.rbutton);
        state.set(Modifiers::XBUTTON1, payload.xbutton1);
        state.set(Modifiers::XBUTTON2, payload.xbutton2);
        state
    }
}

/// Host-facing form of an [`InputEvent`].
///
/// Key events fill `vk_code`, `scan_code`, `key_code` and `char`, the typed character as a
/// string that is empty when there is none. Mouse events fill `x`, `y`, `dx`, `dy` and `button`
/// when a button is involved. Unknown events have a `type` only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InputPayload {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: SmolStr,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub modifiers: Option<ModifierPayload>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub repeats: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub button: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub x: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub y: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub dx: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub dy: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub vk_code: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub scan_code: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub key_code: Option<u32>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "char", default, skip_serializing_if = "Option::is_none")
    )]
    pub character: Option<String>,
}

/// A native `(message, wparam, lparam)` triple forwarded to `"message"` handlers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawMessage {
    pub message: u32,
    pub wparam: usize,
    pub lparam: isize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_contiguous() {
        let keys: Vec<_> = EventKind::ALL.into_iter().filter(|k| k.is_key()).collect();
        assert_eq!(keys, [EventKind::KeyDown, EventKind::KeyUp, EventKind::KeyChar]);
        let mouse: Vec<_> = EventKind::ALL.into_iter().filter(|k| k.is_mouse()).collect();
        assert_eq!(mouse.len(), 5);
        assert!(!EventKind::Unknown.is_key() && !EventKind::Unknown.is_mouse());
    }

    #[test]
    fn names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), kind);
        }
        assert_eq!(EventKind::from_name("dblclick"), EventKind::Unknown);
    }

    #[test]
    fn modifier_bits_do_not_cross_talk() {
        for bits in 0..=u8::MAX {
            let state = Modifiers::from_bits_truncate(bits as u16);
            for button in [0u8, 1, 5, 0xff] {
                let event = InputEvent::mouse(
                    EventKind::MouseUp,
                    state,
                    button,
                    MouseData::default(),
                    0,
                );
                assert_eq!(event.kind(), EventKind::MouseUp);
                assert_eq!(event.button(), button);
                assert_eq!(event.state(), state);
                assert_eq!(Modifiers::from(ModifierPayload::from(state)), state);
            }
        }
    }

    #[test]
    fn packed_layout() {
        let event = InputEvent::mouse(
            EventKind::MouseDown,
            Modifiers::CTRL | Modifiers::LBUTTON,
            1,
            MouseData { x: 10, y: 20, dx: 0, dy: 0 },
            0,
        );
        assert_eq!(event.packed(), 0x0009_0106);
    }

    #[test]
    fn mismatched_constructor_is_unknown() {
        let event = InputEvent::key(EventKind::MouseMove, Modifiers::SHIFT, KeyData::default(), 1);
        assert_eq!(event, InputEvent::unknown());
        assert_eq!(event.kind(), EventKind::Unknown);
        assert_eq!(*event.data(), EventData::None);
    }

    #[test]
    fn key_payload_shape() {
        let event = InputEvent::key(
            EventKind::KeyChar,
            Modifiers::SHIFT,
            KeyData { vk_code: 0x41, scan_code: 0x1e0001, key_code: 0x41, char_code: 0x41 },
            1,
        );
        let payload = event.to_payload();
        assert_eq!(payload.kind, "char");
        assert!(payload.modifiers.unwrap().shift);
        assert_eq!(payload.character.as_deref(), Some("A"));
        assert_eq!(payload.button, None);
        assert_eq!(payload.x, None);
        assert_eq!(InputEvent::from_payload(&payload), event);
    }

    #[test]
    fn character_travels_as_text() {
        let data = KeyData { vk_code: 0x70, scan_code: 0x3b, key_code: 0x70, char_code: 0 };
        let event = InputEvent::key(EventKind::KeyDown, Modifiers::empty(), data, 1);
        let payload = event.to_payload();
        assert_eq!(payload.character.as_deref(), Some(""));
        assert_eq!(InputEvent::from_payload(&payload), event);

        let payload = InputPayload {
            kind: "char".into(),
            character: Some("\u{e9}x".into()),
            ..Default::default()
        };
        assert_eq!(InputEvent::from_payload(&payload).key_data().unwrap().char_code, 0xe9);
    }

    #[test]
    fn unknown_payload_is_type_only() {
        let payload = InputEvent::unknown().to_payload();
        assert_eq!(payload, InputPayload { kind: "unknown".into(), ..Default::default() });
    }

    #[test]
    fn mouse_payload_omits_zero_button() {
        let event = InputEvent::mouse(
            EventKind::MouseMove,
            Modifiers::empty(),
            0,
            MouseData { x: 3, y: 4, dx: 0, dy: 0 },
            0,
        );
        let payload = event.to_payload();
        assert_eq!(payload.button, None);
        assert_eq!((payload.x, payload.y), (Some(3), Some(4)));
        assert_eq!(payload.vk_code, None);
    }

    #[test]
    fn payload_button_is_masked() {
        let payload = InputPayload {
            kind: "mousedown".into(),
            button: Some(0x1_02),
            ..Default::default()
        };
        assert_eq!(InputEvent::from_payload(&payload).button(), 2);

        let payload = InputPayload { kind: "resize".into(), ..Default::default() };
        assert_eq!(InputEvent::from_payload(&payload).kind(), EventKind::Unknown);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn payload_json_shape() {
        let event = InputEvent::mouse(
            EventKind::MouseWheel,
            Modifiers::ALT,
            0,
            MouseData { x: 1, y: 2, dx: 0, dy: -120 },
            0,
        );
        let json = serde_json::to_value(event.to_payload()).unwrap();
        assert_eq!(json["type"], "mousewheel");
        assert_eq!(json["modifiers"]["alt"], true);
        assert_eq!(json["dy"], -120);
        assert!(json.get("button").is_none());
        assert!(json.get("char").is_none());

        let data = KeyData { vk_code: 0x41, scan_code: 0x1e, key_code: 0x41, char_code: 0x61 };
        let key = InputEvent::key(EventKind::KeyChar, Modifiers::empty(), data, 1);
        let json = serde_json::to_value(key.to_payload()).unwrap();
        assert_eq!(json["char"], "a");

        let json = serde_json::to_value(InputEvent::unknown().to_payload()).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "unknown" }));
    }
}
