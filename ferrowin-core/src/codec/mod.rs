//! Translation of native input records into [`InputEvent`]s.
//!
//! Each backend turns its native event into one of the plain records defined here (a Win32
//! message, an X11 input record, an AppKit event record) and hands it to the matching
//! `decode` function. The decoders are pure apart from the per-window [`KeyCache`], which only
//! changes on key presses.
//!
//! [`InputEvent`]: crate::event::InputEvent

pub mod appkit;
pub mod win32;
pub mod x11;

/// Key and character resolved by the last key press of one window.
///
/// X11 does not re-run composition on key release, so the release reports what the matching
/// press resolved to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyCache {
    key_code: u32,
    char_code: u32,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a key press.
    pub fn remember(&mut self, key_code: u32, char_code: u32) {
        self.key_code = key_code;
        self.char_code = char_code;
    }

    /// `(key_code, char_code)` of the last key press, zero before any.
    pub fn last_pressed(&self) -> (u32, u32) {
        (self.key_code, self.char_code)
    }
}

/// Wheel delta reported for one notch.
pub const WHEEL_DELTA: i32 = 120;
