use std::ffi::{c_char, c_int};
use std::ptr;

use x11_dl::xlib;

use crate::xdisplay::XConnection;

const TEXT_BUFFER_SIZE: usize = 64;

/// Result of running a key press through the input context.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyLookup {
    pub keysym: u32,
    pub text: String,
}

impl KeyLookup {
    /// Code point of the first character produced, 0 when the press produced no text.
    pub fn character(&self) -> u32 {
        self.text.chars().next().map_or(0, u32::from)
    }
}

impl XConnection {
    fn lookup_utf8_inner(
        &self,
        ic: xlib::XIC,
        key_event: &mut xlib::XKeyEvent,
        buffer: &mut [u8],
    ) -> (xlib::KeySym, xlib::Status, c_int) {
        let mut keysym: xlib::KeySym = 0;
        let mut status: xlib::Status = 0;
        let count = unsafe {
            (self.xlib.Xutf8LookupString)(
                ic,
                key_event,
                buffer.as_mut_ptr() as *mut c_char,
                buffer.len() as c_int,
                &mut keysym,
                &mut status,
            )
        };
        (keysym, status, count)
    }

    /// Resolve a key press to a keysym and the text it composes.
    ///
    /// Without an input context the core `XLookupString` is used, which knows no
    /// composition.
    pub fn lookup_key(&self, ic: xlib::XIC, key_event: &mut xlib::XKeyEvent) -> KeyLookup {
        let mut buffer = [0u8; TEXT_BUFFER_SIZE];

        if ic.is_null() {
            let mut keysym: xlib::KeySym = 0;
            let count = unsafe {
                (self.xlib.XLookupString)(
                    key_event,
                    buffer.as_mut_ptr() as *mut c_char,
                    buffer.len() as c_int,
                    &mut keysym,
                    ptr::null_mut(),
                )
            };
            let len = count.clamp(0, buffer.len() as c_int) as usize;
            // Latin-1 without a locale aware input method.
            let text = buffer[..len].iter().map(|&byte| char::from(byte)).collect();
            return KeyLookup { keysym: keysym as u32, text };
        }

        let (keysym, status, count) = self.lookup_utf8_inner(ic, key_event, &mut buffer);
        let text = if status == xlib::XBufferOverflow {
            // If the buffer overflows, make a new one on the heap.
            let mut heap = vec![0u8; count.max(0) as usize];
            let (_, _, count) = self.lookup_utf8_inner(ic, key_event, &mut heap);
            heap.truncate(count.max(0) as usize);
            String::from_utf8(heap).unwrap_or_default()
        } else {
            let len = count.clamp(0, buffer.len() as c_int) as usize;
            String::from_utf8_lossy(&buffer[..len]).into_owned()
        };

        KeyLookup { keysym: keysym as u32, text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_character_of_composed_text() {
        let lookup = KeyLookup { keysym: 0xe9, text: "é".into() };
        assert_eq!(lookup.character(), 0xe9);
        assert_eq!(KeyLookup { keysym: 0xffe1, text: String::new() }.character(), 0);
    }
}
