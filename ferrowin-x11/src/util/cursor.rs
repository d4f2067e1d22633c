use std::ffi::{c_char, c_uint, CString};
use std::mem::MaybeUninit;

use cursor_icon::CursorIcon;
use tracing::warn;
use x11_dl::xlib;

use crate::xdisplay::XConnection;

// Glyphs of the core cursor font, see X11/cursorfont.h.
const XC_CROSSHAIR: c_uint = 34;
const XC_FLEUR: c_uint = 52;
const XC_HAND2: c_uint = 60;
const XC_LEFT_PTR: c_uint = 68;
const XC_WATCH: c_uint = 150;
const XC_XTERM: c_uint = 152;

/// Core font glyph used when no cursor theme is available.
pub fn font_glyph(icon: CursorIcon) -> c_uint {
    match icon {
        CursorIcon::Text | CursorIcon::VerticalText => XC_XTERM,
        CursorIcon::Pointer => XC_HAND2,
        CursorIcon::Crosshair | CursorIcon::Cell => XC_CROSSHAIR,
        CursorIcon::Move | CursorIcon::AllScroll | CursorIcon::Grabbing => XC_FLEUR,
        CursorIcon::Wait | CursorIcon::Progress => XC_WATCH,
        _ => XC_LEFT_PTR,
    }
}

impl XConnection {
    /// Load a cursor image, or the invisible cursor for `None`.
    pub fn load_cursor(&self, cursor: Option<CursorIcon>) -> xlib::Cursor {
        let Some(icon) = cursor else {
            return self.create_empty_cursor();
        };

        if let Some(xcursor) = &self.xcursor {
            if let Ok(name) = CString::new(icon.name()) {
                let cursor = unsafe {
                    (xcursor.XcursorLibraryLoadCursor)(self.display, name.as_ptr() as *const c_char)
                };
                if cursor != 0 {
                    return cursor;
                }
            }
        }

        unsafe { (self.xlib.XCreateFontCursor)(self.display, font_glyph(icon)) }
    }

    fn create_empty_cursor(&self) -> xlib::Cursor {
        let data = 0;
        let pixmap =
            unsafe { (self.xlib.XCreateBitmapFromData)(self.display, self.root, &data, 1, 1) };

        if pixmap == 0 {
            warn!("failed to allocate pixmap for the hidden cursor");
            return 0;
        }

        unsafe {
            // The color only fills bytes in the pixmap which are not 0 in the mask.
            let mut dummy_color = MaybeUninit::uninit();
            let cursor = (self.xlib.XCreatePixmapCursor)(
                self.display,
                pixmap,
                pixmap,
                dummy_color.as_mut_ptr(),
                dummy_color.as_mut_ptr(),
                0,
                0,
            );
            (self.xlib.XFreePixmap)(self.display, pixmap);

            cursor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_cursors_have_font_fallbacks() {
        assert_eq!(font_glyph(CursorIcon::Default), XC_LEFT_PTR);
        assert_eq!(font_glyph(CursorIcon::Text), XC_XTERM);
        assert_eq!(font_glyph(CursorIcon::Pointer), XC_HAND2);
        assert_eq!(font_glyph(CursorIcon::Crosshair), XC_CROSSHAIR);
        assert_eq!(font_glyph(CursorIcon::Move), XC_FLEUR);
        assert_eq!(font_glyph(CursorIcon::Wait), XC_WATCH);
    }
}
