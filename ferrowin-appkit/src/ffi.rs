#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals)]

use objc2_foundation::NSPoint;

pub type CGError = i32;
pub type boolean_t = u32;

pub const kCGErrorSuccess: CGError = 0;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    /// Moves the pointer to a point in global display coordinates, top-left origin.
    pub fn CGWarpMouseCursorPosition(new_cursor_position: NSPoint) -> CGError;

    /// Warping freezes pointer movement for a moment unless mouse and cursor are reassociated.
    pub fn CGAssociateMouseAndMouseCursorPosition(connected: boolean_t) -> CGError;
}
