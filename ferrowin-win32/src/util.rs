use std::ffi::{OsStr, OsString};
use std::iter::once;
use std::os::windows::prelude::{OsStrExt, OsStringExt};
use std::{io, mem};

use cursor_icon::CursorIcon;
use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::event::Modifiers;
use ferrowin_core::window::{Rect, WindowStyle};
use windows_sys::Win32::Foundation::{BOOL, HMODULE, HWND, POINT, RECT};
use windows_sys::Win32::Graphics::Gdi::ClientToScreen;
use windows_sys::Win32::System::SystemServices::IMAGE_DOS_HEADER;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, VIRTUAL_KEY, VK_CONTROL, VK_LBUTTON, VK_MBUTTON, VK_MENU, VK_RBUTTON,
    VK_SHIFT, VK_XBUTTON1, VK_XBUTTON2,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetClientRect, GetWindowRect, IDC_APPSTARTING, IDC_ARROW, IDC_CROSS, IDC_HAND, IDC_HELP,
    IDC_IBEAM, IDC_NO, IDC_SIZEALL, IDC_SIZENESW, IDC_SIZENS, IDC_SIZENWSE, IDC_SIZEWE, IDC_WAIT,
    WINDOW_EX_STYLE, WINDOW_STYLE, WS_CAPTION, WS_CLIPCHILDREN, WS_EX_APPWINDOW,
    WS_MAXIMIZEBOX, WS_MINIMIZEBOX, WS_OVERLAPPEDWINDOW, WS_POPUP, WS_SYSMENU, WS_THICKFRAME,
};
use windows_sys::core::PCWSTR;

pub fn encode_wide(string: impl AsRef<OsStr>) -> Vec<u16> {
    string.as_ref().encode_wide().chain(once(0)).collect()
}

pub fn decode_wide(mut wide_c_string: &[u16]) -> OsString {
    if let Some(null_pos) = wide_c_string.iter().position(|c| *c == 0) {
        wide_c_string = &wide_c_string[..null_pos];
    }

    OsString::from_wide(wide_c_string)
}

pub(crate) fn win_to_err(result: BOOL) -> Result<(), io::Error> {
    if result != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

pub(crate) const fn loword(x: u32) -> u16 {
    (x & 0xffff) as u16
}

pub fn get_instance_handle() -> HMODULE {
    // Gets the instance handle by taking the address of the
    // pseudo-variable created by the microsoft linker:
    // https://devblogs.microsoft.com/oldnewthing/20041025-00/?p=37483

    // This is preferred over GetModuleHandle(NULL) because it also works in DLLs:
    // https://stackoverflow.com/questions/21718027/getmodulehandlenull-vs-hinstance

    extern "C" {
        static __ImageBase: IMAGE_DOS_HEADER;
    }

    unsafe { &__ImageBase as *const _ as _ }
}

pub(crate) fn to_windows_cursor(cursor: CursorIcon) -> PCWSTR {
    match cursor {
        CursorIcon::Default => IDC_ARROW,
        CursorIcon::Pointer => IDC_HAND,
        CursorIcon::Crosshair => IDC_CROSS,
        CursorIcon::Text | CursorIcon::VerticalText => IDC_IBEAM,
        CursorIcon::NotAllowed | CursorIcon::NoDrop => IDC_NO,
        CursorIcon::Grab | CursorIcon::Grabbing | CursorIcon::Move | CursorIcon::AllScroll => {
            IDC_SIZEALL
        },
        CursorIcon::EResize
        | CursorIcon::WResize
        | CursorIcon::EwResize
        | CursorIcon::ColResize => IDC_SIZEWE,
        CursorIcon::NResize
        | CursorIcon::SResize
        | CursorIcon::NsResize
        | CursorIcon::RowResize => IDC_SIZENS,
        CursorIcon::NeResize | CursorIcon::SwResize | CursorIcon::NeswResize => IDC_SIZENESW,
        CursorIcon::NwResize | CursorIcon::SeResize | CursorIcon::NwseResize => IDC_SIZENWSE,
        CursorIcon::Wait => IDC_WAIT,
        CursorIcon::Progress => IDC_APPSTARTING,
        CursorIcon::Help => IDC_HELP,
        _ => IDC_ARROW, // use arrow for the missing cases.
    }
}

fn key_down(key: VIRTUAL_KEY) -> bool {
    (unsafe { GetAsyncKeyState(key as i32) } as u16) & 0x8000 != 0
}

/// Keyboard and button state at the time of the call.
pub(crate) fn key_state() -> Modifiers {
    let mut state = Modifiers::empty();
    state.set(Modifiers::CTRL, key_down(VK_CONTROL));
    state.set(Modifiers::ALT, key_down(VK_MENU));
    state.set(Modifiers::SHIFT, key_down(VK_SHIFT));
    state.set(Modifiers::LBUTTON, key_down(VK_LBUTTON));
    state.set(Modifiers::MBUTTON, key_down(VK_MBUTTON));
    state.set(Modifiers::RBUTTON, key_down(VK_RBUTTON));
    state.set(Modifiers::XBUTTON1, key_down(VK_XBUTTON1));
    state.set(Modifiers::XBUTTON2, key_down(VK_XBUTTON2));
    state
}

/// Screen position of the client area origin.
pub(crate) fn client_origin(hwnd: HWND) -> PhysicalPosition<i32> {
    let mut point = POINT { x: 0, y: 0 };
    unsafe { ClientToScreen(hwnd, &mut point) };
    PhysicalPosition::new(point.x, point.y)
}

pub(crate) fn window_rect(hwnd: HWND) -> Result<Rect, io::Error> {
    let mut rect: RECT = unsafe { mem::zeroed() };
    win_to_err(unsafe { GetWindowRect(hwnd, &mut rect) })?;
    Ok(from_rect(&rect))
}

pub(crate) fn client_size(hwnd: HWND) -> Result<PhysicalSize<u32>, io::Error> {
    let mut rect: RECT = unsafe { mem::zeroed() };
    win_to_err(unsafe { GetClientRect(hwnd, &mut rect) })?;
    Ok(from_rect(&rect).size)
}

pub(crate) fn from_rect(rect: &RECT) -> Rect {
    let width = rect.right.saturating_sub(rect.left).max(0) as u32;
    let height = rect.bottom.saturating_sub(rect.top).max(0) as u32;
    Rect::new(rect.left, rect.top, width, height)
}

pub(crate) fn to_rect(rect: &Rect) -> RECT {
    RECT { left: rect.left(), top: rect.top(), right: rect.right(), bottom: rect.bottom() }
}

/// Native window styles for a window style.
///
/// Without any decoration flag the window is a bare popup. An application window always
/// carries the full overlapped frame.
pub(crate) fn window_styles(style: WindowStyle) -> (WINDOW_STYLE, WINDOW_EX_STYLE) {
    let mut native = WS_CLIPCHILDREN;
    let decorations = WindowStyle::TITLEBAR | WindowStyle::RESIZE | WindowStyle::CLOSE;
    if !style.intersects(decorations) {
        native |= WS_POPUP;
    } else {
        if style.contains(WindowStyle::TITLEBAR) {
            native |= WS_CAPTION | WS_MINIMIZEBOX;
        }
        if style.contains(WindowStyle::RESIZE) {
            native |= WS_THICKFRAME | WS_MAXIMIZEBOX;
        }
        if style.contains(WindowStyle::CLOSE) {
            native |= WS_SYSMENU;
        }
    }

    let mut ex_style = 0;
    if style.contains(WindowStyle::APPWINDOW) {
        native |= WS_OVERLAPPEDWINDOW;
        ex_style |= WS_EX_APPWINDOW;
    }
    (native, ex_style)
}

/// Styles of a borderless window covering a display.
pub(crate) fn fullscreen_styles(style: WindowStyle) -> (WINDOW_STYLE, WINDOW_EX_STYLE) {
    let (_, ex_style) = window_styles(style);
    (WS_CLIPCHILDREN | WS_POPUP, ex_style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_strings_round_trip() {
        let wide = encode_wide("splash.bmp");
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(decode_wide(&wide), "splash.bmp");
    }

    #[test]
    fn styles_follow_decoration_flags() {
        let (native, _) = window_styles(WindowStyle::empty());
        assert_eq!(native, WS_CLIPCHILDREN | WS_POPUP);

        let (native, ex_style) = window_styles(WindowStyle::TITLEBAR | WindowStyle::CLOSE);
        assert_eq!(native, WS_CLIPCHILDREN | WS_CAPTION | WS_MINIMIZEBOX | WS_SYSMENU);
        assert_eq!(ex_style, 0);

        let (native, ex_style) = window_styles(WindowStyle::default());
        assert_eq!(native & WS_OVERLAPPEDWINDOW, WS_OVERLAPPEDWINDOW);
        assert_eq!(ex_style, WS_EX_APPWINDOW);

        let (native, _) = fullscreen_styles(WindowStyle::default());
        assert_eq!(native & WS_CAPTION, 0);
    }

    #[test]
    fn rect_conversion() {
        let rect = Rect::new(-10, 20, 300, 200);
        assert_eq!(from_rect(&to_rect(&rect)), rect);
        let inverted = RECT { left: 10, top: 10, right: 0, bottom: 0 };
        assert_eq!(from_rect(&inverted).size, PhysicalSize::new(0, 0));
    }
}
