//! # Win32
//!
//! The Win32 backend creates its windows on the thread that called [`Win32Backend::new`] and
//! pumps that thread's message queue. Native double-click messages are reported as clicks.
//! Windows can accept dropped files, carry an `.ico` icon and show a `.bmp` splash screen.
#![cfg(target_os = "windows")]

use std::path::Path;
use std::time::Duration;

use cursor_icon::CursorIcon;
use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::backend::{Backend, NativeWindow, Notification};
use ferrowin_core::codec::{self, KeyCache};
use ferrowin_core::error::RequestError;
use ferrowin_core::event::{EventKind, RawMessage};
use ferrowin_core::monitor::VideoMode;
use ferrowin_core::window::{Rect, WindowAttributes, WindowStyle};
use tracing::warn;
use windows_sys::Win32::UI::WindowsAndMessaging::{
    HTCLIENT, SIZE_MINIMIZED, WM_CLOSE, WM_DESTROY, WM_DISPLAYCHANGE, WM_DROPFILES, WM_MOVE,
    WM_SETCURSOR, WM_SIZE,
};

pub use crate::event_loop::{EventDetail, Hwnd, Win32Backend, Win32Event, Win32Waker};
pub use crate::splash::BadBitmap;

mod event_loop;
mod handler;
mod icon;
mod monitor;
mod splash;
mod util;
mod window;

/// What a window message means to the window core.
fn notification(event: &Win32Event) -> Notification {
    let lparam = event.lparam as u32;
    match event.message {
        WM_SIZE if event.wparam == SIZE_MINIMIZED as usize => Notification::Ignored,
        WM_SIZE => Notification::Resized(PhysicalSize::new(
            util::loword(lparam) as u32,
            (lparam >> 16) as u16 as u32,
        )),
        WM_MOVE => match event.detail {
            EventDetail::Position(position) => Notification::Moved(position),
            _ => Notification::Ignored,
        },
        WM_CLOSE => Notification::CloseRequested,
        WM_DESTROY => Notification::Destroyed,
        WM_DROPFILES => match &event.detail {
            EventDetail::Files(files) => Notification::DroppedFiles(files.clone()),
            _ => Notification::Ignored,
        },
        WM_SETCURSOR if util::loword(lparam) == HTCLIENT as u16 => Notification::SetCursor,
        WM_DISPLAYCHANGE => Notification::DisplayChanged,
        _ => {
            let input = codec::win32::decode(&event.as_message());
            if input.kind() == EventKind::Unknown {
                Notification::Ignored
            } else {
                Notification::Input(input)
            }
        },
    }
}

impl Backend for Win32Backend {
    type Event = Win32Event;
    type Handle = Hwnd;
    type Waker = Win32Waker;

    fn waker(&self) -> Self::Waker {
        self.new_waker()
    }

    fn create_native_window(
        &self,
        attributes: &WindowAttributes,
        rect: Rect,
        bpp: u16,
    ) -> Result<NativeWindow<Self::Handle>, RequestError> {
        self.create_window(attributes, rect, bpp)
    }

    fn destroy_native_window(&self, handle: Self::Handle) {
        self.destroy_window(handle);
    }

    fn pump_events(
        &self,
        timeout: Option<Duration>,
        handler: &mut dyn FnMut(&Self::Event) -> bool,
    ) {
        self.pump(timeout, handler);
    }

    fn event_window(&self, event: &Self::Event) -> Option<Self::Handle> {
        (event.hwnd != Hwnd::default()).then_some(event.hwnd)
    }

    fn decode_native_event(&self, event: &Self::Event, _keys: &mut KeyCache) -> Notification {
        notification(event)
    }

    fn raw_message(&self, event: &Self::Event) -> Option<RawMessage> {
        Some(RawMessage { message: event.message, wparam: event.wparam, lparam: event.lparam })
    }

    fn set_cursor(&self, _handle: Self::Handle, cursor: Option<CursorIcon>) {
        self.apply_cursor(cursor);
    }

    fn switch_video_mode(
        &self,
        handle: Self::Handle,
        mode: &VideoMode,
    ) -> Result<(), RequestError> {
        self.switch_mode(handle, mode)
    }

    fn restore_video_mode(&self) {
        self.restore_mode();
    }

    fn show(&self, handle: Self::Handle, visible: bool) {
        self.set_visible(handle, visible);
    }

    fn set_focus(&self, handle: Self::Handle) {
        self.focus(handle);
    }

    fn set_rect(&self, handle: Self::Handle, rect: Rect) {
        self.move_resize(handle, rect);
    }

    fn rect(&self, handle: Self::Handle) -> Rect {
        util::window_rect(handle.hwnd()).unwrap_or_else(|err| {
            warn!(?handle, %err, "GetWindowRect failed");
            Rect::default()
        })
    }

    fn client_size(&self, handle: Self::Handle) -> PhysicalSize<u32> {
        util::client_size(handle.hwnd()).unwrap_or_else(|err| {
            warn!(?handle, %err, "GetClientRect failed");
            PhysicalSize::default()
        })
    }

    fn set_capture(&self, handle: Self::Handle, capture: bool) {
        self.capture(handle, capture);
    }

    fn set_cursor_position(&self, handle: Self::Handle, position: PhysicalPosition<i32>) {
        self.warp_cursor(handle, position);
    }

    fn show_frame(&self, handle: Self::Handle, style: WindowStyle, show: bool) {
        self.frame(handle, style, show);
    }

    fn set_topmost(&self, handle: Self::Handle, topmost: bool) {
        self.topmost(handle, topmost);
    }

    fn set_fullscreen(
        &self,
        handle: Self::Handle,
        style: WindowStyle,
        fullscreen: bool,
        rect: Rect,
    ) {
        self.fullscreen(handle, style, fullscreen, rect);
    }

    fn set_drag_accept_files(&self, handle: Self::Handle, accept: bool) {
        self.accept_files(handle, accept);
    }

    fn load_icon(&self, handle: Self::Handle, path: &Path) -> Result<(), RequestError> {
        self.set_icon(handle, path)
    }

    fn use_as_splash_screen(&self, handle: Self::Handle, path: &Path) -> Result<(), RequestError> {
        self.splash(handle, path)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ferrowin_core::codec::win32::{make_lparam, WM_LBUTTONDBLCLK};
    use windows_sys::Win32::UI::WindowsAndMessaging::WM_PAINT;

    use super::*;

    fn event(message: u32, wparam: usize, lparam: isize) -> Win32Event {
        Win32Event::new(Hwnd(1), message, wparam, lparam)
    }

    #[test]
    fn window_messages() {
        let resized = notification(&event(WM_SIZE, 0, make_lparam(640, 480)));
        assert_eq!(resized, Notification::Resized(PhysicalSize::new(640, 480)));
        let minimized = event(WM_SIZE, SIZE_MINIMIZED as usize, 0);
        assert_eq!(notification(&minimized), Notification::Ignored);

        let mut moved = event(WM_MOVE, 0, 0);
        moved.detail = EventDetail::Position(PhysicalPosition::new(-8, 30));
        assert_eq!(notification(&moved), Notification::Moved(PhysicalPosition::new(-8, 30)));

        assert_eq!(notification(&event(WM_CLOSE, 0, 0)), Notification::CloseRequested);
        assert_eq!(notification(&event(WM_DESTROY, 0, 0)), Notification::Destroyed);
        assert_eq!(notification(&event(WM_DISPLAYCHANGE, 32, 0)), Notification::DisplayChanged);
    }

    #[test]
    fn cursor_only_in_client_area() {
        let client = event(WM_SETCURSOR, 0, HTCLIENT as isize);
        assert_eq!(notification(&client), Notification::SetCursor);
        // HTCAPTION
        let caption = event(WM_SETCURSOR, 0, 2);
        assert_eq!(notification(&caption), Notification::Ignored);
    }

    #[test]
    fn dropped_files() {
        let mut dropped = event(WM_DROPFILES, 0, 0);
        let files = vec![PathBuf::from(r"C:\a.txt"), PathBuf::from(r"C:\b.txt")];
        dropped.detail = EventDetail::Files(files.clone());
        assert_eq!(notification(&dropped), Notification::DroppedFiles(files));
    }

    #[test]
    fn input_and_other_messages() {
        let click = notification(&event(WM_LBUTTONDBLCLK, 0x0001, make_lparam(3, 4)));
        let Notification::Input(input) = click else {
            panic!("expected input, got {click:?}");
        };
        assert_eq!(input.kind(), EventKind::MouseClick);
        assert_eq!(input.repeats(), 2);

        assert_eq!(notification(&event(WM_PAINT, 0, 0)), Notification::Ignored);
    }
}
