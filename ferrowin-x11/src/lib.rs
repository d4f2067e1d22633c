//! # Xlib
//!
//! The X11 backend talks to the server through Xlib, loaded at runtime with `x11-dl`. Key
//! presses go through an input method when one is available, so composed characters are
//! reported. Displays and video modes come from RandR when the server has it.
//!
//! The connection is opened from the `DISPLAY` environment variable.
#![cfg(any(
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]

use std::path::Path;
use std::time::Duration;

use cursor_icon::CursorIcon;
use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::backend::{Backend, NativeWindow, Notification};
use ferrowin_core::codec::{self, KeyCache};
use ferrowin_core::error::{NotSupportedError, RequestError};
use ferrowin_core::monitor::VideoMode;
use ferrowin_core::window::{Rect, WindowAttributes, WindowStyle};
use x11_dl::xlib;

pub use crate::event_loop::{X11Backend, X11Event, X11EventKind, X11Waker};
pub use crate::xdisplay::{XConnection, XError, XNotSupported};

mod event_loop;
mod monitor;
mod util;
mod window;
mod xdisplay;

impl Backend for X11Backend {
    type Event = X11Event;
    type Handle = xlib::Window;
    type Waker = X11Waker;

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
        Some(event.window)
    }

    fn decode_native_event(&self, event: &Self::Event, keys: &mut KeyCache) -> Notification {
        match event.kind {
            X11EventKind::Input(input) => Notification::Input(codec::x11::decode(&input, keys)),
            X11EventKind::Resized(size) => Notification::Resized(size),
            X11EventKind::Moved(position) => Notification::Moved(position),
            X11EventKind::CloseRequested => Notification::CloseRequested,
            X11EventKind::Destroyed => Notification::Destroyed,
            X11EventKind::Entered => Notification::SetCursor,
            X11EventKind::ScreenChanged => Notification::DisplayChanged,
            X11EventKind::Other(_) => Notification::Ignored,
        }
    }

    fn set_cursor(&self, handle: Self::Handle, cursor: Option<CursorIcon>) {
        self.apply_cursor(handle, cursor);
    }

    fn switch_video_mode(
        &self,
        _handle: Self::Handle,
        mode: &VideoMode,
    ) -> Result<(), RequestError> {
        self.switch_mode(mode)
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
        self.window_rect(handle)
    }

    fn client_size(&self, handle: Self::Handle) -> PhysicalSize<u32> {
        self.window_size(handle)
    }

    fn set_capture(&self, handle: Self::Handle, capture: bool) {
        self.grab_pointer(handle, capture);
    }

    fn set_cursor_position(&self, handle: Self::Handle, position: PhysicalPosition<i32>) {
        self.warp_pointer(handle, position);
    }

    fn show_frame(&self, handle: Self::Handle, style: WindowStyle, show: bool) {
        self.decorate(handle, style, show);
    }

    fn set_topmost(&self, handle: Self::Handle, topmost: bool) {
        self.keep_above(handle, topmost);
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

    fn load_icon(&self, _handle: Self::Handle, _path: &Path) -> Result<(), RequestError> {
        Err(NotSupportedError::new("window icons on X11").into())
    }
}
