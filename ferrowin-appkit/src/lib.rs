//! # AppKit
//!
//! The AppKit backend runs on the process main thread only, so it is driven with
//! `PlatformContext::run_on_current_thread`. Rectangles are in points, with the origin at the
//! top-left corner of the screen holding the menu bar.
//!
//! AppKit cannot change video modes; a fullscreen window covers its screen at the current mode.
//! The icon given to a window becomes the application icon.
#![cfg(target_vendor = "apple")]

use std::path::Path;
use std::time::Duration;

use cursor_icon::CursorIcon;
use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::backend::{Backend, NativeWindow, Notification};
use ferrowin_core::codec::{self, KeyCache};
use ferrowin_core::error::RequestError;
use ferrowin_core::event::EventKind;
use ferrowin_core::monitor::VideoMode;
use ferrowin_core::window::{Rect, WindowAttributes, WindowStyle};

pub use crate::app::{AppKitBackend, AppKitWaker};
pub use crate::event::{MacEvent, MacEventKind};

mod app;
mod cursor;
mod event;
mod ffi;
mod monitor;
mod observer;
mod window;
mod window_delegate;

fn notification(event: &MacEvent) -> Notification {
    match &event.kind {
        MacEventKind::Input(record) => {
            let input = codec::appkit::decode(record);
            if input.kind() == EventKind::Unknown {
                Notification::Ignored
            } else {
                Notification::Input(input)
            }
        },
        MacEventKind::Resized(size) => Notification::Resized(*size),
        MacEventKind::Moved(position) => Notification::Moved(*position),
        MacEventKind::CloseRequested => Notification::CloseRequested,
        MacEventKind::Closed => Notification::Destroyed,
        MacEventKind::ScreensChanged => Notification::DisplayChanged,
        MacEventKind::Other(_) => Notification::Ignored,
    }
}

impl Backend for AppKitBackend {
    type Event = MacEvent;
    type Handle = isize;
    type Waker = AppKitWaker;

    const MAIN_THREAD_ONLY: bool = true;

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
        event.window
    }

    fn decode_native_event(&self, event: &Self::Event, _keys: &mut KeyCache) -> Notification {
        notification(event)
    }

    fn set_cursor(&self, _handle: Self::Handle, cursor: Option<CursorIcon>) {
        self.apply_cursor(cursor);
    }

    fn switch_video_mode(
        &self,
        _handle: Self::Handle,
        mode: &VideoMode,
    ) -> Result<(), RequestError> {
        self.switch_mode(mode)
    }

    fn restore_video_mode(&self) {}

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
        self.content_size(handle)
    }

    /// AppKit keeps sending mouse events to the window a drag started in.
    fn set_capture(&self, _handle: Self::Handle, _capture: bool) {}

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

    fn load_icon(&self, _handle: Self::Handle, path: &Path) -> Result<(), RequestError> {
        self.set_icon(path)
    }

    fn use_as_splash_screen(&self, handle: Self::Handle, path: &Path) -> Result<(), RequestError> {
        self.splash(handle, path)
    }
}

#[cfg(test)]
mod tests {
    use ferrowin_core::codec::appkit::{AppKitEvent, KEY_DOWN, LEFT_MOUSE_DOWN};

    use super::*;

    fn input(record: AppKitEvent) -> MacEvent {
        MacEvent { window: Some(7), kind: MacEventKind::Input(record) }
    }

    #[test]
    fn window_events() {
        let size = PhysicalSize::new(4, 3);
        let resized = MacEvent { window: Some(7), kind: MacEventKind::Resized(size) };
        assert_eq!(notification(&resized), Notification::Resized(PhysicalSize::new(4, 3)));
        let closed = MacEvent { window: Some(7), kind: MacEventKind::Closed };
        assert_eq!(notification(&closed), Notification::Destroyed);
        let screens = MacEvent { window: None, kind: MacEventKind::ScreensChanged };
        assert_eq!(notification(&screens), Notification::DisplayChanged);
        let other = MacEvent { window: Some(7), kind: MacEventKind::Other(13) };
        assert_eq!(notification(&other), Notification::Ignored);
    }

    #[test]
    fn typed_text_is_a_second_record() {
        let press =
            AppKitEvent { event_type: KEY_DOWN, character: 'q' as u32, ..Default::default() };
        let text = AppKitEvent { text: true, ..press };
        let kinds: Vec<_> = [press, text]
            .into_iter()
            .map(|record| match notification(&input(record)) {
                Notification::Input(event) => event.kind(),
                other => panic!("expected input, got {other:?}"),
            })
            .collect();
        assert_eq!(kinds, [EventKind::KeyDown, EventKind::KeyChar]);
    }

    #[test]
    fn unknown_input_is_ignored() {
        let click =
            AppKitEvent { event_type: LEFT_MOUSE_DOWN, click_count: 1, ..Default::default() };
        assert!(matches!(notification(&input(click)), Notification::Input(_)));
        // NSEventTypeFlagsChanged
        let flags = AppKitEvent { event_type: 12, ..Default::default() };
        assert_eq!(notification(&input(flags)), Notification::Ignored);
    }
}
