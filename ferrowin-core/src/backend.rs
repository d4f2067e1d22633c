//! The interface every native platform implements.
//!
//! A [`Backend`] lives on the platform thread for its whole life and is only ever used from
//! there, so it takes `&self` everywhere and keeps its mutable state in cells. The one piece
//! that crosses threads is its [`BackendWaker`].

use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cursor_icon::CursorIcon;
use dpi::{PhysicalPosition, PhysicalSize};

use crate::codec::KeyCache;
use crate::error::{NotSupportedError, RequestError};
use crate::event::{InputEvent, RawMessage};
use crate::monitor::{DisplaySource, VideoMode};
use crate::window::{Rect, WindowAttributes, WindowStyle};

/// Interrupts a [`Backend::pump_events`] wait from another thread.
pub trait BackendWaker: Clone + Send + Sync + 'static {
    fn wake(&self);
}

/// A freshly created native window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeWindow<H> {
    pub handle: H,
    /// Outer rectangle in screen coordinates.
    pub rect: Rect,
    pub client_size: PhysicalSize<u32>,
}

/// What a native event means to the window it targets.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Input(InputEvent),
    Resized(PhysicalSize<u32>),
    Moved(PhysicalPosition<i32>),
    /// The user asked to close the window.
    CloseRequested,
    /// The native window is gone without a call to `destroy_native_window`.
    Destroyed,
    DroppedFiles(Vec<PathBuf>),
    /// The pointer (re-)entered the client area and the cursor must be applied.
    SetCursor,
    /// Display configuration changed.
    DisplayChanged,
    Ignored,
}

/// A native windowing system.
pub trait Backend: DisplaySource + 'static {
    /// Identity of a native window.
    type Handle: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    /// One native event as read from the system queue.
    type Event;
    type Waker: BackendWaker;

    /// The system requires the event pump on the process main thread.
    const MAIN_THREAD_ONLY: bool = false;

    fn waker(&self) -> Self::Waker;

    /// Create a window whose client area covers `rect`; a fullscreen window's frame covers it.
    /// The returned [`NativeWindow::rect`] is the outer rectangle. The window is shown unless
    /// the style says [`WindowStyle::HIDDEN`] or a splash screen is requested.
    fn create_native_window(
        &self,
        attributes: &WindowAttributes,
        rect: Rect,
        bpp: u16,
    ) -> Result<NativeWindow<Self::Handle>, RequestError>;

    fn destroy_native_window(&self, handle: Self::Handle);

    /// Wait up to `timeout` for native events and pass each to `handler`, which returns whether
    /// it consumed the event. Returns early when woken.
    fn pump_events(&self, timeout: Option<Duration>, handler: &mut dyn FnMut(&Self::Event) -> bool);

    /// The window an event targets.
    fn event_window(&self, event: &Self::Event) -> Option<Self::Handle>;

    fn decode_native_event(&self, event: &Self::Event, keys: &mut KeyCache) -> Notification;

    /// The event as a `(message, wparam, lparam)` triple, where the system has one.
    fn raw_message(&self, _event: &Self::Event) -> Option<RawMessage> {
        None
    }

    /// Apply a cursor image, or hide the cursor with `None`.
    fn set_cursor(&self, handle: Self::Handle, cursor: Option<CursorIcon>);

    fn switch_video_mode(&self, handle: Self::Handle, mode: &VideoMode) -> Result<(), RequestError>;

    fn restore_video_mode(&self);

    fn show(&self, handle: Self::Handle, visible: bool);

    fn set_focus(&self, handle: Self::Handle);

    fn set_rect(&self, handle: Self::Handle, rect: Rect);

    fn rect(&self, handle: Self::Handle) -> Rect;

    fn client_size(&self, handle: Self::Handle) -> PhysicalSize<u32>;

    /// Grab or release the pointer.
    fn set_capture(&self, handle: Self::Handle, capture: bool);

    /// Warp the pointer to client coordinates.
    fn set_cursor_position(&self, handle: Self::Handle, position: PhysicalPosition<i32>);

    /// Show or hide the decorations `style` asks for.
    fn show_frame(&self, handle: Self::Handle, style: WindowStyle, show: bool);

    fn set_topmost(&self, handle: Self::Handle, topmost: bool);

    /// Enter or leave the borderless fullscreen look and move the window to `rect`.
    fn set_fullscreen(
        &self,
        handle: Self::Handle,
        style: WindowStyle,
        fullscreen: bool,
        rect: Rect,
    );

    fn set_drag_accept_files(&self, _handle: Self::Handle, _accept: bool) {}

    fn load_icon(&self, _handle: Self::Handle, _path: &Path) -> Result<(), RequestError> {
        Err(NotSupportedError::new("window icons").into())
    }

    fn use_as_splash_screen(
        &self,
        _handle: Self::Handle,
        _path: &Path,
    ) -> Result<(), RequestError> {
        Err(NotSupportedError::new("splash screens").into())
    }
}
