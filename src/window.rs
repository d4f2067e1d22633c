//! The consumer-side window handle.
//!
//! A [`Window`] never touches the native window. Creation is a rendezvous with the platform
//! thread, every other operation is queued to it, and the accessors read values the platform
//! thread caches after each change.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::backend::{Backend, NativeWindow};
use ferrowin_core::cursor::StockCursor;
use ferrowin_core::error::RequestError;
use ferrowin_core::event::{InputEvent, RawMessage};
use ferrowin_core::monitor::VideoMode;
use ferrowin_core::window::{CreationOptions, Rect, WindowAttributes, WindowId, WindowStyle};
#[cfg(feature = "serde")]
use serde::Serialize;
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::context::{Command, ContextProxy};
use crate::emitter::{CallbackResult, EventEmitter};
use crate::sink::{EventSink, SinkChain, SinkRegistration};
use crate::window_state::WindowState;

/// What host callbacks receive.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum WindowEvent {
    /// New client area size, delivered as `{width, height}`.
    Resized(PhysicalSize<u32>),
    CloseRequested,
    Input(InputEvent),
    Message(RawMessage),
    DroppedFiles(Vec<PathBuf>),
}

impl WindowEvent {
    pub const RESIZE: &'static str = "resize";
    pub const CLOSE: &'static str = "close";
    pub const MESSAGE: &'static str = "message";
    pub const DRAG_ACCEPT_FILES: &'static str = "drag_accept_files";

    /// The callback name this event is delivered to.
    pub fn name(&self) -> &'static str {
        match self {
            WindowEvent::Resized(_) => Self::RESIZE,
            WindowEvent::CloseRequested => Self::CLOSE,
            WindowEvent::Input(input) => input.kind().name(),
            WindowEvent::Message(_) => Self::MESSAGE,
            WindowEvent::DroppedFiles(_) => Self::DRAG_ACCEPT_FILES,
        }
    }
}

/// Where a window is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Lifecycle {
    Uninitialized,
    Creating,
    Live,
    Destroying,
    Destroyed,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Uninitialized,
            1 => Lifecycle::Creating,
            2 => Lifecycle::Live,
            3 => Lifecycle::Destroying,
            _ => Lifecycle::Destroyed,
        }
    }
}

#[derive(Debug)]
struct Cache<H> {
    handle: Option<H>,
    rect: Rect,
    client_size: PhysicalSize<u32>,
    style: WindowStyle,
}

/// State both threads see. Written by the platform thread, read by everyone.
pub(crate) struct WindowShared<B: Backend> {
    pub id: WindowId,
    pub emitter: Arc<EventEmitter<WindowEvent>>,
    pub sinks: Arc<SinkChain<B::Event>>,
    lifecycle: AtomicU8,
    cache: Mutex<Cache<B::Handle>>,
}

impl<B: Backend> WindowShared<B> {
    fn new(style: WindowStyle) -> Self {
        Self {
            id: WindowId::next(),
            emitter: Arc::new(EventEmitter::new()),
            sinks: SinkChain::new(),
            lifecycle: AtomicU8::new(Lifecycle::Uninitialized as u8),
            cache: Mutex::new(Cache {
                handle: None,
                rect: Rect::default(),
                client_size: PhysicalSize::default(),
                style,
            }),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    fn set_lifecycle(&self, lifecycle: Lifecycle) {
        trace!(window = ?self.id, ?lifecycle, "lifecycle");
        self.lifecycle.store(lifecycle as u8, Ordering::Release);
    }

    pub fn set_live(&self, native: &NativeWindow<B::Handle>, style: WindowStyle) {
        {
            let mut cache = self.cache();
            cache.handle = Some(native.handle);
            cache.rect = native.rect;
            cache.client_size = native.client_size;
            cache.style = style;
        }
        self.set_lifecycle(Lifecycle::Live);
    }

    pub fn set_destroyed(&self) {
        self.cache().handle = None;
        self.sinks.clear();
        self.set_lifecycle(Lifecycle::Destroyed);
    }

    /// Record a new client size. Returns whether it changed.
    pub fn update_size(&self, size: PhysicalSize<u32>) -> bool {
        let mut cache = self.cache();
        if cache.client_size == size {
            return false;
        }
        cache.client_size = size;
        true
    }

    pub fn update_position(&self, position: PhysicalPosition<i32>) {
        self.cache().rect.position = position;
    }

    pub fn update_rect(&self, rect: Rect) {
        self.cache().rect = rect;
    }

    pub fn update_style(&self, style: WindowStyle) {
        self.cache().style = style;
    }

    fn cache(&self) -> MutexGuard<'_, Cache<B::Handle>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A native window owned by the platform thread.
///
/// Dropping the handle destroys the window.
pub struct Window<B: Backend> {
    shared: Arc<WindowShared<B>>,
    proxy: ContextProxy<B>,
}

impl<B: Backend> fmt::Debug for Window<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.shared.id)
            .field("lifecycle", &self.lifecycle())
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Window<B> {
    /// Create a window and block until the platform thread has created its native side.
    ///
    /// Fails with [`RequestError::Reentrant`] on the platform thread itself, and with
    /// [`RequestError::Terminated`] once the platform context is shut down.
    pub fn new(
        proxy: &ContextProxy<B>,
        attributes: WindowAttributes,
    ) -> Result<Self, RequestError> {
        attributes.validate()?;
        if proxy.is_platform_thread() {
            return Err(RequestError::Reentrant);
        }

        let shared = Arc::new(WindowShared::new(attributes.style));
        shared.set_lifecycle(Lifecycle::Creating);
        let (reply, created) = mpsc::sync_channel(1);
        let command = Command::Create { shared: shared.clone(), attributes, reply };
        let result = proxy.send(command).and_then(|()| match created.recv() {
            Ok(result) => result,
            Err(_) => Err(RequestError::Terminated),
        });

        match result {
            Ok(()) => {
                debug!(window = ?shared.id, "window created");
                Ok(Self { shared, proxy: proxy.clone() })
            },
            Err(err) => {
                shared.set_destroyed();
                Err(err)
            },
        }
    }

    /// Create a window from host options. See [`WindowAttributes::from_options`].
    pub fn from_options(
        proxy: &ContextProxy<B>,
        options: Option<&CreationOptions>,
    ) -> Result<Self, RequestError> {
        let attributes = WindowAttributes::from_options(options)?;
        Self::new(proxy, attributes)
    }

    pub fn id(&self) -> WindowId {
        self.shared.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lifecycle()
    }

    /// The native handle, or `None` once destroyed.
    pub fn native_handle(&self) -> Option<B::Handle> {
        self.shared.cache().handle
    }

    /// Size of the client area.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.shared.cache().client_size
    }

    /// Outer rectangle in screen coordinates.
    pub fn rect(&self) -> Rect {
        self.shared.cache().rect
    }

    pub fn style(&self) -> WindowStyle {
        self.shared.cache().style
    }

    /// Register the callback for `name`, replacing any previous one.
    ///
    /// Registering [`WindowEvent::DRAG_ACCEPT_FILES`] makes the window accept file drops.
    pub fn on<F>(&self, name: impl Into<SmolStr>, callback: F)
    where
        F: FnMut(&WindowEvent) -> CallbackResult + Send + 'static,
    {
        let name = name.into();
        let accept_files = name == WindowEvent::DRAG_ACCEPT_FILES;
        self.shared.emitter.on(name, Box::new(callback));
        if accept_files {
            self.with_state(|backend, state| state.set_drag_accept_files(backend, true));
        }
    }

    /// Remove the callback for `name`. Returns whether there was one.
    pub fn off(&self, name: &str) -> bool {
        let removed = self.shared.emitter.off(name);
        if removed && name == WindowEvent::DRAG_ACCEPT_FILES {
            self.with_state(|backend, state| state.set_drag_accept_files(backend, false));
        }
        removed
    }

    /// Add an observer of this window's native events.
    pub fn register_sink(&self, sink: Arc<dyn EventSink<B::Event>>) -> SinkRegistration<B::Event> {
        self.shared.sinks.register(sink)
    }

    pub fn show(&self, visible: bool) {
        self.with_state(move |backend, state| state.show(backend, visible));
    }

    pub fn set_focus(&self) {
        self.with_state(|backend, state| state.set_focus(backend));
    }

    pub fn toggle_fullscreen(&self) {
        self.with_state(|backend, state| state.toggle_fullscreen(backend));
    }

    /// Move and resize the window. The rectangle is the outer one, in screen coordinates.
    pub fn set_rect(&self, rect: Rect) {
        self.with_state(move |backend, state| state.set_rect(backend, rect));
    }

    /// Grab the pointer on `true`, release it on the matching `false`. Calls nest.
    pub fn capture_mouse(&self, capture: bool) {
        self.with_state(move |backend, state| state.capture_mouse(backend, capture));
    }

    pub fn set_stock_cursor(&self, cursor: StockCursor) {
        self.with_state(move |backend, state| state.set_stock_cursor(backend, cursor));
    }

    pub fn show_cursor(&self, visible: bool) {
        self.with_state(move |backend, state| state.show_cursor(backend, visible));
    }

    /// Warp the pointer, in client coordinates.
    pub fn set_cursor_position(&self, position: PhysicalPosition<i32>) {
        self.with_state(move |backend, state| state.set_cursor_position(backend, position));
    }

    pub fn show_frame(&self, show: bool) {
        self.with_state(move |backend, state| state.show_frame(backend, show));
    }

    pub fn set_topmost(&self, topmost: bool) {
        self.with_state(move |backend, state| state.set_topmost(backend, topmost));
    }

    /// Switch the display to the supported mode closest to `mode` and cover it.
    pub fn switch_to_fullscreen(&self, mode: VideoMode) {
        self.with_state(move |backend, state| {
            if let Err(err) = state.switch_to_fullscreen(backend, mode) {
                tracing::warn!("video mode switch refused: {err}");
            }
        });
    }

    pub fn load_icon(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.with_state(move |backend, state| state.load_icon(backend, &path));
    }

    pub fn use_as_splash_screen(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.with_state(move |backend, state| state.use_as_splash_screen(backend, &path));
    }

    /// Release the native window. Calling it again, or any operation afterwards, does nothing.
    ///
    /// The `"close"` callback is not fired.
    pub fn destroy(&self) {
        let destroying = self.shared.lifecycle.compare_exchange(
            Lifecycle::Live as u8,
            Lifecycle::Destroying as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if destroying.is_err() {
            return;
        }
        debug!(window = ?self.shared.id, "destroy requested");
        self.shared.cache().handle = None;
        let command = Command::Window {
            id: self.shared.id,
            op: Box::new(|backend, state| state.destroy(backend)),
        };
        if self.proxy.send(command).is_err() {
            self.shared.set_destroyed();
        }
    }

    fn with_state<F>(&self, op: F)
    where
        F: FnOnce(&B, &mut WindowState<B>) + Send + 'static,
    {
        if self.lifecycle() != Lifecycle::Live {
            return;
        }
        let command = Command::Window { id: self.shared.id, op: Box::new(op) };
        if self.proxy.send(command).is_err() {
            trace!(window = ?self.shared.id, "platform thread gone, operation dropped");
        }
    }
}

impl<B: Backend> Drop for Window<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use ferrowin_core::event::{EventKind, KeyData, Modifiers, MouseData};

    use super::*;

    #[test]
    fn event_names() {
        let key = InputEvent::key(EventKind::KeyChar, Modifiers::empty(), KeyData::default(), 1);
        let click = InputEvent::mouse(
            EventKind::MouseClick,
            Modifiers::LBUTTON,
            1,
            MouseData::default(),
            2,
        );
        assert_eq!(WindowEvent::Resized(PhysicalSize::new(1, 1)).name(), "resize");
        assert_eq!(WindowEvent::CloseRequested.name(), "close");
        assert_eq!(WindowEvent::Input(key).name(), "char");
        assert_eq!(WindowEvent::Input(click).name(), "mouseclick");
        assert_eq!(WindowEvent::Message(RawMessage::default()).name(), "message");
        assert_eq!(WindowEvent::DroppedFiles(Vec::new()).name(), "drag_accept_files");
    }

    #[test]
    fn lifecycle_round_trips_through_u8() {
        for lifecycle in [
            Lifecycle::Uninitialized,
            Lifecycle::Creating,
            Lifecycle::Live,
            Lifecycle::Destroying,
            Lifecycle::Destroyed,
        ] {
            assert_eq!(Lifecycle::from_u8(lifecycle as u8), lifecycle);
        }
    }
}
