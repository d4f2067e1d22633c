//! The platform-thread half of a window.
//!
//! A [`WindowState`] owns the native handle and everything that must only be touched where
//! the native calls are made: mouse capture count, cursor, fullscreen bookkeeping and the
//! per-window key cache. It turns native events into host callbacks scheduled on the main loop.

use std::path::Path;
use std::sync::Arc;

use cursor_icon::CursorIcon;
use dpi::PhysicalPosition;
use ferrowin_core::backend::{Backend, NativeWindow, Notification};
use ferrowin_core::codec::KeyCache;
use ferrowin_core::cursor::{CursorState, StockCursor};
use ferrowin_core::error::RequestError;
use ferrowin_core::event::EventKind;
use ferrowin_core::monitor::{closest_mode, DisplaySource, VideoMode};
use ferrowin_core::window::{Rect, WindowStyle};
use tracing::{debug, trace, trace_span, warn};

use crate::dispatch::MainLoopProxy;
use crate::window::{WindowEvent, WindowShared};

/// Result of [`WindowState::process`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Processed {
    /// The native default handling must be skipped.
    pub handled: bool,
    pub display_changed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Fullscreen {
    saved_rect: Rect,
    /// The display mode was changed and must be restored.
    mode_forced: bool,
}

pub(crate) struct WindowState<B: Backend> {
    shared: Arc<WindowShared<B>>,
    handle: Option<B::Handle>,
    style: WindowStyle,
    capture_count: u32,
    cursor: CursorState,
    fullscreen: Option<Fullscreen>,
    keys: KeyCache,
    accepts_files: bool,
    main_loop: MainLoopProxy,
}

impl<B: Backend> WindowState<B> {
    pub fn new(
        shared: Arc<WindowShared<B>>,
        native: &NativeWindow<B::Handle>,
        style: WindowStyle,
        main_loop: MainLoopProxy,
    ) -> Self {
        shared.set_live(native, style);
        Self {
            shared,
            handle: Some(native.handle),
            style,
            capture_count: 0,
            cursor: CursorState::default(),
            fullscreen: None,
            keys: KeyCache::new(),
            accepts_files: false,
            main_loop,
        }
    }

    pub fn handle(&self) -> Option<B::Handle> {
        self.handle
    }

    pub fn is_destroyed(&self) -> bool {
        self.handle.is_none()
    }

    /// Handle one native event targeted at this window.
    pub fn process(&mut self, backend: &B, event: &B::Event) -> Processed {
        let mut processed = Processed::default();
        if self.handle.is_none() {
            return processed;
        }
        let _span = trace_span!("process", window = ?self.shared.id).entered();

        if self.shared.sinks.preprocess(event) {
            processed.handled = true;
            return processed;
        }

        let notification = backend.decode_native_event(event, &mut self.keys);
        trace!(?notification, "decoded");
        match notification {
            Notification::Input(input) if input.kind() != EventKind::Unknown => {
                match input.kind() {
                    EventKind::MouseDown => self.capture_mouse(backend, true),
                    EventKind::MouseUp => self.capture_mouse(backend, false),
                    _ => {},
                }
                self.shared.sinks.notify(|sink| sink.on_input(&input));
                self.schedule(WindowEvent::Input(input));
            },
            Notification::Input(_) | Notification::Ignored => {},
            Notification::Resized(size) => {
                if self.shared.update_size(size) {
                    self.shared.sinks.notify(|sink| sink.on_resize(size));
                    self.schedule(WindowEvent::Resized(size));
                }
            },
            Notification::Moved(position) => self.shared.update_position(position),
            Notification::CloseRequested => {
                debug!(window = ?self.shared.id, "close requested");
                self.schedule(WindowEvent::CloseRequested);
                processed.handled = true;
            },
            Notification::Destroyed => self.native_destroyed(backend),
            Notification::DroppedFiles(files) => {
                if self.accepts_files {
                    self.schedule(WindowEvent::DroppedFiles(files));
                }
                processed.handled = true;
            },
            Notification::SetCursor => {
                self.apply_cursor(backend);
                processed.handled = true;
            },
            Notification::DisplayChanged => {
                self.shared.sinks.notify(|sink| sink.on_display_change());
                processed.display_changed = true;
            },
        }

        if self.shared.emitter.has(WindowEvent::MESSAGE) {
            if let Some(message) = backend.raw_message(event) {
                self.schedule(WindowEvent::Message(message));
            }
        }

        if self.shared.sinks.postprocess(event) {
            processed.handled = true;
        }
        processed
    }

    fn schedule(&self, event: WindowEvent) {
        let name = event.name();
        if !self.shared.emitter.has(name) {
            return;
        }
        let emitter = self.shared.emitter.clone();
        if !self.main_loop.schedule(move || emitter.emit(name, &event)) {
            trace!(name, "main loop is terminating, event dropped");
        }
    }

    /// Reference counted pointer grab.
    pub fn capture_mouse(&mut self, backend: &B, capture: bool) {
        let Some(handle) = self.handle else { return };
        if capture {
            self.capture_count += 1;
            if self.capture_count == 1 {
                backend.set_capture(handle, true);
            }
        } else if self.capture_count > 0 {
            self.capture_count -= 1;
            if self.capture_count == 0 {
                backend.set_capture(handle, false);
            }
        }
    }

    pub fn set_stock_cursor(&mut self, backend: &B, cursor: StockCursor) {
        self.cursor.set_stock(cursor);
        self.apply_cursor(backend);
    }

    pub fn show_cursor(&mut self, backend: &B, visible: bool) {
        self.cursor.visible = visible;
        self.apply_cursor(backend);
    }

    fn apply_cursor(&self, backend: &B) {
        if let Some(handle) = self.handle {
            backend.set_cursor(handle, self.cursor.effective());
        }
    }

    pub fn show(&mut self, backend: &B, visible: bool) {
        let Some(handle) = self.handle else { return };
        backend.show(handle, visible);
        self.style.set(WindowStyle::HIDDEN, !visible);
        self.shared.update_style(self.style);
    }

    pub fn set_focus(&self, backend: &B) {
        if let Some(handle) = self.handle {
            backend.set_focus(handle);
        }
    }

    pub fn set_rect(&self, backend: &B, rect: Rect) {
        let Some(handle) = self.handle else { return };
        backend.set_rect(handle, rect);
        self.shared.update_rect(backend.rect(handle));
    }

    pub fn set_cursor_position(&self, backend: &B, position: PhysicalPosition<i32>) {
        if let Some(handle) = self.handle {
            backend.set_cursor_position(handle, position);
        }
    }

    pub fn show_frame(&self, backend: &B, show: bool) {
        if let Some(handle) = self.handle {
            backend.show_frame(handle, self.style, show);
        }
    }

    pub fn set_topmost(&self, backend: &B, topmost: bool) {
        if let Some(handle) = self.handle {
            backend.set_topmost(handle, topmost);
        }
    }

    pub fn set_drag_accept_files(&mut self, backend: &B, accept: bool) {
        let Some(handle) = self.handle else { return };
        if self.accepts_files != accept {
            backend.set_drag_accept_files(handle, accept);
            self.accepts_files = accept;
        }
    }

    pub fn load_icon(&self, backend: &B, path: &Path) {
        let Some(handle) = self.handle else { return };
        if let Err(err) = backend.load_icon(handle, path) {
            warn!("failed to load window icon {}: {err}", path.display());
        }
    }

    pub fn use_as_splash_screen(&self, backend: &B, path: &Path) {
        let Some(handle) = self.handle else { return };
        if let Err(err) = backend.use_as_splash_screen(handle, path) {
            warn!("failed to show splash screen {}: {err}", path.display());
            // Backends hold a splash window back until the image is up.
            if !self.style.contains(WindowStyle::HIDDEN) {
                backend.show(handle, true);
            }
        }
    }

    /// Switch between the saved placement and borderless fullscreen on the current display.
    pub fn toggle_fullscreen(&mut self, backend: &B) {
        let Some(handle) = self.handle else { return };
        match self.fullscreen.take() {
            Some(fullscreen) => self.leave_fullscreen(backend, handle, fullscreen),
            None => {
                let saved_rect = backend.rect(handle);
                let target = backend.from_window(&saved_rect).map_or(saved_rect, |d| d.rect);
                backend.set_fullscreen(handle, self.style, true, target);
                self.fullscreen = Some(Fullscreen { saved_rect, mode_forced: false });
                self.style.insert(WindowStyle::FULLSCREEN);
                self.shared.update_rect(target);
                self.shared.update_style(self.style);
            },
        }
    }

    /// Change the display mode to the closest match of `requested` and cover the display.
    pub fn switch_to_fullscreen(
        &mut self,
        backend: &B,
        requested: VideoMode,
    ) -> Result<(), RequestError> {
        let Some(handle) = self.handle else { return Ok(()) };
        let current = backend.rect(handle);
        let display = backend.from_window(&current);
        let modes = display.as_ref().map(|d| backend.modes(d)).unwrap_or_default();
        let mode = closest_mode(&modes, requested.width, requested.height, requested.bpp)
            .unwrap_or(requested);
        debug!(?mode, "switching video mode");
        backend.switch_video_mode(handle, &mode)?;

        let saved_rect = self.fullscreen.map_or(current, |fullscreen| fullscreen.saved_rect);
        let origin = display.map(|d| d.rect.position).unwrap_or_default();
        let target = Rect { position: origin, size: (mode.width, mode.height).into() };
        backend.set_fullscreen(handle, self.style, true, target);
        self.fullscreen = Some(Fullscreen { saved_rect, mode_forced: true });
        self.style.insert(WindowStyle::FULLSCREEN);
        self.shared.update_rect(target);
        self.shared.update_style(self.style);
        Ok(())
    }

    fn leave_fullscreen(&mut self, backend: &B, handle: B::Handle, fullscreen: Fullscreen) {
        if fullscreen.mode_forced {
            backend.restore_video_mode();
        }
        self.style.remove(WindowStyle::FULLSCREEN);
        backend.set_fullscreen(handle, self.style, false, fullscreen.saved_rect);
        self.shared.update_rect(fullscreen.saved_rect);
        self.shared.update_style(self.style);
    }

    /// Release native resources. Only the first call does anything.
    pub fn destroy(&mut self, backend: &B) {
        let Some(handle) = self.handle.take() else { return };
        debug!(window = ?self.shared.id, ?handle, "destroying window");
        if let Some(fullscreen) = self.fullscreen.take() {
            if fullscreen.mode_forced {
                backend.restore_video_mode();
            }
        }
        if !self.cursor.visible {
            backend.set_cursor(handle, Some(CursorIcon::Default));
        }
        self.cursor = CursorState::default();
        if self.capture_count > 0 {
            self.capture_count = 0;
            backend.set_capture(handle, false);
        }
        if self.accepts_files {
            self.accepts_files = false;
            backend.set_drag_accept_files(handle, false);
        }
        backend.destroy_native_window(handle);
        self.shared.set_destroyed();
    }

    /// The system destroyed the window behind our back.
    fn native_destroyed(&mut self, backend: &B) {
        if self.handle.take().is_none() {
            return;
        }
        debug!(window = ?self.shared.id, "native window destroyed");
        if let Some(Fullscreen { mode_forced: true, .. }) = self.fullscreen.take() {
            backend.restore_video_mode();
        }
        self.capture_count = 0;
        self.accepts_files = false;
        self.shared.set_destroyed();
    }
}
