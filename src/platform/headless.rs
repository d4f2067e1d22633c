//! An in-memory backend.
//!
//! [`HeadlessBackend`] creates no real windows. Native events are scripted through a
//! [`HeadlessController`], which also records every call the window core makes into the
//! backend. It has one fake 1920x1080 display.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cursor_icon::CursorIcon;
use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::backend::{Backend, BackendWaker, NativeWindow, Notification};
use ferrowin_core::codec::{self, KeyCache};
use ferrowin_core::codec::appkit::AppKitEvent;
use ferrowin_core::codec::win32::Win32Message;
use ferrowin_core::codec::x11::X11Input;
use ferrowin_core::error::RequestError;
use ferrowin_core::event::{InputEvent, RawMessage};
use ferrowin_core::monitor::{Display, DisplayInfo, DisplaySource, VideoMode};
use ferrowin_core::os_error;
use ferrowin_core::window::{Rect, WindowAttributes, WindowStyle};
use smol_str::SmolStr;

/// Identity of a headless window. Handle `0` never names a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeadlessHandle(pub u64);

/// A scripted native event.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessEvent {
    pub window: HeadlessHandle,
    pub kind: HeadlessEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeadlessEventKind {
    /// An already decoded input event.
    Input(InputEvent),
    /// Raw records, decoded by the matching codec.
    Win32(Win32Message),
    X11(X11Input),
    AppKit(AppKitEvent),
    Resized(PhysicalSize<u32>),
    Moved(PhysicalPosition<i32>),
    Close,
    Destroyed,
    DroppedFiles(Vec<PathBuf>),
    SetCursor,
    DisplayChanged,
    /// A message with no meaning beyond its pass-through triple.
    Raw(RawMessage),
}

/// A call the window core made into the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Create { handle: HeadlessHandle, rect: Rect, bpp: u16, caption: String },
    Destroy(HeadlessHandle),
    SetCursor(HeadlessHandle, Option<CursorIcon>),
    SwitchVideoMode(HeadlessHandle, VideoMode),
    RestoreVideoMode,
    Show(HeadlessHandle, bool),
    SetFocus(HeadlessHandle),
    SetRect(HeadlessHandle, Rect),
    SetCapture(HeadlessHandle, bool),
    SetCursorPosition(HeadlessHandle, PhysicalPosition<i32>),
    ShowFrame(HeadlessHandle, bool),
    SetTopmost(HeadlessHandle, bool),
    SetFullscreen(HeadlessHandle, bool, Rect),
    SetDragAcceptFiles(HeadlessHandle, bool),
    LoadIcon(HeadlessHandle, PathBuf),
    UseAsSplashScreen(HeadlessHandle, PathBuf),
    /// An event went through default handling because nobody marked it handled.
    DefaultHandling(HeadlessHandle),
}

#[derive(Default)]
struct Queue {
    events: VecDeque<HeadlessEvent>,
    woken: bool,
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    rect: Rect,
    client_size: PhysicalSize<u32>,
}

struct Shared {
    queue: Mutex<Queue>,
    ready: Condvar,
    calls: Mutex<Vec<NativeCall>>,
    windows: Mutex<HashMap<HeadlessHandle, Placement>>,
    displays: Mutex<Vec<DisplayInfo>>,
    fail_next_create: AtomicBool,
    refuse_video_modes: AtomicBool,
    next_handle: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn record(&self, call: NativeCall) {
        lock(&self.calls).push(call);
    }

    fn placement(&self, handle: HeadlessHandle) -> Option<Placement> {
        lock(&self.windows).get(&handle).copied()
    }

    fn place(&self, handle: HeadlessHandle, rect: Rect) {
        if let Some(placement) = lock(&self.windows).get_mut(&handle) {
            placement.rect = rect;
            placement.client_size = rect.size;
        }
    }
}

/// The fake display every headless backend starts with.
pub fn default_display() -> DisplayInfo {
    let modes = [(640, 480), (800, 600), (1024, 768), (1280, 720), (1920, 1080)]
        .into_iter()
        .map(|(width, height)| VideoMode { width, height, bpp: 32, frequency: 60 })
        .collect();
    DisplayInfo {
        display: Display {
            name: SmolStr::new_static("HEADLESS-1"),
            scale: 1.0,
            color_depth: 24,
            color_depth_per_component: Display::depth_per_component(24),
            rect: Rect::new(0, 0, 1920, 1080),
            work_rect: Rect::new(0, 0, 1920, 1040),
        },
        modes,
        current: VideoMode { width: 1920, height: 1080, bpp: 32, frequency: 60 },
    }
}

/// Backend with no native windowing system behind it.
pub struct HeadlessBackend {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for HeadlessBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessBackend").finish_non_exhaustive()
    }
}

impl HeadlessBackend {
    /// A backend and the controller scripting it.
    pub fn new() -> (Self, HeadlessController) {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            ready: Condvar::new(),
            calls: Mutex::new(Vec::new()),
            windows: Mutex::new(HashMap::new()),
            displays: Mutex::new(vec![default_display()]),
            fail_next_create: AtomicBool::new(false),
            refuse_video_modes: AtomicBool::new(false),
            next_handle: AtomicU64::new(1),
        });
        (Self { shared: shared.clone() }, HeadlessController { shared })
    }
}

/// Scripts a [`HeadlessBackend`] from any thread.
#[derive(Clone)]
pub struct HeadlessController {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for HeadlessController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessController").finish_non_exhaustive()
    }
}

impl HeadlessController {
    /// Queue a native event and wake the pump.
    pub fn push_event(&self, window: HeadlessHandle, kind: HeadlessEventKind) {
        let mut queue = lock(&self.shared.queue);
        queue.events.push_back(HeadlessEvent { window, kind });
        self.shared.ready.notify_all();
    }

    /// Replace the displays and announce the change.
    pub fn set_displays(&self, displays: Vec<DisplayInfo>) {
        *lock(&self.shared.displays) = displays;
        self.push_event(HeadlessHandle(0), HeadlessEventKind::DisplayChanged);
    }

    /// Every native call so far.
    pub fn calls(&self) -> Vec<NativeCall> {
        lock(&self.shared.calls).clone()
    }

    pub fn take_calls(&self) -> Vec<NativeCall> {
        std::mem::take(&mut *lock(&self.shared.calls))
    }

    /// Make the next window creation fail.
    pub fn fail_next_create(&self) {
        self.shared.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Make video mode switches fail.
    pub fn refuse_video_modes(&self, refuse: bool) {
        self.shared.refuse_video_modes.store(refuse, Ordering::SeqCst);
    }

    /// Live native windows.
    pub fn window_count(&self) -> usize {
        lock(&self.shared.windows).len()
    }
}

/// Wakes a blocked [`HeadlessBackend::pump_events`].
#[derive(Clone)]
pub struct HeadlessWaker {
    shared: Arc<Shared>,
}

impl BackendWaker for HeadlessWaker {
    fn wake(&self) {
        lock(&self.shared.queue).woken = true;
        self.shared.ready.notify_all();
    }
}

impl DisplaySource for HeadlessBackend {
    fn enumerate(&self) -> Vec<Display> {
        lock(&self.shared.displays).iter().map(|info| info.display.clone()).collect()
    }

    fn modes(&self, display: &Display) -> Vec<VideoMode> {
        lock(&self.shared.displays)
            .iter()
            .find(|info| info.display.name == display.name)
            .map(|info| info.modes.clone())
            .unwrap_or_default()
    }

    fn current_mode(&self, display: &Display) -> Option<VideoMode> {
        lock(&self.shared.displays)
            .iter()
            .find(|info| info.display.name == display.name)
            .map(|info| info.current)
    }
}

impl Backend for HeadlessBackend {
    type Event = HeadlessEvent;
    type Handle = HeadlessHandle;
    type Waker = HeadlessWaker;

    fn waker(&self) -> HeadlessWaker {
        HeadlessWaker { shared: self.shared.clone() }
    }

    fn create_native_window(
        &self,
        attributes: &WindowAttributes,
        rect: Rect,
        bpp: u16,
    ) -> Result<NativeWindow<HeadlessHandle>, RequestError> {
        if self.shared.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(os_error!("headless window creation failed").into());
        }
        let handle = HeadlessHandle(self.shared.next_handle.fetch_add(1, Ordering::Relaxed));
        let placement = Placement { rect, client_size: rect.size };
        lock(&self.shared.windows).insert(handle, placement);
        self.shared.record(NativeCall::Create {
            handle,
            rect,
            bpp,
            caption: attributes.caption.clone(),
        });
        Ok(NativeWindow { handle, rect, client_size: rect.size })
    }

    fn destroy_native_window(&self, handle: HeadlessHandle) {
        lock(&self.shared.windows).remove(&handle);
        self.shared.record(NativeCall::Destroy(handle));
    }

    fn pump_events(
        &self,
        timeout: Option<Duration>,
        handler: &mut dyn FnMut(&HeadlessEvent) -> bool,
    ) {
        let events = {
            let mut queue = lock(&self.shared.queue);
            let idle = |queue: &mut Queue| queue.events.is_empty() && !queue.woken;
            queue = match timeout {
                Some(timeout) => {
                    self.shared
                        .ready
                        .wait_timeout_while(queue, timeout, idle)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                },
                None => self
                    .shared
                    .ready
                    .wait_while(queue, idle)
                    .unwrap_or_else(PoisonError::into_inner),
            };
            queue.woken = false;
            std::mem::take(&mut queue.events)
        };

        for event in events {
            if !handler(&event) && event.window != HeadlessHandle(0) {
                self.shared.record(NativeCall::DefaultHandling(event.window));
            }
        }
    }

    fn event_window(&self, event: &HeadlessEvent) -> Option<HeadlessHandle> {
        (event.window != HeadlessHandle(0)).then_some(event.window)
    }

    fn decode_native_event(&self, event: &HeadlessEvent, keys: &mut KeyCache) -> Notification {
        match &event.kind {
            HeadlessEventKind::Input(input) => Notification::Input(*input),
            HeadlessEventKind::Win32(message) => Notification::Input(codec::win32::decode(message)),
            HeadlessEventKind::X11(input) => Notification::Input(codec::x11::decode(input, keys)),
            HeadlessEventKind::AppKit(input) => Notification::Input(codec::appkit::decode(input)),
            HeadlessEventKind::Resized(size) => Notification::Resized(*size),
            HeadlessEventKind::Moved(position) => Notification::Moved(*position),
            HeadlessEventKind::Close => Notification::CloseRequested,
            HeadlessEventKind::Destroyed => Notification::Destroyed,
            HeadlessEventKind::DroppedFiles(files) => Notification::DroppedFiles(files.clone()),
            HeadlessEventKind::SetCursor => Notification::SetCursor,
            HeadlessEventKind::DisplayChanged => Notification::DisplayChanged,
            HeadlessEventKind::Raw(_) => Notification::Ignored,
        }
    }

    fn raw_message(&self, event: &HeadlessEvent) -> Option<RawMessage> {
        match &event.kind {
            HeadlessEventKind::Win32(message) => Some(RawMessage {
                message: message.message,
                wparam: message.wparam,
                lparam: message.lparam,
            }),
            HeadlessEventKind::Raw(message) => Some(*message),
            _ => None,
        }
    }

    fn set_cursor(&self, handle: HeadlessHandle, cursor: Option<CursorIcon>) {
        self.shared.record(NativeCall::SetCursor(handle, cursor));
    }

    fn switch_video_mode(
        &self,
        handle: HeadlessHandle,
        mode: &VideoMode,
    ) -> Result<(), RequestError> {
        if self.shared.refuse_video_modes.load(Ordering::SeqCst) {
            return Err(os_error!("video mode refused").into());
        }
        self.shared.record(NativeCall::SwitchVideoMode(handle, *mode));
        Ok(())
    }

    fn restore_video_mode(&self) {
        self.shared.record(NativeCall::RestoreVideoMode);
    }

    fn show(&self, handle: HeadlessHandle, visible: bool) {
        self.shared.record(NativeCall::Show(handle, visible));
    }

    fn set_focus(&self, handle: HeadlessHandle) {
        self.shared.record(NativeCall::SetFocus(handle));
    }

    fn set_rect(&self, handle: HeadlessHandle, rect: Rect) {
        self.shared.place(handle, rect);
        self.shared.record(NativeCall::SetRect(handle, rect));
    }

    fn rect(&self, handle: HeadlessHandle) -> Rect {
        self.shared.placement(handle).map(|placement| placement.rect).unwrap_or_default()
    }

    fn client_size(&self, handle: HeadlessHandle) -> PhysicalSize<u32> {
        self.shared.placement(handle).map(|placement| placement.client_size).unwrap_or_default()
    }

    fn set_capture(&self, handle: HeadlessHandle, capture: bool) {
        self.shared.record(NativeCall::SetCapture(handle, capture));
    }

    fn set_cursor_position(&self, handle: HeadlessHandle, position: PhysicalPosition<i32>) {
        self.shared.record(NativeCall::SetCursorPosition(handle, position));
    }

    fn show_frame(&self, handle: HeadlessHandle, _style: WindowStyle, show: bool) {
        self.shared.record(NativeCall::ShowFrame(handle, show));
    }

    fn set_topmost(&self, handle: HeadlessHandle, topmost: bool) {
        self.shared.record(NativeCall::SetTopmost(handle, topmost));
    }

    fn set_fullscreen(
        &self,
        handle: HeadlessHandle,
        _style: WindowStyle,
        fullscreen: bool,
        rect: Rect,
    ) {
        self.shared.place(handle, rect);
        self.shared.record(NativeCall::SetFullscreen(handle, fullscreen, rect));
    }

    fn set_drag_accept_files(&self, handle: HeadlessHandle, accept: bool) {
        self.shared.record(NativeCall::SetDragAcceptFiles(handle, accept));
    }

    fn load_icon(&self, handle: HeadlessHandle, path: &Path) -> Result<(), RequestError> {
        self.shared.record(NativeCall::LoadIcon(handle, path.to_path_buf()));
        Ok(())
    }

    fn use_as_splash_screen(
        &self,
        handle: HeadlessHandle,
        path: &Path,
    ) -> Result<(), RequestError> {
        self.shared.record(NativeCall::UseAsSplashScreen(handle, path.to_path_buf()));
        Ok(())
    }
}
