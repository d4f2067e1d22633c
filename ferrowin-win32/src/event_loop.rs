//! The window procedure, the message pump and its waker.
//!
//! Windows delivers most messages by calling the window procedure, either from
//! `DispatchMessageW` or synchronously from a call such as `SetWindowPos`. While
//! [`Win32Backend::pump`] runs, the procedure hands each message straight to the pump's
//! handler. Messages sent while no pump runs, or while the handler is already executing, are
//! queued and replayed by the next pump.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration;
use std::{fmt, mem, ptr};

use dpi::PhysicalPosition;
use ferrowin_core::backend::BackendWaker;
use ferrowin_core::codec::win32 as msg;
use ferrowin_core::error::RequestError;
use ferrowin_core::event::Modifiers;
use ferrowin_core::os_error;
use tracing::{trace, warn};
use windows_sys::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows_sys::Win32::Graphics::Gdi::{BeginPaint, EndPaint, PAINTSTRUCT};
use windows_sys::Win32::System::Threading::{GetCurrentThreadId, INFINITE};
use windows_sys::Win32::UI::Shell::{DragFinish, DragQueryFileW, HDROP};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    DefWindowProcW, DispatchMessageW, LoadCursorW, MsgWaitForMultipleObjectsEx, PeekMessageW,
    PostThreadMessageW, RegisterClassExW, TranslateMessage, CS_DBLCLKS, CS_HREDRAW, CS_VREDRAW,
    HTCLIENT, IDC_ARROW, MSG, MWMO_INPUTAVAILABLE, PM_REMOVE, QS_ALLINPUT, WM_APP, WM_CLOSE,
    WM_DESTROY, WM_DISPLAYCHANGE, WM_DROPFILES, WM_MOVE, WM_NCDESTROY, WM_PAINT, WM_SETCURSOR,
    WM_SIZE, WNDCLASSEXW,
};

use crate::splash::SplashBitmap;
use crate::util;

/// Posted to the pump thread by [`Win32Waker`].
const WAKE_MESSAGE: u32 = WM_APP + 0x3ffe;

const CLASS_NAME: &str = "ferrowin.Window";

/// Identity of a native window.
///
/// `HWND` is a raw pointer; the handle keeps its address so it can cross threads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hwnd(pub isize);

impl Hwnd {
    pub fn hwnd(self) -> HWND {
        self.0 as HWND
    }
}

impl From<HWND> for Hwnd {
    fn from(hwnd: HWND) -> Self {
        Self(hwnd as isize)
    }
}

/// Data the window procedure collected along with a message.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum EventDetail {
    #[default]
    None,
    /// `WM_DROPFILES`: the dropped paths. The drop handle is released before delivery.
    Files(Vec<PathBuf>),
    /// `WM_MOVE`: outer window position.
    Position(PhysicalPosition<i32>),
}

/// One window message, with the state sampled when it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct Win32Event {
    pub hwnd: Hwnd,
    pub message: u32,
    pub wparam: usize,
    pub lparam: isize,
    pub key_state: Modifiers,
    pub client_origin: PhysicalPosition<i32>,
    pub detail: EventDetail,
}

impl Win32Event {
    pub fn new(hwnd: Hwnd, message: u32, wparam: usize, lparam: isize) -> Self {
        Self {
            hwnd,
            message,
            wparam,
            lparam,
            key_state: Modifiers::empty(),
            client_origin: PhysicalPosition::default(),
            detail: EventDetail::None,
        }
    }

    pub fn as_message(&self) -> msg::Win32Message {
        msg::Win32Message {
            message: self.message,
            wparam: self.wparam,
            lparam: self.lparam,
            key_state: self.key_state,
            client_origin: self.client_origin,
        }
    }
}

/// Whether a message means something to a window even when it arrives outside of a pump.
fn worth_replaying(message: u32) -> bool {
    matches!(message, msg::WM_KEYDOWN | msg::WM_KEYUP | msg::WM_CHAR)
        || (msg::WM_MOUSEMOVE..=msg::WM_MOUSEHWHEEL).contains(&message)
        || matches!(
            message,
            WM_SIZE | WM_MOVE | WM_CLOSE | WM_DESTROY | WM_DROPFILES | WM_DISPLAYCHANGE
        )
}

/// Per-thread state the window procedure reaches.
#[derive(Default)]
pub(crate) struct ThreadState {
    pub handler: crate::handler::EventHandler,
    replay: RefCell<VecDeque<Win32Event>>,
    pub splashes: RefCell<HashMap<Hwnd, SplashBitmap>>,
    panic: Cell<Option<Box<dyn Any + Send>>>,
}

thread_local! {
    pub(crate) static THREAD_STATE: ThreadState = ThreadState::default();
}

impl ThreadState {
    fn take_replay(&self) -> VecDeque<Win32Event> {
        mem::take(&mut *self.replay.borrow_mut())
    }

    /// Continue a panic the handler raised inside the window procedure.
    fn resume_panic(&self) {
        if let Some(payload) = self.panic.take() {
            panic::resume_unwind(payload);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Win32Waker {
    thread_id: u32,
}

impl BackendWaker for Win32Waker {
    fn wake(&self) {
        let posted = unsafe { PostThreadMessageW(self.thread_id, WAKE_MESSAGE, 0, 0) };
        if posted == 0 {
            warn!("failed to wake the message pump");
        }
    }
}

/// Display whose video mode was switched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SwitchedDisplay {
    pub device: Vec<u16>,
}

/// The Win32 windowing system.
pub struct Win32Backend {
    thread_id: u32,
    pub(crate) class_name: Vec<u16>,
    pub(crate) switched: RefCell<Option<SwitchedDisplay>>,
    pub(crate) icons: RefCell<HashMap<Hwnd, crate::icon::WinIcon>>,
}

impl fmt::Debug for Win32Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Win32Backend")
            .field("thread_id", &self.thread_id)
            .field("switched", &self.switched.borrow())
            .finish_non_exhaustive()
    }
}

impl Win32Backend {
    /// Register the window class on the current thread, which becomes the pump thread.
    pub fn new() -> Result<Self, RequestError> {
        let class_name = util::encode_wide(CLASS_NAME);
        let class = WNDCLASSEXW {
            cbSize: mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW | CS_DBLCLKS,
            lpfnWndProc: Some(window_proc),
            cbClsExtra: 0,
            cbWndExtra: 0,
            hInstance: util::get_instance_handle(),
            hIcon: ptr::null_mut(),
            hCursor: unsafe { LoadCursorW(ptr::null_mut(), IDC_ARROW) },
            hbrBackground: ptr::null_mut(),
            lpszMenuName: ptr::null(),
            lpszClassName: class_name.as_ptr(),
            hIconSm: ptr::null_mut(),
        };

        // A second backend on the process finds the class registered already.
        if unsafe { RegisterClassExW(&class) } == 0 {
            let err = std::io::Error::last_os_error();
            const ERROR_CLASS_ALREADY_EXISTS: i32 = 1410;
            if err.raw_os_error() != Some(ERROR_CLASS_ALREADY_EXISTS) {
                return Err(os_error!(err).into());
            }
        }

        Ok(Self {
            thread_id: unsafe { GetCurrentThreadId() },
            class_name,
            switched: RefCell::new(None),
            icons: RefCell::default(),
        })
    }

    pub(crate) fn new_waker(&self) -> Win32Waker {
        Win32Waker { thread_id: self.thread_id }
    }

    pub(crate) fn pump(
        &self,
        timeout: Option<Duration>,
        handler: &mut dyn FnMut(&Win32Event) -> bool,
    ) {
        THREAD_STATE.with(|state| {
            state.handler.set(handler, || {
                let mut delivered = replay(state);
                delivered |= dispatch_pending(state);
                if !delivered && timeout != Some(Duration::ZERO) {
                    wait(timeout);
                    dispatch_pending(state);
                }
                replay(state);
            })
        });
    }
}

/// Deliver messages queued while no pump ran. Returns whether there were any.
fn replay(state: &ThreadState) -> bool {
    let queued = state.take_replay();
    let delivered = !queued.is_empty();
    for event in queued {
        trace!(?event, "replaying window message");
        state.handler.handle(&event);
    }
    delivered
}

/// Dispatch every message in the queue. Returns whether anything was read.
fn dispatch_pending(state: &ThreadState) -> bool {
    let mut delivered = false;
    let mut message: MSG = unsafe { mem::zeroed() };
    while unsafe { PeekMessageW(&mut message, ptr::null_mut(), 0, 0, PM_REMOVE) } != 0 {
        delivered = true;
        if message.hwnd.is_null() && message.message == WAKE_MESSAGE {
            continue;
        }
        unsafe {
            TranslateMessage(&message);
            DispatchMessageW(&message);
        }
        state.resume_panic();
    }
    delivered
}

fn wait(timeout: Option<Duration>) {
    let millis = match timeout {
        Some(timeout) => timeout.as_millis().min(INFINITE as u128 - 1) as u32,
        None => INFINITE,
    };
    unsafe {
        MsgWaitForMultipleObjectsEx(0, ptr::null(), millis, QS_ALLINPUT, MWMO_INPUTAVAILABLE)
    };
}

/// Paths dropped onto a window. Releases the drop handle.
unsafe fn dropped_files(hdrop: HDROP) -> Vec<PathBuf> {
    let count = unsafe { DragQueryFileW(hdrop, u32::MAX, ptr::null_mut(), 0) };
    let mut files = Vec::with_capacity(count as usize);
    for index in 0..count {
        let len = unsafe { DragQueryFileW(hdrop, index, ptr::null_mut(), 0) } as usize;
        let mut path = vec![0u16; len + 1];
        unsafe { DragQueryFileW(hdrop, index, path.as_mut_ptr(), path.len() as u32) };
        files.push(PathBuf::from(util::decode_wide(&path)));
    }
    unsafe { DragFinish(hdrop) };
    files
}

/// Paint the splash bitmap of `hwnd`, if it has one.
fn paint_splash(state: &ThreadState, hwnd: HWND) -> bool {
    let splashes = state.splashes.borrow();
    let Some(splash) = splashes.get(&Hwnd::from(hwnd)) else {
        return false;
    };
    let mut paint: PAINTSTRUCT = unsafe { mem::zeroed() };
    let hdc = unsafe { BeginPaint(hwnd, &mut paint) };
    if !hdc.is_null() {
        splash.draw(hdc);
    }
    unsafe { EndPaint(hwnd, &paint) };
    true
}

pub(crate) unsafe extern "system" fn window_proc(
    hwnd: HWND,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if message == WM_PAINT && THREAD_STATE.with(|state| paint_splash(state, hwnd)) {
        return 0;
    }

    let handled = THREAD_STATE.with(|state| {
        if message == WM_NCDESTROY {
            state.splashes.borrow_mut().remove(&Hwnd::from(hwnd));
        }

        let detail = match message {
            WM_DROPFILES => EventDetail::Files(unsafe { dropped_files(wparam as HDROP) }),
            WM_MOVE => match util::window_rect(hwnd) {
                Ok(rect) => EventDetail::Position(rect.position),
                Err(_) => EventDetail::None,
            },
            _ => EventDetail::None,
        };
        let event = Win32Event {
            hwnd: Hwnd::from(hwnd),
            message,
            wparam,
            lparam,
            key_state: util::key_state(),
            client_origin: util::client_origin(hwnd),
            detail,
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| state.handler.handle(&event)));
        match result {
            Ok(Some(handled)) => Some(handled),
            Ok(None) => {
                if worth_replaying(message) {
                    state.replay.borrow_mut().push_back(event);
                }
                None
            },
            Err(payload) => {
                // Unwinding through the system frames aborts; continue it in the pump.
                state.panic.set(Some(payload));
                None
            },
        }
    });

    match (handled, message) {
        (_, WM_DROPFILES) => 0,
        (Some(true), WM_SETCURSOR) if util::loword(lparam as u32) == HTCLIENT as u16 => 1,
        // Validation of the update region is left to the default procedure.
        (Some(true), WM_SETCURSOR | WM_PAINT) => unsafe {
            DefWindowProcW(hwnd, message, wparam, lparam)
        },
        (Some(true), _) => 0,
        _ => unsafe { DefWindowProcW(hwnd, message, wparam, lparam) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replayed_messages() {
        assert!(worth_replaying(msg::WM_LBUTTONDOWN));
        assert!(worth_replaying(msg::WM_MOUSEHWHEEL));
        assert!(worth_replaying(WM_SIZE));
        assert!(!worth_replaying(WM_PAINT));
        assert!(!worth_replaying(WM_SETCURSOR));
    }

    #[test]
    fn event_converts_to_codec_message() {
        let mut event = Win32Event::new(Hwnd(0x10), msg::WM_LBUTTONDOWN, 0x0001, 0x0020_0010);
        event.key_state = Modifiers::ALT;
        event.client_origin = PhysicalPosition::new(5, 6);
        let message = event.as_message();
        assert_eq!(message.message, msg::WM_LBUTTONDOWN);
        assert_eq!(message.wparam, 0x0001);
        assert_eq!(message.lparam, 0x0020_0010);
        assert_eq!(message.key_state, Modifiers::ALT);
        assert_eq!(message.client_origin, PhysicalPosition::new(5, 6));
    }

    #[test]
    fn hwnd_keeps_its_address() {
        let hwnd = 0x1234 as HWND;
        assert_eq!(Hwnd::from(hwnd).hwnd(), hwnd);
    }
}
