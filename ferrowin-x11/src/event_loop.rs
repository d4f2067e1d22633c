//! Reading the X event queue and waking a blocked reader.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{c_int, c_void};
use std::io;
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::Arc;
use std::time::Duration;

use cursor_icon::CursorIcon;
use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::backend::BackendWaker;
use ferrowin_core::codec::x11::X11Input;
use ferrowin_core::error::RequestError;
use ferrowin_core::os_error;
use tracing::{trace, warn};
use x11_dl::xlib;

use crate::window::WindowData;
use crate::xdisplay::XConnection;

const RR_SCREEN_CHANGE_NOTIFY: c_int = 0;
const RR_SCREEN_CHANGE_NOTIFY_MASK: c_int = 1 << 0;

/// One X event, reduced to what the window core needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct X11Event {
    pub window: xlib::Window,
    pub kind: X11EventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum X11EventKind {
    Input(X11Input),
    Resized(PhysicalSize<u32>),
    Moved(PhysicalPosition<i32>),
    /// `WM_DELETE_WINDOW` from the window manager.
    CloseRequested,
    Destroyed,
    /// The pointer entered the window.
    Entered,
    /// RandR reported a new screen configuration. Targets the root window.
    ScreenChanged,
    Other(c_int),
}

/// The self-pipe a blocked [`X11Backend`] also polls.
#[derive(Debug)]
struct WakePipe {
    read: OwnedFd,
    write: OwnedFd,
}

impl WakePipe {
    fn new() -> io::Result<Self> {
        let mut fds = [0; 2];
        if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        Ok(Self { read, write })
    }

    fn drain(&self) {
        let mut buffer = [0u8; 64];
        loop {
            let read = unsafe {
                let fd = self.read.as_raw_fd();
                libc::read(fd, buffer.as_mut_ptr().cast::<c_void>(), buffer.len())
            };
            if read <= 0 {
                break;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct X11Waker {
    pipe: Arc<WakePipe>,
}

impl BackendWaker for X11Waker {
    fn wake(&self) {
        let byte = 1u8;
        // A full pipe already has a wake-up pending.
        let _ = unsafe {
            libc::write(self.pipe.write.as_raw_fd(), (&byte as *const u8).cast::<c_void>(), 1)
        };
    }
}

/// Mode the screen was in before the first switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SavedMode {
    pub size_index: u16,
    pub rotation: u16,
    pub rate: i16,
}

/// The Xlib windowing system.
///
/// Lives on the platform thread; its state sits in cells since every call takes `&self`.
pub struct X11Backend {
    pub(crate) xconn: XConnection,
    pipe: Arc<WakePipe>,
    pub(crate) windows: RefCell<HashMap<xlib::Window, WindowData>>,
    pub(crate) cursors: RefCell<HashMap<Option<CursorIcon>, xlib::Cursor>>,
    pub(crate) saved_mode: Cell<Option<SavedMode>>,
    pub(crate) randr_1_2: bool,
    randr_event_base: Option<c_int>,
}

impl std::fmt::Debug for X11Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X11Backend")
            .field("xconn", &self.xconn)
            .field("windows", &self.windows.borrow().len())
            .finish_non_exhaustive()
    }
}

impl X11Backend {
    /// Connect to the display named by `DISPLAY`.
    pub fn new() -> Result<Self, RequestError> {
        let xconn = XConnection::new().map_err(|err| os_error!(err))?;
        let pipe = WakePipe::new().map_err(|err| os_error!(err))?;

        let randr_1_2 = xconn.has_randr_1_2();
        let randr_event_base = xconn.xrandr.as_ref().and_then(|xrandr| {
            let (mut event_base, mut error_base) = (0, 0);
            let present = unsafe {
                (xrandr.XRRQueryExtension)(xconn.display, &mut event_base, &mut error_base)
            };
            if present == 0 {
                return None;
            }
            unsafe {
                (xrandr.XRRSelectInput)(xconn.display, xconn.root, RR_SCREEN_CHANGE_NOTIFY_MASK)
            };
            Some(event_base)
        });
        if randr_event_base.is_none() {
            warn!("RandR is missing, only the default screen is reported");
        }

        Ok(Self {
            xconn,
            pipe: Arc::new(pipe),
            windows: RefCell::default(),
            cursors: RefCell::default(),
            saved_mode: Cell::new(None),
            randr_1_2,
            randr_event_base,
        })
    }

    pub(crate) fn new_waker(&self) -> X11Waker {
        X11Waker { pipe: Arc::clone(&self.pipe) }
    }

    pub(crate) fn pump(
        &self,
        timeout: Option<Duration>,
        handler: &mut dyn FnMut(&X11Event) -> bool,
    ) {
        if self.drain_queue(handler) > 0 || timeout == Some(Duration::ZERO) {
            return;
        }
        self.wait_readable(timeout);
        self.drain_queue(handler);
    }

    /// Block until the connection or the wake pipe is readable.
    fn wait_readable(&self, timeout: Option<Duration>) {
        let mut fds = [
            libc::pollfd { fd: self.xconn.x11_fd, events: libc::POLLIN, revents: 0 },
            libc::pollfd { fd: self.pipe.read.as_raw_fd(), events: libc::POLLIN, revents: 0 },
        ];
        let timeout_ms = match timeout {
            Some(timeout) => {
                timeout.as_nanos().div_ceil(1_000_000).min(c_int::MAX as u128) as c_int
            },
            None => -1,
        };
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                warn!(%err, "poll on the X connection failed");
            }
        }
        if fds[1].revents & libc::POLLIN != 0 {
            self.pipe.drain();
        }
    }

    /// Hand every queued event to `handler`. Returns the number of X events read.
    fn drain_queue(&self, handler: &mut dyn FnMut(&X11Event) -> bool) -> usize {
        let mut count = 0;
        while unsafe { (self.xconn.xlib.XPending)(self.xconn.display) } > 0 {
            let mut xev = MaybeUninit::<xlib::XEvent>::uninit();
            unsafe { (self.xconn.xlib.XNextEvent)(self.xconn.display, xev.as_mut_ptr()) };
            let mut xev = unsafe { xev.assume_init() };
            count += 1;

            // The input method consumes the events it composes.
            if unsafe { (self.xconn.xlib.XFilterEvent)(&mut xev, 0) } == xlib::True {
                continue;
            }

            for event in self.translate(&mut xev) {
                trace!(?event, "X event");
                handler(&event);
            }
        }
        count
    }

    fn is_screen_change(&self, event_type: c_int) -> bool {
        self.randr_event_base.is_some_and(|base| event_type == base + RR_SCREEN_CHANGE_NOTIFY)
    }

    fn translate(&self, xev: &mut xlib::XEvent) -> Vec<X11Event> {
        let event_type = xev.get_type();
        let window = unsafe { xev.any.window };
        let event = |kind| X11Event { window, kind };

        match event_type {
            xlib::KeyPress => {
                let mut key = unsafe { xev.key };
                let ic = self
                    .windows
                    .borrow()
                    .get(&key.window)
                    .map_or(std::ptr::null_mut(), |data| data.ic);
                let lookup = self.xconn.lookup_key(ic, &mut key);
                let character = lookup.character();
                let mut events = vec![event(X11EventKind::Input(X11Input::Key {
                    pressed: true,
                    keycode: key.keycode,
                    state: key.state,
                    keysym: lookup.keysym,
                    character,
                }))];
                if character != 0 {
                    events.push(event(X11EventKind::Input(X11Input::Char {
                        keycode: key.keycode,
                        state: key.state,
                        keysym: lookup.keysym,
                        character,
                    })));
                }
                events
            },
            xlib::KeyRelease => {
                let key = unsafe { xev.key };
                vec![event(X11EventKind::Input(X11Input::Key {
                    pressed: false,
                    keycode: key.keycode,
                    state: key.state,
                    keysym: 0,
                    character: 0,
                }))]
            },
            xlib::ButtonPress | xlib::ButtonRelease => {
                let button = unsafe { xev.button };
                vec![event(X11EventKind::Input(X11Input::Button {
                    pressed: event_type == xlib::ButtonPress,
                    button: button.button,
                    state: button.state,
                    x: button.x,
                    y: button.y,
                }))]
            },
            xlib::MotionNotify => {
                let motion = unsafe { xev.motion };
                vec![event(X11EventKind::Input(X11Input::Motion {
                    state: motion.state,
                    x: motion.x,
                    y: motion.y,
                }))]
            },
            xlib::ConfigureNotify => {
                let configure = unsafe { xev.configure };
                let window = configure.window;
                let (width, height) = (configure.width.max(0), configure.height.max(0));
                let size = PhysicalSize::new(width as u32, height as u32);
                vec![
                    X11Event { window, kind: X11EventKind::Resized(size) },
                    X11Event { window, kind: X11EventKind::Moved(self.root_position(window)) },
                ]
            },
            xlib::ClientMessage => {
                let message = unsafe { xev.client_message };
                let atoms = &self.xconn.atoms;
                if message.message_type == atoms.WM_PROTOCOLS
                    && message.data.get_long(0) as xlib::Atom == atoms.WM_DELETE_WINDOW
                {
                    vec![event(X11EventKind::CloseRequested)]
                } else {
                    vec![event(X11EventKind::Other(event_type))]
                }
            },
            xlib::DestroyNotify => {
                let destroyed = unsafe { xev.destroy_window };
                // Destroyed behind our back: the input context is still ours to free.
                let data = self.windows.borrow_mut().remove(&destroyed.window);
                if let Some(data) = data.filter(|data| !data.ic.is_null()) {
                    unsafe { (self.xconn.xlib.XDestroyIC)(data.ic) };
                }
                vec![X11Event { window: destroyed.window, kind: X11EventKind::Destroyed }]
            },
            xlib::EnterNotify => vec![event(X11EventKind::Entered)],
            _ if self.is_screen_change(event_type) => {
                if let Some(xrandr) = &self.xconn.xrandr {
                    unsafe { (xrandr.XRRUpdateConfiguration)(xev) };
                }
                vec![X11Event { window: self.xconn.root, kind: X11EventKind::ScreenChanged }]
            },
            _ => vec![event(X11EventKind::Other(event_type))],
        }
    }
}
