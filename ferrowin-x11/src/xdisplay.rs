use std::error::Error;
use std::ffi::{c_char, c_int, CStr};
use std::sync::{Mutex, PoisonError};
use std::{fmt, ptr};

use tracing::{error, warn};
use x11_dl::error::OpenError;
use x11_dl::{xcursor, xlib, xrandr};

/// Codes of the last protocol error, written by the process wide error handler.
static LATEST_ERROR: Mutex<Option<RawXError>> = Mutex::new(None);

#[derive(Debug, Clone, Copy)]
struct RawXError {
    error_code: u8,
    request_code: u8,
    minor_code: u8,
}

unsafe extern "C" fn x_error_callback(
    _display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    if let Some(event) = unsafe { event.as_ref() } {
        let raw = RawXError {
            error_code: event.error_code,
            request_code: event.request_code,
            minor_code: event.minor_code,
        };
        error!(?raw, "X11 protocol error");
        *LATEST_ERROR.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);
    }
    // Xlib ignores the return value.
    0
}

/// Interned atoms the backend uses.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub WM_PROTOCOLS: xlib::Atom,
    pub WM_DELETE_WINDOW: xlib::Atom,
    pub _MOTIF_WM_HINTS: xlib::Atom,
    pub _NET_WM_STATE: xlib::Atom,
    pub _NET_WM_STATE_ABOVE: xlib::Atom,
    pub _NET_WM_STATE_FULLSCREEN: xlib::Atom,
    pub _NET_WM_NAME: xlib::Atom,
    pub UTF8_STRING: xlib::Atom,
}

/// A connection to an X server.
pub struct XConnection {
    pub xlib: xlib::Xlib,
    /// Missing when libXrandr is not installed.
    pub xrandr: Option<xrandr::Xrandr>,
    /// Missing when libXcursor is not installed; font cursors are used instead.
    pub xcursor: Option<xcursor::Xcursor>,
    pub display: *mut xlib::Display,
    pub x11_fd: c_int,
    pub screen: c_int,
    pub root: xlib::Window,
    /// Input method used for key composition, null when none could be opened.
    pub im: xlib::XIM,
    pub atoms: Atoms,
}

unsafe impl Send for XConnection {}
unsafe impl Sync for XConnection {}

impl XConnection {
    pub fn new() -> Result<XConnection, XNotSupported> {
        // opening the libraries
        let xlib = xlib::Xlib::open()?;
        let xrandr = xrandr::Xrandr::open().ok();
        let xcursor = xcursor::Xcursor::open().ok();

        unsafe { (xlib.XInitThreads)() };
        unsafe { (xlib.XSetErrorHandler)(Some(x_error_callback)) };

        let display = unsafe { (xlib.XOpenDisplay)(ptr::null()) };
        if display.is_null() {
            return Err(XNotSupported::XOpenDisplayFailed);
        }

        let x11_fd = unsafe { (xlib.XConnectionNumber)(display) };
        let screen = unsafe { (xlib.XDefaultScreen)(display) };
        let root = unsafe { (xlib.XRootWindow)(display, screen) };

        let im = unsafe {
            (xlib.XSetLocaleModifiers)(c"".as_ptr());
            (xlib.XOpenIM)(display, ptr::null_mut(), ptr::null_mut(), ptr::null_mut())
        };
        if im.is_null() {
            warn!("failed to open an input method, key composition is unavailable");
        }

        let intern =
            |name: &CStr| unsafe { (xlib.XInternAtom)(display, name.as_ptr(), xlib::False) };
        let atoms = Atoms {
            WM_PROTOCOLS: intern(c"WM_PROTOCOLS"),
            WM_DELETE_WINDOW: intern(c"WM_DELETE_WINDOW"),
            _MOTIF_WM_HINTS: intern(c"_MOTIF_WM_HINTS"),
            _NET_WM_STATE: intern(c"_NET_WM_STATE"),
            _NET_WM_STATE_ABOVE: intern(c"_NET_WM_STATE_ABOVE"),
            _NET_WM_STATE_FULLSCREEN: intern(c"_NET_WM_STATE_FULLSCREEN"),
            _NET_WM_NAME: intern(c"_NET_WM_NAME"),
            UTF8_STRING: intern(c"UTF8_STRING"),
        };

        Ok(XConnection { xlib, xrandr, xcursor, display, x11_fd, screen, root, im, atoms })
    }

    /// Checks whether an error has been triggered by the previous function calls.
    pub fn check_errors(&self) -> Result<(), XError> {
        let raw = LATEST_ERROR.lock().unwrap_or_else(PoisonError::into_inner).take();
        match raw {
            Some(raw) => Err(self.describe(raw)),
            None => Ok(()),
        }
    }

    /// Ignores any previous error.
    pub fn ignore_error(&self) {
        *LATEST_ERROR.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Flush the output buffer and wait until the server processed every request.
    pub fn sync(&self) -> Result<(), XError> {
        unsafe { (self.xlib.XSync)(self.display, xlib::False) };
        self.check_errors()
    }

    pub fn flush_requests(&self) -> Result<(), XError> {
        unsafe { (self.xlib.XFlush)(self.display) };
        self.check_errors()
    }

    pub fn default_depth(&self) -> u16 {
        unsafe { (self.xlib.XDefaultDepth)(self.display, self.screen) as u16 }
    }

    fn describe(&self, raw: RawXError) -> XError {
        let mut buffer = [0 as c_char; 1024];
        unsafe {
            (self.xlib.XGetErrorText)(
                self.display,
                raw.error_code as c_int,
                buffer.as_mut_ptr(),
                buffer.len() as c_int,
            )
        };
        let description = unsafe { CStr::from_ptr(buffer.as_ptr()) }.to_string_lossy().into_owned();
        XError {
            description,
            error_code: raw.error_code,
            request_code: raw.request_code,
            minor_code: raw.minor_code,
        }
    }
}

impl fmt::Debug for XConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display.fmt(f)
    }
}

impl Drop for XConnection {
    fn drop(&mut self) {
        unsafe {
            if !self.im.is_null() {
                (self.xlib.XCloseIM)(self.im);
            }
            (self.xlib.XCloseDisplay)(self.display)
        };
    }
}

/// Error triggered by xlib.
#[derive(Debug, Clone)]
pub struct XError {
    pub description: String,
    pub error_code: u8,
    pub request_code: u8,
    pub minor_code: u8,
}

impl Error for XError {}

impl fmt::Display for XError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            formatter,
            "X error: {} (code: {}, request code: {}, minor code: {})",
            self.description, self.error_code, self.request_code, self.minor_code
        )
    }
}

/// Error returned if this system doesn't have XLib or can't create an X connection.
#[derive(Clone, Debug)]
pub enum XNotSupported {
    /// Failed to load one or several shared libraries.
    LibraryOpenError(OpenError),
    /// Connecting to the X server with `XOpenDisplay` failed.
    XOpenDisplayFailed,
}

impl From<OpenError> for XNotSupported {
    fn from(err: OpenError) -> XNotSupported {
        XNotSupported::LibraryOpenError(err)
    }
}

impl XNotSupported {
    fn description(&self) -> &'static str {
        match self {
            XNotSupported::LibraryOpenError(_) => "Failed to load one of xlib's shared libraries",
            XNotSupported::XOpenDisplayFailed => "Failed to open a connection with the X server",
        }
    }
}

impl Error for XNotSupported {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            XNotSupported::LibraryOpenError(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for XNotSupported {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        formatter.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let err = XError {
            description: "BadWindow (invalid Window parameter)".into(),
            error_code: 3,
            request_code: 12,
            minor_code: 0,
        };
        assert_eq!(
            err.to_string(),
            "X error: BadWindow (invalid Window parameter) (code: 3, request code: 12, minor code: \
             0)"
        );
        assert_eq!(
            XNotSupported::XOpenDisplayFailed.to_string(),
            "Failed to open a connection with the X server"
        );
        assert!(XNotSupported::XOpenDisplayFailed.source().is_none());
    }
}
