use std::ffi::{c_int, c_long, c_uint, CString};
use std::{mem, ptr};

use cursor_icon::CursorIcon;
use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::backend::NativeWindow;
use ferrowin_core::error::{ConfigError, RequestError};
use ferrowin_core::os_error;
use ferrowin_core::window::{Rect, WindowAttributes, WindowStyle};
use tracing::{debug, warn};
use x11_dl::xlib;

use crate::event_loop::X11Backend;
use crate::util::{MotifHints, StateOperation};

/// Events every window listens to.
const EVENT_MASK: c_long = xlib::FocusChangeMask
    | xlib::ButtonPressMask
    | xlib::ButtonReleaseMask
    | xlib::ButtonMotionMask
    | xlib::PointerMotionMask
    | xlib::KeyPressMask
    | xlib::KeyReleaseMask
    | xlib::StructureNotifyMask
    | xlib::EnterWindowMask
    | xlib::LeaveWindowMask;

/// Per window state the backend keeps besides the X window itself.
#[derive(Debug)]
pub(crate) struct WindowData {
    /// Input context, null without an input method.
    pub ic: xlib::XIC,
}

fn motif_hints(style: WindowStyle, decorated: bool) -> MotifHints {
    MotifHints::decorated(
        decorated && style.contains(WindowStyle::TITLEBAR),
        style.contains(WindowStyle::RESIZE),
        style.contains(WindowStyle::CLOSE),
    )
}

impl X11Backend {
    pub(crate) fn create_window(
        &self,
        attributes: &WindowAttributes,
        rect: Rect,
        bpp: u16,
    ) -> Result<NativeWindow<xlib::Window>, RequestError> {
        let xconn = &self.xconn;
        let caption =
            CString::new(attributes.caption.as_str()).map_err(|_| ConfigError::InvalidCaption)?;
        let depth = xconn.default_depth();
        if bpp != depth {
            debug!(bpp, depth, "windows use the depth of the default visual");
        }

        let size = PhysicalSize::new(rect.size.width.max(1), rect.size.height.max(1));
        let mut set_win_attr: xlib::XSetWindowAttributes = unsafe { mem::zeroed() };
        set_win_attr.event_mask = EVENT_MASK;
        set_win_attr.border_pixel = 0;

        let window = unsafe {
            (xconn.xlib.XCreateWindow)(
                xconn.display,
                xconn.root,
                rect.left(),
                rect.top(),
                size.width,
                size.height,
                0,
                xlib::CopyFromParent,
                xlib::InputOutput as c_uint,
                ptr::null_mut(),
                xlib::CWBorderPixel | xlib::CWEventMask,
                &mut set_win_attr,
            )
        };
        if let Err(err) = xconn.check_errors() {
            return Err(os_error!(err).into());
        }
        if window == 0 {
            return Err(os_error!("XCreateWindow failed").into());
        }

        unsafe {
            (xconn.xlib.XStoreName)(xconn.display, window, caption.as_ptr());
            let title = caption.as_bytes();
            (xconn.xlib.XChangeProperty)(
                xconn.display,
                window,
                xconn.atoms._NET_WM_NAME,
                xconn.atoms.UTF8_STRING,
                8,
                xlib::PropModeReplace,
                title.as_ptr(),
                title.len() as c_int,
            );

            let mut protocols = [xconn.atoms.WM_DELETE_WINDOW];
            (xconn.xlib.XSetWMProtocols)(xconn.display, window, protocols.as_mut_ptr(), 1);

            // The window manager should honor the requested placement.
            let mut size_hints: xlib::XSizeHints = mem::zeroed();
            size_hints.flags = xlib::USPosition | xlib::USSize;
            size_hints.x = rect.left();
            size_hints.y = rect.top();
            size_hints.width = size.width as c_int;
            size_hints.height = size.height as c_int;
            if !attributes.style.contains(WindowStyle::RESIZE) {
                size_hints.flags |= xlib::PMinSize | xlib::PMaxSize;
                size_hints.min_width = size.width as c_int;
                size_hints.max_width = size.width as c_int;
                size_hints.min_height = size.height as c_int;
                size_hints.max_height = size.height as c_int;
            }
            (xconn.xlib.XSetWMNormalHints)(xconn.display, window, &mut size_hints);
        }

        if let Err(err) = xconn.set_motif_hints(window, &motif_hints(attributes.style, true)) {
            warn!(%err, "failed to set window decorations");
        }

        let ic = self.create_input_context(window);

        if !attributes.style.contains(WindowStyle::HIDDEN) {
            unsafe { (xconn.xlib.XMapRaised)(xconn.display, window) };
        }

        if let Err(err) = xconn.sync() {
            self.destroy_window_and_ic(window, ic);
            return Err(os_error!(err).into());
        }

        self.windows.borrow_mut().insert(window, WindowData { ic });
        debug!(window, ?rect, "created X window");
        Ok(NativeWindow { handle: window, rect, client_size: size })
    }

    fn create_input_context(&self, window: xlib::Window) -> xlib::XIC {
        let xconn = &self.xconn;
        if xconn.im.is_null() {
            return ptr::null_mut();
        }
        let ic = unsafe {
            (xconn.xlib.XCreateIC)(
                xconn.im,
                xlib::XNInputStyle_0.as_ptr(),
                (xlib::XIMPreeditNothing | xlib::XIMStatusNothing) as c_long,
                xlib::XNClientWindow_0.as_ptr(),
                window,
                xlib::XNFocusWindow_0.as_ptr(),
                window,
                ptr::null_mut::<()>(),
            )
        };
        if ic.is_null() {
            warn!(window, "failed to create an input context, key composition is unavailable");
        } else {
            unsafe { (xconn.xlib.XSetICFocus)(ic) };
        }
        ic
    }

    fn destroy_window_and_ic(&self, window: xlib::Window, ic: xlib::XIC) {
        let xconn = &self.xconn;
        unsafe {
            if !ic.is_null() {
                (xconn.xlib.XDestroyIC)(ic);
            }
            (xconn.xlib.XDestroyWindow)(xconn.display, window);
        }
        if let Err(err) = xconn.flush_requests() {
            warn!(%err, window, "failed to destroy X window");
        }
    }

    pub(crate) fn destroy_window(&self, window: xlib::Window) {
        let data = self.windows.borrow_mut().remove(&window);
        let ic = data.map_or(ptr::null_mut(), |data| data.ic);
        self.destroy_window_and_ic(window, ic);
    }

    /// Position of the window origin on the root window.
    pub(crate) fn root_position(&self, window: xlib::Window) -> PhysicalPosition<i32> {
        let xconn = &self.xconn;
        let (mut x, mut y, mut child) = (0, 0, 0);
        unsafe {
            (xconn.xlib.XTranslateCoordinates)(
                xconn.display,
                window,
                xconn.root,
                0,
                0,
                &mut x,
                &mut y,
                &mut child,
            )
        };
        PhysicalPosition::new(x, y)
    }

    pub(crate) fn window_size(&self, window: xlib::Window) -> PhysicalSize<u32> {
        let xconn = &self.xconn;
        let (mut root, mut x, mut y) = (0, 0, 0);
        let (mut width, mut height, mut border, mut depth) = (0, 0, 0, 0);
        let status = unsafe {
            (xconn.xlib.XGetGeometry)(
                xconn.display,
                window,
                &mut root,
                &mut x,
                &mut y,
                &mut width,
                &mut height,
                &mut border,
                &mut depth,
            )
        };
        if status == 0 {
            xconn.ignore_error();
            return PhysicalSize::default();
        }
        PhysicalSize::new(width, height)
    }

    pub(crate) fn window_rect(&self, window: xlib::Window) -> Rect {
        Rect { position: self.root_position(window), size: self.window_size(window) }
    }

    fn flush(&self, what: &'static str) {
        if let Err(err) = self.xconn.flush_requests() {
            warn!(%err, "{what} failed");
        }
    }

    pub(crate) fn apply_cursor(&self, window: xlib::Window, cursor: Option<CursorIcon>) {
        let cursor = *self
            .cursors
            .borrow_mut()
            .entry(cursor)
            .or_insert_with(|| self.xconn.load_cursor(cursor));
        if cursor == 0 {
            warn!("failed to create cursor");
            return;
        }
        unsafe { (self.xconn.xlib.XDefineCursor)(self.xconn.display, window, cursor) };
        self.flush("setting the cursor");
    }

    pub(crate) fn set_visible(&self, window: xlib::Window, visible: bool) {
        unsafe {
            if visible {
                (self.xconn.xlib.XMapRaised)(self.xconn.display, window);
            } else {
                (self.xconn.xlib.XUnmapWindow)(self.xconn.display, window);
            }
        }
        self.flush("showing the window");
    }

    pub(crate) fn focus(&self, window: xlib::Window) {
        unsafe {
            (self.xconn.xlib.XRaiseWindow)(self.xconn.display, window);
            (self.xconn.xlib.XSetInputFocus)(
                self.xconn.display,
                window,
                xlib::RevertToParent,
                xlib::CurrentTime,
            );
        }
        self.flush("focusing the window");
    }

    pub(crate) fn move_resize(&self, window: xlib::Window, rect: Rect) {
        unsafe {
            (self.xconn.xlib.XMoveResizeWindow)(
                self.xconn.display,
                window,
                rect.left(),
                rect.top(),
                rect.size.width.max(1),
                rect.size.height.max(1),
            )
        };
        self.flush("moving the window");
    }

    pub(crate) fn grab_pointer(&self, window: xlib::Window, grab: bool) {
        let xconn = &self.xconn;
        if grab {
            let mask = xlib::ButtonPressMask | xlib::ButtonReleaseMask | xlib::PointerMotionMask;
            let result = unsafe {
                (xconn.xlib.XGrabPointer)(
                    xconn.display,
                    window,
                    xlib::True,
                    mask as c_uint,
                    xlib::GrabModeAsync,
                    xlib::GrabModeAsync,
                    0,
                    0,
                    xlib::CurrentTime,
                )
            };
            if result != xlib::GrabSuccess {
                warn!(window, result, "XGrabPointer failed");
            }
        } else {
            unsafe { (xconn.xlib.XUngrabPointer)(xconn.display, xlib::CurrentTime) };
        }
        self.flush("grabbing the pointer");
    }

    pub(crate) fn warp_pointer(&self, window: xlib::Window, position: PhysicalPosition<i32>) {
        unsafe {
            (self.xconn.xlib.XWarpPointer)(
                self.xconn.display,
                0,
                window,
                0,
                0,
                0,
                0,
                position.x,
                position.y,
            )
        };
        self.flush("warping the pointer");
    }

    pub(crate) fn decorate(&self, window: xlib::Window, style: WindowStyle, show: bool) {
        if let Err(err) = self.xconn.set_motif_hints(window, &motif_hints(style, show)) {
            warn!(%err, window, "failed to change window decorations");
        }
    }

    pub(crate) fn keep_above(&self, window: xlib::Window, topmost: bool) {
        let above = self.xconn.atoms._NET_WM_STATE_ABOVE;
        if let Err(err) = self.xconn.set_net_wm_state(window, StateOperation::from(topmost), above)
        {
            warn!(%err, window, "failed to change the stacking state");
        }
    }

    pub(crate) fn fullscreen(
        &self,
        window: xlib::Window,
        style: WindowStyle,
        fullscreen: bool,
        rect: Rect,
    ) {
        self.decorate(window, style, !fullscreen);
        let state = self.xconn.atoms._NET_WM_STATE_FULLSCREEN;
        if let Err(err) =
            self.xconn.set_net_wm_state(window, StateOperation::from(fullscreen), state)
        {
            warn!(%err, window, "failed to change the fullscreen state");
        }
        self.move_resize(window, rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_drives_decorations() {
        let framed = WindowStyle::TITLEBAR | WindowStyle::RESIZE | WindowStyle::CLOSE;
        assert_eq!(motif_hints(framed, true), MotifHints::decorated(true, true, true));
        assert_eq!(motif_hints(framed, false), MotifHints::decorated(false, true, true));
        assert_eq!(
            motif_hints(WindowStyle::CLOSE, true),
            MotifHints::decorated(false, false, true)
        );
    }
}
