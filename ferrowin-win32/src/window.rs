use std::path::Path;
use std::{io, mem, ptr};

use cursor_icon::CursorIcon;
use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::backend::NativeWindow;
use ferrowin_core::error::{ConfigError, RequestError};
use ferrowin_core::os_error;
use ferrowin_core::window::{Rect, WindowAttributes, WindowStyle};
use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{POINT, RECT};
use windows_sys::Win32::Graphics::Gdi::{ClientToScreen, InvalidateRect};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{ReleaseCapture, SetCapture, SetFocus};
use windows_sys::Win32::UI::Shell::DragAcceptFiles;
use windows_sys::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRectEx, CreateWindowExW, DestroyWindow, GetWindowLongW, LoadCursorW,
    SetCursor, SetCursorPos, SetWindowLongW, SetWindowPos, ShowWindow, GWL_EXSTYLE, GWL_STYLE,
    HWND_NOTOPMOST, HWND_TOPMOST, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
    SWP_NOZORDER, SWP_SHOWWINDOW, SW_HIDE, SW_SHOW, WINDOW_EX_STYLE, WINDOW_STYLE, WS_VISIBLE,
};

use crate::event_loop::{Hwnd, Win32Backend, THREAD_STATE};
use crate::icon::WinIcon;
use crate::splash::SplashBitmap;
use crate::util;

/// Outer rectangle of a window whose client area covers `client`.
fn outer_rect(client: Rect, style: WINDOW_STYLE, ex_style: WINDOW_EX_STYLE) -> Rect {
    let mut rect = util::to_rect(&client);
    if unsafe { AdjustWindowRectEx(&mut rect, style, 0, ex_style) } == 0 {
        return client;
    }
    util::from_rect(&rect)
}

/// Position of a `size` rectangle centered in `area`.
fn centered(area: Rect, size: PhysicalSize<u32>) -> PhysicalPosition<i32> {
    let offset = |outer: u32, inner: u32| ((outer as i64 - inner as i64) / 2) as i32;
    PhysicalPosition::new(
        area.left() + offset(area.size.width, size.width),
        area.top() + offset(area.size.height, size.height),
    )
}

impl Win32Backend {
    pub(crate) fn create_window(
        &self,
        attributes: &WindowAttributes,
        rect: Rect,
        bpp: u16,
    ) -> Result<NativeWindow<Hwnd>, RequestError> {
        if attributes.caption.contains('\0') {
            return Err(ConfigError::InvalidCaption.into());
        }
        let caption = util::encode_wide(&attributes.caption);

        let style = attributes.style;
        let fullscreen = style.contains(WindowStyle::FULLSCREEN);
        let (mut native, ex_style) = if fullscreen {
            util::fullscreen_styles(style)
        } else {
            util::window_styles(style)
        };
        // A splash screen shows its window once the bitmap is in place.
        if !style.contains(WindowStyle::HIDDEN) && attributes.splash.is_none() {
            native |= WS_VISIBLE;
        }
        let outer = if fullscreen { rect } else { outer_rect(rect, native, ex_style) };
        debug!(?outer, bpp, "CreateWindowExW");

        let hwnd = unsafe {
            CreateWindowExW(
                ex_style,
                self.class_name.as_ptr(),
                caption.as_ptr(),
                native,
                outer.left(),
                outer.top(),
                outer.size.width as i32,
                outer.size.height as i32,
                ptr::null_mut(),
                ptr::null_mut(),
                util::get_instance_handle(),
                ptr::null(),
            )
        };
        if hwnd.is_null() {
            return Err(os_error!(io::Error::last_os_error()).into());
        }

        let handle = Hwnd::from(hwnd);
        Ok(NativeWindow {
            handle,
            rect: util::window_rect(hwnd).unwrap_or(outer),
            client_size: util::client_size(hwnd).unwrap_or(rect.size),
        })
    }

    pub(crate) fn destroy_window(&self, handle: Hwnd) {
        if unsafe { DestroyWindow(handle.hwnd()) } == 0 {
            warn!(?handle, "DestroyWindow failed: {}", io::Error::last_os_error());
        }
        self.icons.borrow_mut().remove(&handle);
    }

    pub(crate) fn apply_cursor(&self, cursor: Option<CursorIcon>) {
        let cursor = match cursor {
            Some(icon) => unsafe { LoadCursorW(ptr::null_mut(), util::to_windows_cursor(icon)) },
            None => ptr::null_mut(),
        };
        unsafe { SetCursor(cursor) };
    }

    pub(crate) fn set_visible(&self, handle: Hwnd, visible: bool) {
        unsafe { ShowWindow(handle.hwnd(), if visible { SW_SHOW } else { SW_HIDE }) };
    }

    pub(crate) fn focus(&self, handle: Hwnd) {
        unsafe { SetFocus(handle.hwnd()) };
    }

    pub(crate) fn move_resize(&self, handle: Hwnd, rect: Rect) {
        unsafe {
            SetWindowPos(
                handle.hwnd(),
                ptr::null_mut(),
                rect.left(),
                rect.top(),
                rect.size.width as i32,
                rect.size.height as i32,
                SWP_NOZORDER | SWP_NOACTIVATE,
            )
        };
    }

    pub(crate) fn capture(&self, handle: Hwnd, capture: bool) {
        unsafe {
            if capture {
                SetCapture(handle.hwnd());
            } else {
                ReleaseCapture();
            }
        }
    }

    pub(crate) fn warp_cursor(&self, handle: Hwnd, position: PhysicalPosition<i32>) {
        let mut point = POINT { x: position.x, y: position.y };
        unsafe {
            ClientToScreen(handle.hwnd(), &mut point);
            SetCursorPos(point.x, point.y);
        }
    }

    /// Replace the window styles, keeping visibility, and let the frame recompute.
    fn restyle(&self, handle: Hwnd, style: WINDOW_STYLE, ex_style: WINDOW_EX_STYLE) {
        let hwnd = handle.hwnd();
        let visible = unsafe { GetWindowLongW(hwnd, GWL_STYLE) } as u32 & WS_VISIBLE;
        unsafe {
            SetWindowLongW(hwnd, GWL_STYLE, (style | visible) as i32);
            SetWindowLongW(hwnd, GWL_EXSTYLE, ex_style as i32);
        }
    }

    pub(crate) fn frame(&self, handle: Hwnd, style: WindowStyle, show: bool) {
        let (native, ex_style) =
            if show { util::window_styles(style) } else { util::fullscreen_styles(style) };
        self.restyle(handle, native, ex_style);
        unsafe {
            SetWindowPos(
                handle.hwnd(),
                ptr::null_mut(),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE | SWP_FRAMECHANGED,
            )
        };
    }

    pub(crate) fn topmost(&self, handle: Hwnd, topmost: bool) {
        let insert_after = if topmost { HWND_TOPMOST } else { HWND_NOTOPMOST };
        unsafe {
            SetWindowPos(
                handle.hwnd(),
                insert_after,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
        };
    }

    pub(crate) fn fullscreen(
        &self,
        handle: Hwnd,
        style: WindowStyle,
        fullscreen: bool,
        rect: Rect,
    ) {
        let (native, ex_style) = if fullscreen {
            util::fullscreen_styles(style)
        } else {
            util::window_styles(style)
        };
        self.restyle(handle, native, ex_style);
        let insert_after = if fullscreen { HWND_TOPMOST } else { HWND_NOTOPMOST };
        unsafe {
            SetWindowPos(
                handle.hwnd(),
                insert_after,
                rect.left(),
                rect.top(),
                rect.size.width as i32,
                rect.size.height as i32,
                SWP_FRAMECHANGED | SWP_NOACTIVATE,
            )
        };
    }

    pub(crate) fn accept_files(&self, handle: Hwnd, accept: bool) {
        unsafe { DragAcceptFiles(handle.hwnd(), accept as i32) };
    }

    pub(crate) fn set_icon(&self, handle: Hwnd, path: &Path) -> Result<(), RequestError> {
        let icon = WinIcon::from_path(path).map_err(|err| os_error!(err))?;
        icon.apply(handle);
        // The previous icons stay alive until the window no longer uses them.
        self.icons.borrow_mut().insert(handle, icon);
        Ok(())
    }

    /// Paint a bitmap over the whole window and center it, frameless and above other windows,
    /// on its display.
    pub(crate) fn splash(&self, handle: Hwnd, path: &Path) -> Result<(), RequestError> {
        let bitmap = SplashBitmap::load(path).map_err(|err| os_error!(err))?;
        let size = PhysicalSize::new(bitmap.width().max(0) as u32, bitmap.height() as u32);
        THREAD_STATE.with(|state| state.splashes.borrow_mut().insert(handle, bitmap));

        let hwnd = handle.hwnd();
        let (native, _) = util::fullscreen_styles(WindowStyle::empty());
        let ex_style = unsafe { GetWindowLongW(hwnd, GWL_EXSTYLE) } as u32;
        self.restyle(handle, native, ex_style);

        let area = self.display_rect(handle);
        let position = centered(area, size);
        let mut rect: RECT = unsafe { mem::zeroed() };
        rect.right = size.width as i32;
        rect.bottom = size.height as i32;
        unsafe {
            SetWindowPos(
                hwnd,
                HWND_TOPMOST,
                position.x,
                position.y,
                size.width as i32,
                size.height as i32,
                SWP_SHOWWINDOW | SWP_FRAMECHANGED,
            );
            InvalidateRect(hwnd, &rect, 0);
        }
        Ok(())
    }
}
