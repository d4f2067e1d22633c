use std::path::Path;
use std::{io, ptr};

use windows_sys::Win32::UI::WindowsAndMessaging::{
    DestroyIcon, GetSystemMetrics, LoadImageW, SendMessageW, HICON, ICON_BIG, ICON_SMALL,
    IMAGE_ICON, LR_DEFAULTSIZE, LR_LOADFROMFILE, SM_CXSMICON, SM_CYSMICON, WM_SETICON,
};

use crate::event_loop::Hwnd;
use crate::util;

#[derive(Debug, Clone, Copy)]
pub enum IconType {
    Small = ICON_SMALL as isize,
    Big = ICON_BIG as isize,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct RaiiIcon {
    handle: HICON,
}

impl RaiiIcon {
    /// Load an `.ico` file. A size of zero asks for the system default size.
    pub fn from_path(path: &Path, width: i32, height: i32) -> Result<Self, io::Error> {
        let wide_path = util::encode_wide(path);
        let handle = unsafe {
            LoadImageW(
                ptr::null_mut(),
                wide_path.as_ptr(),
                IMAGE_ICON,
                width,
                height,
                LR_DEFAULTSIZE | LR_LOADFROMFILE,
            )
        };
        if handle.is_null() {
            Err(io::Error::last_os_error())
        } else {
            Ok(Self { handle: handle as HICON })
        }
    }
}

impl Drop for RaiiIcon {
    fn drop(&mut self) {
        unsafe { DestroyIcon(self.handle) };
    }
}

/// The icons a window shows in its title bar and the task switcher. They must outlive their
/// use by the window.
#[derive(Debug)]
pub(crate) struct WinIcon {
    big: RaiiIcon,
    small: RaiiIcon,
}

impl WinIcon {
    pub fn from_path(path: &Path) -> Result<Self, io::Error> {
        let big = RaiiIcon::from_path(path, 0, 0)?;
        let (width, height) =
            unsafe { (GetSystemMetrics(SM_CXSMICON), GetSystemMetrics(SM_CYSMICON)) };
        let small = RaiiIcon::from_path(path, width, height)?;
        Ok(Self { big, small })
    }

    pub fn apply(&self, hwnd: Hwnd) {
        set_icon(hwnd, IconType::Big, self.big.handle);
        set_icon(hwnd, IconType::Small, self.small.handle);
    }
}

fn set_icon(hwnd: Hwnd, icon_type: IconType, icon: HICON) {
    unsafe { SendMessageW(hwnd.hwnd(), WM_SETICON, icon_type as usize, icon as isize) };
}
