use std::{io, mem, ptr};

use ferrowin_core::error::RequestError;
use ferrowin_core::monitor::{normalize_modes, Display, DisplaySource, VideoMode};
use ferrowin_core::os_error;
use smol_str::SmolStr;
use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{BOOL, LPARAM, RECT, TRUE};
use windows_sys::Win32::Graphics::Gdi::{
    ChangeDisplaySettingsExW, EnumDisplayMonitors, EnumDisplaySettingsExW, GetMonitorInfoW,
    MonitorFromWindow, CDS_FULLSCREEN, DEVMODEW, DISP_CHANGE_SUCCESSFUL, DM_BITSPERPEL,
    DM_DISPLAYFREQUENCY, DM_PELSHEIGHT, DM_PELSWIDTH, ENUM_CURRENT_SETTINGS, HDC, HMONITOR,
    MONITORINFO, MONITORINFOEXW, MONITOR_DEFAULTTONEAREST,
};
use windows_sys::Win32::UI::HiDpi::{GetDpiForMonitor, MDT_EFFECTIVE_DPI};

use crate::event_loop::{Hwnd, SwitchedDisplay, Win32Backend};
use crate::util;

const MONITORINFOF_PRIMARY: u32 = 1;
const BASE_DPI: u32 = 96;

unsafe extern "system" fn monitor_enum_proc(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _place: *mut RECT,
    data: LPARAM,
) -> BOOL {
    let monitors = data as *mut Vec<HMONITOR>;
    unsafe { (*monitors).push(hmonitor) };
    TRUE // continue enumeration
}

fn available_monitors() -> Vec<HMONITOR> {
    let mut monitors: Vec<HMONITOR> = Vec::new();
    unsafe {
        EnumDisplayMonitors(
            ptr::null_mut(),
            ptr::null(),
            Some(monitor_enum_proc),
            &mut monitors as *mut _ as LPARAM,
        );
    }
    monitors
}

pub(crate) fn get_monitor_info(hmonitor: HMONITOR) -> Result<MONITORINFOEXW, io::Error> {
    let mut monitor_info: MONITORINFOEXW = unsafe { mem::zeroed() };
    monitor_info.monitorInfo.cbSize = mem::size_of::<MONITORINFOEXW>() as u32;
    let status = unsafe {
        GetMonitorInfoW(hmonitor, &mut monitor_info as *mut MONITORINFOEXW as *mut MONITORINFO)
    };
    if status == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(monitor_info)
    }
}

fn scale_factor(hmonitor: HMONITOR) -> f64 {
    let (mut dpi_x, mut dpi_y) = (0, 0);
    let result = unsafe { GetDpiForMonitor(hmonitor, MDT_EFFECTIVE_DPI, &mut dpi_x, &mut dpi_y) };
    if result < 0 || dpi_x == 0 {
        return 1.0;
    }
    dpi_x as f64 / BASE_DPI as f64
}

fn empty_devmode() -> DEVMODEW {
    let mut mode: DEVMODEW = unsafe { mem::zeroed() };
    mode.dmSize = mem::size_of::<DEVMODEW>() as u16;
    mode
}

fn video_mode(mode: &DEVMODEW) -> VideoMode {
    VideoMode {
        width: mode.dmPelsWidth,
        height: mode.dmPelsHeight,
        bpp: mode.dmBitsPerPel as u16,
        frequency: mode.dmDisplayFrequency,
    }
}

/// Every mode a display device reports. `EnumDisplaySettingsExW` repeats modes, which
/// normalizing removes.
fn device_modes(device: &[u16]) -> Vec<VideoMode> {
    let mut modes = Vec::new();
    let mut index = 0;
    loop {
        let mut mode = empty_devmode();
        if unsafe { EnumDisplaySettingsExW(device.as_ptr(), index, &mut mode, 0) } == 0 {
            break;
        }
        index += 1;
        modes.push(video_mode(&mode));
    }
    normalize_modes(&mut modes);
    modes
}

fn current_device_mode(device: &[u16]) -> Option<DEVMODEW> {
    let mut mode = empty_devmode();
    let found =
        unsafe { EnumDisplaySettingsExW(device.as_ptr(), ENUM_CURRENT_SETTINGS, &mut mode, 0) };
    (found != 0).then_some(mode)
}

/// A display device name as a NUL terminated wide string.
fn device_name(display: &Display) -> Vec<u16> {
    util::encode_wide(display.name.as_str())
}

fn describe(hmonitor: HMONITOR) -> Option<(Display, bool)> {
    let info = match get_monitor_info(hmonitor) {
        Ok(info) => info,
        Err(err) => {
            warn!(%err, "GetMonitorInfoW failed");
            return None;
        },
    };
    let device = info.szDevice;
    let color_depth = current_device_mode(&device).map_or(0, |mode| mode.dmBitsPerPel as u16);
    let name = util::decode_wide(&device).to_string_lossy().into_owned();
    let display = Display {
        name: SmolStr::from(name),
        scale: scale_factor(hmonitor),
        color_depth,
        color_depth_per_component: Display::depth_per_component(color_depth),
        rect: util::from_rect(&info.monitorInfo.rcMonitor),
        work_rect: util::from_rect(&info.monitorInfo.rcWork),
    };
    let primary = info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0;
    Some((display, primary))
}

impl Win32Backend {
    fn window_device(&self, handle: Hwnd) -> Option<[u16; 32]> {
        let hmonitor = unsafe { MonitorFromWindow(handle.hwnd(), MONITOR_DEFAULTTONEAREST) };
        get_monitor_info(hmonitor).ok().map(|info| info.szDevice)
    }

    /// Rectangle of the display a window is on.
    pub(crate) fn display_rect(&self, handle: Hwnd) -> ferrowin_core::window::Rect {
        let hmonitor = unsafe { MonitorFromWindow(handle.hwnd(), MONITOR_DEFAULTTONEAREST) };
        match get_monitor_info(hmonitor) {
            Ok(info) => util::from_rect(&info.monitorInfo.rcMonitor),
            Err(_) => self.primary().map(|display| display.rect).unwrap_or_default(),
        }
    }

    /// Change the mode of the display the window is on.
    pub(crate) fn switch_mode(&self, handle: Hwnd, mode: &VideoMode) -> Result<(), RequestError> {
        let device = self
            .window_device(handle)
            .ok_or_else(|| os_error!("the window is on no display"))?;

        let mut devmode = empty_devmode();
        devmode.dmFields = DM_PELSWIDTH | DM_PELSHEIGHT | DM_BITSPERPEL;
        devmode.dmPelsWidth = mode.width;
        devmode.dmPelsHeight = mode.height;
        devmode.dmBitsPerPel = mode.bpp as u32;
        if mode.frequency != 0 {
            devmode.dmFields |= DM_DISPLAYFREQUENCY;
            devmode.dmDisplayFrequency = mode.frequency;
        }

        let result = unsafe {
            ChangeDisplaySettingsExW(
                device.as_ptr(),
                &devmode,
                ptr::null_mut(),
                CDS_FULLSCREEN,
                ptr::null(),
            )
        };
        if result != DISP_CHANGE_SUCCESSFUL {
            return Err(os_error!(format!("ChangeDisplaySettingsExW returned {result}")).into());
        }
        debug!(?mode, "switched video mode");
        self.switched.borrow_mut().get_or_insert(SwitchedDisplay { device: device.to_vec() });
        Ok(())
    }

    pub(crate) fn restore_mode(&self) {
        let Some(switched) = self.switched.borrow_mut().take() else {
            return;
        };
        // A null mode goes back to the registry settings.
        let result = unsafe {
            ChangeDisplaySettingsExW(
                switched.device.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
                0,
                ptr::null(),
            )
        };
        if result != DISP_CHANGE_SUCCESSFUL {
            warn!(result, "failed to restore the video mode");
        }
    }
}

impl DisplaySource for Win32Backend {
    fn enumerate(&self) -> Vec<Display> {
        let mut displays: Vec<_> = available_monitors().into_iter().filter_map(describe).collect();
        if let Some(index) = displays.iter().position(|(_, primary)| *primary) {
            displays[..=index].rotate_right(1);
        }
        displays.into_iter().map(|(display, _)| display).collect()
    }

    fn modes(&self, display: &Display) -> Vec<VideoMode> {
        device_modes(&device_name(display))
    }

    fn current_mode(&self, display: &Display) -> Option<VideoMode> {
        current_device_mode(&device_name(display)).map(|mode| video_mode(&mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devmode_fields() {
        let mut mode = empty_devmode();
        assert_eq!(mode.dmSize as usize, mem::size_of::<DEVMODEW>());
        mode.dmPelsWidth = 1920;
        mode.dmPelsHeight = 1080;
        mode.dmBitsPerPel = 32;
        mode.dmDisplayFrequency = 144;
        let expected = VideoMode { width: 1920, height: 1080, bpp: 32, frequency: 144 };
        assert_eq!(video_mode(&mode), expected);
    }

    #[test]
    fn device_names_are_terminated() {
        let display = Display { name: SmolStr::new_static(r"\\.\DISPLAY1"), ..Display::default() };
        let device = device_name(&display);
        assert_eq!(device.last(), Some(&0));
        assert_eq!(util::decode_wide(&device), r"\\.\DISPLAY1");
    }
}
