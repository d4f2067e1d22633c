use std::ffi::c_int;
use std::slice;

use ferrowin_core::monitor::{normalize_modes, Display, VideoMode};
use ferrowin_core::window::Rect;
use smol_str::SmolStr;
use tracing::warn;

use crate::xdisplay::XConnection;

const RR_ROTATE_90: u16 = 2;
const RR_ROTATE_270: u16 = 8;
const RR_INTERLACE: u64 = 0x10;
const RR_CONNECTED: u16 = 0;

/// Refresh rate of a mode line in Hz, rounded.
pub fn refresh_rate(dot_clock: u64, htotal: u32, vtotal: u32) -> u32 {
    if dot_clock > 0 && htotal > 0 && vtotal > 0 {
        let millihertz = dot_clock * 1000 / (htotal as u64 * vtotal as u64);
        ((millihertz as f64) / 1000.0).round() as u32
    } else {
        0
    }
}

/// Size of a CRTC as the user sees it. A quarter turn swaps the axes.
pub fn rotated_size(width: u32, height: u32, rotation: u16) -> (u32, u32) {
    if rotation & (RR_ROTATE_90 | RR_ROTATE_270) != 0 {
        (height, width)
    } else {
        (width, height)
    }
}

/// Every supported depth combined with every `(width, height, frequency)` size.
pub fn combine_modes(sizes: &[(u32, u32, u32)], depths: &[u16]) -> Vec<VideoMode> {
    let mut modes: Vec<_> = depths
        .iter()
        .flat_map(|&bpp| {
            sizes.iter().map(move |&(width, height, frequency)| VideoMode {
                width,
                height,
                bpp,
                frequency,
            })
        })
        .collect();
    normalize_modes(&mut modes);
    modes
}

/// One connected output as RandR 1.2 reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub display: Display,
    pub primary: bool,
    /// `(width, height, frequency)` of every non interlaced mode.
    pub sizes: Vec<(u32, u32, u32)>,
    pub current: (u32, u32, u32),
}

/// Put the primary output first and keep the others in server order.
pub fn primary_first(outputs: &mut [Output]) {
    if let Some(index) = outputs.iter().position(|output| output.primary) {
        outputs[..=index].rotate_right(1);
    }
}

impl XConnection {
    /// Whether the server speaks RandR 1.2 or later.
    pub fn has_randr_1_2(&self) -> bool {
        let Some(xrandr) = &self.xrandr else {
            return false;
        };
        let (mut event_base, mut error_base) = (0, 0);
        if unsafe { (xrandr.XRRQueryExtension)(self.display, &mut event_base, &mut error_base) }
            == 0
        {
            return false;
        }
        let (mut major, mut minor) = (0, 0);
        if unsafe { (xrandr.XRRQueryVersion)(self.display, &mut major, &mut minor) } == 0 {
            return false;
        }
        major > 1 || (major == 1 && minor >= 2)
    }

    /// Depths the default screen supports, the default one when the list is unavailable.
    pub fn depths(&self) -> Vec<u16> {
        let mut count: c_int = 0;
        let list = unsafe { (self.xlib.XListDepths)(self.display, self.screen, &mut count) };
        if list.is_null() || count <= 0 {
            return vec![self.default_depth()];
        }
        let depths = unsafe { slice::from_raw_parts(list, count as usize) }
            .iter()
            .map(|&depth| depth as u16)
            .collect();
        unsafe { (self.xlib.XFree)(list.cast()) };
        depths
    }

    /// Connected outputs, primary first.
    ///
    /// For each CRTC the primary output is preferred, then the first connected one. Outputs
    /// that share a CRTC are mirrors and are reported once.
    pub fn randr_outputs(&self) -> Vec<Output> {
        let Some(xrandr) = &self.xrandr else {
            return Vec::new();
        };
        let resources = unsafe { (xrandr.XRRGetScreenResources)(self.display, self.root) };
        let Some(res) = (unsafe { resources.as_ref() }) else {
            warn!("XRRGetScreenResources failed");
            return Vec::new();
        };
        let primary = unsafe { (xrandr.XRRGetOutputPrimary)(self.display, self.root) };
        let depth = self.default_depth();
        let crtcs = unsafe { raw_slice(res.crtcs, res.ncrtc) };
        let mode_infos = unsafe { raw_slice(res.modes, res.nmode) };

        let mut outputs = Vec::new();
        for &crtc in crtcs {
            let crtc_info = unsafe { (xrandr.XRRGetCrtcInfo)(self.display, resources, crtc) };
            let Some(info) = (unsafe { crtc_info.as_ref() }) else {
                continue;
            };
            let crtc_outputs = unsafe { raw_slice(info.outputs, info.noutput) };
            let mut chosen = None;
            for &output in crtc_outputs {
                let output_info =
                    unsafe { (xrandr.XRRGetOutputInfo)(self.display, resources, output) };
                let Some(out) = (unsafe { output_info.as_ref() }) else {
                    continue;
                };
                if out.connection as u16 == RR_CONNECTED {
                    let is_primary = output == primary;
                    if chosen.is_none() || is_primary {
                        let name = unsafe { raw_slice(out.name.cast::<u8>(), out.nameLen) };
                        let ids = unsafe { raw_slice(out.modes, out.nmode) };
                        let sizes = mode_infos
                            .iter()
                            .filter(|mode| ids.contains(&mode.id))
                            .filter(|mode| mode.modeFlags as u64 & RR_INTERLACE == 0)
                            .map(|mode| {
                                let frequency =
                                    refresh_rate(mode.dotClock as u64, mode.hTotal, mode.vTotal);
                                (mode.width, mode.height, frequency)
                            })
                            .collect::<Vec<_>>();
                        let name = String::from_utf8_lossy(name).into_owned();
                        chosen = Some((name, is_primary, sizes));
                    }
                }
                unsafe { (xrandr.XRRFreeOutputInfo)(output_info) };
            }

            if let Some((name, primary, sizes)) = chosen {
                let (width, height) = rotated_size(info.width, info.height, info.rotation as u16);
                let current = mode_infos
                    .iter()
                    .find(|mode| mode.id == info.mode)
                    .map(|mode| refresh_rate(mode.dotClock as u64, mode.hTotal, mode.vTotal))
                    .unwrap_or(0);
                let rect = Rect::new(info.x, info.y, width, height);
                outputs.push(Output {
                    display: Display {
                        name: SmolStr::from(name),
                        scale: 1.0,
                        color_depth: depth,
                        color_depth_per_component: Display::depth_per_component(depth),
                        rect,
                        work_rect: rect,
                    },
                    primary,
                    sizes,
                    current: (width, height, current),
                });
            }
            unsafe { (xrandr.XRRFreeCrtcInfo)(crtc_info) };
        }
        unsafe { (xrandr.XRRFreeScreenResources)(resources) };

        primary_first(&mut outputs);
        outputs
    }
}

/// # Safety
///
/// `data` must point to `len` initialized values, or be null.
unsafe fn raw_slice<'a, T>(data: *const T, len: c_int) -> &'a [T] {
    if data.is_null() || len <= 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(data, len as usize) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RR_ROTATE_0: u16 = 1;
    const RR_ROTATE_180: u16 = 4;

    fn output(name: &str, primary: bool) -> Output {
        Output {
            display: Display { name: name.into(), ..Display::default() },
            primary,
            sizes: Vec::new(),
            current: (0, 0, 0),
        }
    }

    #[test]
    fn refresh_rate_from_mode_line() {
        // 1920x1080@60 CVT reduced blanking.
        assert_eq!(refresh_rate(138_500_000, 2080, 1111), 60);
        // 1024x768@75 VESA.
        assert_eq!(refresh_rate(78_750_000, 1312, 800), 75);
        assert_eq!(refresh_rate(0, 2080, 1111), 0);
        assert_eq!(refresh_rate(138_500_000, 0, 1111), 0);
    }

    #[test]
    fn quarter_turns_swap_axes() {
        assert_eq!(rotated_size(1920, 1080, RR_ROTATE_0), (1920, 1080));
        assert_eq!(rotated_size(1920, 1080, RR_ROTATE_90), (1080, 1920));
        assert_eq!(rotated_size(1920, 1080, RR_ROTATE_180), (1920, 1080));
        assert_eq!(rotated_size(1920, 1080, RR_ROTATE_270), (1080, 1920));
    }

    #[test]
    fn every_depth_with_every_size() {
        let sizes = [(1920, 1080, 60), (1280, 720, 60), (1920, 1080, 60)];
        let modes = combine_modes(&sizes, &[24, 16]);
        assert_eq!(modes.len(), 4);
        assert_eq!(modes[0], VideoMode { width: 1280, height: 720, bpp: 16, frequency: 60 });
        assert_eq!(modes[3], VideoMode { width: 1920, height: 1080, bpp: 24, frequency: 60 });
    }

    #[test]
    fn primary_output_moves_to_front() {
        let mut outputs =
            vec![output("DP-1", false), output("DP-2", false), output("HDMI-1", true)];
        primary_first(&mut outputs);
        let names: Vec<_> = outputs.iter().map(|o| o.display.name.as_str()).collect();
        assert_eq!(names, ["HDMI-1", "DP-1", "DP-2"]);

        let mut outputs = vec![output("DP-1", false), output("DP-2", false)];
        primary_first(&mut outputs);
        assert_eq!(outputs[0].display.name, "DP-1");
    }
}
