use std::ffi::c_int;
use std::slice;

use ferrowin_core::error::{NotSupportedError, RequestError};
use ferrowin_core::monitor::{Display, DisplaySource, VideoMode};
use ferrowin_core::os_error;
use ferrowin_core::window::Rect;
use tracing::{debug, warn};
use x11_dl::xlib;

use crate::event_loop::{SavedMode, X11Backend};
use crate::util::{combine_modes, Output};

/// Name reported for the screen when RandR 1.2 is unavailable.
const DEFAULT_DISPLAY_NAME: &str = "default";

impl X11Backend {
    fn outputs(&self) -> Vec<Output> {
        if self.randr_1_2 {
            self.xconn.randr_outputs()
        } else {
            Vec::new()
        }
    }

    fn default_screen(&self) -> Output {
        let xconn = &self.xconn;
        let width = unsafe { (xconn.xlib.XDisplayWidth)(xconn.display, xconn.screen) };
        let height = unsafe { (xconn.xlib.XDisplayHeight)(xconn.display, xconn.screen) };
        let (width, height) = (width.max(0) as u32, height.max(0) as u32);
        let depth = xconn.default_depth();
        let rect = Rect::new(0, 0, width, height);
        Output {
            display: Display {
                name: DEFAULT_DISPLAY_NAME.into(),
                scale: 1.0,
                color_depth: depth,
                color_depth_per_component: Display::depth_per_component(depth),
                rect,
                work_rect: rect,
            },
            primary: true,
            sizes: vec![(width, height, 0)],
            current: (width, height, 0),
        }
    }

    fn output(&self, display: &Display) -> Option<Output> {
        let mut outputs = self.outputs();
        if outputs.is_empty() {
            outputs.push(self.default_screen());
        }
        outputs.into_iter().find(|output| output.display.name == display.name)
    }

    /// Switch the screen to the size of `mode` through the RandR screen configuration.
    ///
    /// The configuration in effect before the first switch is kept for
    /// [`X11Backend::restore_mode`].
    pub(crate) fn switch_mode(&self, mode: &VideoMode) -> Result<(), RequestError> {
        let xconn = &self.xconn;
        let xrandr =
            xconn.xrandr.as_ref().ok_or(NotSupportedError::new("video modes without RandR"))?;
        let config = unsafe { (xrandr.XRRGetScreenInfo)(xconn.display, xconn.root) };
        if config.is_null() {
            return Err(os_error!("XRRGetScreenInfo failed").into());
        }

        let mut count: c_int = 0;
        let sizes = unsafe { (xrandr.XRRConfigSizes)(config, &mut count) };
        let sizes = if sizes.is_null() || count <= 0 {
            &[][..]
        } else {
            unsafe { slice::from_raw_parts(sizes, count as usize) }
        };
        let index = sizes.iter().position(|size| {
            size.width as u32 == mode.width && size.height as u32 == mode.height
        });
        let Some(index) = index else {
            unsafe { (xrandr.XRRFreeScreenConfigInfo)(config) };
            return Err(NotSupportedError::new("no screen size matches the video mode").into());
        };

        let mut rotation = 0;
        let current = unsafe { (xrandr.XRRConfigCurrentConfiguration)(config, &mut rotation) };
        if self.saved_mode.get().is_none() {
            let rate = unsafe { (xrandr.XRRConfigCurrentRate)(config) };
            self.saved_mode.set(Some(SavedMode { size_index: current, rotation, rate }));
        }

        let mut rate_count: c_int = 0;
        let rates = unsafe { (xrandr.XRRConfigRates)(config, index as c_int, &mut rate_count) };
        let rates = if rates.is_null() || rate_count <= 0 {
            &[][..]
        } else {
            unsafe { slice::from_raw_parts(rates, rate_count as usize) }
        };
        let rate = rates
            .iter()
            .copied()
            .find(|&rate| rate as u32 == mode.frequency)
            .or_else(|| rates.iter().copied().max())
            .unwrap_or(0);

        let status = unsafe {
            (xrandr.XRRSetScreenConfigAndRate)(
                xconn.display,
                config,
                xconn.root,
                index as c_int,
                rotation,
                rate,
                xlib::CurrentTime,
            )
        };
        unsafe { (xrandr.XRRFreeScreenConfigInfo)(config) };

        if status != 0 {
            return Err(os_error!(format!("XRRSetScreenConfigAndRate refused {mode:?}")).into());
        }
        debug!(?mode, rate, "switched video mode");
        Ok(())
    }

    pub(crate) fn restore_mode(&self) {
        let Some(saved) = self.saved_mode.take() else {
            return;
        };
        let xconn = &self.xconn;
        let Some(xrandr) = &xconn.xrandr else {
            return;
        };
        let config = unsafe { (xrandr.XRRGetScreenInfo)(xconn.display, xconn.root) };
        if config.is_null() {
            warn!("XRRGetScreenInfo failed, the video mode stays switched");
            return;
        }
        let status = unsafe {
            (xrandr.XRRSetScreenConfigAndRate)(
                xconn.display,
                config,
                xconn.root,
                saved.size_index as c_int,
                saved.rotation,
                saved.rate,
                xlib::CurrentTime,
            )
        };
        unsafe { (xrandr.XRRFreeScreenConfigInfo)(config) };
        if status != 0 {
            warn!(status, "failed to restore the video mode");
        }
    }
}

impl DisplaySource for X11Backend {
    fn enumerate(&self) -> Vec<Display> {
        let outputs = self.outputs();
        if outputs.is_empty() {
            return vec![self.default_screen().display];
        }
        outputs.into_iter().map(|output| output.display).collect()
    }

    fn modes(&self, display: &Display) -> Vec<VideoMode> {
        let Some(output) = self.output(display) else {
            return Vec::new();
        };
        combine_modes(&output.sizes, &self.xconn.depths())
    }

    fn current_mode(&self, display: &Display) -> Option<VideoMode> {
        let output = self.output(display)?;
        let (width, height, frequency) = output.current;
        Some(VideoMode { width, height, bpp: self.xconn.default_depth(), frequency })
    }
}
