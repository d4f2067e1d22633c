//! Screens, and the flip between AppKit's bottom-left and the top-left coordinate space.
//!
//! Rectangles are reported in points. `Display::scale` holds the backing scale factor.

use ferrowin_core::error::{NotSupportedError, RequestError};
use ferrowin_core::monitor::{Display, DisplaySource, VideoMode};
use ferrowin_core::window::Rect;
use objc2::rc::Retained;
use objc2_app_kit::{NSBitsPerPixelFromDepth, NSScreen};
use objc2_foundation::{MainThreadMarker, NSPoint, NSRect, NSSize};
use smol_str::SmolStr;

use crate::app::AppKitBackend;

/// Height of the screen holding the menu bar, the origin of both coordinate spaces.
pub(crate) fn primary_height(mtm: MainThreadMarker) -> f64 {
    NSScreen::screens(mtm).firstObject().map_or(0.0, |screen| screen.frame().size.height)
}

/// An AppKit frame in top-left screen coordinates.
pub(crate) fn from_ns_rect(frame: NSRect, primary_height: f64) -> Rect {
    let top = primary_height - (frame.origin.y + frame.size.height);
    Rect::new(
        frame.origin.x.round() as i32,
        top.round() as i32,
        frame.size.width.max(0.0).round() as u32,
        frame.size.height.max(0.0).round() as u32,
    )
}

pub(crate) fn to_ns_rect(rect: Rect, primary_height: f64) -> NSRect {
    let height = rect.size.height as f64;
    let y = primary_height - rect.top() as f64 - height;
    NSRect::new(
        NSPoint::new(rect.left() as f64, y),
        NSSize::new(rect.size.width as f64, height),
    )
}

fn describe(screen: &NSScreen, primary_height: f64) -> Display {
    let name = unsafe { screen.localizedName() }.to_string();
    let depth = unsafe { NSBitsPerPixelFromDepth(screen.depth()) };
    let color_depth = u16::try_from(depth).unwrap_or(0);
    Display {
        name: SmolStr::from(name),
        scale: screen.backingScaleFactor(),
        color_depth,
        color_depth_per_component: Display::depth_per_component(color_depth),
        rect: from_ns_rect(screen.frame(), primary_height),
        work_rect: from_ns_rect(screen.visibleFrame(), primary_height),
    }
}

impl AppKitBackend {
    fn screens(&self) -> Vec<Retained<NSScreen>> {
        NSScreen::screens(self.mtm).iter().collect()
    }

    fn screen_named(&self, display: &Display) -> Option<Retained<NSScreen>> {
        let primary_height = primary_height(self.mtm);
        self.screens()
            .into_iter()
            .find(|screen| describe(screen, primary_height).name == display.name)
    }

    pub(crate) fn switch_mode(&self, mode: &VideoMode) -> Result<(), RequestError> {
        tracing::debug!(?mode, "video mode switch requested");
        Err(NotSupportedError::new("video mode switching on macOS").into())
    }
}

impl DisplaySource for AppKitBackend {
    fn enumerate(&self) -> Vec<Display> {
        let primary_height = primary_height(self.mtm);
        self.screens().iter().map(|screen| describe(screen, primary_height)).collect()
    }

    /// Only the mode in use; the size is in points.
    fn modes(&self, display: &Display) -> Vec<VideoMode> {
        self.current_mode(display).into_iter().collect()
    }

    fn current_mode(&self, display: &Display) -> Option<VideoMode> {
        let screen = self.screen_named(display)?;
        let size = screen.frame().size;
        let frequency = unsafe { screen.maximumFramesPerSecond() };
        Some(VideoMode {
            width: size.width.round() as u32,
            height: size.height.round() as u32,
            bpp: display.color_depth,
            frequency: u32::try_from(frequency).unwrap_or(0),
        })
    }
}
