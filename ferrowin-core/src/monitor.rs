//! Types describing displays and their video modes.
//!
//! Displays are plain snapshots: they are read when asked for and never updated in place.
//! The window core only needs them to derive default geometry and to pick a video mode for
//! fullscreen windows.

use std::cmp::Ordering;

use dpi::PhysicalPosition;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::window::Rect;

/// One resolution a display supports.
///
/// Modes order by depth first, then width, height and refresh rate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VideoMode {
    pub width: u32,
    pub height: u32,
    /// Bits per pixel.
    pub bpp: u16,
    /// Refresh rate in Hz, 0 when unknown.
    pub frequency: u32,
}

impl VideoMode {
    fn key(&self) -> (u16, u32, u32, u32) {
        (self.bpp, self.width, self.height, self.frequency)
    }
}

impl Ord for VideoMode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for VideoMode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort a mode list and drop duplicates.
pub fn normalize_modes(modes: &mut Vec<VideoMode>) {
    modes.sort();
    modes.dedup();
}

/// Pick the mode to switch to for a `width`x`height` fullscreen window.
///
/// An exact size match wins, preferring the requested depth and then the highest refresh
/// rate. Without one the mode with the smallest size difference is used.
pub fn closest_mode(modes: &[VideoMode], width: u32, height: u32, bpp: u16) -> Option<VideoMode> {
    let exact = modes
        .iter()
        .filter(|mode| mode.width == width && mode.height == height)
        .max_by_key(|mode| (mode.bpp == bpp, mode.frequency));
    if let Some(mode) = exact {
        return Some(*mode);
    }
    modes
        .iter()
        .min_by_key(|mode| {
            let distance = mode.width.abs_diff(width) as u64 + mode.height.abs_diff(height) as u64;
            (distance, mode.bpp != bpp, u32::MAX - mode.frequency)
        })
        .copied()
}

/// Information about one display.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Display {
    pub name: SmolStr,
    /// Ratio between physical and logical pixels.
    pub scale: f64,
    pub color_depth: u16,
    /// Assumes balanced channels: 8 for 24 bits and up, 0 otherwise.
    pub color_depth_per_component: u16,
    pub rect: Rect,
    /// The part of `rect` not covered by panels and docks.
    pub work_rect: Rect,
}

impl Display {
    pub fn depth_per_component(color_depth: u16) -> u16 {
        if color_depth >= 24 {
            8
        } else {
            0
        }
    }
}

/// Read-only access to the displays of a system.
pub trait DisplaySource {
    /// All connected displays, primary first.
    fn enumerate(&self) -> Vec<Display>;

    fn primary(&self) -> Option<Display> {
        self.enumerate().into_iter().next()
    }

    /// The display showing the center of `window`, or the primary one.
    fn from_window(&self, window: &Rect) -> Option<Display> {
        let center = PhysicalPosition::new(
            window.left().saturating_add((window.size.width / 2) as i32),
            window.top().saturating_add((window.size.height / 2) as i32),
        );
        let displays = self.enumerate();
        let hit = displays.iter().position(|display| display.rect.contains(center));
        match hit {
            Some(index) => displays.into_iter().nth(index),
            None => displays.into_iter().next(),
        }
    }

    /// Supported modes, sorted and deduplicated.
    fn modes(&self, display: &Display) -> Vec<VideoMode>;

    fn current_mode(&self, display: &Display) -> Option<VideoMode>;
}

/// Everything known about one display at the time of a [`DisplaySnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayInfo {
    pub display: Display,
    pub modes: Vec<VideoMode>,
    pub current: VideoMode,
}

/// A copy of a [`DisplaySource`] that can be queried from any thread.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DisplaySnapshot {
    displays: Vec<DisplayInfo>,
}

impl DisplaySnapshot {
    pub fn new(displays: Vec<DisplayInfo>) -> Self {
        Self { displays }
    }

    pub fn capture(source: &(impl DisplaySource + ?Sized)) -> Self {
        let displays = source
            .enumerate()
            .into_iter()
            .filter_map(|display| {
                let current = source.current_mode(&display)?;
                let modes = source.modes(&display);
                Some(DisplayInfo { display, modes, current })
            })
            .collect();
        Self { displays }
    }

    pub fn displays(&self) -> &[DisplayInfo] {
        &self.displays
    }

    fn info(&self, display: &Display) -> Option<&DisplayInfo> {
        self.displays.iter().find(|info| info.display.name == display.name)
    }

    /// Display by name, falling back to the primary display.
    pub fn by_name(&self, name: Option<&str>) -> Option<&DisplayInfo> {
        name.and_then(|name| self.displays.iter().find(|info| info.display.name == name))
            .or_else(|| self.displays.first())
    }
}

impl DisplaySource for DisplaySnapshot {
    fn enumerate(&self) -> Vec<Display> {
        self.displays.iter().map(|info| info.display.clone()).collect()
    }

    fn modes(&self, display: &Display) -> Vec<VideoMode> {
        self.info(display).map(|info| info.modes.clone()).unwrap_or_default()
    }

    fn current_mode(&self, display: &Display) -> Option<VideoMode> {
        self.info(display).map(|info| info.current)
    }
}
