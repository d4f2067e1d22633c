//! Window identity, style and creation attributes.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
pub use dpi::{PhysicalPosition, PhysicalSize};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ConfigError;
use crate::monitor::VideoMode;

/// Largest accepted width or height. Larger requests are clamped.
pub const MAX_WINDOW_EXTENT: u32 = 10_240;

/// Identifier of a window, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowId(u64);

impl WindowId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn into_raw(self) -> u64 {
        self.0
    }

    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

bitflags! {
    /// Window decoration and behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct WindowStyle: u32 {
        const TITLEBAR = 0x01;
        const RESIZE = 0x02;
        const CLOSE = 0x04;
        const FULLSCREEN = 0x08;
        /// A main application window: on Win32 it gets the full overlapped frame and a taskbar
        /// button. Closing it only fires `"close"`, like any other window.
        const APPWINDOW = 0x20;
        const HIDDEN = 0x40;
    }
}

impl Default for WindowStyle {
    fn default() -> Self {
        WindowStyle::TITLEBAR | WindowStyle::RESIZE | WindowStyle::CLOSE | WindowStyle::APPWINDOW
    }
}

/// A rectangle in screen coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub position: PhysicalPosition<i32>,
    pub size: PhysicalSize<u32>,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self { position: PhysicalPosition::new(left, top), size: PhysicalSize::new(width, height) }
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.position.x
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.position.y
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.position.x.saturating_add_unsigned(self.size.width)
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.position.y.saturating_add_unsigned(self.size.height)
    }

    pub fn contains(&self, point: PhysicalPosition<i32>) -> bool {
        (self.left()..self.right()).contains(&point.x)
            && (self.top()..self.bottom()).contains(&point.y)
    }
}

/// Host supplied creation options. Every field is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CreationOptions {
    pub left: Option<i32>,
    pub top: Option<i32>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub bpp: Option<u16>,
    pub style: Option<u32>,
    pub caption: Option<String>,
    pub icon: Option<PathBuf>,
    pub splash: Option<PathBuf>,
    pub display: Option<SmolStr>,
}

/// Attributes used when creating a window.
///
/// Unset geometry and depth are derived from the current video mode of the target display by
/// [`WindowAttributes::rect_on`] and [`WindowAttributes::bpp_on`], one field at a time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WindowAttributes {
    pub left: Option<i32>,
    pub top: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bpp: Option<u16>,
    pub style: WindowStyle,
    pub caption: String,
    pub icon: Option<PathBuf>,
    pub splash: Option<PathBuf>,
    pub display: Option<SmolStr>,
}

impl WindowAttributes {
    /// Build attributes from host options, clamping the size to [`MAX_WINDOW_EXTENT`].
    pub fn from_options(options: Option<&CreationOptions>) -> Result<Self, ConfigError> {
        let options = options.ok_or(ConfigError::MissingOptions)?;
        let style = match options.style {
            Some(bits) => WindowStyle::from_bits(bits).ok_or(ConfigError::UnknownStyle(bits))?,
            None => WindowStyle::default(),
        };
        let attributes = Self {
            left: options.left,
            top: options.top,
            width: options.width.map(clamp_extent),
            height: options.height.map(clamp_extent),
            bpp: options.bpp,
            style,
            caption: options.caption.clone().unwrap_or_default(),
            icon: options.icon.clone(),
            splash: options.splash.clone(),
            display: options.display.clone(),
        };
        attributes.validate()?;
        Ok(attributes)
    }

    pub fn with_position(mut self, position: PhysicalPosition<i32>) -> Self {
        self.left = Some(position.x);
        self.top = Some(position.y);
        self
    }

    pub fn with_size(mut self, size: PhysicalSize<u32>) -> Self {
        self.width = Some(size.width.min(MAX_WINDOW_EXTENT));
        self.height = Some(size.height.min(MAX_WINDOW_EXTENT));
        self
    }

    pub fn with_bpp(mut self, bpp: u16) -> Self {
        self.bpp = Some(bpp);
        self
    }

    pub fn with_style(mut self, style: WindowStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<PathBuf>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_splash(mut self, splash: impl Into<PathBuf>) -> Self {
        self.splash = Some(splash.into());
        self
    }

    pub fn with_display(mut self, display: impl Into<SmolStr>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.caption.contains('\0') {
            return Err(ConfigError::InvalidCaption);
        }
        let empty =
            |path: &Option<PathBuf>| path.as_ref().is_some_and(|p| p.as_os_str().is_empty());
        if empty(&self.icon) || empty(&self.splash) {
            return Err(ConfigError::EmptyPath);
        }
        Ok(())
    }

    /// The window rectangle on a display at `origin` currently in `mode`.
    ///
    /// A missing extent takes the mode's, a missing coordinate centers the window on the display
    /// along that axis without leaving its top-left corner. Given coordinates are absolute.
    pub fn rect_on(&self, mode: &VideoMode, origin: PhysicalPosition<i32>) -> Rect {
        let width = self.width.unwrap_or(mode.width).min(MAX_WINDOW_EXTENT);
        let height = self.height.unwrap_or(mode.height).min(MAX_WINDOW_EXTENT);
        let center = |start: i32, screen: u32, window: u32| {
            start.saturating_add(((screen as i64 - window as i64) / 2).max(0) as i32)
        };
        let left = self.left.unwrap_or_else(|| center(origin.x, mode.width, width));
        let top = self.top.unwrap_or_else(|| center(origin.y, mode.height, height));
        Rect::new(left, top, width, height)
    }

    pub fn bpp_on(&self, mode: &VideoMode) -> u16 {
        self.bpp.unwrap_or(mode.bpp)
    }
}

fn clamp_extent(value: i64) -> u32 {
    value.clamp(0, MAX_WINDOW_EXTENT as i64) as u32
}
