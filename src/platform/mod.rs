//! Backends available to this build.
//!
//! The headless backend is always present. The native one for the target is re-exported as
//! [`DefaultBackend`] when it is enabled.

pub mod headless;

#[cfg(macos_platform)]
pub use ferrowin_appkit as appkit;
#[cfg(windows_platform)]
pub use ferrowin_win32 as win32;
#[cfg(x11_platform)]
pub use ferrowin_x11 as x11;

/// The native backend of the target platform.
#[cfg(macos_platform)]
pub type DefaultBackend = ferrowin_appkit::AppKitBackend;
#[cfg(windows_platform)]
pub type DefaultBackend = ferrowin_win32::Win32Backend;
#[cfg(x11_platform)]
pub type DefaultBackend = ferrowin_x11::X11Backend;
