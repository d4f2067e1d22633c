//! ferrowin is the window core of a scripting host: native windows owned by one platform
//! thread, input normalized to one [`InputEvent`] layout on every system, and host callbacks
//! delivered in order on the consumer thread.
//!
//! # Threads
//!
//! A [`PlatformContext`] owns the platform thread, which makes every native windowing call
//! and pumps native events. The consumer thread creates [`Window`]s through a
//! [`ContextProxy`], registers callbacks with [`Window::on`], and runs the [`MainLoop`] those
//! callbacks are dispatched on.
//!
//! ```no_run
//! # #[cfg(any(target_os = "windows", all(target_os = "linux", feature = "x11")))]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ferrowin::{ContextConfig, Window, WindowAttributes};
//!
//! let config = ContextConfig::from_env();
//! let (context, mut main_loop) = ferrowin::init(config)?;
//! let window = Window::new(context.proxy(), WindowAttributes::default().with_caption("demo"))?;
//! let main_loop_proxy = context.proxy().main_loop().clone();
//! window.on("close", move |_| {
//!     main_loop_proxy.terminate();
//!     Ok(())
//! });
//! main_loop.run(config.tick);
//! # Ok(())
//! # }
//! # #[cfg(not(any(target_os = "windows", all(target_os = "linux", feature = "x11"))))]
//! # fn main() {}
//! ```
//!
//! # Events
//!
//! Callbacks are keyed by name: `"resize"`, `"close"`, the input names of
//! [`EventKind::name`], `"message"` for raw native messages and `"drag_accept_files"` for file
//! drops. Errors and panics raised by callbacks are logged and otherwise ignored.
//!
//! [`EventKind::name`]: event::EventKind::name

pub use ferrowin_core::{backend, codec, cursor, error, event, monitor};

pub use crate::context::{ContextConfig, ContextProxy, PlatformContext, TICK_HZ_ENV};
pub use crate::dispatch::{MainLoop, MainLoopProxy, TaskResult, DEFAULT_BATCH_LIMIT};
pub use crate::emitter::{Callback, CallbackResult, EventEmitter};
pub use crate::sink::{EventSink, SinkChain, SinkRegistration};
pub use crate::window::{Lifecycle, Window, WindowEvent};
pub use ferrowin_core::event::InputEvent;
pub use ferrowin_core::window::{
    CreationOptions, Rect, WindowAttributes, WindowId, WindowStyle, MAX_WINDOW_EXTENT,
};
pub use dpi;

mod context;
pub mod dispatch;
mod emitter;
pub mod platform;
mod sink;
mod window;
mod window_state;

/// Start the native backend of this platform on its own thread.
#[cfg(any(windows_platform, x11_platform))]
pub fn init(
    config: ContextConfig,
) -> Result<(PlatformContext<platform::DefaultBackend>, MainLoop), error::RequestError> {
    PlatformContext::new(config, platform::DefaultBackend::new)
}
