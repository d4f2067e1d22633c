//! The platform context: the thread that owns every native window and its event pump.
//!
//! [`PlatformContext::new`] starts the platform thread and hands back the consumer's
//! [`MainLoop`]. Consumers talk to the platform thread through a [`ContextProxy`], which
//! queues commands and wakes the pump. Native events flow the other way as tasks scheduled on
//! the main loop.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use dpi::PhysicalPosition;
use ferrowin_core::backend::{Backend, BackendWaker, Notification};
use ferrowin_core::codec::KeyCache;
use ferrowin_core::error::{NotSupportedError, RequestError};
use ferrowin_core::monitor::{DisplaySnapshot, VideoMode};
use ferrowin_core::os_error;
use ferrowin_core::window::{WindowAttributes, WindowId, WindowStyle};
use tracing::{debug, trace, trace_span, warn};

use crate::dispatch::{self, MainLoop, MainLoopProxy, DEFAULT_BATCH_LIMIT};
use crate::window::WindowShared;
use crate::window_state::WindowState;

/// Environment variable overriding [`ContextConfig::tick`], in ticks per second.
pub const TICK_HZ_ENV: &str = "FERROWIN_TICK_HZ";

/// Used for default geometry when the backend reports no display at all.
const FALLBACK_MODE: VideoMode = VideoMode { width: 640, height: 480, bpp: 32, frequency: 60 };

/// Tuning of a [`PlatformContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Tasks the consumer runs per pass.
    pub batch_limit: usize,
    /// Consumer tick, for [`MainLoop::run`].
    pub tick: Duration,
    /// Longest wait of the platform thread for native events between command checks.
    pub pump_timeout: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
            tick: Duration::from_secs(1) / 30,
            pump_timeout: Duration::from_millis(16),
        }
    }
}

impl ContextConfig {
    /// The defaults, with the tick taken from `FERROWIN_TICK_HZ` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = env::var(TICK_HZ_ENV) {
            match value.trim().parse::<u32>() {
                Ok(hz) if hz > 0 => config.tick = Duration::from_secs(1) / hz,
                _ => warn!("ignoring {TICK_HZ_ENV}={value:?}, expected a positive integer"),
            }
        }
        config
    }
}

pub(crate) type WindowOp<B> = Box<dyn FnOnce(&B, &mut WindowState<B>) + Send>;

pub(crate) enum Command<B: Backend> {
    Create {
        shared: Arc<WindowShared<B>>,
        attributes: WindowAttributes,
        reply: SyncSender<Result<(), RequestError>>,
    },
    Window {
        id: WindowId,
        op: WindowOp<B>,
    },
    Flush(SyncSender<()>),
    Shutdown,
}

/// Sends work to the platform thread. Cheap to clone, usable from any thread.
pub struct ContextProxy<B: Backend> {
    commands: Sender<Command<B>>,
    waker: B::Waker,
    platform_thread: ThreadId,
    displays: Arc<RwLock<DisplaySnapshot>>,
    main_loop: MainLoopProxy,
}

impl<B: Backend> Clone for ContextProxy<B> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            waker: self.waker.clone(),
            platform_thread: self.platform_thread,
            displays: self.displays.clone(),
            main_loop: self.main_loop.clone(),
        }
    }
}

impl<B: Backend> fmt::Debug for ContextProxy<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextProxy")
            .field("platform_thread", &self.platform_thread)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> ContextProxy<B> {
    pub(crate) fn send(&self, command: Command<B>) -> Result<(), RequestError> {
        self.commands.send(command).map_err(|_| RequestError::Terminated)?;
        self.waker.wake();
        Ok(())
    }

    /// The displays as of start-up or the last display change.
    pub fn displays(&self) -> DisplaySnapshot {
        self.displays.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Current mode of the named display, or of the primary one.
    pub fn current_mode(&self, display: Option<&str>) -> Option<VideoMode> {
        let displays = self.displays.read().unwrap_or_else(PoisonError::into_inner);
        displays.by_name(display).map(|info| info.current)
    }

    /// Block until every command sent before this call, and the native events pending when
    /// it was processed, have been handled.
    ///
    /// Fails with [`RequestError::Reentrant`] on the platform thread, which would wait on itself.
    pub fn flush(&self) -> Result<(), RequestError> {
        if self.is_platform_thread() {
            return Err(RequestError::Reentrant);
        }
        let (done, flushed) = mpsc::sync_channel(1);
        self.send(Command::Flush(done))?;
        flushed.recv().map_err(|_| RequestError::Terminated)
    }

    pub fn is_platform_thread(&self) -> bool {
        thread::current().id() == self.platform_thread
    }

    /// The queue native events are dispatched through.
    pub fn main_loop(&self) -> &MainLoopProxy {
        &self.main_loop
    }

    /// Ask the platform thread to destroy every window and exit.
    pub fn shutdown(&self) {
        let _ = self.send(Command::Shutdown);
    }
}

/// Owner of the platform thread.
///
/// Dropping the context shuts the platform thread down and joins it.
pub struct PlatformContext<B: Backend> {
    proxy: ContextProxy<B>,
    thread: Option<JoinHandle<()>>,
}

impl<B: Backend> fmt::Debug for PlatformContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformContext").field("proxy", &self.proxy).finish_non_exhaustive()
    }
}

impl<B: Backend> PlatformContext<B> {
    /// Start a platform thread running the backend built by `make_backend`.
    ///
    /// Blocks until the backend is up. Backends whose pump must run on the process main
    /// thread are refused; use [`PlatformContext::run_on_current_thread`] for them.
    pub fn new<F>(config: ContextConfig, make_backend: F) -> Result<(Self, MainLoop), RequestError>
    where
        F: FnOnce() -> Result<B, RequestError> + Send + 'static,
    {
        if B::MAIN_THREAD_ONLY {
            let reason = "a platform thread other than the main thread";
            return Err(NotSupportedError::new(reason).into());
        }

        let (main_loop_proxy, main_loop) = dispatch::channel(config.batch_limit);
        let (commands, receiver) = mpsc::channel();
        let (ready, started) = mpsc::sync_channel(1);
        let displays = Arc::new(RwLock::new(DisplaySnapshot::default()));

        let thread_displays = displays.clone();
        let thread_main_loop = main_loop_proxy.clone();
        let thread = thread::Builder::new()
            .name("ferrowin-platform".into())
            .spawn(move || {
                let backend = match make_backend() {
                    Ok(backend) => backend,
                    Err(err) => {
                        let _ = ready.send(Err(err));
                        return;
                    },
                };
                *thread_displays.write().unwrap_or_else(PoisonError::into_inner) =
                    DisplaySnapshot::capture(&backend);
                if ready.send(Ok(backend.waker())).is_err() {
                    return;
                }
                Runtime::new(backend, receiver, thread_main_loop, thread_displays, config).run();
            })
            .map_err(|err| os_error!(err))?;

        let waker = match started.recv() {
            Ok(Ok(waker)) => waker,
            Ok(Err(err)) => {
                let _ = thread.join();
                return Err(err);
            },
            Err(_) => {
                let _ = thread.join();
                return Err(RequestError::Terminated);
            },
        };

        let proxy = ContextProxy {
            commands,
            waker,
            platform_thread: thread.thread().id(),
            displays,
            main_loop: main_loop_proxy,
        };
        debug!("platform thread started");
        Ok((Self { proxy, thread: Some(thread) }, main_loop))
    }

    /// Run the platform side on the calling thread until shutdown, and the consumer on a new
    /// thread.
    ///
    /// `consumer` gets a proxy and the main loop; the context shuts down when it returns.
    pub fn run_on_current_thread<F>(
        config: ContextConfig,
        backend: B,
        consumer: F,
    ) -> Result<(), RequestError>
    where
        F: FnOnce(ContextProxy<B>, MainLoop) + Send + 'static,
    {
        let (main_loop_proxy, main_loop) = dispatch::channel(config.batch_limit);
        let (commands, receiver) = mpsc::channel();
        let displays = Arc::new(RwLock::new(DisplaySnapshot::capture(&backend)));
        let proxy = ContextProxy {
            commands,
            waker: backend.waker(),
            platform_thread: thread::current().id(),
            displays: displays.clone(),
            main_loop: main_loop_proxy.clone(),
        };

        let consumer = thread::Builder::new()
            .name("ferrowin-consumer".into())
            .spawn(move || {
                let shutdown = proxy.clone();
                consumer(proxy, main_loop);
                shutdown.shutdown();
            })
            .map_err(|err| os_error!(err))?;

        Runtime::new(backend, receiver, main_loop_proxy, displays, config).run();
        consumer.join().map_err(|_| os_error!("consumer thread panicked"))?;
        Ok(())
    }

    pub fn proxy(&self) -> &ContextProxy<B> {
        &self.proxy
    }

    /// Destroy every window, stop the platform thread and wait for it.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else { return };
        self.proxy.shutdown();
        if thread.join().is_err() {
            warn!("platform thread panicked");
        }
    }
}

impl<B: Backend> Drop for PlatformContext<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Everything the platform thread owns.
struct Runtime<B: Backend> {
    backend: B,
    windows: HashMap<WindowId, WindowState<B>>,
    handles: HashMap<B::Handle, WindowId>,
    commands: Receiver<Command<B>>,
    main_loop: MainLoopProxy,
    displays: Arc<RwLock<DisplaySnapshot>>,
    config: ContextConfig,
}

impl<B: Backend> Runtime<B> {
    fn new(
        backend: B,
        commands: Receiver<Command<B>>,
        main_loop: MainLoopProxy,
        displays: Arc<RwLock<DisplaySnapshot>>,
        config: ContextConfig,
    ) -> Self {
        Self {
            backend,
            windows: HashMap::new(),
            handles: HashMap::new(),
            commands,
            main_loop,
            displays,
            config,
        }
    }

    fn run(mut self) {
        let _span = trace_span!("platform_thread").entered();
        let mut flushes = Vec::new();
        loop {
            let running = self.drain_commands(&mut flushes);
            if !running {
                break;
            }
            // A flush of an idle queue must not wait out the pump timeout.
            let timeout =
                if flushes.is_empty() { self.config.pump_timeout } else { Duration::ZERO };
            if self.pump(timeout) {
                self.refresh_displays();
            }
            self.reap();
            for done in flushes.drain(..) {
                let _ = done.send(());
            }
        }
        self.teardown();
        for done in flushes {
            let _ = done.send(());
        }
    }

    /// Execute queued commands. Returns `false` on shutdown.
    fn drain_commands(&mut self, flushes: &mut Vec<SyncSender<()>>) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(Command::Create { shared, attributes, reply }) => {
                    self.create(shared, attributes, reply)
                },
                Ok(Command::Window { id, op }) => match self.windows.get_mut(&id) {
                    Some(state) => op(&self.backend, state),
                    None => trace!(window = ?id, "operation on a destroyed window"),
                },
                Ok(Command::Flush(done)) => flushes.push(done),
                Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => return false,
                Err(TryRecvError::Empty) => return true,
            }
        }
    }

    fn create(
        &mut self,
        shared: Arc<WindowShared<B>>,
        attributes: WindowAttributes,
        reply: SyncSender<Result<(), RequestError>>,
    ) {
        let _span = trace_span!("create_window", window = ?shared.id).entered();
        let id = shared.id;
        let result = self.create_window(shared, &attributes);
        let created = result.is_ok();
        if reply.send(result).is_err() && created {
            debug!(window = ?id, "creator went away, destroying window");
            if let Some(state) = self.windows.get_mut(&id) {
                state.destroy(&self.backend);
            }
        }
    }

    fn create_window(
        &mut self,
        shared: Arc<WindowShared<B>>,
        attributes: &WindowAttributes,
    ) -> Result<(), RequestError> {
        let (mode, origin) = {
            let displays = self.displays.read().unwrap_or_else(PoisonError::into_inner);
            let display = displays.by_name(attributes.display.as_deref());
            display.map_or((FALLBACK_MODE, PhysicalPosition::default()), |info| {
                (info.current, info.display.rect.position)
            })
        };
        let rect = attributes.rect_on(&mode, origin);
        let bpp = attributes.bpp_on(&mode);
        debug!(?rect, bpp, style = ?attributes.style, "creating native window");

        let native = self.backend.create_native_window(attributes, rect, bpp)?;
        let id = shared.id;
        // Fullscreen is only part of the style once the mode switch went through.
        let style = attributes.style - WindowStyle::FULLSCREEN;
        let mut state = WindowState::new(shared, &native, style, self.main_loop.clone());

        if attributes.style.contains(WindowStyle::FULLSCREEN) {
            let requested =
                VideoMode { width: rect.size.width, height: rect.size.height, bpp, frequency: 0 };
            if let Err(err) = state.switch_to_fullscreen(&self.backend, requested) {
                warn!("video mode switch refused: {err}");
            }
        }
        if let Some(icon) = &attributes.icon {
            state.load_icon(&self.backend, icon);
        }
        if let Some(splash) = &attributes.splash {
            state.use_as_splash_screen(&self.backend, splash);
        }

        self.handles.insert(native.handle, id);
        self.windows.insert(id, state);
        Ok(())
    }

    /// Dispatch native events until the pump returns. Returns whether displays changed.
    fn pump(&mut self, timeout: Duration) -> bool {
        let Self { backend, windows, handles, .. } = self;
        let backend: &B = backend;
        let mut display_changed = false;
        backend.pump_events(Some(timeout), &mut |event| {
            let state = backend
                .event_window(event)
                .and_then(|handle| handles.get(&handle))
                .and_then(|id| windows.get_mut(id));
            match state {
                Some(state) => {
                    let processed = state.process(backend, event);
                    display_changed |= processed.display_changed;
                    processed.handled
                },
                None => {
                    let mut keys = KeyCache::new();
                    match backend.decode_native_event(event, &mut keys) {
                        Notification::DisplayChanged => display_changed = true,
                        Notification::Ignored => {},
                        notification => trace!(?notification, "event for an unknown window"),
                    }
                    false
                },
            }
        });
        display_changed
    }

    fn refresh_displays(&self) {
        debug!("display configuration changed");
        let snapshot = DisplaySnapshot::capture(&self.backend);
        *self.displays.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    fn reap(&mut self) {
        let before = self.windows.len();
        self.windows.retain(|_, state| !state.is_destroyed());
        if self.windows.len() != before {
            let windows = &self.windows;
            self.handles.retain(|_, id| windows.contains_key(id));
        }
    }

    fn teardown(&mut self) {
        debug!(windows = self.windows.len(), "platform thread shutting down");
        for state in self.windows.values_mut() {
            state.destroy(&self.backend);
        }
        self.windows.clear();
        self.handles.clear();
        self.main_loop.terminate();
    }
}
