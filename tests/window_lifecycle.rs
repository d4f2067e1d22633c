use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ferrowin::codec::win32::{self, Win32Message};
use ferrowin::codec::x11::X11Input;
use ferrowin::cursor::{CursorIcon, StockCursor};
use ferrowin::dpi::{PhysicalPosition, PhysicalSize};
use ferrowin::error::{ConfigError, RequestError};
use ferrowin::event::{EventKind, InputEvent, Modifiers, MouseData, RawMessage};
use ferrowin::monitor::{DisplayInfo, VideoMode};
use ferrowin::platform::headless::{
    default_display, HeadlessBackend, HeadlessController, HeadlessEvent, HeadlessEventKind,
    HeadlessHandle, NativeCall,
};
use ferrowin::{
    ContextConfig, ContextProxy, CreationOptions, EventSink, Lifecycle, MainLoop,
    PlatformContext, Rect, Window, WindowAttributes, WindowEvent, WindowStyle,
};
use tracing_subscriber::EnvFilter;

type Headless = PlatformContext<HeadlessBackend>;

fn start() -> (Headless, MainLoop, HeadlessController) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let (backend, controller) = HeadlessBackend::new();
    let (context, main_loop) =
        PlatformContext::new(ContextConfig::default(), move || Ok(backend)).unwrap();
    (context, main_loop, controller)
}

fn sized(width: u32, height: u32) -> WindowAttributes {
    WindowAttributes::default().with_size(PhysicalSize::new(width, height))
}

fn handle(window: &Window<HeadlessBackend>) -> HeadlessHandle {
    window.native_handle().unwrap()
}

fn push(
    proxy: &ContextProxy<HeadlessBackend>,
    controller: &HeadlessController,
    window: HeadlessHandle,
    kind: HeadlessEventKind,
) {
    controller.push_event(window, kind);
    proxy.flush().unwrap();
}

/// Records the names and events callbacks received, in order.
fn record(window: &Window<HeadlessBackend>, names: &[&str]) -> Arc<Mutex<Vec<WindowEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for name in names {
        let seen = seen.clone();
        window.on(*name, move |event: &WindowEvent| {
            seen.lock().unwrap().push(event.clone());
            Ok(())
        });
    }
    seen
}

#[test]
fn default_geometry_is_centered_on_the_primary_display() {
    let (context, _main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(800, 600)).unwrap();
    assert_eq!(window.lifecycle(), Lifecycle::Live);
    assert_eq!(window.rect(), Rect::new(560, 240, 800, 600));
    assert_eq!(window.size(), PhysicalSize::new(800, 600));
    assert_eq!(controller.calls(), [NativeCall::Create {
        handle: handle(&window),
        rect: Rect::new(560, 240, 800, 600),
        bpp: 32,
        caption: String::new(),
    }]);
}

#[test]
fn oversized_options_are_clamped() {
    let (context, _main_loop, _controller) = start();
    let options = CreationOptions { width: Some(999_999), height: Some(100), ..Default::default() };
    let window = Window::from_options(context.proxy(), Some(&options)).unwrap();
    assert_eq!(window.rect(), Rect::new(0, 490, 10_240, 100));
}

#[test]
fn missing_options_fail_construction() {
    let (context, _main_loop, controller) = start();
    let result = Window::from_options(context.proxy(), None);
    assert!(matches!(result, Err(RequestError::Config(ConfigError::MissingOptions))));
    assert!(controller.calls().is_empty());
}

#[test]
fn native_failure_reaches_the_constructor() {
    let (context, _main_loop, controller) = start();
    controller.fail_next_create();
    let result = Window::new(context.proxy(), sized(320, 200));
    assert!(matches!(result, Err(RequestError::Os(_))));
    assert_eq!(controller.window_count(), 0);

    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    assert_eq!(window.lifecycle(), Lifecycle::Live);
}

#[test]
fn capture_is_reference_counted() {
    let (context, _main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    controller.take_calls();

    for capture in [true, true, true, false, false, false, false, true, false] {
        window.capture_mouse(capture);
    }
    context.proxy().flush().unwrap();

    let id = handle(&window);
    assert_eq!(controller.take_calls(), [
        NativeCall::SetCapture(id, true),
        NativeCall::SetCapture(id, false),
        NativeCall::SetCapture(id, true),
        NativeCall::SetCapture(id, false),
    ]);
}

#[test]
fn mouse_buttons_capture_the_pointer() {
    let (context, _main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    controller.take_calls();

    let message = |message| Win32Message { message, ..Default::default() };
    for kind in [win32::WM_LBUTTONDOWN, win32::WM_LBUTTONUP] {
        push(context.proxy(), &controller, id, HeadlessEventKind::Win32(message(kind)));
    }

    let captures: Vec<_> = controller
        .calls()
        .into_iter()
        .filter(|call| matches!(call, NativeCall::SetCapture(..)))
        .collect();
    assert_eq!(captures, [NativeCall::SetCapture(id, true), NativeCall::SetCapture(id, false)]);
}

#[test]
fn destroy_is_idempotent() {
    let (context, _main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    let closed = record(&window, &["close"]);
    controller.take_calls();

    for _ in 0..3 {
        window.destroy();
    }
    context.proxy().flush().unwrap();
    assert_eq!(controller.take_calls(), [NativeCall::Destroy(id)]);
    assert_eq!(window.lifecycle(), Lifecycle::Destroyed);
    assert_eq!(window.native_handle(), None);

    window.show(true);
    window.capture_mouse(true);
    window.destroy();
    drop(window);
    context.proxy().flush().unwrap();
    assert!(controller.calls().is_empty());
    assert!(closed.lock().unwrap().is_empty());
}

#[test]
fn destroy_restores_what_the_window_changed() {
    let (context, _main_loop, controller) = start();
    let attributes = sized(800, 600).with_style(WindowStyle::default() | WindowStyle::FULLSCREEN);
    let window = Window::new(context.proxy(), attributes).unwrap();
    let id = handle(&window);
    let mode = VideoMode { width: 800, height: 600, bpp: 32, frequency: 60 };
    assert!(controller.calls().contains(&NativeCall::SwitchVideoMode(id, mode)));
    assert!(window.style().contains(WindowStyle::FULLSCREEN));

    window.show_cursor(false);
    window.capture_mouse(true);
    context.proxy().flush().unwrap();
    controller.take_calls();

    window.destroy();
    context.proxy().flush().unwrap();
    assert_eq!(controller.take_calls(), [
        NativeCall::RestoreVideoMode,
        NativeCall::SetCursor(id, Some(CursorIcon::Default)),
        NativeCall::SetCapture(id, false),
        NativeCall::Destroy(id),
    ]);
}

#[test]
fn refused_video_mode_still_creates_the_window() {
    let (context, _main_loop, controller) = start();
    controller.refuse_video_modes(true);
    let attributes = sized(800, 600).with_style(WindowStyle::FULLSCREEN);
    let window = Window::new(context.proxy(), attributes).unwrap();
    assert_eq!(window.lifecycle(), Lifecycle::Live);
    assert!(!window.style().contains(WindowStyle::FULLSCREEN));
}

#[test]
fn resizes_arrive_in_order() {
    let (context, mut main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    let widths = Arc::new(Mutex::new(Vec::new()));
    let seen = widths.clone();
    window.on("resize", move |event: &WindowEvent| {
        if let WindowEvent::Resized(size) = event {
            seen.lock().unwrap().push(size.width);
        }
        Ok(())
    });

    controller.push_event(id, HeadlessEventKind::Resized(PhysicalSize::new(100, 100)));
    controller.push_event(id, HeadlessEventKind::Resized(PhysicalSize::new(200, 200)));
    controller.push_event(id, HeadlessEventKind::Resized(PhysicalSize::new(200, 200)));
    context.proxy().flush().unwrap();
    main_loop.run_pending();

    assert_eq!(*widths.lock().unwrap(), [100, 200]);
    assert_eq!(window.size(), PhysicalSize::new(200, 200));
}

#[test]
fn close_request_only_fires_the_callback() {
    let (context, mut main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    let seen = record(&window, &["close", "resize"]);
    controller.take_calls();

    push(context.proxy(), &controller, id, HeadlessEventKind::Close);
    main_loop.run_pending();

    assert_eq!(*seen.lock().unwrap(), [WindowEvent::CloseRequested]);
    assert_eq!(window.lifecycle(), Lifecycle::Live);
    assert!(controller.calls().is_empty());
    // An application window is no exception.
    assert!(window.style().contains(WindowStyle::APPWINDOW));
    assert!(!context.proxy().main_loop().is_terminating());
}

#[test]
fn input_is_decoded_and_named() {
    let (context, mut main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    let seen = record(&window, &["keydown", "keyup", "mousewheel"]);

    let press =
        X11Input::Key { pressed: true, keycode: 38, state: 0, keysym: 0x61, character: 0x61 };
    let release = X11Input::Key { pressed: false, keycode: 38, state: 0, keysym: 0, character: 0 };
    push(context.proxy(), &controller, id, HeadlessEventKind::X11(press));
    push(context.proxy(), &controller, id, HeadlessEventKind::X11(release));
    let wheel = Win32Message {
        message: win32::WM_MOUSEWHEEL,
        wparam: win32::wheel_wparam(1, 0),
        lparam: win32::make_lparam(600, 300),
        key_state: Modifiers::empty(),
        client_origin: PhysicalPosition::new(560, 240),
    };
    push(context.proxy(), &controller, id, HeadlessEventKind::Win32(wheel));
    main_loop.run_pending();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    let names: Vec<_> = seen.iter().map(WindowEvent::name).collect();
    assert_eq!(names, ["keydown", "keyup", "mousewheel"]);
    let WindowEvent::Input(keyup) = seen[1] else { panic!("expected input") };
    assert_eq!(keyup.key_data().unwrap().char_code, 0x61);
    let WindowEvent::Input(wheel) = seen[2] else { panic!("expected input") };
    assert_eq!(wheel.mouse_data(), Some(&MouseData { x: 40, y: 60, dx: 0, dy: 120 }));
}

#[test]
fn callback_failures_do_not_stop_delivery() {
    let (context, mut main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    window.on("mousemove", move |_: &WindowEvent| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err("first move rejected".into());
        }
        panic!("second move panicked")
    });
    let seen = record(&window, &["mousedown"]);

    let data = MouseData::default();
    let moved = InputEvent::mouse(EventKind::MouseMove, Modifiers::empty(), 0, data, 0);
    let down = InputEvent::mouse(EventKind::MouseDown, Modifiers::LBUTTON, 1, data, 0);
    push(context.proxy(), &controller, id, HeadlessEventKind::Input(moved));
    push(context.proxy(), &controller, id, HeadlessEventKind::Input(moved));
    push(context.proxy(), &controller, id, HeadlessEventKind::Input(down));
    main_loop.run_pending();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*seen.lock().unwrap(), [WindowEvent::Input(down)]);
}

struct Consuming {
    consume: bool,
    pre: AtomicUsize,
    post: AtomicUsize,
    inputs: AtomicUsize,
}

impl Consuming {
    fn new(consume: bool) -> Arc<Self> {
        Arc::new(Self {
            consume,
            pre: AtomicUsize::new(0),
            post: AtomicUsize::new(0),
            inputs: AtomicUsize::new(0),
        })
    }
}

impl EventSink<HeadlessEvent> for Consuming {
    fn preprocess(&self, _event: &HeadlessEvent) -> bool {
        self.pre.fetch_add(1, Ordering::SeqCst);
        self.consume
    }

    fn postprocess(&self, _event: &HeadlessEvent) -> bool {
        self.post.fetch_add(1, Ordering::SeqCst);
        false
    }

    fn on_input(&self, _event: &InputEvent) {
        self.inputs.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn consuming_sink_short_circuits_the_window() {
    let (context, mut main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    let seen = record(&window, &["mousedown"]);
    let observer = Consuming::new(false);
    let consumer = Consuming::new(true);
    let _observer = window.register_sink(observer.clone());
    let consumer_registration = window.register_sink(consumer.clone());
    controller.take_calls();

    let data = MouseData::default();
    let down = InputEvent::mouse(EventKind::MouseDown, Modifiers::LBUTTON, 1, data, 0);
    push(context.proxy(), &controller, id, HeadlessEventKind::Input(down));
    main_loop.run_pending();
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(observer.pre.load(Ordering::SeqCst), 1);
    assert_eq!(observer.post.load(Ordering::SeqCst), 0);
    assert_eq!(observer.inputs.load(Ordering::SeqCst), 0);
    assert!(controller.take_calls().is_empty());

    assert!(consumer_registration.unregister());
    push(context.proxy(), &controller, id, HeadlessEventKind::Input(down));
    main_loop.run_pending();
    assert_eq!(*seen.lock().unwrap(), [WindowEvent::Input(down)]);
    assert_eq!(observer.post.load(Ordering::SeqCst), 1);
    assert_eq!(observer.inputs.load(Ordering::SeqCst), 1);
    assert_eq!(consumer.pre.load(Ordering::SeqCst), 1);
}

struct Reentrant {
    proxy: ContextProxy<HeadlessBackend>,
    refused: AtomicBool,
    flush_refused: AtomicBool,
}

impl Reentrant {
    fn new(proxy: &ContextProxy<HeadlessBackend>) -> Arc<Self> {
        Arc::new(Self {
            proxy: proxy.clone(),
            refused: AtomicBool::new(false),
            flush_refused: AtomicBool::new(false),
        })
    }
}

impl EventSink<HeadlessEvent> for Reentrant {
    fn preprocess(&self, _event: &HeadlessEvent) -> bool {
        let result = Window::new(&self.proxy, WindowAttributes::default());
        self.refused.store(matches!(result, Err(RequestError::Reentrant)), Ordering::SeqCst);
        let flushed = matches!(self.proxy.flush(), Err(RequestError::Reentrant));
        self.flush_refused.store(flushed, Ordering::SeqCst);
        true
    }

    fn postprocess(&self, _event: &HeadlessEvent) -> bool {
        false
    }
}

#[test]
fn constructing_on_the_platform_thread_is_refused() {
    let (context, _main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let sink = Reentrant::new(context.proxy());
    let _registration = window.register_sink(sink.clone());

    push(context.proxy(), &controller, handle(&window), HeadlessEventKind::SetCursor);
    assert!(sink.refused.load(Ordering::SeqCst));
    assert_eq!(controller.window_count(), 1);
}

#[test]
fn flushing_on_the_platform_thread_is_refused() {
    let (context, mut main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    let seen = record(&window, &["close"]);
    let sink = Reentrant::new(context.proxy());
    let registration = window.register_sink(sink.clone());

    push(context.proxy(), &controller, id, HeadlessEventKind::Close);
    assert!(sink.flush_refused.load(Ordering::SeqCst));

    // The platform thread is still serving requests.
    assert!(registration.unregister());
    push(context.proxy(), &controller, id, HeadlessEventKind::Close);
    main_loop.run_pending();
    assert_eq!(*seen.lock().unwrap(), [WindowEvent::CloseRequested]);
}

#[test]
fn raw_messages_pass_through() {
    let (context, mut main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    let seen = record(&window, &["message"]);

    let raw = RawMessage { message: 0x0400, wparam: 7, lparam: -1 };
    push(context.proxy(), &controller, id, HeadlessEventKind::Raw(raw));
    push(context.proxy(), &controller, id, HeadlessEventKind::Close);
    main_loop.run_pending();
    assert_eq!(*seen.lock().unwrap(), [WindowEvent::Message(raw)]);

    assert!(window.off("message"));
    push(context.proxy(), &controller, id, HeadlessEventKind::Raw(raw));
    main_loop.run_pending();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn file_drops_need_a_handler() {
    let (context, mut main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    let files = vec![PathBuf::from("a.txt"), PathBuf::from("b.png")];

    push(context.proxy(), &controller, id, HeadlessEventKind::DroppedFiles(files.clone()));
    controller.take_calls();

    let seen = record(&window, &["drag_accept_files"]);
    context.proxy().flush().unwrap();
    assert_eq!(controller.take_calls(), [NativeCall::SetDragAcceptFiles(id, true)]);

    push(context.proxy(), &controller, id, HeadlessEventKind::DroppedFiles(files.clone()));
    main_loop.run_pending();
    assert_eq!(*seen.lock().unwrap(), [WindowEvent::DroppedFiles(files)]);

    assert!(window.off("drag_accept_files"));
    context.proxy().flush().unwrap();
    assert_eq!(controller.take_calls(), [NativeCall::SetDragAcceptFiles(id, false)]);
}

#[test]
fn cursor_visibility_is_independent_of_the_image() {
    let (context, _main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    controller.take_calls();

    window.set_stock_cursor(StockCursor::Hand);
    window.show_cursor(false);
    window.set_stock_cursor(StockCursor::Wait);
    window.show_cursor(true);
    context.proxy().flush().unwrap();
    push(context.proxy(), &controller, id, HeadlessEventKind::SetCursor);

    assert_eq!(controller.take_calls(), [
        NativeCall::SetCursor(id, Some(CursorIcon::Pointer)),
        NativeCall::SetCursor(id, None),
        NativeCall::SetCursor(id, None),
        NativeCall::SetCursor(id, Some(CursorIcon::Wait)),
        NativeCall::SetCursor(id, Some(CursorIcon::Wait)),
    ]);
}

#[test]
fn toggle_fullscreen_restores_the_placement() {
    let (context, _main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(800, 600)).unwrap();
    let id = handle(&window);
    controller.take_calls();

    window.toggle_fullscreen();
    context.proxy().flush().unwrap();
    assert_eq!(window.rect(), Rect::new(0, 0, 1920, 1080));
    assert!(window.style().contains(WindowStyle::FULLSCREEN));

    window.toggle_fullscreen();
    context.proxy().flush().unwrap();
    assert_eq!(window.rect(), Rect::new(560, 240, 800, 600));
    assert!(!window.style().contains(WindowStyle::FULLSCREEN));
    assert_eq!(controller.take_calls(), [
        NativeCall::SetFullscreen(id, true, Rect::new(0, 0, 1920, 1080)),
        NativeCall::SetFullscreen(id, false, Rect::new(560, 240, 800, 600)),
    ]);
}

#[test]
fn switch_to_fullscreen_picks_the_closest_mode() {
    let (context, _main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(800, 600)).unwrap();
    let id = handle(&window);
    controller.take_calls();

    window.switch_to_fullscreen(VideoMode { width: 1280, height: 720, bpp: 16, frequency: 0 });
    window.toggle_fullscreen();
    context.proxy().flush().unwrap();

    let mode = VideoMode { width: 1280, height: 720, bpp: 32, frequency: 60 };
    assert_eq!(controller.take_calls(), [
        NativeCall::SwitchVideoMode(id, mode),
        NativeCall::SetFullscreen(id, true, Rect::new(0, 0, 1280, 720)),
        NativeCall::RestoreVideoMode,
        NativeCall::SetFullscreen(id, false, Rect::new(560, 240, 800, 600)),
    ]);
}

#[test]
fn direct_operations_reach_the_backend() {
    let (context, _main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    controller.take_calls();

    window.show(false);
    window.set_focus();
    window.set_rect(Rect::new(10, 20, 640, 480));
    window.set_cursor_position(PhysicalPosition::new(5, 6));
    window.show_frame(false);
    window.set_topmost(true);
    window.load_icon("app.ico");
    window.use_as_splash_screen("splash.bmp");
    context.proxy().flush().unwrap();

    assert_eq!(controller.take_calls(), [
        NativeCall::Show(id, false),
        NativeCall::SetFocus(id),
        NativeCall::SetRect(id, Rect::new(10, 20, 640, 480)),
        NativeCall::SetCursorPosition(id, PhysicalPosition::new(5, 6)),
        NativeCall::ShowFrame(id, false),
        NativeCall::SetTopmost(id, true),
        NativeCall::LoadIcon(id, PathBuf::from("app.ico")),
        NativeCall::UseAsSplashScreen(id, PathBuf::from("splash.bmp")),
    ]);
    assert_eq!(window.rect(), Rect::new(10, 20, 640, 480));
    assert!(window.style().contains(WindowStyle::HIDDEN));
}

#[test]
fn system_destroyed_window_becomes_inert() {
    let (context, _main_loop, controller) = start();
    let window = Window::new(context.proxy(), sized(320, 200)).unwrap();
    let id = handle(&window);
    controller.take_calls();

    push(context.proxy(), &controller, id, HeadlessEventKind::Destroyed);
    assert_eq!(window.lifecycle(), Lifecycle::Destroyed);
    window.destroy();
    window.show(true);
    context.proxy().flush().unwrap();
    assert!(!controller.calls().contains(&NativeCall::Destroy(id)));
    assert!(!controller.calls().contains(&NativeCall::Show(id, true)));
}

#[test]
fn display_changes_refresh_the_snapshot() {
    let (context, _main_loop, controller) = start();
    assert_eq!(context.proxy().current_mode(None).unwrap().width, 1920);

    let mut display: DisplayInfo = default_display();
    display.current = VideoMode { width: 1280, height: 720, bpp: 32, frequency: 60 };
    controller.set_displays(vec![display]);
    context.proxy().flush().unwrap();

    assert_eq!(context.proxy().current_mode(Some("HEADLESS-1")).unwrap().width, 1280);
    let window = Window::new(context.proxy(), sized(640, 480)).unwrap();
    assert_eq!(window.rect(), Rect::new(320, 120, 640, 480));
}

#[test]
fn centers_on_the_requested_display() {
    let (context, _main_loop, controller) = start();
    let mut hdmi = default_display();
    hdmi.display.name = "HDMI-1".into();
    hdmi.display.rect = Rect::new(1920, 0, 1280, 1024);
    hdmi.display.work_rect = hdmi.display.rect;
    hdmi.current = VideoMode { width: 1280, height: 1024, bpp: 32, frequency: 60 };
    controller.set_displays(vec![default_display(), hdmi]);
    context.proxy().flush().unwrap();

    let attributes = sized(800, 600).with_display("HDMI-1");
    let window = Window::new(context.proxy(), attributes).unwrap();
    assert_eq!(window.rect(), Rect::new(2160, 212, 800, 600));

    let primary = Window::new(context.proxy(), sized(800, 600)).unwrap();
    assert_eq!(primary.rect(), Rect::new(560, 240, 800, 600));
}

#[test]
fn shutdown_destroys_windows_and_stops_dispatch() {
    let (mut context, mut main_loop, controller) = start();
    let proxy = context.proxy().clone();
    let window = Window::new(&proxy, sized(320, 200)).unwrap();
    let id = handle(&window);

    context.shutdown();
    assert!(controller.calls().contains(&NativeCall::Destroy(id)));
    assert_eq!(controller.window_count(), 0);
    assert_eq!(window.lifecycle(), Lifecycle::Destroyed);
    assert!(matches!(Window::new(&proxy, sized(320, 200)), Err(RequestError::Terminated)));
    assert!(matches!(proxy.flush(), Err(RequestError::Terminated)));

    assert!(!proxy.main_loop().schedule(|| Ok(())));
    main_loop.run_pending();
    assert!(main_loop.is_terminated());
}

#[test]
fn runs_on_the_calling_thread() {
    let (backend, controller) = HeadlessBackend::new();
    let created = Arc::new(AtomicBool::new(false));
    let flag = created.clone();
    let scripted = controller.clone();
    let config = ContextConfig::default();
    PlatformContext::run_on_current_thread(config, backend, move |proxy, mut main_loop| {
        let window = Window::new(&proxy, sized(320, 200)).unwrap();
        let closing = proxy.main_loop().clone();
        window.on("close", move |_: &WindowEvent| {
            closing.terminate();
            Ok(())
        });
        flag.store(!proxy.is_platform_thread(), Ordering::SeqCst);
        scripted.push_event(handle(&window), HeadlessEventKind::Close);
        main_loop.run(config.tick);
    })
    .unwrap();
    assert!(created.load(Ordering::SeqCst));
    assert_eq!(controller.window_count(), 0);
}
