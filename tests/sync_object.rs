use ferrowin::platform::headless::{HeadlessBackend, HeadlessEvent};

#[allow(dead_code)]
fn needs_sync<T: Sync + ?Sized>() {}

#[test]
fn window_sync() {
    needs_sync::<ferrowin::Window<HeadlessBackend>>();
}

#[test]
fn context_proxy_sync() {
    needs_sync::<ferrowin::ContextProxy<HeadlessBackend>>();
    needs_sync::<ferrowin::MainLoopProxy>();
}

#[test]
fn registries_sync() {
    needs_sync::<ferrowin::EventEmitter<ferrowin::WindowEvent>>();
    needs_sync::<ferrowin::SinkChain<HeadlessEvent>>();
    needs_sync::<dyn ferrowin::EventSink<HeadlessEvent>>();
}

#[test]
fn window_attributes_sync() {
    needs_sync::<ferrowin::WindowAttributes>();
    needs_sync::<ferrowin::monitor::DisplaySnapshot>();
}
