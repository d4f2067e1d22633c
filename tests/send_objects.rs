use ferrowin::platform::headless::HeadlessBackend;

#[allow(dead_code)]
fn needs_send<T: Send>() {}

#[test]
fn window_send() {
    // ensures that `ferrowin::Window` implements `Send`
    needs_send::<ferrowin::Window<HeadlessBackend>>();
}

#[test]
fn proxies_send() {
    // ensures that the handles other threads talk through implement `Send`
    needs_send::<ferrowin::ContextProxy<HeadlessBackend>>();
    needs_send::<ferrowin::MainLoopProxy>();
    needs_send::<ferrowin::MainLoop>();
    needs_send::<ferrowin::SinkRegistration<ferrowin::platform::headless::HeadlessEvent>>();
}

#[test]
fn ids_send() {
    needs_send::<ferrowin::WindowId>();
    needs_send::<ferrowin::platform::headless::HeadlessHandle>();
}

#[test]
fn events_send() {
    needs_send::<ferrowin::WindowEvent>();
    needs_send::<ferrowin::InputEvent>();
}
