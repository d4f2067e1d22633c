use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use dpi::{PhysicalPosition, PhysicalSize};
use objc2::rc::{Retained, Weak};
use objc2::runtime::{AnyObject, NSObject, NSObjectProtocol};
use objc2::{define_class, msg_send, DefinedClass, MainThreadOnly};
use objc2_app_kit::{NSWindow, NSWindowDelegate};
use objc2_foundation::MainThreadMarker;
use tracing::trace;

use crate::event::{MacEvent, MacEventKind};
use crate::monitor;

/// Events raised from delegate callbacks, delivered by the next pump.
pub(crate) type EventQueue = Rc<RefCell<VecDeque<MacEvent>>>;

#[derive(Debug)]
pub(crate) struct State {
    window: Weak<NSWindow>,
    number: isize,
    queue: EventQueue,
}

define_class!(
    #[unsafe(super(NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "FerrowinWindowDelegate"]
    #[ivars = State]
    #[derive(Debug)]
    pub(crate) struct WindowDelegate;

    unsafe impl NSObjectProtocol for WindowDelegate {}

    unsafe impl NSWindowDelegate for WindowDelegate {
        #[unsafe(method(windowShouldClose:))]
        fn window_should_close(&self, _: Option<&AnyObject>) -> bool {
            trace!("windowShouldClose:");
            self.push(MacEventKind::CloseRequested);
            false
        }

        #[unsafe(method(windowWillClose:))]
        fn window_will_close(&self, _: Option<&AnyObject>) {
            trace!("windowWillClose:");
            self.push(MacEventKind::Closed);
        }

        #[unsafe(method(windowDidResize:))]
        fn window_did_resize(&self, _: Option<&AnyObject>) {
            let Some(window) = self.ivars().window.load() else { return };
            let content = window.contentRectForFrameRect(window.frame());
            let size = PhysicalSize::new(
                content.size.width.round() as u32,
                content.size.height.round() as u32,
            );
            self.push(MacEventKind::Resized(size));
        }

        #[unsafe(method(windowDidMove:))]
        fn window_did_move(&self, _: Option<&AnyObject>) {
            let Some(window) = self.ivars().window.load() else { return };
            let mtm = MainThreadMarker::from(self);
            let rect = monitor::from_ns_rect(window.frame(), monitor::primary_height(mtm));
            self.push(MacEventKind::Moved(PhysicalPosition::new(rect.left(), rect.top())));
        }
    }
);

impl WindowDelegate {
    pub(crate) fn new(
        window: &Retained<NSWindow>,
        number: isize,
        queue: EventQueue,
    ) -> Retained<Self> {
        let mtm = MainThreadMarker::from(&**window);
        let this = Self::alloc(mtm).set_ivars(State {
            window: Weak::from_retained(window),
            number,
            queue,
        });
        unsafe { msg_send![super(this), init] }
    }

    fn push(&self, kind: MacEventKind) {
        let state = self.ivars();
        state.queue.borrow_mut().push_back(MacEvent::new(Some(state.number), kind));
    }
}
