//! The shared application, its event pump and the waker.
//!
//! AppKit only delivers events to the process main thread, so [`AppKitBackend::new`] fails
//! anywhere else. Delegate callbacks can fire in the middle of any AppKit call; they are queued
//! and handed out by the pump after the event that caused them.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use ferrowin_core::backend::BackendWaker;
use ferrowin_core::error::{NotSupportedError, RequestError};
use objc2::rc::{autoreleasepool, Retained};
use objc2::runtime::{AnyObject, NSObjectProtocol, ProtocolObject};
use objc2::{class, msg_send, ClassType};
use objc2_app_kit::{
    NSApplication, NSApplicationActivationPolicy,
    NSApplicationDidChangeScreenParametersNotification, NSEvent, NSEventMask,
    NSEventModifierFlags, NSEventType, NSWindow,
};
use objc2_foundation::{
    MainThreadMarker, NSDate, NSDefaultRunLoopMode, NSNotification, NSNotificationCenter, NSPoint,
};
use tracing::{debug, trace, warn};

use crate::event::{self, MacEvent, MacEventKind};
use crate::observer::create_observer;
use crate::window_delegate::{EventQueue, WindowDelegate};

/// `subtype` of the application defined event posted by [`AppKitWaker`].
const WAKE_SUBTYPE: i16 = 0x6677;

/// Wakes a blocked [`AppKitBackend`] pump from any thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppKitWaker;

impl BackendWaker for AppKitWaker {
    fn wake(&self) {
        autoreleasepool(|_| {
            let event: Option<Retained<NSEvent>> = unsafe {
                msg_send![
                    NSEvent::class(),
                    otherEventWithType: NSEventType::ApplicationDefined,
                    location: NSPoint::new(0.0, 0.0),
                    modifierFlags: NSEventModifierFlags(0),
                    timestamp: 0.0f64,
                    windowNumber: 0isize,
                    context: None::<&AnyObject>,
                    subtype: WAKE_SUBTYPE,
                    data1: 0isize,
                    data2: 0isize,
                ]
            };
            let Some(event) = event else {
                warn!("failed to create the wake up event");
                return;
            };
            // `postEvent:atStart:` may be called from any thread, `NSApplication` is only
            // reachable through the runtime off the main thread.
            let app: Option<Retained<AnyObject>> =
                unsafe { msg_send![class!(NSApplication), sharedApplication] };
            match app {
                Some(app) => {
                    let _: () = unsafe { msg_send![&*app, postEvent: &*event, atStart: false] };
                },
                None => warn!("no shared application to wake"),
            }
        });
    }
}

fn is_wake(event: &NSEvent) -> bool {
    event.r#type() == NSEventType::ApplicationDefined
        && unsafe { event.subtype() }.0 == WAKE_SUBTYPE
}

pub(crate) struct WindowEntry {
    pub(crate) window: Retained<NSWindow>,
    /// `NSWindow` only keeps a weak reference to its delegate.
    pub(crate) delegate: Retained<WindowDelegate>,
}

impl WindowEntry {
    /// Close without reporting it; the delegate is detached first.
    pub(crate) fn close(self) {
        self.window.setDelegate(None);
        self.window.close();
        drop(self.delegate);
    }
}

/// The AppKit backend. Lives on the main thread.
pub struct AppKitBackend {
    pub(crate) mtm: MainThreadMarker,
    pub(crate) app: Retained<NSApplication>,
    pub(crate) queue: EventQueue,
    pub(crate) windows: RefCell<HashMap<isize, WindowEntry>>,
    pub(crate) cursor_hidden: Cell<bool>,
    screen_observer: Retained<ProtocolObject<dyn NSObjectProtocol>>,
}

impl fmt::Debug for AppKitBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppKitBackend")
            .field("windows", &self.windows.borrow().keys().collect::<Vec<_>>())
            .field("queued", &self.queue.borrow().len())
            .field("cursor_hidden", &self.cursor_hidden.get())
            .finish_non_exhaustive()
    }
}

impl AppKitBackend {
    pub fn new() -> Result<Self, RequestError> {
        let mtm = MainThreadMarker::new()
            .ok_or(NotSupportedError::new("AppKit outside the main thread"))?;

        let app = NSApplication::sharedApplication(mtm);
        app.setActivationPolicy(NSApplicationActivationPolicy::Regular);
        unsafe { app.finishLaunching() };
        #[allow(deprecated)]
        app.activateIgnoringOtherApps(true);

        let queue: EventQueue = Rc::new(RefCell::new(VecDeque::new()));
        let screen_queue = Rc::clone(&queue);
        let screen_observer = create_observer(
            &NSNotificationCenter::defaultCenter(),
            unsafe { NSApplicationDidChangeScreenParametersNotification },
            move |_: &NSNotification| {
                trace!("screen parameters changed");
                let event = MacEvent::new(None, MacEventKind::ScreensChanged);
                screen_queue.borrow_mut().push_back(event);
            },
        );
        debug!("AppKit application launched");

        Ok(Self {
            mtm,
            app,
            queue,
            windows: RefCell::new(HashMap::new()),
            cursor_hidden: Cell::new(false),
            screen_observer,
        })
    }

    pub(crate) fn new_waker(&self) -> AppKitWaker {
        AppKitWaker
    }

    fn deliver_queued(&self, handler: &mut dyn FnMut(&MacEvent) -> bool) {
        loop {
            // The handler may cause more delegate callbacks; the queue is not borrowed meanwhile.
            let Some(event) = self.queue.borrow_mut().pop_front() else { break };
            trace!(?event, "delegate event");
            handler(&event);
            if let (Some(number), MacEventKind::Closed) = (event.window, &event.kind) {
                self.windows.borrow_mut().remove(&number);
            }
        }
    }

    /// Run queued delegate events, then read the application queue until it is empty.
    ///
    /// Waits up to `timeout` for the first event, forever with `None`. Events the handler does
    /// not take go to `-[NSApplication sendEvent:]`.
    pub(crate) fn pump(
        &self,
        timeout: Option<Duration>,
        handler: &mut dyn FnMut(&MacEvent) -> bool,
    ) {
        autoreleasepool(|_| {
            self.deliver_queued(handler);
            let mut until = match timeout {
                Some(timeout) if timeout.is_zero() => NSDate::distantPast(),
                Some(timeout) => NSDate::dateWithTimeIntervalSinceNow(timeout.as_secs_f64()),
                None => NSDate::distantFuture(),
            };
            loop {
                let event = unsafe {
                    self.app.nextEventMatchingMask_untilDate_inMode_dequeue(
                        NSEventMask::Any,
                        Some(&until),
                        NSDefaultRunLoopMode,
                        true,
                    )
                };
                let Some(event) = event else { break };
                until = NSDate::distantPast();
                if is_wake(&event) {
                    continue;
                }

                let mut handled = false;
                for record in event::records(&event, self.mtm) {
                    handled |= handler(&record);
                }
                if !handled {
                    self.app.sendEvent(&event);
                }
                self.deliver_queued(handler);
            }
            self.app.updateWindows();
        });
    }
}

impl Drop for AppKitBackend {
    fn drop(&mut self) {
        let center = NSNotificationCenter::defaultCenter();
        let _: () = unsafe { msg_send![&*center, removeObserver: &*self.screen_observer] };
        for (_, entry) in self.windows.get_mut().drain() {
            entry.close();
        }
        if self.cursor_hidden.get() {
            crate::window::set_cursor_hidden(false);
        }
    }
}
