use std::cell::RefCell;
use std::{fmt, mem};

use crate::event_loop::Win32Event;

type Handler = dyn FnMut(&Win32Event) -> bool;

/// Storage for the pump's event handler, reachable from the window procedure while the pump
/// runs.
#[derive(Default)]
pub(crate) struct EventHandler {
    /// This can be in the following states:
    /// - Not set, outside of a pump (None).
    /// - Present (Some(handler)).
    /// - Currently executing the handler / in use (RefCell borrowed).
    inner: RefCell<Option<&'static mut Handler>>,
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.try_borrow().as_deref() {
            Ok(Some(_)) => "<available>",
            Ok(None) => "<not set>",
            Err(_) => "<in use>",
        };
        f.debug_struct("EventHandler").field("state", &state).finish_non_exhaustive()
    }
}

impl EventHandler {
    /// Set the handler for the duration of the given closure.
    pub fn set<'handler, R>(
        &self,
        handler: &'handler mut (dyn FnMut(&Win32Event) -> bool + 'handler),
        closure: impl FnOnce() -> R,
    ) -> R {
        // SAFETY: The handler is unset again at the end of this function, also when
        // unwinding, so the extended lifetime never outlives `'handler`.
        let handler = unsafe {
            mem::transmute::<
                &'handler mut (dyn FnMut(&Win32Event) -> bool + 'handler),
                &'static mut Handler,
            >(handler)
        };

        match self.inner.try_borrow_mut().as_deref_mut() {
            Ok(data @ None) => *data = Some(handler),
            Ok(Some(_)) => unreachable!("tried to set handler while another was already set"),
            Err(_) => unreachable!("tried to set handler that is currently in use"),
        }

        struct ClearOnDrop<'a>(&'a EventHandler);

        impl Drop for ClearOnDrop<'_> {
            fn drop(&mut self) {
                match self.0.inner.try_borrow_mut() {
                    Ok(mut data) => *data = None,
                    Err(_) => {
                        // Unsound to leave the handler behind.
                        eprintln!("tried to clear handler that is currently in use");
                        std::process::abort();
                    },
                }
            }
        }

        let _clear_on_drop = ClearOnDrop(self);
        closure()
    }

    /// Call the handler with `event`.
    ///
    /// Returns `None` when no pump is running or the handler is already executing, which
    /// happens when a message is sent to a window from inside the handler.
    pub fn handle(&self, event: &Win32Event) -> Option<bool> {
        match self.inner.try_borrow_mut().as_deref_mut() {
            Ok(Some(handler)) => Some(handler(event)),
            Ok(None) | Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::Hwnd;

    fn event(message: u32) -> Win32Event {
        Win32Event::new(Hwnd::default(), message, 0, 0)
    }

    #[test]
    fn handler_only_reachable_inside_set() {
        let storage = EventHandler::default();
        assert_eq!(storage.handle(&event(1)), None);

        let mut seen = Vec::new();
        let mut handler = |event: &Win32Event| {
            seen.push(event.message);
            event.message == 2
        };
        storage.set(&mut handler, || {
            assert_eq!(storage.handle(&event(1)), Some(false));
            assert_eq!(storage.handle(&event(2)), Some(true));
        });

        assert_eq!(storage.handle(&event(3)), None);
        assert_eq!(seen, [1, 2]);
    }

    #[test]
    fn reentrant_call_is_refused() {
        let storage = EventHandler::default();
        let inner = std::cell::Cell::new(None);
        let mut handler = |_: &Win32Event| {
            inner.set(Some(storage.handle(&event(5))));
            true
        };
        storage.set(&mut handler, || storage.handle(&event(4)));
        assert_eq!(inner.get(), Some(None));
    }
}
