//! Secondary observers of a window's native events.
//!
//! Sinks see every native event of their window on the platform thread, before and after the
//! window handles it, and are told about decoded resizes, input and display changes. A sink
//! that reports an event as handled stops everything after it for that event.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use dpi::PhysicalSize;
use ferrowin_core::event::InputEvent;
use tracing::error;

use crate::dispatch::panic_message;

/// An observer of the native events `E` of one window.
pub trait EventSink<E>: Send + Sync {
    /// Called before the window's own handling. Return `true` to consume the event.
    fn preprocess(&self, event: &E) -> bool;

    /// Called after the window's own handling. Return `true` to mark the event handled.
    fn postprocess(&self, event: &E) -> bool;

    fn on_resize(&self, _size: PhysicalSize<u32>) {}

    fn on_input(&self, _event: &InputEvent) {}

    fn on_display_change(&self) {}
}

struct Entry<E> {
    sink: Arc<dyn EventSink<E>>,
    registered: AtomicBool,
    id: u64,
}

/// Sinks of one window, in registration order.
///
/// Passes iterate over a snapshot, so a sink may register or unregister sinks, itself
/// included, from inside its own callback. An unregistered sink is skipped for the rest of
/// the pass in progress.
pub struct SinkChain<E> {
    entries: Mutex<Vec<Arc<Entry<E>>>>,
    next_id: AtomicU64,
}

impl<E> Default for SinkChain<E> {
    fn default() -> Self {
        Self { entries: Mutex::new(Vec::new()), next_id: AtomicU64::new(0) }
    }
}

impl<E> fmt::Debug for SinkChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkChain").field("len", &self.len()).finish_non_exhaustive()
    }
}

impl<E> SinkChain<E> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Append `sink` to the chain.
    pub fn register(self: &Arc<Self>, sink: Arc<dyn EventSink<E>>) -> SinkRegistration<E> {
        let entry = Arc::new(Entry {
            sink,
            registered: AtomicBool::new(true),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        });
        self.entries().push(entry.clone());
        SinkRegistration { chain: Arc::downgrade(self), entry }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Run every sink's `preprocess` until one consumes `event`.
    pub fn preprocess(&self, event: &E) -> bool {
        self.any(|sink| sink.preprocess(event))
    }

    /// Run every sink's `postprocess` until one marks `event` handled.
    pub fn postprocess(&self, event: &E) -> bool {
        self.any(|sink| sink.postprocess(event))
    }

    /// Call `notify` for every registered sink.
    pub fn notify(&self, notify: impl Fn(&dyn EventSink<E>)) {
        self.any(|sink| {
            notify(sink);
            false
        });
    }

    fn any(&self, mut callback: impl FnMut(&dyn EventSink<E>) -> bool) -> bool {
        let snapshot = self.entries().clone();
        for entry in snapshot {
            if !entry.registered.load(Ordering::Acquire) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| callback(entry.sink.as_ref()))) {
                Ok(true) => return true,
                Ok(false) => {},
                Err(payload) => error!("event sink panicked: {}", panic_message(payload.as_ref())),
            }
        }
        false
    }

    fn remove(&self, id: u64) {
        self.entries().retain(|entry| entry.id != id);
    }

    /// Drop every sink, marking their registrations as unregistered.
    pub fn clear(&self) {
        for entry in self.entries().drain(..) {
            entry.registered.store(false, Ordering::Release);
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Vec<Arc<Entry<E>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a registered sink. Clones refer to the same registration.
pub struct SinkRegistration<E> {
    chain: Weak<SinkChain<E>>,
    entry: Arc<Entry<E>>,
}

impl<E> Clone for SinkRegistration<E> {
    fn clone(&self) -> Self {
        Self { chain: self.chain.clone(), entry: self.entry.clone() }
    }
}

impl<E> fmt::Debug for SinkRegistration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkRegistration")
            .field("id", &self.entry.id)
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl<E> SinkRegistration<E> {
    /// Remove the sink from its chain. Returns `false` if it was already removed.
    pub fn unregister(&self) -> bool {
        if !self.entry.registered.swap(false, Ordering::AcqRel) {
            return false;
        }
        if let Some(chain) = self.chain.upgrade() {
            chain.remove(self.entry.id);
        }
        true
    }

    pub fn is_registered(&self) -> bool {
        self.entry.registered.load(Ordering::Acquire) && self.chain.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        consume: bool,
        pre: AtomicUsize,
        post: AtomicUsize,
    }

    impl EventSink<u32> for Recorder {
        fn preprocess(&self, _event: &u32) -> bool {
            self.pre.fetch_add(1, Ordering::SeqCst);
            self.consume
        }

        fn postprocess(&self, _event: &u32) -> bool {
            self.post.fetch_add(1, Ordering::SeqCst);
            false
        }
    }

    #[test]
    fn handled_short_circuits() {
        let chain = SinkChain::new();
        let first = Arc::new(Recorder { consume: true, ..Default::default() });
        let second = Arc::new(Recorder::default());
        let _a = chain.register(first.clone());
        let _b = chain.register(second.clone());
        assert!(chain.preprocess(&1));
        assert_eq!(first.pre.load(Ordering::SeqCst), 1);
        assert_eq!(second.pre.load(Ordering::SeqCst), 0);
        assert!(!chain.postprocess(&1));
        assert_eq!(second.post.load(Ordering::SeqCst), 1);
    }

    struct SelfRemoving {
        registration: Mutex<Option<SinkRegistration<u32>>>,
        calls: AtomicUsize,
    }

    impl EventSink<u32> for SelfRemoving {
        fn preprocess(&self, _event: &u32) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(registration) = self.registration.lock().unwrap().take() {
                assert!(registration.unregister());
            }
            false
        }

        fn postprocess(&self, _event: &u32) -> bool {
            false
        }
    }

    #[test]
    fn unregister_during_callback() {
        let chain = SinkChain::new();
        let sink =
            Arc::new(SelfRemoving { registration: Mutex::new(None), calls: AtomicUsize::new(0) });
        let after = Arc::new(Recorder::default());
        let registration = chain.register(sink.clone());
        let _after = chain.register(after.clone());
        *sink.registration.lock().unwrap() = Some(registration.clone());

        assert!(!chain.preprocess(&1));
        assert_eq!(after.pre.load(Ordering::SeqCst), 1);
        assert_eq!(chain.len(), 1);
        assert!(!registration.is_registered());
        assert!(!registration.unregister());

        chain.preprocess(&2);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    struct Panicking;

    impl EventSink<u32> for Panicking {
        fn preprocess(&self, _event: &u32) -> bool {
            panic!("sink failure")
        }

        fn postprocess(&self, _event: &u32) -> bool {
            false
        }
    }

    #[test]
    fn panicking_sink_is_contained() {
        let chain = SinkChain::new();
        let after = Arc::new(Recorder::default());
        let _p = chain.register(Arc::new(Panicking));
        let _a = chain.register(after.clone());
        assert!(!chain.preprocess(&0));
        assert_eq!(after.pre.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registration_outliving_chain() {
        let chain = SinkChain::new();
        let registration = chain.register(Arc::new(Recorder::default()));
        drop(chain);
        assert!(!registration.is_registered());
        assert!(registration.unregister());
        assert!(!registration.unregister());
    }
}
