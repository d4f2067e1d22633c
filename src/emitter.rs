//! Host callback registry keyed by event name.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use smol_str::SmolStr;

/// What a host callback returns. Errors are logged by the dispatcher and otherwise ignored.
pub type CallbackResult = Result<(), Box<dyn Error + Send + Sync>>;

/// A host callback.
pub type Callback<E> = Box<dyn FnMut(&E) -> CallbackResult + Send>;

type SharedCallback<E> = Arc<Mutex<Callback<E>>>;

/// Maps event names to at most one callback each.
///
/// Callbacks are invoked without holding the registry lock, so a callback may freely call
/// [`EventEmitter::on`] or [`EventEmitter::off`], including for its own name.
pub struct EventEmitter<E> {
    handlers: Mutex<HashMap<SmolStr, SharedCallback<E>>>,
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self { handlers: Mutex::new(HashMap::new()) }
    }
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EventEmitter").field("names", &handlers.keys()).finish()
    }
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `name`, replacing any previous one.
    pub fn on(&self, name: impl Into<SmolStr>, callback: Callback<E>) {
        self.handlers().insert(name.into(), Arc::new(Mutex::new(callback)));
    }

    /// Remove the callback for `name`. Returns whether there was one.
    pub fn off(&self, name: &str) -> bool {
        self.handlers().remove(name).is_some()
    }

    pub fn has(&self, name: &str) -> bool {
        self.handlers().contains_key(name)
    }

    /// Invoke the callback registered for `name`, if any.
    pub fn emit(&self, name: &str, event: &E) -> CallbackResult {
        let callback = self.handlers().get(name).cloned();
        match callback {
            Some(callback) => {
                let mut callback = callback.lock().unwrap_or_else(PoisonError::into_inner);
                (callback)(event)
            },
            None => Ok(()),
        }
    }

    fn handlers(&self) -> std::sync::MutexGuard<'_, HashMap<SmolStr, SharedCallback<E>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
