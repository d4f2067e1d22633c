//! Hand-off of work from the platform thread to the consumer thread.
//!
//! [`channel`] creates a [`MainLoopProxy`], which any thread may clone and schedule tasks
//! through, and the single [`MainLoop`] the consumer drains. Tasks run in submission order.
//! Each pass runs a bounded batch so a burst of events cannot starve the consumer, and a
//! failing or panicking task is logged and dropped without stopping the loop.

use std::any::Any;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, trace};

/// Outcome of a scheduled task.
pub type TaskResult = Result<(), Box<dyn Error + Send + Sync>>;

type Task = Box<dyn FnOnce() -> TaskResult + Send>;

/// Default number of tasks run per pass.
pub const DEFAULT_BATCH_LIMIT: usize = 100;

enum Message {
    Task(Task),
    /// Sentinel that wakes a blocked consumer once terminating.
    Terminate,
}

struct Shared {
    terminating: AtomicBool,
}

/// Create a connected proxy and main loop running at most `batch_limit` tasks per pass.
pub fn channel(batch_limit: usize) -> (MainLoopProxy, MainLoop) {
    let (sender, receiver) = mpsc::channel();
    let shared = Arc::new(Shared { terminating: AtomicBool::new(false) });
    let proxy = MainLoopProxy { sender, shared: shared.clone() };
    let main_loop = MainLoop {
        receiver,
        shared,
        peeked: None,
        batch_limit: batch_limit.max(1),
        terminated: false,
    };
    (proxy, main_loop)
}

/// Schedules tasks onto a [`MainLoop`] from any thread.
#[derive(Clone)]
pub struct MainLoopProxy {
    sender: Sender<Message>,
    shared: Arc<Shared>,
}

impl MainLoopProxy {
    /// Queue `task` to run on the consumer thread.
    ///
    /// Returns `false`, dropping the task, once [`MainLoopProxy::terminate`] was called or the
    /// main loop is gone.
    pub fn schedule<F>(&self, task: F) -> bool
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        if self.shared.terminating.load(Ordering::Acquire) {
            return false;
        }
        self.sender.send(Message::Task(Box::new(task))).is_ok()
    }

    /// Stop accepting tasks and wake the consumer. Tasks queued before this call still run; the
    /// loop stops at the terminate marker and drops whatever arrives behind it.
    pub fn terminate(&self) {
        if !self.shared.terminating.swap(true, Ordering::AcqRel) {
            trace!("terminating main loop");
            let _ = self.sender.send(Message::Terminate);
        }
    }

    pub fn is_terminating(&self) -> bool {
        self.shared.terminating.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MainLoopProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoopProxy").field("terminating", &self.is_terminating()).finish()
    }
}

/// The consumer side of the dispatch queue.
pub struct MainLoop {
    receiver: Receiver<Message>,
    shared: Arc<Shared>,
    peeked: Option<Message>,
    batch_limit: usize,
    terminated: bool,
}

impl MainLoop {
    /// Run queued tasks without blocking, at most one batch. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut executed = 0;
        while !self.terminated && executed < self.batch_limit {
            let message = match self.peeked.take() {
                Some(message) => message,
                None => match self.receiver.try_recv() {
                    Ok(message) => message,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.terminated = true;
                        break;
                    },
                },
            };
            match message {
                Message::Task(task) => {
                    run_task(task);
                    executed += 1;
                },
                Message::Terminate => self.terminated = true,
            }
        }
        executed
    }

    /// Block until a task is queued, the loop terminates, or `timeout` elapses.
    ///
    /// Returns whether a task is ready. Nothing runs; follow with [`MainLoop::run_pending`].
    pub fn wait(&mut self, timeout: Option<Duration>) -> bool {
        if self.terminated {
            return false;
        }
        if self.peeked.is_none() {
            let received = match timeout {
                Some(timeout) => self.receiver.recv_timeout(timeout),
                None => self.receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(Message::Terminate) | Err(RecvTimeoutError::Disconnected) => {
                    self.terminated = true;
                },
                Ok(message) => self.peeked = Some(message),
                Err(RecvTimeoutError::Timeout) => {},
            }
        }
        self.peeked.is_some()
    }

    /// Run batches until terminated, at most one batch per `tick` while there is a backlog.
    pub fn run(&mut self, tick: Duration) {
        while !self.terminated {
            let deadline = Instant::now() + tick;
            if self.run_pending() == self.batch_limit {
                thread::sleep(deadline.saturating_duration_since(Instant::now()));
            } else {
                self.wait(Some(tick));
            }
        }
        trace!("main loop finished");
    }

    /// The loop saw the termination sentinel or lost every proxy.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    /// Some proxy called [`MainLoopProxy::terminate`].
    pub fn is_terminating(&self) -> bool {
        self.shared.terminating.load(Ordering::Acquire)
    }
}

fn run_task(task: Task) {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(())) => {},
        Ok(Err(err)) => error!("scheduled callback failed: {err}"),
        Err(payload) => error!("scheduled callback panicked: {}", panic_message(payload.as_ref())),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "Box<dyn Any>"
    }
}
