//! Command Queue - Cross-Thread Work Marshaling
//!
//! Any thread may enqueue a deferred action. Exactly one thread (the render
//! thread) drains the queue once per tick and runs every action against its
//! context with exclusive access. This is the only way work reaches
//! animation state.
//!
//! # Drain semantics
//!
//! - The pending buffer is swapped out under the lock, then executed outside
//!   it, so producers never wait on action execution
//! - Actions run in FIFO order of enqueue
//! - An action that returns `Err` or panics is logged; later actions in the
//!   same drain still run
//! - Actions enqueued while a drain is executing run on the next drain

use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

/// A deferred unit of work executed on the draining thread
pub type Action<C> = Box<dyn FnOnce(&mut C) -> anyhow::Result<()> + Send + 'static>;

/// Outcome counts for one drain
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Actions that returned `Ok`
    pub succeeded: usize,
    /// Actions that returned `Err`
    pub failed: usize,
    /// Actions that panicked
    pub panicked: usize,
}

impl DrainStats {
    /// Total actions executed
    #[must_use]
    pub fn executed(&self) -> usize {
        self.succeeded + self.failed + self.panicked
    }
}

/// Thread-safe FIFO of actions over a context `C`
pub struct CommandQueue<C> {
    pending: Mutex<VecDeque<Action<C>>>,
}

impl<C> Default for CommandQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for CommandQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl<C> CommandQueue<C> {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Append an action; callable from any thread
    pub fn enqueue<F>(&self, action: F)
    where
        F: FnOnce(&mut C) -> anyhow::Result<()> + Send + 'static,
    {
        self.pending.lock().push_back(Box::new(action));
    }

    /// Number of actions waiting for the next drain
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether nothing is waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Run every action pending at call time against `ctx`
    ///
    /// Must only be called from the thread that owns `ctx`.
    pub fn drain_and_execute_all(&self, ctx: &mut C) -> DrainStats {
        let batch = std::mem::take(&mut *self.pending.lock());
        let mut stats = DrainStats::default();

        for action in batch {
            match catch_unwind(AssertUnwindSafe(|| action(ctx))) {
                Ok(Ok(())) => stats.succeeded += 1,
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Queued command failed");
                    stats.failed += 1;
                }
                Err(payload) => {
                    tracing::error!(panic = %panic_message(payload.as_ref()), "Queued command panicked");
                    stats.panicked += 1;
                }
            }
        }

        if stats.executed() > 0 {
            tracing::trace!(
                executed = stats.executed(),
                failed = stats.failed,
                panicked = stats.panicked,
                "Drained command queue"
            );
        }

        stats
    }

    /// Producer handle that shares this queue
    #[must_use]
    pub fn sender(self: &Arc<Self>) -> CommandSender<C> {
        CommandSender {
            queue: Arc::clone(self),
        }
    }
}

/// Cloneable producer handle for a [`CommandQueue`]
pub struct CommandSender<C> {
    queue: Arc<CommandQueue<C>>,
}

impl<C> Clone for CommandSender<C> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<C> fmt::Debug for CommandSender<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSender")
            .field("pending", &self.queue.len())
            .finish()
    }
}

impl<C> CommandSender<C> {
    /// Append an action to the shared queue
    pub fn enqueue<F>(&self, action: F)
    where
        F: FnOnce(&mut C) -> anyhow::Result<()> + Send + 'static,
    {
        self.queue.enqueue(action);
    }

    /// The queue this handle feeds
    #[must_use]
    pub fn queue(&self) -> &Arc<CommandQueue<C>> {
        &self.queue
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
