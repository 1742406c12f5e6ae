//! Bounded closeable FIFO of line buffers.
//!
//! # Design
//!
//! This is the backpressure point between the tailing reader and the sink: a
//! capacity-limited queue with blocking `push`/`pop` and an explicit closed
//! state, i.e. a bounded channel whose shutdown semantics we control exactly.
//!
//! One mutex guards the buffer sequence and the closed bit; two condvars
//! (`not_empty`, `not_full`) wake the complementary side on every state
//! change. No compound invariant spans this mutex and any other lock — the
//! buffer pool has its own, and neither is acquired while holding the other.
//!
//! # Shutdown Protocol
//!
//! - `close()` marks the queue closed and wakes **all** waiters. Idempotent.
//! - A `push` blocked on a full queue stops waiting once closed and hands the
//!   rejected buffer back to the caller (who returns it to the pool) instead
//!   of enqueueing it.
//! - A `pop` keeps draining whatever was enqueued before the close; it
//!   returns `None` only once the queue is closed **and** empty. That `None`
//!   is the consumer's terminal signal.
//!
//! Together these guarantee no waiter blocks indefinitely after shutdown and
//! no queued line is dropped by the consumer.
//!
//! # Ordering
//!
//! Strictly FIFO: `pop` order equals `push` order. The single mutex
//! serializes both sides, so there is no reordering window.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Bounded FIFO of in-flight line buffers with cooperative shutdown.
#[derive(Debug)]
pub struct LineQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

#[derive(Debug)]
struct QueueState {
    items: VecDeque<Vec<u8>>,
    closed: bool,
}

impl LineQueue {
    /// Creates a queue holding at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Enqueues a line, blocking while the queue is full and open.
    ///
    /// Returns `Err(line)` with the rejected buffer if the queue is (or
    /// becomes, while blocked) closed. The caller owns the rejected buffer
    /// and is expected to release it to the pool.
    pub fn push(&self, line: Vec<u8>) -> Result<(), Vec<u8>> {
        let mut state = self.state.lock().expect("line queue mutex poisoned");

        while state.items.len() == self.capacity && !state.closed {
            state = self
                .not_full
                .wait(state)
                .expect("line queue mutex poisoned");
        }

        if state.closed {
            return Err(line);
        }

        debug_assert!(state.items.len() < self.capacity);
        state.items.push_back(line);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeues the oldest line, blocking while the queue is empty and open.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub fn pop(&self) -> Option<Vec<u8>> {
        let mut state = self.state.lock().expect("line queue mutex poisoned");

        while state.items.is_empty() && !state.closed {
            state = self
                .not_empty
                .wait(state)
                .expect("line queue mutex poisoned");
        }

        match state.items.pop_front() {
            Some(line) => {
                drop(state);
                self.not_full.notify_one();
                Some(line)
            }
            None => {
                debug_assert!(state.closed);
                None
            }
        }
    }

    /// Closes the queue and wakes every blocked waiter. Idempotent.
    ///
    /// Lines already queued remain poppable; new pushes are rejected.
    pub fn close(&self) {
        let mut state = self.state.lock().expect("line queue mutex poisoned");
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Current number of queued lines.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .expect("line queue mutex poisoned")
            .items
            .len()
    }

    /// True when no lines are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
