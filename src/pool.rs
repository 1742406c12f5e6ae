//! Reusable line-buffer pool.
//!
//! # Design
//!
//! A free list of `Vec<u8>` line buffers behind a single mutex. Pool
//! operations run once per *line*, not per byte, so one uncontended lock is
//! cheap relative to the read/write syscalls on either side; the hot per-byte
//! work (framing, matching) never touches the pool.
//!
//! # Correctness Invariants
//!
//! - **Exclusive handout**: a buffer returned by `acquire()` is owned by the
//!   caller and is not reachable from the free list until `release()`d. Moves
//!   of `Vec<u8>` enforce this by construction.
//! - **Cleared before reuse**: `release()` resets the length to zero. Byte
//!   contents are not erased; capacity is retained.
//! - **Never fails**: exhaustion allocates a new buffer instead of erroring.
//!   The pool grows to the peak concurrent in-flight line count and never
//!   shrinks.
//! - **Capacity floor**: every buffer has capacity ≥ the configured line
//!   capacity, so appending up to `max_line_len` bytes never reallocates.

use std::sync::Mutex;

/// Growable pool of reusable line buffers.
///
/// Shared between the reader thread (acquire) and the sink thread (release);
/// see the locking discipline note in the crate docs — the pool mutex is
/// never held while touching the queue, and vice versa.
#[derive(Debug)]
pub struct BufferPool {
    inner: Mutex<PoolInner>,
    /// Capacity reserved in every buffer this pool hands out.
    buf_capacity: usize,
}

#[derive(Debug)]
struct PoolInner {
    free: Vec<Vec<u8>>,
    allocated: u64,
    reused: u64,
    released: u64,
}

/// Pool accounting, snapshotted under the pool lock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers ever allocated (initial pre-warm plus on-demand growth).
    pub allocated: u64,
    /// Acquires served from the free list.
    pub reused: u64,
    /// Buffers returned via `release()`.
    pub released: u64,
    /// Buffers currently on the free list.
    pub free: usize,
}

impl BufferPool {
    /// Creates a pool that pre-allocates `initial` buffers of `buf_capacity`
    /// bytes each.
    pub fn new(buf_capacity: usize, initial: usize) -> Self {
        assert!(buf_capacity > 0);

        let free: Vec<Vec<u8>> = (0..initial)
            .map(|_| Vec::with_capacity(buf_capacity))
            .collect();

        Self {
            inner: Mutex::new(PoolInner {
                free,
                allocated: initial as u64,
                reused: 0,
                released: 0,
            }),
            buf_capacity,
        }
    }

    /// Returns an empty buffer with capacity ≥ the pool's buffer capacity.
    ///
    /// Pops the free list when possible, otherwise allocates. Never fails.
    pub fn acquire(&self) -> Vec<u8> {
        let mut inner = self.inner.lock().expect("buffer pool mutex poisoned");
        match inner.free.pop() {
            Some(buf) => {
                debug_assert!(buf.is_empty());
                debug_assert!(buf.capacity() >= self.buf_capacity);
                inner.reused += 1;
                buf
            }
            None => {
                inner.allocated += 1;
                drop(inner);
                Vec::with_capacity(self.buf_capacity)
            }
        }
    }

    /// Clears a buffer and returns it to the free list.
    ///
    /// Undersized buffers are grown to the pool's capacity so the floor
    /// holds for every future `acquire`.
    pub fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        if buf.capacity() < self.buf_capacity {
            buf.reserve(self.buf_capacity);
        }

        let mut inner = self.inner.lock().expect("buffer pool mutex poisoned");
        inner.released += 1;
        inner.free.push(buf);
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock().expect("buffer pool mutex poisoned");
        PoolStats {
            allocated: inner.allocated,
            reused: inner.reused,
            released: inner.released,
            free: inner.free.len(),
        }
    }

    /// The capacity reserved in each buffer.
    pub fn buf_capacity(&self) -> usize {
        self.buf_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn prewarmed_buffers_are_reused() {
        let pool = BufferPool::new(64, 2);
        assert_eq!(pool.stats().free, 2);

        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.stats().free, 0);
        assert_eq!(pool.stats().reused, 2);
        assert_eq!(pool.stats().allocated, 2);

        pool.release(a);
        pool.release(b);
        assert_eq!(pool.stats().free, 2);
        assert_eq!(pool.stats().released, 2);
    }

    #[test]
    fn grows_on_exhaustion() {
        let pool = BufferPool::new(16, 0);
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.stats().allocated, 2);
        assert_eq!(pool.stats().reused, 0);

        pool.release(a);
        pool.release(b);
        // Growth is permanent: both buffers stay on the free list.
        assert_eq!(pool.stats().free, 2);
    }

    #[test]
    fn released_buffer_is_empty_but_keeps_capacity() {
        let pool = BufferPool::new(32, 1);
        let mut buf = pool.acquire();
        buf.extend_from_slice(b"some line content");
        pool.release(buf);

        let again = pool.acquire();
        assert!(again.is_empty());
        assert!(again.capacity() >= 32);
    }

    #[test]
    fn capacity_floor_holds_for_grown_buffers() {
        let pool = BufferPool::new(100, 0);
        let buf = pool.acquire();
        assert!(buf.capacity() >= 100);
    }

    #[test]
    fn concurrent_acquire_release() {
        let pool = Arc::new(BufferPool::new(64, 4));
        let threads = 4;
        let rounds = 1000;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for i in 0..rounds {
                        let mut buf = pool.acquire();
                        buf.extend_from_slice(&[i as u8; 8]);
                        pool.release(buf);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.released, (threads * rounds) as u64);
        assert_eq!(stats.reused + stats.allocated - 4, stats.released);
        assert_eq!(stats.free as u64, stats.allocated);
    }
}
