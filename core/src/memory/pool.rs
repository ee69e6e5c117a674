use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use super::DEFAULT_BUFFER_SIZE;

struct Inner {
    free: Mutex<Vec<Box<[u8]>>>,
    notify: Notify,
    buffer_size: usize,
    /// Total buffers ever allocated; bounded by `max_buffers`.
    allocated: AtomicUsize,
    max_buffers: usize,
    outstanding: AtomicUsize,
}

/// A pool of equal-sized byte buffers leased to receive operations.
///
/// `lease` suspends (via `Notify`, not a spin loop) once `max_buffers` are
/// outstanding, giving property 7 of the specification a real enforcement point
/// rather than an unbounded allocation escape hatch.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

impl BufferPool {
    pub fn new(buffer_size: usize, max_buffers: usize) -> Self {
        BufferPool {
            inner: Arc::new(Inner {
                free: Mutex::new(Vec::new()),
                notify: Notify::new(),
                buffer_size,
                allocated: AtomicUsize::new(0),
                max_buffers,
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    pub fn with_defaults(max_buffers: usize) -> Self {
        Self::new(DEFAULT_BUFFER_SIZE, max_buffers)
    }

    /// Number of buffers currently leased out (not yet released).
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Relaxed)
    }

    /// Lease a buffer, suspending if the pool is exhausted and at capacity.
    pub async fn lease(&self) -> LeasedBuffer {
        loop {
            if let Some(buf) = self.try_take() {
                self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
                return LeasedBuffer {
                    buf: Some(buf),
                    len: 0,
                    pool: self.clone(),
                };
            }
            self.inner.notify.notified().await;
        }
    }

    fn try_take(&self) -> Option<Box<[u8]>> {
        let mut free = self.inner.free.lock().expect("buffer pool mutex poisoned");
        if let Some(buf) = free.pop() {
            return Some(buf);
        }
        drop(free);

        let allocated = self.inner.allocated.fetch_add(1, Ordering::AcqRel);
        if allocated < self.inner.max_buffers {
            Some(vec![0u8; self.inner.buffer_size].into_boxed_slice())
        } else {
            self.inner.allocated.fetch_sub(1, Ordering::AcqRel);
            None
        }
    }

    fn release(&self, buf: Box<[u8]>) {
        self.inner
            .free
            .lock()
            .expect("buffer pool mutex poisoned")
            .push(buf);
        self.inner.outstanding.fetch_sub(1, Ordering::AcqRel);
        self.inner.notify.notify_one();
    }
}

/// A buffer leased from a [`BufferPool`]; returned automatically on drop so every
/// exit path — success, parse failure, or cancellation — releases it exactly
/// once.
pub struct LeasedBuffer {
    buf: Option<Box<[u8]>>,
    len: usize,
    pool: BufferPool,
}

impl LeasedBuffer {
    /// Full backing storage, for receive operations that need to fill it.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buf.as_mut().expect("buffer already released")
    }

    /// The portion of the buffer written by the last receive.
    pub fn filled(&self) -> &[u8] {
        &self.buf.as_ref().expect("buffer already released")[..self.len]
    }

    pub fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.buf.as_ref().map_or(0, |b| b.len()));
        self.len = len;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for LeasedBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lease_and_release_returns_exactly_once() {
        let pool = BufferPool::new(128, 2);
        {
            let a = pool.lease().await;
            let b = pool.lease().await;
            assert_eq!(pool.outstanding(), 2);
            drop(a);
            drop(b);
        }
        assert_eq!(pool.outstanding(), 0);
    }

    #[tokio::test]
    async fn lease_suspends_when_exhausted() {
        let pool = BufferPool::new(8, 1);
        let first = pool.lease().await;
        let pool2 = pool.clone();
        let handle = tokio::spawn(async move {
            let _second = pool2.lease().await;
        });
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        drop(first);
        handle.await.unwrap();
    }
}
