//! Monitor-based blocking queue for producer/consumer decoupling.

use parking_lot::{Condvar, Mutex};

use super::{Queue, QueueError};

/// The one concurrent component of the crate: a bounded, blocking wrapper
/// around any [`Queue`].
///
/// `enqueue` waits while the wrapped queue holds `bound` elements;
/// `dequeue` waits while it is empty. Each successful operation signals one
/// waiting thread of the opposite kind. `close` wakes every waiter: pending
/// and subsequent `enqueue`s fail, while `dequeue` drains the remaining
/// elements and then reports `None`.
///
/// Share it with `Arc` between a producer and a consumer thread:
///
/// ```
/// use std::sync::Arc;
/// use sluice_core::queue::{BoundedQueue, ResizableArrayQueue};
///
/// let q = Arc::new(BoundedQueue::new(ResizableArrayQueue::new(), 4));
/// let producer = {
///     let q = Arc::clone(&q);
///     std::thread::spawn(move || {
///         for i in 0..100 {
///             q.enqueue(i).unwrap();
///         }
///         q.close();
///     })
/// };
/// let mut received = Vec::new();
/// while let Some(x) = q.dequeue() {
///     received.push(x);
/// }
/// producer.join().unwrap();
/// assert_eq!(received, (0..100).collect::<Vec<_>>());
/// ```
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    bound: usize,
}

struct Inner<T> {
    queue: Box<dyn Queue<T> + Send>,
    closed: bool,
}

impl<T: Send> BoundedQueue<T> {
    /// Wraps `queue` with a bound of `bound` elements (at least 1).
    pub fn new(queue: impl Queue<T> + Send + 'static, bound: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: Box::new(queue),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            bound: bound.max(1),
        }
    }

    /// The configured bound.
    #[must_use]
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Number of elements currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Whether no elements are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// Appends an element, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// [`QueueError::Closed`] if the queue is closed before the element
    /// could be inserted.
    pub fn enqueue(&self, item: T) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        while inner.queue.len() >= self.bound && !inner.closed {
            self.not_full.wait(&mut inner);
        }
        if inner.closed {
            return Err(QueueError::Closed);
        }
        inner.queue.enqueue(item);
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the head element, waiting while the queue is empty.
    ///
    /// Returns `None` only after `close`, once all remaining elements have
    /// been drained.
    pub fn dequeue(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        while inner.queue.is_empty() && !inner.closed {
            self.not_empty.wait(&mut inner);
        }
        let item = inner.queue.dequeue();
        drop(inner);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Attempts to remove the head element without blocking.
    pub fn try_dequeue(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        let item = inner.queue.dequeue();
        drop(inner);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Closes the queue and wakes every waiting thread. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        drop(inner);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Whether the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}
