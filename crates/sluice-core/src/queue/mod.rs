//! FIFO queues: the pluggable storage behind overflow and run buffering.
//!
//! - [`Queue`] - the minimal FIFO contract operators program against
//! - [`ResizableArrayQueue`] - circular array queue with an injected
//!   [`GrowthPolicy`]
//! - [`BoundedQueue`] - the one concurrent component: a monitor-guarded
//!   blocking wrapper for producer/consumer decoupling

mod bounded;
mod resizable;

pub use bounded::BoundedQueue;
pub use resizable::{DoublingGrowth, GrowthPolicy, ResizableArrayQueue};

use std::collections::VecDeque;

use thiserror::Error;

use crate::cursor::{Cursor, CursorResult, Lookahead};

/// Error from queue operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was closed while the operation was pending or before it
    /// started.
    #[error("queue is closed")]
    Closed,
}

/// Minimal FIFO contract.
///
/// Implementations are single-threaded; wrap one in a
/// [`BoundedQueue`] for cross-thread handoff.
pub trait Queue<T> {
    /// Appends an element at the tail.
    fn enqueue(&mut self, item: T);

    /// Removes and returns the head element, or `None` when empty.
    fn dequeue(&mut self) -> Option<T>;

    /// The head element without removing it.
    fn peek(&self) -> Option<&T>;

    /// Number of stored elements.
    fn len(&self) -> usize;

    /// Whether no elements are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all stored elements.
    fn clear(&mut self);
}

/// Cursor that drains a queue in FIFO order.
///
/// Used by the external sorter to replay a materialized run; works over any
/// boxed [`Queue`], so runs can live in external storage.
pub struct QueueCursor<T> {
    core: Lookahead<T>,
    queue: Box<dyn Queue<T>>,
}

impl<T> QueueCursor<T> {
    /// Wraps `queue`; elements are consumed as the cursor advances.
    pub fn new(queue: Box<dyn Queue<T>>) -> Self {
        Self {
            core: Lookahead::new(),
            queue,
        }
    }
}

impl<T> Cursor for QueueCursor<T> {
    type Item = T;

    fn open(&mut self) {
        self.core.open();
    }

    fn close(&mut self) {
        if self.core.close() {
            self.queue.clear();
        }
    }

    fn has_next(&mut self) -> bool {
        self.open();
        let queue = &mut self.queue;
        self.core.has_next_with(|| queue.dequeue())
    }

    fn next(&mut self) -> CursorResult<T> {
        self.open();
        let queue = &mut self.queue;
        self.core.next_with(|| queue.dequeue())
    }

    fn peek(&mut self) -> CursorResult<&T> {
        self.open();
        let queue = &mut self.queue;
        self.core.peek_with(|| queue.dequeue())
    }

    fn supports_peek(&self) -> bool {
        true
    }
}

impl<T> Queue<T> for VecDeque<T> {
    fn enqueue(&mut self, item: T) {
        self.push_back(item);
    }

    fn dequeue(&mut self) -> Option<T> {
        self.pop_front()
    }

    fn peek(&self) -> Option<&T> {
        self.front()
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn clear(&mut self) {
        VecDeque::clear(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_cursor_drains_fifo() {
        let mut q = ResizableArrayQueue::new();
        for i in 0..5 {
            q.enqueue(i);
        }
        let mut cursor = QueueCursor::new(Box::new(q) as Box<dyn Queue<i32>>);
        assert_eq!(*cursor.peek().unwrap(), 0);
        assert_eq!(cursor.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(!cursor.has_next());
    }

    #[test]
    fn test_vecdeque_queue_fifo() {
        let mut q: VecDeque<i32> = VecDeque::new();
        Queue::enqueue(&mut q, 1);
        Queue::enqueue(&mut q, 2);
        assert_eq!(Queue::peek(&q), Some(&1));
        assert_eq!(Queue::dequeue(&mut q), Some(1));
        assert_eq!(Queue::dequeue(&mut q), Some(2));
        assert_eq!(Queue::dequeue(&mut q), None);
    }
}
