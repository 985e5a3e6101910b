//! Sorting operators: replacement-selection run generation, k-way merging,
//! and the external sort pipeline combining the two.
//!
//! [`ReplacementSelection`] turns an unsorted cursor into sorted runs using
//! a heap of fixed capacity; on random input the expected run length is
//! about twice the capacity. [`Merger`] merges any number of sorted cursors
//! into one. [`MergeSorter`] wires them together, materializing each run
//! into a factory-allocated queue - swap in external-storage queues and the
//! sort runs out-of-core.

mod merge;
mod replacement_selection;

pub use merge::Merger;
pub use replacement_selection::ReplacementSelection;

use thiserror::Error;

use crate::cursor::Cursor;
use crate::queue::{Queue, QueueCursor};
use crate::storage::QueueFactory;

/// Error from sorter configuration.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortError {
    /// The run capacity must admit at least one resident element.
    #[error("run capacity must be at least one element")]
    ZeroCapacity,
}

/// External merge sort over cursors.
///
/// Phase one generates sorted runs by replacement selection; phase two
/// replays the materialized runs through a k-way merge. Runs are stored in
/// queues from the configured factory, in-memory by default.
///
/// # Example
///
/// ```
/// use sluice_core::cursor::{Cursor, IterCursor};
/// use sluice_core::sort::MergeSorter;
///
/// let input = IterCursor::new([5, 2, 9, 1, 7, 3].into_iter());
/// let mut sorted = MergeSorter::new(4, i32::cmp).sort(input).unwrap();
/// assert_eq!(sorted.iter().collect::<Vec<_>>(), vec![1, 2, 3, 5, 7, 9]);
/// ```
pub struct MergeSorter<T, Cmp> {
    run_capacity: usize,
    cmp: Cmp,
    queue_factory: QueueFactory<T>,
}

impl<T, Cmp> MergeSorter<T, Cmp>
where
    T: 'static,
    Cmp: Fn(&T, &T) -> std::cmp::Ordering + Clone + 'static,
{
    /// Creates a sorter generating runs of up to `run_capacity` resident
    /// elements, ordered by `cmp`, with in-memory run storage.
    pub fn new(run_capacity: usize, cmp: Cmp) -> Self {
        Self {
            run_capacity,
            cmp,
            queue_factory: Box::new(|| Box::new(crate::queue::ResizableArrayQueue::new())),
        }
    }

    /// Replaces the run storage factory.
    #[must_use]
    pub fn with_queue_factory(mut self, queue_factory: QueueFactory<T>) -> Self {
        self.queue_factory = queue_factory;
        self
    }

    /// Consumes `input` and returns a cursor over its elements in `cmp`
    /// order.
    ///
    /// # Errors
    ///
    /// [`SortError::ZeroCapacity`] if the sorter was configured with a zero
    /// run capacity; nothing is consumed from `input` in that case.
    pub fn sort<C>(mut self, input: C) -> Result<Merger<QueueCursor<T>>, SortError>
    where
        C: Cursor<Item = T>,
    {
        let mut generator =
            ReplacementSelection::new(input, self.run_capacity, self.cmp.clone())?;
        let mut runs: Vec<Box<dyn Queue<T>>> = Vec::new();
        while generator.has_next() {
            let Ok(item) = generator.next() else {
                break;
            };
            let run = generator.run();
            if run == runs.len() {
                runs.push((self.queue_factory)());
            }
            runs[run].enqueue(item);
        }
        generator.close();

        let inputs: Vec<QueueCursor<T>> = runs.into_iter().map(QueueCursor::new).collect();
        let cmp = self.cmp;
        Ok(Merger::new(inputs, move |a, b| cmp(a, b)))
    }
}
