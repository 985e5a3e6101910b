//! Heap-based sorted run generation.

use std::cmp::Ordering;
use std::mem;

use tracing::debug;

use super::SortError;
use crate::cursor::{Cursor, CursorResult, Lookahead};
use crate::heap::ArrayHeap;

/// Generates sorted runs longer than its memory footprint.
///
/// A heap of `capacity` elements is filled from the input. Each pull emits
/// the heap minimum; the input element that takes its place goes back into
/// the heap when it still fits the current run (a single
/// [`replace`](ArrayHeap::replace) sift), or into a side buffer for the
/// next run, shrinking the active heap by one. When the heap runs dry the
/// side buffer is heapified into a fresh run and the emptied array is
/// recycled as the next side buffer, so steady-state memory is two arrays
/// of `capacity`.
///
/// The cursor yields the elements of each run in comparator order;
/// [`run`](Self::run) reports which run the most recently returned element
/// belongs to. On uniformly random input the expected run length is about
/// `2 * capacity`.
pub struct ReplacementSelection<C, Cmp>
where
    C: Cursor,
    Cmp: Fn(&C::Item, &C::Item) -> Ordering,
{
    core: Lookahead<(usize, C::Item)>,
    input: C,
    heap: ArrayHeap<C::Item, Cmp>,
    side: Vec<C::Item>,
    run: usize,
    last_run: usize,
    filled: bool,
}

impl<C, Cmp> ReplacementSelection<C, Cmp>
where
    C: Cursor,
    Cmp: Fn(&C::Item, &C::Item) -> Ordering,
{
    /// Creates a generator over `input` with the given run capacity and
    /// comparator.
    ///
    /// # Errors
    ///
    /// [`SortError::ZeroCapacity`] when `capacity` is zero.
    pub fn new(input: C, capacity: usize, cmp: Cmp) -> Result<Self, SortError> {
        if capacity == 0 {
            return Err(SortError::ZeroCapacity);
        }
        Ok(Self {
            core: Lookahead::new(),
            input,
            heap: ArrayHeap::with_capacity(capacity, cmp),
            side: Vec::with_capacity(capacity),
            run: 0,
            last_run: 0,
            filled: false,
        })
    }

    /// Run index (0-based) of the element most recently returned by
    /// `next`. Stays at 0 until the first element is returned.
    #[must_use]
    pub fn run(&self) -> usize {
        self.last_run
    }

    /// Initial fill: up to `capacity` elements heapified in one pass.
    fn fill(&mut self) {
        let mut initial = Vec::with_capacity(self.heap.capacity());
        while initial.len() < self.heap.capacity() {
            if !self.input.has_next() {
                break;
            }
            let Ok(item) = self.input.next() else {
                break;
            };
            initial.push(item);
        }
        // Within capacity by construction of the loop above.
        let _ = self.heap.rebuild(initial);
        self.filled = true;
    }

    /// Rebuilds the heap from the side buffer, starting the next run. The
    /// emptied heap storage becomes the new side buffer.
    fn start_next_run(&mut self) {
        let buffered = mem::take(&mut self.side);
        match self.heap.rebuild(buffered) {
            Ok(mut recycled) => {
                recycled.clear();
                self.side = recycled;
            }
            Err(_) => self.side = Vec::with_capacity(self.heap.capacity()),
        }
        self.run += 1;
        debug!(run = self.run, len = self.heap.len(), "starting next run");
    }

    fn produce(&mut self) -> Option<(usize, C::Item)> {
        if !self.filled {
            self.fill();
        }
        if self.heap.is_empty() {
            if self.side.is_empty() {
                return None;
            }
            self.start_next_run();
        }
        let out = if self.input.has_next() {
            let candidate = self.input.next().ok()?;
            let stays_in_run = {
                let minimum = self.heap.peek().ok()?;
                self.heap.compare(&candidate, minimum) != Ordering::Less
            };
            if stays_in_run {
                self.heap.replace(candidate).ok()?
            } else {
                let minimum = self.heap.dequeue().ok()?;
                self.side.push(candidate);
                minimum
            }
        } else {
            self.heap.dequeue().ok()?
        };
        Some((self.run, out))
    }
}

impl<C, Cmp> Cursor for ReplacementSelection<C, Cmp>
where
    C: Cursor,
    Cmp: Fn(&C::Item, &C::Item) -> Ordering,
{
    type Item = C::Item;

    fn open(&mut self) {
        if self.core.open() {
            self.input.open();
        }
    }

    fn close(&mut self) {
        if self.core.close() {
            self.input.close();
            let _ = self.heap.rebuild(Vec::new());
            self.side.clear();
        }
    }

    fn has_next(&mut self) -> bool {
        self.open();
        if self.core.is_closed() || self.core.is_exhausted() {
            return self.core.has_next_with(|| None);
        }
        if self.core.has_pending() {
            return true;
        }
        let item = self.produce();
        self.core.has_next_with(|| item)
    }

    fn next(&mut self) -> CursorResult<Self::Item> {
        self.open();
        let entry = if self.core.is_closed() || self.core.has_pending() || self.core.is_exhausted()
        {
            self.core.next_with(|| None)?
        } else {
            let item = self.produce();
            self.core.next_with(|| item)?
        };
        let (run, item) = entry;
        self.last_run = run;
        Ok(item)
    }

    fn reset(&mut self) -> CursorResult<()> {
        self.input.reset()?;
        let _ = self.heap.rebuild(Vec::new());
        self.side.clear();
        self.run = 0;
        self.last_run = 0;
        self.filled = false;
        self.core.reset();
        Ok(())
    }

    fn supports_reset(&self) -> bool {
        self.input.supports_reset()
    }
}
