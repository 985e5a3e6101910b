//! K-way merge of sorted cursors.

use std::cmp::Ordering;

use crate::cursor::{Cursor, CursorResult, Lookahead};
use crate::heap::ArrayHeap;

/// Comparator over (element, source index) heap entries.
type EntryCmp<T> = Box<dyn Fn(&(T, usize), &(T, usize)) -> Ordering>;

/// Merges any number of sorted child cursors into one sorted cursor.
///
/// A heap of per-child heads drives the merge: each pull swaps the emitted
/// head for its successor from the same child in a single
/// [`replace`](ArrayHeap::replace) sift. Children must already be sorted
/// under the same comparator; the merger does not verify this.
pub struct Merger<C: Cursor> {
    core: Lookahead<C::Item>,
    inputs: Vec<C>,
    heap: ArrayHeap<(C::Item, usize), EntryCmp<C::Item>>,
    primed: bool,
}

impl<C: Cursor> Merger<C> {
    /// Creates a merger over `inputs` ordered by `cmp`.
    pub fn new(inputs: Vec<C>, cmp: impl Fn(&C::Item, &C::Item) -> Ordering + 'static) -> Self {
        let entry_cmp: EntryCmp<C::Item> = Box::new(move |a, b| cmp(&a.0, &b.0));
        let heap = ArrayHeap::with_capacity(inputs.len(), entry_cmp);
        Self {
            core: Lookahead::new(),
            inputs,
            heap,
            primed: false,
        }
    }

    /// Number of child cursors being merged.
    #[must_use]
    pub fn fan_in(&self) -> usize {
        self.inputs.len()
    }

    fn pull_source(&mut self, source: usize) -> Option<C::Item> {
        let input = &mut self.inputs[source];
        if input.has_next() {
            input.next().ok()
        } else {
            None
        }
    }

    fn produce(&mut self) -> Option<C::Item> {
        if !self.primed {
            self.primed = true;
            for source in 0..self.inputs.len() {
                if let Some(head) = self.pull_source(source) {
                    let _ = self.heap.enqueue((head, source));
                }
            }
        }
        let source = self.heap.peek().ok()?.1;
        match self.pull_source(source) {
            Some(successor) => self
                .heap
                .replace((successor, source))
                .ok()
                .map(|(item, _)| item),
            None => self.heap.dequeue().ok().map(|(item, _)| item),
        }
    }
}

impl<C: Cursor> Cursor for Merger<C> {
    type Item = C::Item;

    fn open(&mut self) {
        if self.core.open() {
            for input in &mut self.inputs {
                input.open();
            }
        }
    }

    fn close(&mut self) {
        if self.core.close() {
            for input in &mut self.inputs {
                input.close();
            }
            let _ = self.heap.rebuild(Vec::new());
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
        if self.core.is_closed() || self.core.has_pending() || self.core.is_exhausted() {
            return self.core.next_with(|| None);
        }
        let item = self.produce();
        self.core.next_with(|| item)
    }

    fn peek(&mut self) -> CursorResult<&Self::Item> {
        self.open();
        if self.core.is_closed() || self.core.has_pending() || self.core.is_exhausted() {
            return self.core.peek_with(|| None);
        }
        let item = self.produce();
        self.core.peek_with(|| item)
    }

    fn supports_peek(&self) -> bool {
        true
    }

    fn reset(&mut self) -> CursorResult<()> {
        for input in &mut self.inputs {
            input.reset()?;
        }
        let _ = self.heap.rebuild(Vec::new());
        self.primed = false;
        self.core.reset();
        Ok(())
    }

    fn supports_reset(&self) -> bool {
        self.inputs.iter().all(Cursor::supports_reset)
    }
}
