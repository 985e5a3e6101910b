//! Bounded-memory grouping with an overflow queue.

use std::hash::Hash;

use tracing::debug;

use sluice_common::collections::{sluice_index_map, SluiceIndexMap};
use sluice_common::memory::{BudgetError, MemoryBudget};

use super::Group;
use crate::bag::Bag;
use crate::cursor::{Cursor, CursorResult, Lookahead};
use crate::queue::Queue;
use crate::storage::{BagFactory, QueueFactory};

/// Partitions its input by a key function under a fixed memory budget.
///
/// At most `budget.max_tuples()` keys are resident at once, each holding a
/// factory-allocated [`Bag`]. Elements whose key is not resident and cannot
/// be admitted are redirected to a factory-allocated overflow [`Queue`].
/// A resident key absorbs every one of its elements during a pass, so each
/// resident group is complete when the pass ends.
///
/// Groups are emitted in the key map's insertion order, one per pull, and
/// removed from the operator as they go. When the resident map drains and
/// overflow remains, the overflow queue is swapped out and re-drained
/// through the same routing - a second, third, ... pass - until no element
/// is left.
///
/// With factory-supplied external bags and queues, resident memory stays
/// bounded by the budget no matter the input size.
pub struct NestedLoopsGrouper<C, F, K>
where
    C: Cursor,
    K: Eq + Hash,
{
    core: Lookahead<Group<K, C::Item>>,
    input: C,
    key_fn: F,
    budget: MemoryBudget,
    max_tuples: usize,
    groups: SluiceIndexMap<K, Box<dyn Bag<C::Item>>>,
    overflow: Box<dyn Queue<C::Item>>,
    bag_factory: BagFactory<C::Item>,
    queue_factory: QueueFactory<C::Item>,
    input_drained: bool,
    pass: usize,
}

impl<C, F, K> NestedLoopsGrouper<C, F, K>
where
    C: Cursor,
    C::Item: 'static,
    F: Fn(&C::Item) -> K,
    K: Eq + Hash + 'static,
{
    /// Creates a grouper over `input` keyed by `key_fn`, constrained by
    /// `budget`, allocating storage from the given factories.
    ///
    /// # Errors
    ///
    /// [`BudgetError`] if the budget cannot hold two keys plus one buffered
    /// element; nothing is consumed from `input` in that case.
    pub fn new(
        input: C,
        key_fn: F,
        budget: MemoryBudget,
        bag_factory: BagFactory<C::Item>,
        mut queue_factory: QueueFactory<C::Item>,
    ) -> Result<Self, BudgetError> {
        budget.validate()?;
        let overflow = queue_factory();
        Ok(Self {
            core: Lookahead::new(),
            input,
            key_fn,
            budget,
            max_tuples: budget.max_tuples(),
            groups: sluice_index_map(),
            overflow,
            bag_factory,
            queue_factory,
            input_drained: false,
            pass: 0,
        })
    }

    /// The budget this grouper was constructed with.
    #[must_use]
    pub fn budget(&self) -> &MemoryBudget {
        &self.budget
    }

    /// Number of keys that may be resident at once.
    #[must_use]
    pub fn max_tuples(&self) -> usize {
        self.max_tuples
    }

    /// Routes one element: resident bag, fresh bag if a slot is free,
    /// otherwise the overflow queue.
    fn route(&mut self, item: C::Item) {
        let key = (self.key_fn)(&item);
        if let Some(bag) = self.groups.get_mut(&key) {
            bag.insert(item);
        } else if self.groups.len() < self.max_tuples {
            let mut bag = (self.bag_factory)();
            bag.insert(item);
            self.groups.insert(key, bag);
        } else {
            self.overflow.enqueue(item);
        }
    }

    /// First pass: consume the entire input through the router.
    fn drain_input(&mut self) {
        while self.input.has_next() {
            let Ok(item) = self.input.next() else {
                break;
            };
            self.route(item);
        }
        self.input_drained = true;
        self.pass = 1;
        debug!(
            resident = self.groups.len(),
            overflow = self.overflow.len(),
            "grouping pass 1 complete"
        );
    }

    /// Later passes: swap the overflow queue for a fresh one and push the
    /// old contents back through the router.
    fn redrain_overflow(&mut self) {
        let mut spilled = std::mem::replace(&mut self.overflow, (self.queue_factory)());
        while let Some(item) = spilled.dequeue() {
            self.route(item);
        }
        self.pass += 1;
        debug!(
            pass = self.pass,
            resident = self.groups.len(),
            overflow = self.overflow.len(),
            "grouping pass complete"
        );
    }

    fn produce(&mut self) -> Option<Group<K, C::Item>> {
        if !self.input_drained {
            self.drain_input();
        }
        while self.groups.is_empty() && !self.overflow.is_empty() {
            self.redrain_overflow();
        }
        let (key, bag) = self.groups.shift_remove_index(0)?;
        Some((key, bag.into_cursor()))
    }
}

impl<C, F, K> Cursor for NestedLoopsGrouper<C, F, K>
where
    C: Cursor,
    C::Item: 'static,
    F: Fn(&C::Item) -> K,
    K: Eq + Hash + 'static,
{
    type Item = Group<K, C::Item>;

    fn open(&mut self) {
        if self.core.open() {
            self.input.open();
        }
    }

    fn close(&mut self) {
        if self.core.close() {
            self.input.close();
            for (_, mut bag) in self.groups.drain(..) {
                bag.clear();
            }
            self.overflow.clear();
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
        let group = self.produce();
        self.core.has_next_with(|| group)
    }

    fn next(&mut self) -> CursorResult<Self::Item> {
        self.open();
        if self.core.is_closed() || self.core.has_pending() || self.core.is_exhausted() {
            return self.core.next_with(|| None);
        }
        let group = self.produce();
        self.core.next_with(|| group)
    }

    fn peek(&mut self) -> CursorResult<&Self::Item> {
        self.open();
        if self.core.is_closed() || self.core.has_pending() || self.core.is_exhausted() {
            return self.core.peek_with(|| None);
        }
        let group = self.produce();
        self.core.peek_with(|| group)
    }

    fn supports_peek(&self) -> bool {
        true
    }

    fn reset(&mut self) -> CursorResult<()> {
        self.input.reset()?;
        for (_, mut bag) in self.groups.drain(..) {
            bag.clear();
        }
        self.overflow = (self.queue_factory)();
        self.input_drained = false;
        self.pass = 0;
        self.core.reset();
        Ok(())
    }

    fn supports_reset(&self) -> bool {
        self.input.supports_reset()
    }
}
