//! Grouping operators: partition a cursor into per-key sub-cursors.
//!
//! Two implementations with one contract:
//!
//! - [`HashGrouper`] - strict and in-memory. Consumes the whole input into
//!   a hash map on first use. Simple, fast, and unbounded: high key
//!   cardinality exhausts memory by design.
//! - [`NestedLoopsGrouper`] - bounded memory. Keeps at most a
//!   budget-derived number of keys resident; everything else overflows to a
//!   factory-supplied queue and is regrouped in later passes.
//!
//! Both emit `(key, group)` pairs where the group is a cursor over the
//! partition's elements. Each group is handed out exactly once; advancing
//! the outer cursor removes the emitted group from the operator. With
//! identical inputs the two operators produce identical partitions (as
//! sets - emission order differs).

mod hash;
mod nested_loops;

pub use hash::HashGrouper;
pub use nested_loops::NestedLoopsGrouper;

use crate::cursor::BoxCursor;

/// One emitted partition: the key and a cursor over its elements.
pub type Group<K, T> = (K, BoxCursor<T>);
