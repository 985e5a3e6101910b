//! Standard collection type aliases for Sluice.
//!
//! Use these instead of direct HashMap/HashSet to allow future optimization
//! and ensure consistent hashing across the codebase.
//!
//! # Type Aliases
//!
//! | Type | Use Case |
//! |------|----------|
//! | [`SluiceMap`] | Single-threaded hash map |
//! | [`SluiceSet`] | Single-threaded hash set |
//! | [`SluiceIndexMap`] | Insertion-order preserving map |
//!
//! Grouping keys are hashed on every routed element, so the default hasher
//! matters: FxHash keeps small integer and string keys cheap.
//!
//! # Example
//!
//! ```rust
//! use sluice_common::collections::{SluiceMap, SluiceSet};
//!
//! let mut map: SluiceMap<String, i32> = SluiceMap::default();
//! map.insert("key".to_string(), 42);
//!
//! let mut set: SluiceSet<i32> = SluiceSet::default();
//! set.insert(1);
//! ```

use rustc_hash::FxBuildHasher;

/// Standard HashMap with FxHash (fast, non-cryptographic).
///
/// FxHash is optimized for small keys and performs well for the integer and
/// short-string grouping keys common in cursor pipelines.
pub type SluiceMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

/// Standard HashSet with FxHash.
pub type SluiceSet<T> = hashbrown::HashSet<T, FxBuildHasher>;

/// Ordered map preserving insertion order.
///
/// The bounded-memory grouper keeps its resident keys in one of these so
/// that group emission order is the map's own insertion order rather than an
/// arbitrary hash order.
pub type SluiceIndexMap<K, V> = indexmap::IndexMap<K, V, FxBuildHasher>;

/// Create a new empty [`SluiceMap`].
#[inline]
#[must_use]
pub fn sluice_map<K, V>() -> SluiceMap<K, V> {
    SluiceMap::with_hasher(FxBuildHasher)
}

/// Create a new [`SluiceMap`] with the specified capacity.
#[inline]
#[must_use]
pub fn sluice_map_with_capacity<K, V>(capacity: usize) -> SluiceMap<K, V> {
    SluiceMap::with_capacity_and_hasher(capacity, FxBuildHasher)
}

/// Create a new empty [`SluiceSet`].
#[inline]
#[must_use]
pub fn sluice_set<T>() -> SluiceSet<T> {
    SluiceSet::with_hasher(FxBuildHasher)
}

/// Create a new empty [`SluiceIndexMap`].
#[inline]
#[must_use]
pub fn sluice_index_map<K, V>() -> SluiceIndexMap<K, V> {
    SluiceIndexMap::with_hasher(FxBuildHasher)
}

/// Create a new [`SluiceIndexMap`] with the specified capacity.
#[inline]
#[must_use]
pub fn sluice_index_map_with_capacity<K, V>(capacity: usize) -> SluiceIndexMap<K, V> {
    SluiceIndexMap::with_capacity_and_hasher(capacity, FxBuildHasher)
}
