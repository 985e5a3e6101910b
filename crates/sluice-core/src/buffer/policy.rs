//! Victim-selection policies for the slot buffer.

/// Per-slot metadata the buffer maintains for its eviction policy.
///
/// The buffer keeps one entry per occupied slot, parallel to the slot
/// array. Policies read ticks and accessed bits and may clear accessed
/// bits during a scan; they must never select a fixed slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotMeta {
    /// Whether the slot is pinned against eviction.
    pub fixed: bool,
    /// Logical timestamp of the last access.
    pub tick: u64,
    /// Set on every access, cleared by scanning policies.
    pub accessed: bool,
}

/// Chooses which slot a full buffer displaces.
///
/// Injected into the buffer as a strategy object, replacing subclass
/// overrides with composition. `victim` returns the index of an unfixed
/// slot, or `None` when every slot is fixed (the buffer then reports
/// overflow to the caller).
pub trait EvictionPolicy {
    /// Selects the victim among the occupied slots described by `slots`.
    fn victim(&mut self, slots: &mut [SlotMeta]) -> Option<usize>;
}

/// Evicts the least recently used unfixed slot (smallest access tick).
#[derive(Debug, Clone, Copy, Default)]
pub struct LruPolicy;

impl EvictionPolicy for LruPolicy {
    fn victim(&mut self, slots: &mut [SlotMeta]) -> Option<usize> {
        slots
            .iter()
            .enumerate()
            .filter(|(_, meta)| !meta.fixed)
            .min_by_key(|(_, meta)| meta.tick)
            .map(|(index, _)| index)
    }
}

/// Second-chance (clock) eviction.
///
/// Sweeps a clock hand over the slots: an accessed slot has its bit
/// cleared and is passed over once; the first unfixed slot found with a
/// clear bit is the victim. The sweep is bounded at two revolutions, after
/// which the first unfixed slot wins regardless of its bit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockPolicy {
    hand: usize,
}

impl EvictionPolicy for ClockPolicy {
    fn victim(&mut self, slots: &mut [SlotMeta]) -> Option<usize> {
        if slots.is_empty() {
            return None;
        }
        let n = slots.len();
        for _ in 0..n * 2 {
            let index = self.hand % n;
            self.hand = (self.hand + 1) % n;
            let meta = &mut slots[index];
            if meta.fixed {
                continue;
            }
            if meta.accessed {
                meta.accessed = false;
            } else {
                return Some(index);
            }
        }
        // Every unfixed slot kept getting re-accessed; take the first one.
        slots.iter().position(|meta| !meta.fixed)
    }
}
