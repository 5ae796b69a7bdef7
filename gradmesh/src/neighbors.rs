//! Neighbor table: a bounded slot arena with liveness deadlines.
//!
//! One entry per one-hop neighbor, keyed by link address, holding the
//! neighbor's last-announced hop count and the deadline after which it is
//! considered gone. The pool is fixed-capacity: when full, new neighbors are
//! silently not tracked.
//!
//! Slots are addressed through [`NeighborId`], a `(slot, generation)` pair.
//! The generation is bumped every time a slot is reused, so a handle taken
//! before an eviction can never act on the entry that later recycled the
//! slot - a one-shot liveness timer that fires late detects its own
//! staleness instead of evicting an unrelated neighbor.

use alloc::vec::Vec;

use crate::time::Timestamp;
use crate::types::{HopCount, LinkAddr};

/// Stable handle to a neighbor slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NeighborId {
    slot: usize,
    generation: u32,
}

/// A tracked one-hop neighbor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborEntry {
    /// Link-layer address. Unique key within the table.
    pub addr: LinkAddr,
    /// Last value this neighbor announced.
    pub hop_count_to_sink: HopCount,
    /// Liveness deadline, rearmed on every announcement.
    pub expires_at: Timestamp,
}

/// Outcome of [`NeighborTable::upsert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    /// Existing entry refreshed in place.
    Updated,
    /// New entry allocated.
    Inserted(NeighborId),
    /// Pool exhausted; the neighbor is not tracked.
    Dropped,
}

struct Slot {
    entry: Option<NeighborEntry>,
    generation: u32,
}

/// The neighbor table.
pub struct NeighborTable {
    slots: Vec<Slot>,
    /// Live slot indices in insertion order, for forwarding traversal.
    order: Vec<usize>,
}

impl NeighborTable {
    /// Create a table with the given pool capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(Slot {
                entry: None,
                generation: 0,
            });
        }
        Self {
            slots,
            order: Vec::with_capacity(capacity),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if no neighbors are tracked.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Pool capacity.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Insert or refresh a neighbor.
    ///
    /// An existing entry for `addr` has its value replaced and its deadline
    /// rearmed to `expires_at`. A new neighbor takes a free slot, or is
    /// silently dropped when the pool is full.
    pub fn upsert(&mut self, addr: LinkAddr, hop_count: HopCount, expires_at: Timestamp) -> Upsert {
        for &idx in &self.order {
            let slot = &mut self.slots[idx];
            if let Some(entry) = slot.entry.as_mut() {
                if entry.addr == addr {
                    entry.hop_count_to_sink = hop_count;
                    entry.expires_at = expires_at;
                    return Upsert::Updated;
                }
            }
        }

        match self.slots.iter().position(|s| s.entry.is_none()) {
            Some(idx) => {
                self.slots[idx].entry = Some(NeighborEntry {
                    addr,
                    hop_count_to_sink: hop_count,
                    expires_at,
                });
                self.order.push(idx);
                Upsert::Inserted(NeighborId {
                    slot: idx,
                    generation: self.slots[idx].generation,
                })
            }
            None => Upsert::Dropped,
        }
    }

    /// Look up a neighbor by address.
    pub fn get(&self, addr: LinkAddr) -> Option<&NeighborEntry> {
        self.iter().find(|e| e.addr == addr)
    }

    /// Handle for the entry at `addr`, if tracked.
    pub fn id_of(&self, addr: LinkAddr) -> Option<NeighborId> {
        self.order.iter().find_map(|&idx| {
            let slot = &self.slots[idx];
            match &slot.entry {
                Some(entry) if entry.addr == addr => Some(NeighborId {
                    slot: idx,
                    generation: slot.generation,
                }),
                _ => None,
            }
        })
    }

    /// Remove the entry a one-shot liveness timer refers to.
    ///
    /// Returns the evicted address, or `None` if the handle is stale (the
    /// slot was already freed, possibly reused for another neighbor). A
    /// stale handle mutates nothing.
    pub fn expire(&mut self, id: NeighborId) -> Option<LinkAddr> {
        let slot = self.slots.get(id.slot)?;
        if slot.generation != id.generation {
            return None;
        }
        self.remove_slot(id.slot)
    }

    /// Remove every entry whose deadline has passed (`now >= expires_at`).
    ///
    /// Returns the evicted addresses; the caller recomputes the gradient
    /// afterwards, since a removed neighbor may have held the minimum.
    pub fn take_expired(&mut self, now: Timestamp) -> Vec<LinkAddr> {
        let expired: Vec<usize> = self
            .order
            .iter()
            .copied()
            .filter(|&idx| {
                self.slots[idx]
                    .entry
                    .as_ref()
                    .is_some_and(|e| now >= e.expires_at)
            })
            .collect();

        expired
            .into_iter()
            .filter_map(|idx| self.remove_slot(idx))
            .collect()
    }

    /// Minimum hop count over live entries, `None` when the table is empty.
    pub fn min_hop_count(&self) -> Option<HopCount> {
        self.iter().map(|e| e.hop_count_to_sink).min()
    }

    /// Earliest liveness deadline, for timer scheduling.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.iter().map(|e| e.expires_at).min()
    }

    /// Insertion-order traversal of live entries.
    pub fn iter(&self) -> impl Iterator<Item = &NeighborEntry> {
        self.order
            .iter()
            .filter_map(|&idx| self.slots[idx].entry.as_ref())
    }

    /// Free a slot: clear the entry, bump the generation, drop from the
    /// insertion order. Returns `None` if the slot holds no entry.
    fn remove_slot(&mut self, idx: usize) -> Option<LinkAddr> {
        let entry = self.slots[idx].entry.take()?;
        self.slots[idx].generation = self.slots[idx].generation.wrapping_add(1);
        self.order.retain(|&i| i != idx);
        Some(entry.addr)
    }
}
