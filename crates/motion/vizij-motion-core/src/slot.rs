//! Versioned slot allocator.
//!
//! Slots are addressed by `(index, version)`. Freeing a slot bumps its version,
//! so indices handed out earlier stop resolving instead of aliasing whatever
//! gets allocated into the slot next. Unused slots form a free list threaded
//! through the slot array itself.

/// Sparse index handed out by [`SlotAllocator::alloc`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SlotIndex {
    pub index: u32,
    pub version: u32,
}

/// Where a live slot's row currently sits in dense storage.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DenseLocation {
    pub bucket: u8,
    pub dense: u32,
}

#[derive(Copy, Clone, Debug)]
enum SlotState {
    Free { next: Option<u32> },
    Occupied(DenseLocation),
}

#[derive(Copy, Clone, Debug)]
struct Slot {
    version: u32,
    state: SlotState,
}

#[derive(Debug, Default)]
pub struct SlotAllocator {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    live: usize,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut alloc = Self::default();
        alloc.grow_to(capacity);
        alloc
    }

    /// Number of slots currently allocated.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total number of slots, live or free.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Append free slots until the array holds `capacity` entries.
    /// Existing slots keep their index and version.
    fn grow_to(&mut self, capacity: usize) {
        let old = self.slots.len();
        if capacity <= old {
            return;
        }
        self.slots.reserve_exact(capacity - old);
        // Link new slots in ascending order so fresh allocations stay dense.
        for i in old..capacity {
            let next = if i + 1 < capacity {
                Some((i + 1) as u32)
            } else {
                self.free_head
            };
            self.slots.push(Slot {
                version: 1,
                state: SlotState::Free { next },
            });
        }
        self.free_head = Some(old as u32);
        log::trace!("slot allocator grew {} -> {}", old, capacity);
    }

    /// Reserve a slot pointing at `location`. Never fails; doubles the slot
    /// array when the free list runs dry.
    pub fn alloc(&mut self, location: DenseLocation) -> SlotIndex {
        if self.free_head.is_none() {
            let target = (self.slots.len() * 2).max(16);
            self.grow_to(target);
        }
        // grow_to always leaves a free head behind.
        let index = match self.free_head {
            Some(i) => i,
            None => unreachable!("slot allocator grew without producing a free slot"),
        };
        let slot = &mut self.slots[index as usize];
        self.free_head = match slot.state {
            SlotState::Free { next } => next,
            SlotState::Occupied(_) => unreachable!("free list points at an occupied slot"),
        };
        slot.state = SlotState::Occupied(location);
        self.live += 1;
        SlotIndex {
            index,
            version: slot.version,
        }
    }

    /// Release a slot. Returns `false` (and changes nothing) for stale or
    /// already-free indices.
    pub fn free(&mut self, idx: SlotIndex) -> bool {
        if !self.is_active(idx) {
            return false;
        }
        let head = self.free_head;
        let slot = &mut self.slots[idx.index as usize];
        slot.version = next_version(slot.version);
        slot.state = SlotState::Free { next: head };
        self.free_head = Some(idx.index);
        self.live -= 1;
        true
    }

    #[inline]
    pub fn is_active(&self, idx: SlotIndex) -> bool {
        matches!(
            self.slots.get(idx.index as usize),
            Some(Slot { version, state: SlotState::Occupied(_) }) if *version == idx.version
        )
    }

    /// Dense location of a live slot, `None` when stale.
    #[inline]
    pub fn resolve(&self, idx: SlotIndex) -> Option<DenseLocation> {
        match self.slots.get(idx.index as usize) {
            Some(Slot {
                version,
                state: SlotState::Occupied(loc),
            }) if *version == idx.version => Some(*loc),
            _ => None,
        }
    }

    /// Current version-qualified index for a raw slot index, if it is live.
    #[inline]
    pub fn current(&self, index: u32) -> Option<SlotIndex> {
        match self.slots.get(index as usize) {
            Some(Slot {
                version,
                state: SlotState::Occupied(_),
            }) => Some(SlotIndex {
                index,
                version: *version,
            }),
            _ => None,
        }
    }

    /// Point a live slot at a new dense location (after a swap-remove moved its row).
    pub fn relocate(&mut self, index: u32, location: DenseLocation) {
        if let Some(Slot {
            state: SlotState::Occupied(loc),
            ..
        }) = self.slots.get_mut(index as usize)
        {
            *loc = location;
        } else {
            debug_assert!(false, "relocate called on free slot {index}");
        }
    }
}

/// Versions skip 0 so a zeroed handle never matches a live slot.
#[inline]
fn next_version(v: u32) -> u32 {
    match v.wrapping_add(1) {
        0 => 1,
        n => n,
    }
}
