//! Dense motion storage.
//!
//! One [`MotionStorage`] exists per (value, options, adapter) triple. It owns a
//! slot allocator and one struct-of-arrays bucket per update phase. Rows are
//! removed by swap-remove, so buckets stay packed and the tick loop walks
//! contiguous memory.
//!
//! The engine reaches storages through the object-safe [`AnyStorage`] trait;
//! dynamic dispatch happens once per storage per phase, never per row.

use std::any::Any;
use std::marker::PhantomData;

use crate::adapter::MotionAdapter;
use crate::callbacks::CallbackRegistry;
use crate::handle::MotionHandle;
use crate::scheduler::{self, MotionState, MotionValues, Sink, TickTime, UpdatePhase};
use crate::slot::{DenseLocation, SlotAllocator, SlotIndex};
use crate::timeline::{MotionParams, MotionStatus};

/// Everything needed to insert one motion.
pub struct MotionRow<T, O> {
    pub state: MotionState,
    pub params: MotionParams,
    pub values: MotionValues<T, O>,
    pub sink: Option<Sink<T>>,
}

struct DenseBucket<T, O> {
    handles: Vec<MotionHandle>,
    states: Vec<MotionState>,
    params: Vec<MotionParams>,
    values: Vec<MotionValues<T, O>>,
    sinks: Vec<Option<Sink<T>>>,
    /// Rows that finished during the current pass, in ascending dense order.
    finished: Vec<u32>,
}

impl<T, O> DenseBucket<T, O> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: Vec::with_capacity(capacity),
            states: Vec::with_capacity(capacity),
            params: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            sinks: Vec::with_capacity(capacity),
            finished: Vec::new(),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.handles.len()
    }

    fn push(&mut self, handle: MotionHandle, row: MotionRow<T, O>) {
        self.handles.push(handle);
        self.states.push(row.state);
        self.params.push(row.params);
        self.values.push(row.values);
        self.sinks.push(row.sink);
    }

    /// Remove row `dense` by moving the last row into its place.
    fn swap_remove(&mut self, dense: usize) -> MotionHandle {
        let removed = self.handles.swap_remove(dense);
        self.states.swap_remove(dense);
        self.params.swap_remove(dense);
        self.values.swap_remove(dense);
        self.sinks.swap_remove(dense);
        removed
    }
}

/// Type-erased view of a storage used by the engine.
pub(crate) trait AnyStorage {
    fn update(&mut self, phase: UpdatePhase, time: &TickTime, callbacks: &mut CallbackRegistry);
    fn is_active(&self, slot: SlotIndex) -> bool;
    fn state(&self, slot: SlotIndex) -> Option<&MotionState>;
    fn state_mut(&mut self, slot: SlotIndex) -> Option<&mut MotionState>;
    fn params(&self, slot: SlotIndex) -> Option<&MotionParams>;
    fn phase(&self, slot: SlotIndex) -> Option<UpdatePhase>;
    fn cancel(&mut self, slot: SlotIndex, callbacks: &mut CallbackRegistry) -> bool;
    fn complete(&mut self, slot: SlotIndex, callbacks: &mut CallbackRegistry) -> bool;
    fn set_time(&mut self, slot: SlotIndex, time: f64, callbacks: &mut CallbackRegistry) -> bool;
    /// Drop a row without firing anything.
    fn release(&mut self, slot: SlotIndex, callbacks: &mut CallbackRegistry) -> bool;
    fn len_in(&self, phase: UpdatePhase) -> usize;
    fn len(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub struct MotionStorage<T, O, A> {
    id: u32,
    slots: SlotAllocator,
    buckets: [DenseBucket<T, O>; UpdatePhase::COUNT],
    _adapter: PhantomData<fn() -> A>,
}

const PHASES: [UpdatePhase; UpdatePhase::COUNT] = [
    UpdatePhase::FixedUpdate,
    UpdatePhase::Update,
    UpdatePhase::LateUpdate,
    UpdatePhase::Manual,
];

impl<T, O, A> MotionStorage<T, O, A>
where
    T: 'static,
    O: 'static,
    A: MotionAdapter<T, O>,
{
    pub fn new(id: u32, capacity: usize) -> Self {
        Self {
            id,
            slots: SlotAllocator::with_capacity(capacity),
            buckets: std::array::from_fn(|i| {
                // Most motions land in Update; the other phases start empty.
                let cap = if i == UpdatePhase::Update.index() { capacity } else { 0 };
                DenseBucket::with_capacity(cap)
            }),
            _adapter: PhantomData,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Insert a row into `phase`'s bucket and hand out its handle.
    pub fn add(&mut self, phase: UpdatePhase, row: MotionRow<T, O>) -> MotionHandle {
        let bucket = &mut self.buckets[phase.index()];
        let location = DenseLocation {
            bucket: phase.index() as u8,
            dense: bucket.len() as u32,
        };
        let slot = self.slots.alloc(location);
        let handle = MotionHandle::new(self.id, slot);
        bucket.push(handle, row);
        handle
    }

    /// Remove a live row. Caller has checked `slot` is active.
    pub fn remove_unchecked(&mut self, slot: SlotIndex) -> MotionHandle {
        let loc = match self.slots.resolve(slot) {
            Some(loc) => loc,
            None => {
                debug_assert!(false, "remove_unchecked on stale slot {slot:?}");
                return MotionHandle::new(self.id, slot);
            }
        };
        let bucket = &mut self.buckets[loc.bucket as usize];
        let removed = bucket.swap_remove(loc.dense as usize);
        if let Some(moved) = bucket.handles.get(loc.dense as usize) {
            self.slots.relocate(moved.index, loc);
        }
        self.slots.free(slot);
        removed
    }

    /// Live states of one phase, in dense order.
    pub fn states(&self, phase: UpdatePhase) -> &[MotionState] {
        &self.buckets[phase.index()].states
    }

    /// Mutable span over one phase's states for batch edits.
    pub fn states_mut(&mut self, phase: UpdatePhase) -> &mut [MotionState] {
        &mut self.buckets[phase.index()].states
    }

    pub fn handles(&self, phase: UpdatePhase) -> &[MotionHandle] {
        &self.buckets[phase.index()].handles
    }

    /// `true` when every live row's handle resolves back to its own dense slot.
    pub fn is_consistent(&self) -> bool {
        let mut live = 0;
        for (b, bucket) in self.buckets.iter().enumerate() {
            for (dense, handle) in bucket.handles.iter().enumerate() {
                live += 1;
                let expected = DenseLocation {
                    bucket: b as u8,
                    dense: dense as u32,
                };
                if self.slots.resolve(handle.slot()) != Some(expected) {
                    return false;
                }
            }
        }
        live == self.slots.len()
    }

    fn locate(&self, slot: SlotIndex) -> Option<(usize, usize)> {
        self.slots
            .resolve(slot)
            .map(|loc| (loc.bucket as usize, loc.dense as usize))
    }

    fn release_row(&mut self, slot: SlotIndex, callbacks: &mut CallbackRegistry) {
        let handle = self.remove_unchecked(slot);
        callbacks.release(handle);
    }
}

impl<T, O, A> AnyStorage for MotionStorage<T, O, A>
where
    T: 'static,
    O: 'static,
    A: MotionAdapter<T, O>,
{
    fn update(&mut self, phase: UpdatePhase, time: &TickTime, callbacks: &mut CallbackRegistry) {
        let bucket = &mut self.buckets[phase.index()];
        bucket.finished.clear();
        // Rows cannot be added or removed from inside the loop: callbacks have
        // no engine access, and finished rows are released afterwards.
        let len = bucket.len();
        for i in 0..len {
            let state = &mut bucket.states[i];
            if !state.is_ticking() {
                continue;
            }
            let release = scheduler::tick_row::<T, O, A>(
                bucket.handles[i],
                state,
                &bucket.params[i],
                &bucket.values[i],
                &mut bucket.sinks[i],
                time,
                callbacks,
            );
            if release {
                bucket.finished.push(i as u32);
            }
        }

        // Descending order: a swap-remove only ever pulls in a row that is
        // not pending release.
        let mut finished = std::mem::take(&mut self.buckets[phase.index()].finished);
        while let Some(dense) = finished.pop() {
            let handle = self.buckets[phase.index()].handles[dense as usize];
            self.release_row(handle.slot(), callbacks);
        }
        self.buckets[phase.index()].finished = finished;
    }

    fn is_active(&self, slot: SlotIndex) -> bool {
        self.slots.is_active(slot)
    }

    fn state(&self, slot: SlotIndex) -> Option<&MotionState> {
        let (b, d) = self.locate(slot)?;
        self.buckets[b].states.get(d)
    }

    fn state_mut(&mut self, slot: SlotIndex) -> Option<&mut MotionState> {
        let (b, d) = self.locate(slot)?;
        self.buckets[b].states.get_mut(d)
    }

    fn params(&self, slot: SlotIndex) -> Option<&MotionParams> {
        let (b, d) = self.locate(slot)?;
        self.buckets[b].params.get(d)
    }

    fn phase(&self, slot: SlotIndex) -> Option<UpdatePhase> {
        self.locate(slot).map(|(b, _)| PHASES[b])
    }

    fn cancel(&mut self, slot: SlotIndex, callbacks: &mut CallbackRegistry) -> bool {
        let Some((b, d)) = self.locate(slot) else {
            return false;
        };
        let bucket = &mut self.buckets[b];
        let handle = bucket.handles[d];
        if bucket.states[d].status != MotionStatus::Completed {
            bucket.states[d].status = MotionStatus::Canceled;
            callbacks.cancel(handle);
        }
        self.release_row(slot, callbacks);
        true
    }

    fn complete(&mut self, slot: SlotIndex, callbacks: &mut CallbackRegistry) -> bool {
        let Some((b, d)) = self.locate(slot) else {
            return false;
        };
        let bucket = &mut self.buckets[b];
        if bucket.states[d].status.is_terminal() {
            return false;
        }
        let total = bucket.params[d].total_duration();
        if total.is_infinite() {
            log::warn!(
                "complete ignored for {:?}: motion loops forever",
                bucket.handles[d]
            );
            return false;
        }
        let release = scheduler::seek_row::<T, O, A>(
            bucket.handles[d],
            &mut bucket.states[d],
            &bucket.params[d],
            &bucket.values[d],
            &mut bucket.sinks[d],
            total,
            callbacks,
        );
        if release {
            self.release_row(slot, callbacks);
        }
        true
    }

    fn set_time(&mut self, slot: SlotIndex, time: f64, callbacks: &mut CallbackRegistry) -> bool {
        let Some((b, d)) = self.locate(slot) else {
            return false;
        };
        let bucket = &mut self.buckets[b];
        let release = scheduler::seek_row::<T, O, A>(
            bucket.handles[d],
            &mut bucket.states[d],
            &bucket.params[d],
            &bucket.values[d],
            &mut bucket.sinks[d],
            time,
            callbacks,
        );
        if release {
            self.release_row(slot, callbacks);
        }
        true
    }

    fn release(&mut self, slot: SlotIndex, callbacks: &mut CallbackRegistry) -> bool {
        if !self.slots.is_active(slot) {
            return false;
        }
        self.release_row(slot, callbacks);
        true
    }

    fn len_in(&self, phase: UpdatePhase) -> usize {
        self.buckets[phase.index()].len()
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{LerpAdapter, NoOptions};
    use crate::completion::CompletionPool;
    use std::sync::Arc;

    type F32Storage = MotionStorage<f32, NoOptions, LerpAdapter>;

    fn row(duration: f64) -> MotionRow<f32, NoOptions> {
        MotionRow {
            state: MotionState::default(),
            params: MotionParams {
                duration,
                ..MotionParams::default()
            },
            values: MotionValues {
                start: 0.0,
                end: 1.0,
                options: NoOptions,
            },
            sink: None,
        }
    }

    fn registry() -> CallbackRegistry {
        CallbackRegistry::new(Arc::new(CompletionPool::new(4)))
    }

    #[test]
    fn swap_remove_keeps_lookup_consistent() {
        let mut s = F32Storage::new(0, 4);
        let handles: Vec<_> = (0..10).map(|_| s.add(UpdatePhase::Update, row(1.0))).collect();
        s.remove_unchecked(handles[2].slot());
        s.remove_unchecked(handles[9].slot());
        s.remove_unchecked(handles[0].slot());
        assert!(s.is_consistent());
        assert_eq!(s.len_in(UpdatePhase::Update), 7);
        for h in [handles[0], handles[2], handles[9]] {
            assert!(!s.is_active(h.slot()));
        }
        for h in &handles[3..9] {
            assert!(s.is_active(h.slot()));
        }
    }

    #[test]
    fn finished_rows_are_released_after_pass() {
        let mut s = F32Storage::new(0, 4);
        let mut cb = registry();
        let short: Vec<_> = (0..5).map(|_| s.add(UpdatePhase::Update, row(0.5))).collect();
        let long: Vec<_> = (0..5).map(|_| s.add(UpdatePhase::Update, row(2.0))).collect();
        s.update(UpdatePhase::Update, &TickTime::uniform(1.0), &mut cb);
        assert!(s.is_consistent());
        assert!(short.iter().all(|h| !s.is_active(h.slot())));
        assert!(long.iter().all(|h| s.is_active(h.slot())));
        for h in &long {
            assert_eq!(s.state(h.slot()).map(|st| st.time), Some(1.0));
        }
    }

    #[test]
    fn phases_are_bucketed_separately() {
        let mut s = F32Storage::new(0, 4);
        let mut cb = registry();
        let late = s.add(UpdatePhase::LateUpdate, row(1.0));
        let manual = s.add(UpdatePhase::Manual, row(1.0));
        s.update(UpdatePhase::LateUpdate, &TickTime::uniform(0.25), &mut cb);
        assert_eq!(s.state(late.slot()).map(|st| st.time), Some(0.25));
        assert_eq!(s.state(manual.slot()).map(|st| st.time), Some(0.0));
        assert_eq!(s.phase(manual.slot()), Some(UpdatePhase::Manual));
        assert_eq!(s.len(), 2);
    }
}
