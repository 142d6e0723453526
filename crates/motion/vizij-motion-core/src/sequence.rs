//! Sequences: one timeline driving several existing motions.
//!
//! A sequence owns no values of its own. Each tick it advances its own time,
//! maps it onto every child's local time and seeks the child there, so
//! children fire their own sinks and callbacks. Children are flagged
//! `in_sequence` so the phase tick skips them, and they stay alive (even
//! after completing) until the sequence itself is released.
//!
//! Sequences share the motion handle type; their handles carry the reserved
//! storage id [`SEQUENCE_STORAGE`].

use crate::callbacks::{Callback, CallbackRegistry, LoopCallback, MotionCallbacks};
use crate::engine::Engine;
use crate::error::MotionError;
use crate::handle::MotionHandle;
use crate::scheduler::{clamp_time, MotionState, TickTime, UpdatePhase};
use crate::slot::{DenseLocation, SlotAllocator, SlotIndex};
use crate::storage::AnyStorage;
use crate::timeline::{self, DelayType, LoopCount, LoopType, MotionParams, MotionStatus, TimeKind};

/// Storage id reserved for sequence handles.
pub const SEQUENCE_STORAGE: u32 = u32::MAX;

#[derive(Copy, Clone, Debug)]
pub(crate) struct SequenceChild {
    pub handle: MotionHandle,
    /// Start of the child on the sequence's loop timeline.
    pub position: f64,
}

#[derive(Debug)]
pub(crate) struct SequenceEntry {
    handle: MotionHandle,
    phase: UpdatePhase,
    state: MotionState,
    params: MotionParams,
    children: Vec<SequenceChild>,
}

/// Dense list of live sequences plus their slot table.
#[derive(Debug, Default)]
pub(crate) struct SequenceSet {
    slots: SlotAllocator,
    entries: Vec<SequenceEntry>,
    finished: Vec<u32>,
}

fn drive_children(
    children: &[SequenceChild],
    local: f64,
    storages: &mut [Box<dyn AnyStorage>],
    callbacks: &mut CallbackRegistry,
) {
    for child in children {
        let Some(storage) = storages.get_mut(child.handle.storage as usize) else {
            continue;
        };
        let slot = child.handle.slot();
        let (Some(state), Some(params)) = (storage.state(slot), storage.params(slot)) else {
            // Canceled from outside; nothing left to drive.
            continue;
        };
        let target = clamp_time(local - child.position, params.total_duration());
        let reached = state.status == MotionStatus::Scheduled && local >= child.position;
        if target != state.time || reached {
            storage.set_time(slot, target, callbacks);
        }
    }
}

impl SequenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn locate(&self, slot: SlotIndex) -> Option<usize> {
        self.slots.resolve(slot).map(|loc| loc.dense as usize)
    }

    pub fn is_active(&self, slot: SlotIndex) -> bool {
        self.slots.is_active(slot)
    }

    pub fn state(&self, slot: SlotIndex) -> Option<&MotionState> {
        let i = self.locate(slot)?;
        self.entries.get(i).map(|e| &e.state)
    }

    pub fn state_mut(&mut self, slot: SlotIndex) -> Option<&mut MotionState> {
        let i = self.locate(slot)?;
        self.entries.get_mut(i).map(|e| &mut e.state)
    }

    pub fn params(&self, slot: SlotIndex) -> Option<&MotionParams> {
        let i = self.locate(slot)?;
        self.entries.get(i).map(|e| &e.params)
    }

    pub fn phase(&self, slot: SlotIndex) -> Option<UpdatePhase> {
        let i = self.locate(slot)?;
        self.entries.get(i).map(|e| e.phase)
    }

    pub fn children(&self, slot: SlotIndex) -> Option<Vec<MotionHandle>> {
        let i = self.locate(slot)?;
        self.entries
            .get(i)
            .map(|e| e.children.iter().map(|c| c.handle).collect())
    }

    pub fn len_in(&self, phase: UpdatePhase) -> usize {
        self.entries.iter().filter(|e| e.phase == phase).count()
    }

    fn insert(
        &mut self,
        phase: UpdatePhase,
        state: MotionState,
        params: MotionParams,
        children: Vec<SequenceChild>,
    ) -> MotionHandle {
        let location = DenseLocation {
            bucket: phase.index() as u8,
            dense: self.entries.len() as u32,
        };
        let handle = MotionHandle::new(SEQUENCE_STORAGE, self.slots.alloc(location));
        self.entries.push(SequenceEntry {
            handle,
            phase,
            state,
            params,
            children,
        });
        handle
    }

    fn remove(&mut self, dense: usize) -> SequenceEntry {
        let entry = self.entries.swap_remove(dense);
        if let Some(moved) = self.entries.get(dense) {
            let location = DenseLocation {
                bucket: moved.phase.index() as u8,
                dense: dense as u32,
            };
            self.slots.relocate(moved.handle.index, location);
        }
        self.slots.free(entry.handle.slot());
        entry
    }

    /// Drop a sequence and every child it still holds.
    fn release_at(
        &mut self,
        dense: usize,
        storages: &mut [Box<dyn AnyStorage>],
        callbacks: &mut CallbackRegistry,
    ) {
        let entry = self.remove(dense);
        for child in &entry.children {
            if let Some(storage) = storages.get_mut(child.handle.storage as usize) {
                storage.release(child.handle.slot(), callbacks);
            }
        }
        callbacks.release(entry.handle);
    }

    /// Move a sequence to `time`. Returns `true` when it just completed and
    /// should be released.
    fn apply(
        entry: &mut SequenceEntry,
        time: f64,
        storages: &mut [Box<dyn AnyStorage>],
        callbacks: &mut CallbackRegistry,
    ) -> bool {
        let params = &entry.params;
        let previous_status = entry.state.status;
        let was_completed = previous_status == MotionStatus::Completed;
        let previous_loops = entry.state.completed_loops;

        entry.state.time = clamp_time(time, params.total_duration());
        let sample = timeline::sample(params, entry.state.time);
        entry.state.status = sample.status;
        entry.state.completed_loops = sample.completed_loops;

        if !was_completed && sample.completed_loops > previous_loops {
            // Let children finish the loop that was just left.
            let loop_end = params.loop_progress(1.0, previous_loops as u64) * params.duration;
            drive_children(&entry.children, loop_end, storages, callbacks);
        }
        let waiting = matches!(previous_status, MotionStatus::Scheduled | MotionStatus::Delayed);
        if sample.status != MotionStatus::Delayed || !waiting {
            drive_children(
                &entry.children,
                sample.progress * params.duration,
                storages,
                callbacks,
            );
        }

        if was_completed {
            return false;
        }
        if sample.completed_loops > previous_loops {
            callbacks.loop_complete(entry.handle, sample.completed_loops);
        }
        if sample.status == MotionStatus::Completed {
            callbacks.complete(entry.handle);
            return !entry.state.preserved;
        }
        false
    }

    pub fn update(
        &mut self,
        phase: UpdatePhase,
        time: &TickTime,
        storages: &mut [Box<dyn AnyStorage>],
        callbacks: &mut CallbackRegistry,
    ) {
        self.finished.clear();
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if entry.phase != phase || !entry.state.is_ticking() {
                continue;
            }
            let dt = time.delta_for(entry.params.time_kind) * entry.state.playback_speed as f64;
            let target = entry.state.time + dt;
            if Self::apply(entry, target, storages, callbacks) {
                self.finished.push(i as u32);
            }
        }
        let mut finished = std::mem::take(&mut self.finished);
        while let Some(dense) = finished.pop() {
            self.release_at(dense as usize, storages, callbacks);
        }
        self.finished = finished;
    }

    pub fn set_time(
        &mut self,
        slot: SlotIndex,
        time: f64,
        storages: &mut [Box<dyn AnyStorage>],
        callbacks: &mut CallbackRegistry,
    ) -> bool {
        let Some(i) = self.locate(slot) else {
            return false;
        };
        if Self::apply(&mut self.entries[i], time, storages, callbacks) {
            self.release_at(i, storages, callbacks);
        }
        true
    }

    pub fn complete(
        &mut self,
        slot: SlotIndex,
        storages: &mut [Box<dyn AnyStorage>],
        callbacks: &mut CallbackRegistry,
    ) -> bool {
        let Some(i) = self.locate(slot) else {
            return false;
        };
        let entry = &mut self.entries[i];
        if entry.state.status.is_terminal() {
            return false;
        }
        let total = entry.params.total_duration();
        if total.is_infinite() {
            log::warn!("complete ignored for sequence {:?}: it loops forever", entry.handle);
            return false;
        }
        if Self::apply(entry, total, storages, callbacks) {
            self.release_at(i, storages, callbacks);
        }
        true
    }

    /// Cancel the sequence and every child that has not completed yet.
    pub fn cancel(
        &mut self,
        slot: SlotIndex,
        storages: &mut [Box<dyn AnyStorage>],
        callbacks: &mut CallbackRegistry,
    ) -> bool {
        let Some(i) = self.locate(slot) else {
            return false;
        };
        let entry = self.remove(i);
        for child in &entry.children {
            if let Some(storage) = storages.get_mut(child.handle.storage as usize) {
                storage.cancel(child.handle.slot(), callbacks);
            }
        }
        if entry.state.status != MotionStatus::Completed {
            callbacks.cancel(entry.handle);
        }
        callbacks.release(entry.handle);
        true
    }

    /// Drop a sequence without firing its callbacks.
    pub fn release(
        &mut self,
        slot: SlotIndex,
        storages: &mut [Box<dyn AnyStorage>],
        callbacks: &mut CallbackRegistry,
    ) -> bool {
        match self.locate(slot) {
            Some(i) => {
                self.release_at(i, storages, callbacks);
                true
            }
            None => false,
        }
    }
}

/// Collects child motions on a timeline, then schedules them as one unit.
///
/// ```ignore
/// let seq = engine
///     .sequence()
///     .append(fade_in)
///     .join(scale_up)
///     .append_interval(0.5)
///     .append(fade_out)
///     .run()?;
/// ```
///
/// Construction errors are kept and reported by [`run`](Self::run).
pub struct SequenceBuilder<'e> {
    engine: &'e mut Engine,
    children: Vec<SequenceChild>,
    /// End of the timeline built so far.
    cursor: f64,
    /// Start of the most recently appended child; `join` lines up with it.
    last_start: f64,
    params: MotionParams,
    phase: UpdatePhase,
    state: MotionState,
    callbacks: MotionCallbacks,
    error: Option<MotionError>,
}

impl<'e> SequenceBuilder<'e> {
    pub(crate) fn new(engine: &'e mut Engine) -> Self {
        let phase = engine.config().default_phase;
        Self {
            engine,
            children: Vec::new(),
            cursor: 0.0,
            last_start: 0.0,
            params: MotionParams::default(),
            phase,
            state: MotionState::default(),
            callbacks: MotionCallbacks::default(),
            error: None,
        }
    }

    fn fail(&mut self, error: MotionError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Validate a child and return its total duration.
    fn child_total(&mut self, handle: MotionHandle) -> Option<f64> {
        if self.error.is_some() {
            return None;
        }
        if handle.storage == SEQUENCE_STORAGE {
            self.fail(MotionError::NestedSequence { handle });
            return None;
        }
        let Some((in_sequence, terminal)) = self
            .engine
            .state(handle)
            .map(|s| (s.in_sequence, s.status.is_terminal()))
        else {
            self.fail(MotionError::InactiveMotion { handle });
            return None;
        };
        if in_sequence || self.children.iter().any(|c| c.handle == handle) {
            self.fail(MotionError::AlreadyInSequence { handle });
            return None;
        }
        if terminal {
            self.fail(MotionError::InactiveMotion { handle });
            return None;
        }
        let total = self.engine.total_duration(handle).unwrap_or(0.0);
        if total.is_infinite() {
            self.fail(MotionError::InfiniteDuration { handle });
            return None;
        }
        Some(total)
    }

    /// Place `handle` at the end of the timeline.
    pub fn append(mut self, handle: MotionHandle) -> Self {
        if let Some(total) = self.child_total(handle) {
            let position = self.cursor;
            self.children.push(SequenceChild { handle, position });
            self.last_start = position;
            self.cursor = position + total;
        }
        self
    }

    /// Start `handle` together with the previously appended child.
    pub fn join(mut self, handle: MotionHandle) -> Self {
        if let Some(total) = self.child_total(handle) {
            let position = self.last_start;
            self.children.push(SequenceChild { handle, position });
            self.cursor = self.cursor.max(position + total);
        }
        self
    }

    /// Start `handle` at an absolute position on the timeline.
    pub fn insert(mut self, position: f64, handle: MotionHandle) -> Self {
        if !(position.is_finite() && position >= 0.0) {
            self.fail(MotionError::InvalidPosition { position });
            return self;
        }
        if let Some(total) = self.child_total(handle) {
            self.children.push(SequenceChild { handle, position });
            self.cursor = self.cursor.max(position + total);
        }
        self
    }

    /// Leave a gap before whatever is appended next.
    pub fn append_interval(mut self, interval: f64) -> Self {
        if !(interval.is_finite() && interval >= 0.0) {
            self.fail(MotionError::InvalidPosition { position: interval });
            return self;
        }
        self.cursor += interval;
        self
    }

    /// `loops <= 0` repeats forever. Incremental loops cannot be sequenced.
    pub fn with_loops(mut self, loops: i32, loop_type: LoopType) -> Self {
        if loop_type == LoopType::Incremental {
            self.fail(MotionError::UnsupportedLoopType { loop_type });
            return self;
        }
        self.params.loops = LoopCount::from_signed(loops);
        self.params.loop_type = loop_type;
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.params.delay = delay;
        self
    }

    pub fn with_delay_type(mut self, delay_type: DelayType) -> Self {
        self.params.delay_type = delay_type;
        self
    }

    pub fn with_phase(mut self, phase: UpdatePhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_time_kind(mut self, time_kind: TimeKind) -> Self {
        self.params.time_kind = time_kind;
        self
    }

    pub fn with_playback_speed(mut self, speed: f32) -> Self {
        self.state.playback_speed = speed;
        self
    }

    pub fn with_preserve(mut self) -> Self {
        self.state.preserved = true;
        self
    }

    pub fn with_on_complete(mut self, f: impl FnMut() + 'static) -> Self {
        self.callbacks.on_complete = Some(Box::new(f) as Callback);
        self
    }

    pub fn with_on_cancel(mut self, f: impl FnMut() + 'static) -> Self {
        self.callbacks.on_cancel = Some(Box::new(f) as Callback);
        self
    }

    pub fn with_on_loop_complete(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.callbacks.on_loop_complete = Some(Box::new(f) as LoopCallback);
        self
    }

    /// Schedule the sequence. Children stop ticking on their own from here on.
    pub fn run(self) -> Result<MotionHandle, MotionError> {
        let SequenceBuilder {
            engine,
            children,
            cursor,
            mut params,
            phase,
            state,
            callbacks,
            error,
            ..
        } = self;
        if let Some(error) = error {
            return Err(error);
        }
        if !(params.delay.is_finite() && params.delay >= 0.0) {
            return Err(MotionError::InvalidDelay {
                delay: params.delay,
            });
        }
        if !state.playback_speed.is_finite() {
            return Err(MotionError::InvalidPlaybackSpeed {
                speed: state.playback_speed,
            });
        }
        params.duration = cursor;
        Ok(engine.insert_sequence(phase, state, params, children, callbacks))
    }
}

impl Engine {
    pub(crate) fn insert_sequence(
        &mut self,
        phase: UpdatePhase,
        state: MotionState,
        params: MotionParams,
        children: Vec<SequenceChild>,
        callbacks: MotionCallbacks,
    ) -> MotionHandle {
        for child in &children {
            if let Some(s) = self.state_mut(child.handle) {
                s.in_sequence = true;
            }
        }
        let count = children.len();
        let duration = params.duration;
        let handle = self.sequences.insert(phase, state, params, children);
        self.callbacks.insert(handle, callbacks);
        log::debug!(
            "sequence {handle:?} scheduled in {phase:?}: {count} children over {duration:.3}s"
        );
        handle
    }
}
