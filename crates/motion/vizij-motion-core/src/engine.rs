//! Engine: owns every storage, the callback registry and the command queue.
//!
//! Methods:
//! - new, create / create_with / punch / shake / spring (builders), sequence
//! - update (one phase), update_frame (Fixed → Update → Late)
//! - handle operations: cancel, complete, set_time, playback speed, pause, preserve

use std::any::TypeId;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::adapter::{
    DefaultAdapter, Lanes, MotionAdapter, PunchAdapter, PunchOptions, ShakeAdapter, ShakeOptions,
    SpringAdapter, SpringOptions,
};
use crate::builder::MotionBuilder;
use crate::callbacks::{CallbackRegistry, MotionCallbacks};
use crate::commands::{MotionCommand, MotionCommands};
use crate::completion::{acquire, Completion, CompletionPool, CompletionStatus};
use crate::config::Config;
use crate::error::CallbackFault;
use crate::handle::MotionHandle;
use crate::scheduler::{MotionState, TickTime, UpdatePhase};
use crate::sequence::{SequenceBuilder, SequenceSet, SEQUENCE_STORAGE};
use crate::storage::{AnyStorage, MotionRow, MotionStorage};
use crate::timeline::{MotionParams, MotionStatus};

/// Command rounds applied per drain before the rest is dropped. Guards
/// against callbacks that enqueue work every time they run.
const MAX_COMMAND_ROUNDS: usize = 64;

/// Snapshot of engine occupancy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub storages: usize,
    pub motions: usize,
    pub sequences: usize,
    /// Motions with at least one registered callback or waiter.
    pub callbacks: usize,
    pub pooled_completions: usize,
}

pub struct Engine {
    cfg: Config,
    storages: Vec<Box<dyn AnyStorage>>,
    storage_ids: HashMap<TypeId, u32>,
    pub(crate) sequences: SequenceSet,
    pub(crate) callbacks: CallbackRegistry,
    commands: MotionCommands,
    pool: Arc<CompletionPool>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cfg", &self.cfg)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Engine {
    pub fn new(cfg: Config) -> Self {
        let pool = Arc::new(CompletionPool::new(cfg.completion_pool_size));
        Self {
            storages: Vec::new(),
            storage_ids: HashMap::new(),
            sequences: SequenceSet::new(),
            callbacks: CallbackRegistry::new(Arc::clone(&pool)),
            commands: MotionCommands::new(),
            pool,
            cfg,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    // ---------- creation ----------

    /// Start building a motion with the value type's default adapter.
    pub fn create<T: DefaultAdapter>(
        &mut self,
        start: T,
        end: T,
        duration: f64,
    ) -> MotionBuilder<'_, T, T::Options, T::Adapter> {
        MotionBuilder::new(self, start, end, duration)
    }

    /// Start building a motion with an explicit adapter.
    pub fn create_with<A, T, O>(
        &mut self,
        start: T,
        end: T,
        duration: f64,
    ) -> MotionBuilder<'_, T, O, A>
    where
        T: 'static,
        O: Default + 'static,
        A: MotionAdapter<T, O>,
    {
        MotionBuilder::new(self, start, end, duration)
    }

    /// Damped oscillation around `offset` with peak `strength`.
    pub fn punch<T: Lanes>(
        &mut self,
        offset: T,
        strength: T,
        duration: f64,
    ) -> MotionBuilder<'_, T, PunchOptions, PunchAdapter> {
        self.create_with(offset, strength, duration)
    }

    /// Pseudo-random jitter around `offset` bounded by `strength`.
    pub fn shake<T: Lanes>(
        &mut self,
        offset: T,
        strength: T,
        duration: f64,
    ) -> MotionBuilder<'_, T, ShakeOptions, ShakeAdapter> {
        self.create_with(offset, strength, duration)
    }

    pub fn spring<T: Lanes>(
        &mut self,
        start: T,
        end: T,
        duration: f64,
    ) -> MotionBuilder<'_, T, SpringOptions, SpringAdapter> {
        self.create_with(start, end, duration)
    }

    /// Start building a sequence of existing motions.
    pub fn sequence(&mut self) -> SequenceBuilder<'_> {
        SequenceBuilder::new(self)
    }

    fn storage_for<T, O, A>(&mut self) -> &mut MotionStorage<T, O, A>
    where
        T: 'static,
        O: 'static,
        A: MotionAdapter<T, O>,
    {
        let key = TypeId::of::<MotionStorage<T, O, A>>();
        let id = match self.storage_ids.get(&key) {
            Some(&id) => id,
            None => {
                let id = self.storages.len() as u32;
                log::debug!(
                    "motion storage {id} created for {}",
                    std::any::type_name::<MotionStorage<T, O, A>>()
                );
                self.storages
                    .push(Box::new(MotionStorage::<T, O, A>::new(id, self.cfg.initial_capacity)));
                self.storage_ids.insert(key, id);
                id
            }
        };
        match self.storages[id as usize]
            .as_any_mut()
            .downcast_mut::<MotionStorage<T, O, A>>()
        {
            Some(storage) => storage,
            None => unreachable!("storage {id} registered under another type"),
        }
    }

    pub(crate) fn insert<T, O, A>(
        &mut self,
        phase: UpdatePhase,
        row: MotionRow<T, O>,
        callbacks: MotionCallbacks,
    ) -> MotionHandle
    where
        T: 'static,
        O: 'static,
        A: MotionAdapter<T, O>,
    {
        let handle = self.storage_for::<T, O, A>().add(phase, row);
        self.callbacks.insert(handle, callbacks);
        handle
    }

    // ---------- ticking ----------

    /// Advance every motion scheduled in `phase`, then apply queued commands.
    pub fn update(&mut self, phase: UpdatePhase, time: impl Into<TickTime>) {
        let time = time.into();
        for storage in self.storages.iter_mut() {
            storage.update(phase, &time, &mut self.callbacks);
        }
        self.sequences
            .update(phase, &time, &mut self.storages, &mut self.callbacks);
        self.drain_commands();
    }

    /// Run `FixedUpdate`, `Update` and `LateUpdate` with the same time.
    /// `Manual` motions are left alone.
    pub fn update_frame(&mut self, time: impl Into<TickTime>) {
        let time = time.into();
        for phase in UpdatePhase::FRAME_ORDER {
            self.update(phase, time);
        }
    }

    // ---------- lookup ----------

    pub(crate) fn state(&self, handle: MotionHandle) -> Option<&MotionState> {
        if handle.storage == SEQUENCE_STORAGE {
            return self.sequences.state(handle.slot());
        }
        self.storages
            .get(handle.storage as usize)?
            .state(handle.slot())
    }

    pub(crate) fn state_mut(&mut self, handle: MotionHandle) -> Option<&mut MotionState> {
        if handle.storage == SEQUENCE_STORAGE {
            return self.sequences.state_mut(handle.slot());
        }
        self.storages
            .get_mut(handle.storage as usize)?
            .state_mut(handle.slot())
    }

    fn params(&self, handle: MotionHandle) -> Option<&MotionParams> {
        if handle.storage == SEQUENCE_STORAGE {
            return self.sequences.params(handle.slot());
        }
        self.storages
            .get(handle.storage as usize)?
            .params(handle.slot())
    }

    /// `true` while the handle still refers to a live (or preserved) motion.
    pub fn is_active(&self, handle: MotionHandle) -> bool {
        if handle.storage == SEQUENCE_STORAGE {
            return self.sequences.is_active(handle.slot());
        }
        self.storages
            .get(handle.storage as usize)
            .is_some_and(|s| s.is_active(handle.slot()))
    }

    /// Update phase the motion is scheduled in.
    pub fn phase(&self, handle: MotionHandle) -> Option<UpdatePhase> {
        if handle.storage == SEQUENCE_STORAGE {
            return self.sequences.phase(handle.slot());
        }
        self.storages.get(handle.storage as usize)?.phase(handle.slot())
    }

    /// Live, not finished and not paused.
    pub fn is_playing(&self, handle: MotionHandle) -> bool {
        self.state(handle)
            .is_some_and(|s| !s.status.is_terminal() && !s.paused)
    }

    pub fn status(&self, handle: MotionHandle) -> Option<MotionStatus> {
        self.state(handle).map(|s| s.status)
    }

    pub fn time(&self, handle: MotionHandle) -> Option<f64> {
        self.state(handle).map(|s| s.time)
    }

    pub fn playback_speed(&self, handle: MotionHandle) -> Option<f32> {
        self.state(handle).map(|s| s.playback_speed)
    }

    pub fn completed_loops(&self, handle: MotionHandle) -> Option<u32> {
        self.state(handle).map(|s| s.completed_loops)
    }

    /// Length of one loop.
    pub fn duration(&self, handle: MotionHandle) -> Option<f64> {
        self.params(handle).map(|p| p.duration)
    }

    /// Delay plus every loop; `f64::INFINITY` for infinite loops.
    pub fn total_duration(&self, handle: MotionHandle) -> Option<f64> {
        self.params(handle).map(MotionParams::total_duration)
    }

    pub fn is_paused(&self, handle: MotionHandle) -> bool {
        self.state(handle).is_some_and(|s| s.paused)
    }

    /// Child motions of a sequence handle.
    pub fn sequence_children(&self, handle: MotionHandle) -> Option<Vec<MotionHandle>> {
        if handle.storage != SEQUENCE_STORAGE {
            return None;
        }
        self.sequences.children(handle.slot())
    }

    pub fn motion_count(&self) -> usize {
        self.storages.iter().map(|s| s.len()).sum::<usize>() + self.sequences.len()
    }

    pub fn motion_count_in(&self, phase: UpdatePhase) -> usize {
        self.storages.iter().map(|s| s.len_in(phase)).sum::<usize>()
            + self.sequences.len_in(phase)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            storages: self.storages.len(),
            motions: self.storages.iter().map(|s| s.len()).sum(),
            sequences: self.sequences.len(),
            callbacks: self.callbacks.len(),
            pooled_completions: self.pool.len(),
        }
    }

    // ---------- handle operations ----------

    /// Cancel a motion: fires `on_cancel` and frees the slot. A preserved
    /// motion that already completed is released without firing anything.
    pub fn cancel(&mut self, handle: MotionHandle) -> bool {
        let done = self.cancel_now(handle);
        self.drain_commands();
        done
    }

    /// Jump to the end: emits the final value, fires completion callbacks and
    /// frees the slot unless preserved. Ignored for infinite loops and for
    /// motions inside a sequence.
    pub fn complete(&mut self, handle: MotionHandle) -> bool {
        let done = self.complete_now(handle);
        self.drain_commands();
        done
    }

    /// Seek to an absolute motion time, delays included. Sequence children
    /// are seeked through their sequence instead.
    pub fn set_time(&mut self, handle: MotionHandle, time: f64) -> bool {
        let done = self.set_time_now(handle, time);
        self.drain_commands();
        done
    }

    /// Speed multiplier; zero freezes and negative values rewind.
    pub fn set_playback_speed(&mut self, handle: MotionHandle, speed: f32) -> bool {
        if !speed.is_finite() {
            log::warn!("playback speed {speed} rejected for {handle:?}");
            return false;
        }
        match self.state_mut(handle) {
            Some(state) => {
                state.playback_speed = speed;
                true
            }
            None => false,
        }
    }

    pub fn pause(&mut self, handle: MotionHandle) -> bool {
        self.set_paused(handle, true)
    }

    pub fn resume(&mut self, handle: MotionHandle) -> bool {
        self.set_paused(handle, false)
    }

    fn set_paused(&mut self, handle: MotionHandle, paused: bool) -> bool {
        match self.state_mut(handle) {
            Some(state) => {
                state.paused = paused;
                true
            }
            None => false,
        }
    }

    /// Keep the motion's slot alive after it completes.
    pub fn preserve(&mut self, handle: MotionHandle) -> bool {
        match self.state_mut(handle) {
            Some(state) => {
                state.preserved = true;
                true
            }
            None => false,
        }
    }

    fn cancel_now(&mut self, handle: MotionHandle) -> bool {
        if handle.storage == SEQUENCE_STORAGE {
            return self
                .sequences
                .cancel(handle.slot(), &mut self.storages, &mut self.callbacks);
        }
        match self.storages.get_mut(handle.storage as usize) {
            Some(storage) => storage.cancel(handle.slot(), &mut self.callbacks),
            None => false,
        }
    }

    /// Children of a sequence only move through the sequence's own timeline.
    fn owned_by_sequence(&self, handle: MotionHandle, op: &str) -> bool {
        let owned = self.state(handle).is_some_and(|s| s.in_sequence);
        if owned {
            log::warn!("{op} ignored for {handle:?}: it is driven by a sequence");
        }
        owned
    }

    fn complete_now(&mut self, handle: MotionHandle) -> bool {
        if self.owned_by_sequence(handle, "complete") {
            return false;
        }
        if handle.storage == SEQUENCE_STORAGE {
            return self
                .sequences
                .complete(handle.slot(), &mut self.storages, &mut self.callbacks);
        }
        match self.storages.get_mut(handle.storage as usize) {
            Some(storage) => storage.complete(handle.slot(), &mut self.callbacks),
            None => false,
        }
    }

    fn set_time_now(&mut self, handle: MotionHandle, time: f64) -> bool {
        if time.is_nan() {
            log::warn!("NaN time rejected for {handle:?}");
            return false;
        }
        if self.owned_by_sequence(handle, "set_time") {
            return false;
        }
        if handle.storage == SEQUENCE_STORAGE {
            return self.sequences.set_time(
                handle.slot(),
                time,
                &mut self.storages,
                &mut self.callbacks,
            );
        }
        match self.storages.get_mut(handle.storage as usize) {
            Some(storage) => storage.set_time(handle.slot(), time, &mut self.callbacks),
            None => false,
        }
    }

    // ---------- callbacks & commands ----------

    /// Replace the hook that receives panics from sinks and callbacks.
    /// The default logs them with `log::error!`.
    pub fn set_fault_hook(&mut self, hook: impl FnMut(CallbackFault) + 'static) {
        self.callbacks.faults = Box::new(hook);
    }

    /// Queue handle for use inside callbacks. Queued commands are applied
    /// after the current phase pass or engine call.
    pub fn commands(&self) -> MotionCommands {
        self.commands.clone()
    }

    /// Future resolving when the motion completes or is canceled. Resolves
    /// immediately (as completed) for handles that are no longer live.
    pub fn completion(&mut self, handle: MotionHandle) -> Completion {
        let pool = Arc::clone(&self.pool);
        match self.status(handle) {
            None | Some(MotionStatus::Completed) => {
                Completion::ready(CompletionStatus::Completed, pool)
            }
            Some(MotionStatus::Canceled) => Completion::ready(CompletionStatus::Canceled, pool),
            Some(_) => {
                let cell = acquire(&pool);
                self.callbacks.add_waiter(handle, Arc::clone(&cell));
                Completion::pending(cell, pool)
            }
        }
    }

    pub fn apply_command(&mut self, cmd: MotionCommand) -> bool {
        match cmd {
            MotionCommand::Cancel(h) => self.cancel_now(h),
            MotionCommand::Complete(h) => self.complete_now(h),
            MotionCommand::Pause(h) => self.pause(h),
            MotionCommand::Resume(h) => self.resume(h),
            MotionCommand::SetPlaybackSpeed { handle, speed } => {
                self.set_playback_speed(handle, speed)
            }
            MotionCommand::SetTime { handle, time } => self.set_time_now(handle, time),
        }
    }

    fn drain_commands(&mut self) {
        for _ in 0..MAX_COMMAND_ROUNDS {
            let batch = self.commands.take();
            if batch.is_empty() {
                return;
            }
            for cmd in batch {
                self.apply_command(cmd);
            }
        }
        let dropped = self.commands.take().len();
        if dropped > 0 {
            log::warn!("dropped {dropped} motion commands still queued after {MAX_COMMAND_ROUNDS} rounds");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storages_are_shared_per_type_triple() {
        let mut engine = Engine::default();
        let a = engine.create(0.0f32, 1.0, 1.0).run().unwrap();
        let b = engine.create(2.0f32, 3.0, 1.0).run().unwrap();
        let c = engine.create(0.0f64, 1.0, 1.0).run().unwrap();
        let d = engine.punch(0.0f32, 1.0, 1.0).run().unwrap();
        assert_eq!(a.storage, b.storage);
        assert_ne!(a.storage, c.storage);
        assert_ne!(a.storage, d.storage);
        assert_eq!(engine.stats().storages, 3);
        assert_eq!(engine.motion_count(), 4);
    }

    #[test]
    fn foreign_storage_id_is_inert() {
        let mut engine = Engine::default();
        let bogus = MotionHandle {
            storage: 42,
            index: 0,
            version: 1,
        };
        assert!(!engine.is_active(bogus));
        assert!(!engine.cancel(bogus));
        assert!(!engine.set_time(bogus, 1.0));
    }

    #[test]
    fn nan_speed_and_time_are_rejected() {
        let mut engine = Engine::default();
        let h = engine.create(0.0f32, 1.0, 1.0).run().unwrap();
        assert!(!engine.set_playback_speed(h, f32::NAN));
        assert!(!engine.set_time(h, f64::NAN));
        assert_eq!(engine.playback_speed(h), Some(1.0));
    }
}
