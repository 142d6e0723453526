//! Update phases, tick time and the per-row update step.
//!
//! Ticking and seeking both end in [`apply_sample`]: the row's time has been
//! set, the timeline is sampled, and the result decides what gets emitted and
//! which lifecycle callbacks fire.

use serde::{Deserialize, Serialize};

use crate::adapter::{EvaluationContext, MotionAdapter};
use crate::callbacks::{guard, CallbackRegistry};
use crate::error::CallbackSource;
use crate::handle::MotionHandle;
use crate::timeline::{self, MotionParams, MotionStatus, TimeKind, TimeSample};

/// Point in the host frame at which a bucket of motions advances.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdatePhase {
    FixedUpdate,
    #[default]
    Update,
    LateUpdate,
    /// Only advanced when the host calls `Engine::update(UpdatePhase::Manual, ..)`.
    Manual,
}

impl UpdatePhase {
    pub const COUNT: usize = 4;

    /// Phases run by `Engine::update_frame`, in order.
    pub const FRAME_ORDER: [UpdatePhase; 3] = [
        UpdatePhase::FixedUpdate,
        UpdatePhase::Update,
        UpdatePhase::LateUpdate,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            UpdatePhase::FixedUpdate => 0,
            UpdatePhase::Update => 1,
            UpdatePhase::LateUpdate => 2,
            UpdatePhase::Manual => 3,
        }
    }
}

/// Deltas for one tick, one per [`TimeKind`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickTime {
    pub delta: f64,
    pub unscaled_delta: f64,
    pub realtime_delta: f64,
}

impl TickTime {
    /// Same delta for every clock.
    pub fn uniform(dt: f64) -> Self {
        Self {
            delta: dt,
            unscaled_delta: dt,
            realtime_delta: dt,
        }
    }

    #[inline]
    pub fn delta_for(&self, kind: TimeKind) -> f64 {
        match kind {
            TimeKind::Scaled => self.delta,
            TimeKind::Unscaled => self.unscaled_delta,
            TimeKind::Realtime => self.realtime_delta,
        }
    }
}

impl From<f64> for TickTime {
    fn from(dt: f64) -> Self {
        TickTime::uniform(dt)
    }
}

impl From<f32> for TickTime {
    fn from(dt: f32) -> Self {
        TickTime::uniform(dt as f64)
    }
}

/// Mutable per-motion state, one row per live motion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub status: MotionStatus,
    /// Absolute motion time, delays and previous loops included.
    pub time: f64,
    pub playback_speed: f32,
    pub completed_loops: u32,
    pub paused: bool,
    pub preserved: bool,
    /// Driven by a sequence instead of the phase tick.
    pub in_sequence: bool,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            status: MotionStatus::Scheduled,
            time: 0.0,
            playback_speed: 1.0,
            completed_loops: 0,
            paused: false,
            preserved: false,
            in_sequence: false,
        }
    }
}

impl MotionState {
    /// Whether the phase tick should advance this row.
    #[inline]
    pub fn is_ticking(&self) -> bool {
        !(self.status.is_terminal() || self.paused || self.in_sequence)
    }
}

/// Endpoints and adapter options of one motion.
#[derive(Clone, Debug)]
pub struct MotionValues<T, O> {
    pub start: T,
    pub end: T,
    pub options: O,
}

pub type Sink<T> = Box<dyn FnMut(T)>;

/// Clamp a motion time into `[0, total]`.
#[inline]
pub(crate) fn clamp_time(time: f64, total: f64) -> f64 {
    time.max(0.0).min(total)
}

#[inline]
fn emit<T, O, A: MotionAdapter<T, O>>(
    handle: MotionHandle,
    values: &MotionValues<T, O>,
    sink: &mut Option<Sink<T>>,
    progress: f64,
    time: f64,
    callbacks: &mut CallbackRegistry,
) {
    let Some(sink) = sink.as_mut() else {
        return;
    };
    let value = A::evaluate(
        &values.start,
        &values.end,
        &values.options,
        &EvaluationContext { progress, time },
    );
    guard(&mut callbacks.faults, handle, CallbackSource::Sink, || {
        sink(value)
    });
}

/// Apply a sampled time to a row. Returns `true` when the row just completed
/// and should be released.
pub(crate) fn apply_sample<T, O, A: MotionAdapter<T, O>>(
    handle: MotionHandle,
    state: &mut MotionState,
    params: &MotionParams,
    values: &MotionValues<T, O>,
    sink: &mut Option<Sink<T>>,
    sample: TimeSample,
    callbacks: &mut CallbackRegistry,
) -> bool {
    let was_completed = state.status == MotionStatus::Completed;
    let previous_loops = state.completed_loops;
    state.status = sample.status;
    state.completed_loops = sample.completed_loops;

    match sample.status {
        MotionStatus::Delayed => {
            if !params.skip_values_during_delay {
                emit::<T, O, A>(handle, values, sink, sample.progress, state.time, callbacks);
            }
        }
        MotionStatus::Running | MotionStatus::Completed => {
            emit::<T, O, A>(handle, values, sink, sample.progress, state.time, callbacks);
        }
        MotionStatus::Scheduled | MotionStatus::Canceled => {
            debug_assert!(false, "timeline produced {:?}", sample.status);
        }
    }

    if was_completed {
        // Seeking a preserved, completed motion re-emits but never re-fires.
        return false;
    }
    if sample.completed_loops > previous_loops {
        callbacks.loop_complete(handle, sample.completed_loops);
    }
    if sample.status == MotionStatus::Completed {
        callbacks.complete(handle);
        return !(state.preserved || state.in_sequence);
    }
    false
}

/// Advance one row by a tick. Returns `true` when the row should be released.
#[inline]
pub(crate) fn tick_row<T, O, A: MotionAdapter<T, O>>(
    handle: MotionHandle,
    state: &mut MotionState,
    params: &MotionParams,
    values: &MotionValues<T, O>,
    sink: &mut Option<Sink<T>>,
    time: &TickTime,
    callbacks: &mut CallbackRegistry,
) -> bool {
    let dt = time.delta_for(params.time_kind) * state.playback_speed as f64;
    state.time = clamp_time(state.time + dt, params.total_duration());
    let sample = timeline::sample(params, state.time);
    apply_sample::<T, O, A>(handle, state, params, values, sink, sample, callbacks)
}

/// Jump a row to `time` without replaying intermediate ticks.
pub(crate) fn seek_row<T, O, A: MotionAdapter<T, O>>(
    handle: MotionHandle,
    state: &mut MotionState,
    params: &MotionParams,
    values: &MotionValues<T, O>,
    sink: &mut Option<Sink<T>>,
    time: f64,
    callbacks: &mut CallbackRegistry,
) -> bool {
    state.time = clamp_time(time, params.total_duration());
    let sample = timeline::sample(params, state.time);
    apply_sample::<T, O, A>(handle, state, params, values, sink, sample, callbacks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_indices_are_distinct() {
        let mut seen = [false; UpdatePhase::COUNT];
        for p in [
            UpdatePhase::FixedUpdate,
            UpdatePhase::Update,
            UpdatePhase::LateUpdate,
            UpdatePhase::Manual,
        ] {
            assert!(!seen[p.index()]);
            seen[p.index()] = true;
        }
    }

    #[test]
    fn tick_time_selects_clock() {
        let t = TickTime {
            delta: 0.5,
            unscaled_delta: 1.0,
            realtime_delta: 2.0,
        };
        assert_eq!(t.delta_for(TimeKind::Scaled), 0.5);
        assert_eq!(t.delta_for(TimeKind::Unscaled), 1.0);
        assert_eq!(t.delta_for(TimeKind::Realtime), 2.0);
        assert_eq!(TickTime::from(0.25f64).unscaled_delta, 0.25);
    }

    #[test]
    fn clamp_time_bounds() {
        assert_eq!(clamp_time(-1.0, 2.0), 0.0);
        assert_eq!(clamp_time(3.0, 2.0), 2.0);
        assert_eq!(clamp_time(5.0, f64::INFINITY), 5.0);
    }
}
