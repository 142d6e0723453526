//! Motion builder: create → configure → bind.

use std::marker::PhantomData;

use crate::adapter::MotionAdapter;
use crate::callbacks::{Callback, LoopCallback, MotionCallbacks};
use crate::ease::Ease;
use crate::engine::Engine;
use crate::error::MotionError;
use crate::handle::MotionHandle;
use crate::scheduler::{MotionState, MotionValues, Sink, UpdatePhase};
use crate::storage::MotionRow;
use crate::timeline::{DelayType, LoopCount, LoopType, MotionParams, TimeKind};

/// Accumulates the configuration of one motion. Nothing is scheduled until
/// [`bind`](Self::bind), [`bind_with_state`](Self::bind_with_state) or
/// [`run`](Self::run) is called.
#[must_use = "a motion is only scheduled by bind() or run()"]
pub struct MotionBuilder<'e, T, O, A> {
    engine: &'e mut Engine,
    values: MotionValues<T, O>,
    params: MotionParams,
    state: MotionState,
    phase: UpdatePhase,
    callbacks: MotionCallbacks,
    _adapter: PhantomData<fn() -> A>,
}

impl<'e, T, O, A> MotionBuilder<'e, T, O, A>
where
    T: 'static,
    O: Default + 'static,
    A: MotionAdapter<T, O>,
{
    pub(crate) fn new(engine: &'e mut Engine, start: T, end: T, duration: f64) -> Self {
        let cfg = engine.config();
        let params = MotionParams {
            duration,
            ease: cfg.default_ease,
            skip_values_during_delay: cfg.skip_values_during_delay,
            ..MotionParams::default()
        };
        let phase = cfg.default_phase;
        Self {
            engine,
            values: MotionValues {
                start,
                end,
                options: O::default(),
            },
            params,
            state: MotionState::default(),
            phase,
            callbacks: MotionCallbacks::default(),
            _adapter: PhantomData,
        }
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.params.ease = ease;
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

    /// `loops <= 0` loops forever.
    pub fn with_loops(mut self, loops: i32, loop_type: LoopType) -> Self {
        self.params.loops = LoopCount::from_signed(loops);
        self.params.loop_type = loop_type;
        self
    }

    pub fn with_options(mut self, options: O) -> Self {
        self.values.options = options;
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

    pub fn with_skip_values_during_delay(mut self, skip: bool) -> Self {
        self.params.skip_values_during_delay = skip;
        self
    }

    pub fn with_playback_speed(mut self, speed: f32) -> Self {
        self.state.playback_speed = speed;
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

    /// Called with the number of finished loops each time a loop wraps.
    pub fn with_on_loop_complete(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.callbacks.on_loop_complete = Some(Box::new(f) as LoopCallback);
        self
    }

    /// Keep the motion alive (and queryable) after it completes.
    pub fn with_preserve(mut self) -> Self {
        self.state.preserved = true;
        self
    }

    /// Replace every timing parameter at once, duration included.
    pub fn with_params(mut self, params: MotionParams) -> Self {
        self.params = params;
        self
    }

    fn validate(&self) -> Result<(), MotionError> {
        let p = &self.params;
        if !(p.duration.is_finite() && p.duration >= 0.0) {
            return Err(MotionError::InvalidDuration {
                duration: p.duration,
            });
        }
        if !(p.delay.is_finite() && p.delay >= 0.0) {
            return Err(MotionError::InvalidDelay { delay: p.delay });
        }
        if !self.state.playback_speed.is_finite() {
            return Err(MotionError::InvalidPlaybackSpeed {
                speed: self.state.playback_speed,
            });
        }
        Ok(())
    }

    fn schedule(self, sink: Option<Sink<T>>) -> Result<MotionHandle, MotionError> {
        self.validate()?;
        let MotionBuilder {
            engine,
            values,
            params,
            state,
            phase,
            callbacks,
            ..
        } = self;
        let row = MotionRow {
            state,
            params,
            values,
            sink,
        };
        Ok(engine.insert::<T, O, A>(phase, row, callbacks))
    }

    /// Schedule the motion; `sink` receives the value on every tick.
    pub fn bind(self, sink: impl FnMut(T) + 'static) -> Result<MotionHandle, MotionError> {
        self.schedule(Some(Box::new(sink)))
    }

    /// Like [`bind`](Self::bind) with state moved into the motion and passed
    /// back to the sink, so the closure itself captures nothing.
    pub fn bind_with_state<S: 'static>(
        self,
        mut state: S,
        mut sink: impl FnMut(T, &mut S) + 'static,
    ) -> Result<MotionHandle, MotionError> {
        self.bind(move |value| sink(value, &mut state))
    }

    /// Schedule without a sink, e.g. to drive a sequence slot or await
    /// completion only.
    pub fn run(self) -> Result<MotionHandle, MotionError> {
        self.schedule(None)
    }
}
