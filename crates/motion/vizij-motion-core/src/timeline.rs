//! Pure time math: absolute motion time -> status, loop index and eased progress.
//!
//! Motion time is absolute: it starts at 0 when the motion is scheduled and
//! covers delays and every loop. [`sample`] maps it onto the current loop
//! without touching any state, so ticking and seeking share one code path.

use serde::{Deserialize, Serialize};

use crate::ease::Ease;

/// Lifecycle of one motion.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionStatus {
    /// Bound but not ticked yet.
    #[default]
    Scheduled,
    Delayed,
    Running,
    Completed,
    Canceled,
}

impl MotionStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, MotionStatus::Completed | MotionStatus::Canceled)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopType {
    /// Every loop starts again from the start value.
    #[default]
    Restart,
    /// Odd loops play the eased curve backwards.
    Flip,
    /// Odd loops run time backwards before easing, so the curve is mirrored.
    Yoyo,
    /// Every loop continues from where the previous one ended.
    Incremental,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayType {
    /// Delay once before the first loop.
    #[default]
    FirstLoop,
    /// Delay before every loop.
    EveryLoop,
}

/// Which clock of a tick drives a motion.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeKind {
    #[default]
    Scaled,
    Unscaled,
    Realtime,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopCount {
    Finite(u32),
    Infinite,
}

impl Default for LoopCount {
    fn default() -> Self {
        LoopCount::Finite(1)
    }
}

impl LoopCount {
    /// `n <= 0` loops forever.
    pub fn from_signed(n: i32) -> Self {
        if n <= 0 {
            LoopCount::Infinite
        } else {
            LoopCount::Finite(n as u32)
        }
    }

    #[inline]
    pub fn is_infinite(self) -> bool {
        matches!(self, LoopCount::Infinite)
    }
}

/// Timing parameters of one motion. Immutable once bound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionParams {
    /// Length of one loop in seconds.
    pub duration: f64,
    pub delay: f64,
    pub delay_type: DelayType,
    pub loops: LoopCount,
    pub loop_type: LoopType,
    pub ease: Ease,
    pub time_kind: TimeKind,
    /// When true nothing is written to the sink while the motion waits out a delay.
    pub skip_values_during_delay: bool,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            duration: 0.0,
            delay: 0.0,
            delay_type: DelayType::FirstLoop,
            loops: LoopCount::Finite(1),
            loop_type: LoopType::Restart,
            ease: Ease::Linear,
            time_kind: TimeKind::Scaled,
            skip_values_during_delay: true,
        }
    }
}

impl MotionParams {
    /// Duration of one loop including its delay share.
    #[inline]
    fn cycle(&self) -> f64 {
        match self.delay_type {
            DelayType::FirstLoop => self.duration,
            DelayType::EveryLoop => self.duration + self.delay,
        }
    }

    /// Delay that precedes loop 0 only.
    #[inline]
    fn lead(&self) -> f64 {
        match self.delay_type {
            DelayType::FirstLoop => self.delay,
            DelayType::EveryLoop => 0.0,
        }
    }

    /// Full length of the motion, `f64::INFINITY` for infinite loops.
    pub fn total_duration(&self) -> f64 {
        match self.loops {
            LoopCount::Infinite => f64::INFINITY,
            LoopCount::Finite(n) => self.lead() + self.cycle() * n as f64,
        }
    }

    /// Progress inside loop `loop_index` for linear loop time `t` in [0, 1].
    pub fn loop_progress(&self, t: f64, loop_index: u64) -> f64 {
        let odd = loop_index % 2 == 1;
        match self.loop_type {
            LoopType::Restart => self.ease.evaluate(t),
            LoopType::Flip if odd => 1.0 - self.ease.evaluate(t),
            LoopType::Flip => self.ease.evaluate(t),
            LoopType::Yoyo if odd => self.ease.evaluate(1.0 - t),
            LoopType::Yoyo => self.ease.evaluate(t),
            LoopType::Incremental => self.ease.evaluate(t) + loop_index as f64,
        }
    }

    /// Progress emitted when the motion completes: the end of its last loop.
    pub fn final_progress(&self) -> f64 {
        match self.loops {
            LoopCount::Finite(n) => self.loop_progress(1.0, n.saturating_sub(1) as u64),
            LoopCount::Infinite => self.loop_progress(1.0, 0),
        }
    }
}

/// Result of mapping a motion time onto its timeline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeSample {
    pub status: MotionStatus,
    pub progress: f64,
    /// Number of loops fully played before this time.
    pub completed_loops: u32,
}

/// Map absolute motion time onto status/progress. Times below zero clamp to 0.
pub fn sample(params: &MotionParams, time: f64) -> TimeSample {
    let time = if time.is_nan() { 0.0 } else { time.max(0.0) };
    let lead = params.lead();

    if time < lead {
        return TimeSample {
            status: MotionStatus::Delayed,
            progress: params.loop_progress(0.0, 0),
            completed_loops: 0,
        };
    }

    let cycle = params.cycle();
    let local = time - lead;

    if cycle <= 0.0 {
        // Zero-length loops: finite motions finish immediately, infinite ones
        // sit at the end of their first loop.
        return match params.loops {
            LoopCount::Finite(n) => completed(params, n),
            LoopCount::Infinite => TimeSample {
                status: MotionStatus::Running,
                progress: params.loop_progress(1.0, 0),
                completed_loops: 0,
            },
        };
    }

    let loop_f = (local / cycle).floor();
    if let LoopCount::Finite(n) = params.loops {
        if loop_f >= n as f64 {
            return completed(params, n);
        }
    }
    // Saturating cast keeps very long infinite motions well-defined.
    let loop_index = loop_f as u64;
    let in_cycle = local - loop_f * cycle;
    let in_body = match params.delay_type {
        DelayType::FirstLoop => in_cycle,
        DelayType::EveryLoop => in_cycle - params.delay,
    };
    let completed_loops = loop_index.min(u32::MAX as u64) as u32;

    if in_body < 0.0 {
        return TimeSample {
            status: MotionStatus::Delayed,
            progress: params.loop_progress(0.0, loop_index),
            completed_loops,
        };
    }

    let t = if params.duration > 0.0 {
        (in_body / params.duration).clamp(0.0, 1.0)
    } else {
        1.0
    };
    TimeSample {
        status: MotionStatus::Running,
        progress: params.loop_progress(t, loop_index),
        completed_loops,
    }
}

fn completed(params: &MotionParams, loops: u32) -> TimeSample {
    TimeSample {
        status: MotionStatus::Completed,
        progress: params.final_progress(),
        completed_loops: loops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(duration: f64) -> MotionParams {
        MotionParams {
            duration,
            ..MotionParams::default()
        }
    }

    #[test]
    fn single_loop_progress_and_completion() {
        let p = params(2.0);
        let s = sample(&p, 0.5);
        assert_eq!(s.status, MotionStatus::Running);
        assert!((s.progress - 0.25).abs() < 1e-12);
        let end = sample(&p, 2.0);
        assert_eq!(end.status, MotionStatus::Completed);
        assert_eq!(end.progress, 1.0);
        assert_eq!(end.completed_loops, 1);
    }

    #[test]
    fn first_loop_delay() {
        let p = MotionParams {
            delay: 0.5,
            ..params(1.0)
        };
        assert_eq!(sample(&p, 0.2).status, MotionStatus::Delayed);
        let s = sample(&p, 1.0);
        assert_eq!(s.status, MotionStatus::Running);
        assert!((s.progress - 0.5).abs() < 1e-12);
        assert_eq!(p.total_duration(), 1.5);
    }

    #[test]
    fn every_loop_delay() {
        let p = MotionParams {
            delay: 1.0,
            delay_type: DelayType::EveryLoop,
            loops: LoopCount::Finite(2),
            ..params(1.0)
        };
        assert_eq!(p.total_duration(), 4.0);
        assert_eq!(sample(&p, 0.5).status, MotionStatus::Delayed);
        assert_eq!(sample(&p, 1.5).status, MotionStatus::Running);
        let second_delay = sample(&p, 2.5);
        assert_eq!(second_delay.status, MotionStatus::Delayed);
        assert_eq!(second_delay.completed_loops, 1);
        assert_eq!(sample(&p, 4.0).status, MotionStatus::Completed);
    }

    #[test]
    fn yoyo_reverses_odd_loops() {
        let p = MotionParams {
            loops: LoopCount::Finite(2),
            loop_type: LoopType::Yoyo,
            ..params(1.0)
        };
        assert!((sample(&p, 0.25).progress - 0.25).abs() < 1e-12);
        assert!((sample(&p, 1.25).progress - 0.75).abs() < 1e-12);
        assert_eq!(sample(&p, 2.0).progress, 0.0);
    }

    #[test]
    fn incremental_accumulates() {
        let p = MotionParams {
            loops: LoopCount::Finite(3),
            loop_type: LoopType::Incremental,
            ..params(1.0)
        };
        assert!((sample(&p, 1.5).progress - 1.5).abs() < 1e-12);
        assert_eq!(sample(&p, 3.0).progress, 3.0);
    }

    #[test]
    fn infinite_loops_never_complete() {
        let p = MotionParams {
            loops: LoopCount::Infinite,
            ..params(0.5)
        };
        let s = sample(&p, 1.0e12 + 0.25);
        assert_eq!(s.status, MotionStatus::Running);
        assert_eq!(s.completed_loops, u32::MAX);
        assert!(p.total_duration().is_infinite());
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let s = sample(&params(0.0), 0.0);
        assert_eq!(s.status, MotionStatus::Completed);
        assert_eq!(s.progress, 1.0);
    }

    #[test]
    fn loop_count_from_signed() {
        assert_eq!(LoopCount::from_signed(0), LoopCount::Infinite);
        assert_eq!(LoopCount::from_signed(-1), LoopCount::Infinite);
        assert_eq!(LoopCount::from_signed(3), LoopCount::Finite(3));
    }
}
