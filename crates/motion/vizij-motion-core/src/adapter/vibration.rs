//! Waveform adapters: punch, shake and spring.
//!
//! Punch and shake read `start` as the resting offset and `end` as the
//! amplitude: `value = start + end * wave(progress)`, with `wave(0) == wave(1) == 0`,
//! so they begin and finish exactly on `start`. Spring is an ordinary
//! `start -> end` transition shaped by a damped-oscillator response.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::{hash_signed_unit, lerp_f32, EvaluationContext, Lanes, MotionAdapter};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PunchOptions {
    /// Oscillations over the motion.
    pub frequency: u32,
    /// 0 = no decay beyond the linear envelope, 1 = strong decay.
    pub damping_ratio: f32,
}

impl Default for PunchOptions {
    fn default() -> Self {
        Self {
            frequency: 10,
            damping_ratio: 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeOptions {
    /// Direction changes over the motion.
    pub frequency: u32,
    pub damping_ratio: f32,
    pub seed: u64,
}

impl Default for ShakeOptions {
    fn default() -> Self {
        Self {
            frequency: 10,
            damping_ratio: 1.0,
            seed: 0x5EED,
        }
    }
}

/// Decaying envelope, 1 at t = 0 and 0 at t = 1.
#[inline]
fn envelope(t: f64, damping_ratio: f32) -> f64 {
    (1.0 - t) * (-(damping_ratio.max(0.0) as f64) * 3.0 * t).exp()
}

/// Damped sine used by punch. Zero at both ends.
pub fn punch_wave(t: f64, options: &PunchOptions) -> f64 {
    if t <= 0.0 || t >= 1.0 {
        return 0.0;
    }
    (2.0 * PI * options.frequency as f64 * t).sin() * envelope(t, options.damping_ratio)
}

#[derive(Copy, Clone, Debug, Default)]
pub struct PunchAdapter;

impl<T: Lanes> MotionAdapter<T, PunchOptions> for PunchAdapter {
    #[inline]
    fn evaluate(offset: &T, strength: &T, options: &PunchOptions, ctx: &EvaluationContext) -> T {
        let w = punch_wave(ctx.progress, options);
        T::zip_map(*offset, *strength, |_, o, s| (o as f64 + s as f64 * w) as f32)
    }
}

/// Random offsets per lane that change `frequency` times over the motion.
#[derive(Copy, Clone, Debug, Default)]
pub struct ShakeAdapter;

impl<T: Lanes> MotionAdapter<T, ShakeOptions> for ShakeAdapter {
    fn evaluate(offset: &T, strength: &T, options: &ShakeOptions, ctx: &EvaluationContext) -> T {
        let t = ctx.progress;
        if t <= 0.0 || t >= 1.0 {
            return *offset;
        }
        let env = envelope(t, options.damping_ratio);
        let step = (t * options.frequency.max(1) as f64).floor() as u64;
        T::zip_map(*offset, *strength, |lane, o, s| {
            let r = hash_signed_unit(options.seed, lane as u64, step);
            (o as f64 + s as f64 * r * env) as f32
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringOptions {
    /// Natural angular frequency over the normalized motion.
    pub stiffness: f32,
    /// < 1 overshoots, 1 is critically damped, > 1 approaches slowly.
    pub damping_ratio: f32,
}

impl Default for SpringOptions {
    fn default() -> Self {
        Self {
            stiffness: 12.0,
            damping_ratio: 0.5,
        }
    }
}

/// Step response of a damped oscillator at normalized time `t`.
/// Pinned to exactly 0 and 1 at the ends.
pub fn spring_response(t: f64, options: &SpringOptions) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let omega = options.stiffness.max(f32::EPSILON) as f64;
    let zeta = options.damping_ratio.max(0.0) as f64;
    if zeta < 1.0 {
        let root = (1.0 - zeta * zeta).sqrt();
        let omega_d = omega * root;
        let decay = (-zeta * omega * t).exp();
        1.0 - decay * ((omega_d * t).cos() + (zeta / root) * (omega_d * t).sin())
    } else if zeta == 1.0 {
        1.0 - (-omega * t).exp() * (1.0 + omega * t)
    } else {
        // Two real roots, both negative; each term decays on its own.
        let root = (zeta * zeta - 1.0).sqrt();
        let slow = ((-zeta + root) * omega * t).exp();
        let fast = ((-zeta - root) * omega * t).exp();
        let k = zeta / root;
        1.0 - 0.5 * ((1.0 + k) * slow + (1.0 - k) * fast)
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SpringAdapter;

impl<T: Lanes> MotionAdapter<T, SpringOptions> for SpringAdapter {
    #[inline]
    fn evaluate(start: &T, end: &T, options: &SpringOptions, ctx: &EvaluationContext) -> T {
        let k = spring_response(ctx.progress, options);
        T::zip_map(*start, *end, |_, a, b| lerp_f32(a, b, k))
    }
}
