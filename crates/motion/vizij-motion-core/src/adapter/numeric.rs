//! Lerp-based adapters: scalars, vectors, integers, quaternions, colors.

use serde::{Deserialize, Serialize};

use super::{lerp_f32, lerp_f64, DefaultAdapter, EvaluationContext, Lanes, MotionAdapter, NoOptions};

/// Component-wise lerp for `f32` and `[f32; N]`.
#[derive(Copy, Clone, Debug, Default)]
pub struct LerpAdapter;

impl<T: Lanes> MotionAdapter<T, NoOptions> for LerpAdapter {
    #[inline]
    fn evaluate(start: &T, end: &T, _options: &NoOptions, ctx: &EvaluationContext) -> T {
        T::zip_map(*start, *end, |_, a, b| lerp_f32(a, b, ctx.progress))
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct DoubleAdapter;

impl MotionAdapter<f64, NoOptions> for DoubleAdapter {
    #[inline]
    fn evaluate(start: &f64, end: &f64, _options: &NoOptions, ctx: &EvaluationContext) -> f64 {
        lerp_f64(*start, *end, ctx.progress)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundingMode {
    /// Banker's rounding.
    #[default]
    ToEven,
    AwayFromZero,
    ToZero,
    ToPositiveInfinity,
    ToNegativeInfinity,
}

impl RoundingMode {
    #[inline]
    pub fn apply(self, v: f64) -> f64 {
        match self {
            RoundingMode::ToEven => v.round_ties_even(),
            RoundingMode::AwayFromZero => v.round(),
            RoundingMode::ToZero => v.trunc(),
            RoundingMode::ToPositiveInfinity => v.ceil(),
            RoundingMode::ToNegativeInfinity => v.floor(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerOptions {
    pub rounding: RoundingMode,
}

/// Lerp in `f64`, then round with [`IntegerOptions::rounding`].
#[derive(Copy, Clone, Debug, Default)]
pub struct IntegerAdapter;

impl MotionAdapter<i32, IntegerOptions> for IntegerAdapter {
    #[inline]
    fn evaluate(start: &i32, end: &i32, options: &IntegerOptions, ctx: &EvaluationContext) -> i32 {
        let v = lerp_f64(*start as f64, *end as f64, ctx.progress);
        // `as` saturates on overflow
        options.rounding.apply(v) as i32
    }
}

impl MotionAdapter<i64, IntegerOptions> for IntegerAdapter {
    #[inline]
    fn evaluate(start: &i64, end: &i64, options: &IntegerOptions, ctx: &EvaluationContext) -> i64 {
        let v = lerp_f64(*start as f64, *end as f64, ctx.progress);
        options.rounding.apply(v) as i64
    }
}

/// Spherical interpolation of unit quaternions `(x, y, z, w)` along the
/// shortest arc. Falls back to normalized lerp for nearly parallel inputs.
#[derive(Copy, Clone, Debug, Default)]
pub struct QuatAdapter;

#[inline]
fn dot4(a: [f32; 4], b: [f32; 4]) -> f64 {
    (0..4).map(|i| a[i] as f64 * b[i] as f64).sum()
}

fn normalize4(q: [f64; 4]) -> [f32; 4] {
    let len2: f64 = q.iter().map(|c| c * c).sum();
    if len2 > 0.0 {
        let inv = len2.sqrt().recip();
        [
            (q[0] * inv) as f32,
            (q[1] * inv) as f32,
            (q[2] * inv) as f32,
            (q[3] * inv) as f32,
        ]
    } else {
        [0.0, 0.0, 0.0, 1.0]
    }
}

pub fn slerp_quat(a: [f32; 4], b: [f32; 4], t: f64) -> [f32; 4] {
    let mut d = dot4(a, b);
    let mut b = b.map(|c| c as f64);
    if d < 0.0 {
        d = -d;
        b = b.map(|c| -c);
    }
    let a = a.map(|c| c as f64);
    let (wa, wb) = if d > 0.9995 {
        (1.0 - t, t)
    } else {
        let theta = d.clamp(-1.0, 1.0).acos();
        let sin_theta = theta.sin();
        (
            ((1.0 - t) * theta).sin() / sin_theta,
            (t * theta).sin() / sin_theta,
        )
    };
    normalize4(std::array::from_fn(|i| wa * a[i] + wb * b[i]))
}

impl MotionAdapter<[f32; 4], NoOptions> for QuatAdapter {
    #[inline]
    fn evaluate(
        start: &[f32; 4],
        end: &[f32; 4],
        _options: &NoOptions,
        ctx: &EvaluationContext,
    ) -> [f32; 4] {
        if ctx.progress == 1.0 {
            return *end;
        }
        slerp_quat(*start, *end, ctx.progress)
    }
}

/// RGBA lerp with channels kept in [0, 1] when the ease overshoots.
#[derive(Copy, Clone, Debug, Default)]
pub struct ColorAdapter;

impl MotionAdapter<[f32; 4], NoOptions> for ColorAdapter {
    #[inline]
    fn evaluate(
        start: &[f32; 4],
        end: &[f32; 4],
        _options: &NoOptions,
        ctx: &EvaluationContext,
    ) -> [f32; 4] {
        <[f32; 4]>::zip_map(*start, *end, |_, a, b| {
            lerp_f32(a, b, ctx.progress).clamp(0.0, 1.0)
        })
    }
}

impl DefaultAdapter for f32 {
    type Options = NoOptions;
    type Adapter = LerpAdapter;
}

impl<const N: usize> DefaultAdapter for [f32; N] {
    type Options = NoOptions;
    type Adapter = LerpAdapter;
}

impl DefaultAdapter for f64 {
    type Options = NoOptions;
    type Adapter = DoubleAdapter;
}

impl DefaultAdapter for i32 {
    type Options = IntegerOptions;
    type Adapter = IntegerAdapter;
}

impl DefaultAdapter for i64 {
    type Options = IntegerOptions;
    type Adapter = IntegerAdapter;
}
