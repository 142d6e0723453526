//! Value adapters.
//!
//! An adapter turns `(start, end, options, progress)` into a value. Adapters
//! are zero-sized types with an associated function, so the choice of adapter
//! is fixed per storage at compile time and the tick loop never branches on
//! the value type.
//!
//! Most adapters treat `start`/`end` as the endpoints of a lerp. The
//! vibration adapters ([`PunchAdapter`], [`ShakeAdapter`]) do not: there
//! `start` is the resting offset and `end` is the amplitude, and the motion
//! settles back on `start` when it completes.

pub mod numeric;
pub mod text;
pub mod vibration;

use serde::{Deserialize, Serialize};

pub use numeric::{
    ColorAdapter, DoubleAdapter, IntegerAdapter, IntegerOptions, LerpAdapter, QuatAdapter,
    RoundingMode,
};
pub use text::{ScrambleMode, TextAdapter, TextOptions};
pub use vibration::{
    PunchAdapter, PunchOptions, ShakeAdapter, ShakeOptions, SpringAdapter, SpringOptions,
};

/// Inputs an adapter may look at besides the endpoints.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct EvaluationContext {
    /// Eased progress. 0 = start, 1 = end; may leave [0, 1] for overshooting
    /// eases and incremental loops.
    pub progress: f64,
    /// Absolute motion time in seconds.
    pub time: f64,
}

/// Evaluation strategy for one (value, options) pair.
pub trait MotionAdapter<T, O>: 'static {
    /// Pure: same inputs, same output. No side effects.
    fn evaluate(start: &T, end: &T, options: &O, ctx: &EvaluationContext) -> T;
}

/// Adapter picked by [`crate::Engine::create`] for a value type.
pub trait DefaultAdapter: Sized + 'static {
    type Options: Default + 'static;
    type Adapter: MotionAdapter<Self, Self::Options>;
}

/// Options type for adapters without settings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoOptions;

/// f32-component values (`f32`, `[f32; N]`).
pub trait Lanes: Copy + 'static {
    fn zip_map(a: Self, b: Self, f: impl FnMut(usize, f32, f32) -> f32) -> Self;
}

impl Lanes for f32 {
    #[inline]
    fn zip_map(a: Self, b: Self, mut f: impl FnMut(usize, f32, f32) -> f32) -> Self {
        f(0, a, b)
    }
}

impl<const N: usize> Lanes for [f32; N] {
    #[inline]
    fn zip_map(a: Self, b: Self, mut f: impl FnMut(usize, f32, f32) -> f32) -> Self {
        std::array::from_fn(|i| f(i, a[i], b[i]))
    }
}

/// `(1 - t) * a + t * b`: exact at both endpoints.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f64) -> f32 {
    ((1.0 - t) * a as f64 + t * b as f64) as f32
}

#[inline]
pub fn lerp_f64(a: f64, b: f64, t: f64) -> f64 {
    (1.0 - t) * a + t * b
}

/// Stateless xorshift64* mix of a seed and two counters.
#[inline]
pub(crate) fn hash64(seed: u64, a: u64, b: u64) -> u64 {
    let mut x = seed
        ^ a.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ b.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    if x == 0 {
        x = 0x9E37_79B9_7F4A_7C15;
    }
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    x.wrapping_mul(0x2545_F491_4F6C_DD1D)
}

/// Hash mapped to [-1, 1].
#[inline]
pub(crate) fn hash_signed_unit(seed: u64, a: u64, b: u64) -> f64 {
    let bits = hash64(seed, a, b) >> 11; // 53 significant bits
    (bits as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
}
