//! Injectable sources of uniform randomness.
//!
//! Every sampling site in the wave subsystem (formation selection, tank
//! position sampling, color bias) draws from a [`RandomSource`] supplied by the
//! caller. Production code wraps a `rand` generator in [`RngSource`]; tests feed
//! scripted values through [`SequenceRandom`].

use rand::{rngs::ThreadRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Largest value a [`SequenceRandom`] will hand out, keeping draws inside `[0, 1)`.
const MAX_UNIT: f64 = 1.0 - f64::EPSILON;

/// Produces uniformly distributed values in the half-open interval `[0, 1)`.
pub trait RandomSource {
    /// Draws the next value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Adapts any `rand` generator into a [`RandomSource`].
#[derive(Clone, Debug)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: RngCore> RngSource<R> {
    /// Wraps the provided generator.
    #[must_use]
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Consumes the adapter, yielding the wrapped generator.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl RngSource<ChaCha8Rng> {
    /// Creates a reproducible source seeded from a 64-bit value.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl RngSource<ThreadRng> {
    /// Creates a source backed by the thread-local generator.
    #[must_use]
    pub fn thread() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of values, cycling once the list is exhausted.
///
/// Values are clamped into `[0, 1)`; non-finite entries read as `0.0`. An empty
/// sequence always yields `0.0`.
#[derive(Clone, Debug, Default)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    /// Creates a sequence that replays `values` in order.
    #[must_use]
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// Creates a sequence that always yields `value`.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of values drawn so far.
    #[must_use]
    pub const fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        if value.is_finite() {
            value.clamp(0.0, MAX_UNIT)
        } else {
            0.0
        }
    }
}
