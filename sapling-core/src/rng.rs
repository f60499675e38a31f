//! Deterministic random source shared by every stochastic decision.
//!
//! All draws go through one [`TreeRng`] that is passed explicitly, so a
//! generation run is reproducible from its seed alone and sub-sequences can
//! be replayed with [`TreeRng::save`] / [`TreeRng::restore`].

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Opaque snapshot of a [`TreeRng`] position in its stream.
#[derive(Clone, Debug)]
pub struct RngState(StdRng);

#[derive(Clone, Debug)]
pub struct TreeRng {
    inner: StdRng,
}

impl TreeRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform sample in `[0, 1)`.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.inner.random::<f32>()
    }

    /// Uniform sample between `low` and `high`.
    ///
    /// Always consumes exactly one draw. When `low == high` the result is
    /// exactly `low`, and reversed bounds are accepted.
    #[inline]
    pub fn uniform(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.random()
    }

    /// Uniform sample in `[centre - variation, centre + variation]`.
    #[inline]
    pub fn spread(&mut self, centre: f32, variation: f32) -> f32 {
        self.uniform(centre - variation, centre + variation)
    }

    pub fn save(&self) -> RngState {
        RngState(self.inner.clone())
    }

    pub fn restore(&mut self, state: &RngState) {
        self.inner = state.0.clone();
    }
}
