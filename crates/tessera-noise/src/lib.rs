//! Seeded gradient noise and fractal sums. Pure functions of (seed, coordinate).
#![forbid(unsafe_code)]

mod fractal;
mod gradient;
mod rng;

pub use fractal::{Fractal, fbm_2d, fbm_3d, ridged_2d};
pub use gradient::{cell_hash_2d, cell_hash_3d, gradient_noise_2d, gradient_noise_3d};
pub use rng::Mulberry32;

pub const DEFAULT_OCTAVES_2D: u32 = 6;
pub const DEFAULT_OCTAVES_3D: u32 = 4;

/// A seed bundled with the noise entry points so call sites don't thread it by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NoiseField {
    pub seed: u32,
}

impl NoiseField {
    #[inline]
    pub const fn new(seed: u32) -> Self {
        Self { seed }
    }

    #[inline]
    pub fn noise_2d(&self, x: f64, z: f64) -> f64 {
        gradient_noise_2d(self.seed, x, z)
    }

    #[inline]
    pub fn fbm_2d(&self, x: f64, z: f64, octaves: u32) -> f64 {
        fbm_2d(self.seed, x, z, octaves)
    }

    #[inline]
    pub fn fbm_3d(&self, x: f64, y: f64, z: f64, octaves: u32) -> f64 {
        fbm_3d(self.seed, x, y, z, octaves)
    }
}
