use crate::gradient::{gradient_noise_2d, gradient_noise_3d};

const LACUNARITY: f64 = 2.0;
const GAIN: f64 = 0.5;

/// Octave composition style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Fractal {
    #[default]
    Smooth,
    Ridged,
}

impl Fractal {
    #[inline]
    pub fn sample_2d(self, seed: u32, x: f64, z: f64, octaves: u32) -> f64 {
        match self {
            Fractal::Smooth => fbm_2d(seed, x, z, octaves),
            Fractal::Ridged => ridged_2d(seed, x, z, octaves),
        }
    }
}

#[inline]
fn accumulate(octaves: u32, mut sample: impl FnMut(f64) -> f64) -> f64 {
    if octaves == 0 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut norm = 0.0;
    let mut amp = 1.0;
    let mut freq = 1.0;
    for _ in 0..octaves {
        sum += amp * sample(freq);
        norm += amp;
        amp *= GAIN;
        freq *= LACUNARITY;
    }
    sum / norm
}

/// Octave sum normalised by total amplitude, so the result stays in `[-1, 1]`.
pub fn fbm_2d(seed: u32, x: f64, z: f64, octaves: u32) -> f64 {
    accumulate(octaves, |f| gradient_noise_2d(seed, x * f, z * f)).clamp(-1.0, 1.0)
}

pub fn fbm_3d(seed: u32, x: f64, y: f64, z: f64, octaves: u32) -> f64 {
    accumulate(octaves, |f| gradient_noise_3d(seed, x * f, y * f, z * f)).clamp(-1.0, 1.0)
}

/// Each octave is folded to `(1 - |n|)^2` before summing; the sum is remapped to `[-1, 1]`.
pub fn ridged_2d(seed: u32, x: f64, z: f64, octaves: u32) -> f64 {
    if octaves == 0 {
        return 0.0;
    }
    let r = accumulate(octaves, |f| {
        let n = 1.0 - gradient_noise_2d(seed, x * f, z * f).abs();
        n * n
    });
    (r * 2.0 - 1.0).clamp(-1.0, 1.0)
}
