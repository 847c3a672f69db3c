use crate::rng::Mulberry32;
use core::f64::consts::TAU;

const PRIME_X: u32 = 73_856_093;
const PRIME_Y: u32 = 19_349_663;
const PRIME_Z: u32 = 83_492_791;

#[inline]
fn lattice(v: f64) -> (i64, f64) {
    let f = v.floor();
    (f as i64, v - f)
}

/// `seed ^ hash(ix) ^ hash(iz)` with wrapping arithmetic.
#[inline]
pub fn cell_hash_2d(seed: u32, ix: i64, iz: i64) -> u32 {
    seed ^ (ix as u32).wrapping_mul(PRIME_X) ^ (iz as u32).wrapping_mul(PRIME_Y)
}

#[inline]
pub fn cell_hash_3d(seed: u32, ix: i64, iy: i64, iz: i64) -> u32 {
    seed ^ (ix as u32).wrapping_mul(PRIME_X)
        ^ (iy as u32).wrapping_mul(PRIME_Y)
        ^ (iz as u32).wrapping_mul(PRIME_Z)
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[inline]
fn grad_2d(seed: u32, ix: i64, iz: i64) -> (f64, f64) {
    let angle = Mulberry32::new(cell_hash_2d(seed, ix, iz)).next_f64() * TAU;
    (angle.cos(), angle.sin())
}

#[inline]
fn grad_3d(seed: u32, ix: i64, iy: i64, iz: i64) -> (f64, f64, f64) {
    let r = Mulberry32::new(cell_hash_3d(seed, ix, iy, iz)).next_f64() * TAU;
    let (gx, gy, gz) = (r.cos(), (r * 1.3).sin(), (r * 0.7).cos());
    let len = (gx * gx + gy * gy + gz * gz).sqrt();
    if len > 1e-9 {
        (gx / len, gy / len, gz / len)
    } else {
        (1.0, 0.0, 0.0)
    }
}

/// Gradient noise in `[-1, 1]`; zero on integer lattice points. Non-finite input yields 0.
pub fn gradient_noise_2d(seed: u32, x: f64, z: f64) -> f64 {
    if !x.is_finite() || !z.is_finite() {
        return 0.0;
    }
    let (ix, fx) = lattice(x);
    let (iz, fz) = lattice(z);
    let corner = |dx: i64, dz: i64| {
        let (gx, gz) = grad_2d(seed, ix.wrapping_add(dx), iz.wrapping_add(dz));
        gx * (fx - dx as f64) + gz * (fz - dz as f64)
    };
    let u = fade(fx);
    let v = fade(fz);
    let a = lerp(corner(0, 0), corner(1, 0), u);
    let b = lerp(corner(0, 1), corner(1, 1), u);
    lerp(a, b, v).clamp(-1.0, 1.0)
}

pub fn gradient_noise_3d(seed: u32, x: f64, y: f64, z: f64) -> f64 {
    if !x.is_finite() || !y.is_finite() || !z.is_finite() {
        return 0.0;
    }
    let (ix, fx) = lattice(x);
    let (iy, fy) = lattice(y);
    let (iz, fz) = lattice(z);
    let corner = |dx: i64, dy: i64, dz: i64| {
        let (gx, gy, gz) = grad_3d(
            seed,
            ix.wrapping_add(dx),
            iy.wrapping_add(dy),
            iz.wrapping_add(dz),
        );
        gx * (fx - dx as f64) + gy * (fy - dy as f64) + gz * (fz - dz as f64)
    };
    let u = fade(fx);
    let v = fade(fy);
    let w = fade(fz);
    let x00 = lerp(corner(0, 0, 0), corner(1, 0, 0), u);
    let x10 = lerp(corner(0, 1, 0), corner(1, 1, 0), u);
    let x01 = lerp(corner(0, 0, 1), corner(1, 0, 1), u);
    let x11 = lerp(corner(0, 1, 1), corner(1, 1, 1), u);
    let y0 = lerp(x00, x10, v);
    let y1 = lerp(x01, x11, v);
    lerp(y0, y1, w).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_on_lattice() {
        for ix in -4..4 {
            for iz in -4..4 {
                assert_eq!(gradient_noise_2d(9, ix as f64, iz as f64), 0.0);
                assert_eq!(gradient_noise_3d(9, ix as f64, 2.0, iz as f64), 0.0);
            }
        }
    }

    #[test]
    fn non_finite_is_zero() {
        assert_eq!(gradient_noise_2d(1, f64::NAN, 0.5), 0.0);
        assert_eq!(gradient_noise_2d(1, 0.5, f64::INFINITY), 0.0);
        assert_eq!(gradient_noise_3d(1, 0.5, f64::NEG_INFINITY, 0.5), 0.0);
    }

    #[test]
    fn continuous_across_cell_edge() {
        let eps = 1e-7;
        let a = gradient_noise_2d(3, 5.0 - eps, 2.3);
        let b = gradient_noise_2d(3, 5.0 + eps, 2.3);
        assert!((a - b).abs() < 1e-5);
    }

    #[test]
    fn seed_changes_output() {
        let pts = [(0.37, 0.81), (12.5, -3.25), (-7.1, 4.9), (100.3, 200.7)];
        let differs = pts
            .iter()
            .any(|&(x, z)| gradient_noise_2d(1, x, z) != gradient_noise_2d(2, x, z));
        assert!(differs);
    }

    #[test]
    fn huge_coordinates_stay_finite() {
        let v = gradient_noise_2d(5, 1.0e15 + 0.5, -3.0e12 + 0.25);
        assert!(v.is_finite());
        let w = gradient_noise_3d(5, 1.0e15, 2.0e14 + 0.5, -9.0e13);
        assert!(w.is_finite());
    }
}
