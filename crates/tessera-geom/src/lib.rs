//! Minimal geometry types for the terrain and collision crates (no engine dependency).
#![forbid(unsafe_code)]

use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const UP: Vec3 = Vec3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    pub const DOWN: Vec3 = Vec3 {
        x: 0.0,
        y: -1.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(self, rhs: Vec3) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline]
    pub fn cross(self, rhs: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn length_sq(self) -> f64 {
        self.dot(self)
    }

    #[inline]
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len > 0.0 { self / len } else { self }
    }

    /// Projection onto the XZ plane.
    #[inline]
    pub fn horizontal(self) -> Vec3 {
        Vec3::new(self.x, 0.0, self.z)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec3) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    #[inline]
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn div(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of `size` whose bottom face is centred on `base`.
    #[inline]
    pub fn from_base(base: Vec3, size: Vec3) -> Self {
        let hx = size.x * 0.5;
        let hz = size.z * 0.5;
        Self {
            min: Vec3::new(base.x - hx, base.y, base.z - hz),
            max: Vec3::new(base.x + hx, base.y + size.y, base.z + hz),
        }
    }

    #[inline]
    pub fn from_center(center: Vec3, size: Vec3) -> Self {
        let h = size * 0.5;
        Self {
            min: center - h,
            max: center + h,
        }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    #[inline]
    pub fn translated(&self, by: Vec3) -> Aabb {
        Aabb::new(self.min + by, self.max + by)
    }

    /// Grows the box by `r` on X and Z only.
    #[inline]
    pub fn inflated_xz(&self, r: f64) -> Aabb {
        Aabb::new(
            Vec3::new(self.min.x - r, self.min.y, self.min.z - r),
            Vec3::new(self.max.x + r, self.max.y, self.max.z + r),
        )
    }

    /// Inclusive XZ containment.
    #[inline]
    pub fn contains_xz(&self, x: f64, z: f64) -> bool {
        x >= self.min.x && x <= self.max.x && z >= self.min.z && z <= self.max.z
    }

    /// Strict XZ containment (boundary excluded).
    #[inline]
    pub fn contains_xz_strict(&self, x: f64, z: f64) -> bool {
        x > self.min.x && x < self.max.x && z > self.min.z && z < self.max.z
    }

    /// True when the vertical span `[lo, hi]` overlaps the box by more than `eps` on both ends.
    #[inline]
    pub fn overlaps_y(&self, lo: f64, hi: f64, eps: f64) -> bool {
        !(lo >= self.max.y - eps || hi <= self.min.y + eps)
    }

    /// Slab test. Returns the entry distance along `dir` (not necessarily unit) and the
    /// outward normal of the entered face. Rays starting inside report no hit.
    pub fn ray_intersect(&self, origin: Vec3, dir: Vec3) -> Option<(f64, Vec3)> {
        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;
        let mut normal = Vec3::ZERO;
        let axes = [
            (origin.x, dir.x, self.min.x, self.max.x, Vec3::new(1.0, 0.0, 0.0)),
            (origin.y, dir.y, self.min.y, self.max.y, Vec3::UP),
            (origin.z, dir.z, self.min.z, self.max.z, Vec3::new(0.0, 0.0, 1.0)),
        ];
        for (o, d, lo, hi, axis) in axes {
            if d.abs() < 1e-12 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
            let mut face = -axis;
            if t0 > t1 {
                core::mem::swap(&mut t0, &mut t1);
                face = axis;
            }
            if t0 > t_near {
                t_near = t0;
                normal = face;
            }
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }
        if t_near < 0.0 {
            return None;
        }
        Some((t_near, normal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_top_face_from_above() {
        let b = Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
        let (t, n) = b
            .ray_intersect(Vec3::new(0.0, 5.0, 0.0), Vec3::DOWN)
            .unwrap();
        assert!((t - 3.0).abs() < 1e-12);
        assert_eq!(n, Vec3::UP);
    }

    #[test]
    fn ray_from_inside_misses() {
        let b = Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
        assert!(b.ray_intersect(Vec3::new(0.0, 1.0, 0.0), Vec3::DOWN).is_none());
    }

    #[test]
    fn ray_side_face_normal() {
        let b = Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
        let (t, n) = b
            .ray_intersect(Vec3::new(-4.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0))
            .unwrap();
        assert!((t - 3.0).abs() < 1e-12);
        assert_eq!(n, Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn from_base_sits_on_base() {
        let b = Aabb::from_base(Vec3::new(8.0, 1.0, -16.0), Vec3::new(4.0, 1.0, 4.0));
        assert_eq!(b.min, Vec3::new(6.0, 1.0, -18.0));
        assert_eq!(b.max, Vec3::new(10.0, 2.0, -14.0));
    }
}
