use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// Floor division of a world position by the chunk size.
    #[inline]
    pub fn from_world(x: f64, z: f64, chunk_size: u32) -> Self {
        let s = f64::from(chunk_size.max(1));
        Self {
            cx: (x / s).floor() as i32,
            cz: (z / s).floor() as i32,
        }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx.saturating_add(dx),
            cz: self.cz.saturating_add(dz),
        }
    }

    /// Grid distance; the streaming window is a square.
    #[inline]
    pub fn chebyshev(self, other: ChunkCoord) -> u32 {
        let dx = (i64::from(self.cx) - i64::from(other.cx)).unsigned_abs();
        let dz = (i64::from(self.cz) - i64::from(other.cz)).unsigned_abs();
        dx.max(dz).min(u64::from(u32::MAX)) as u32
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx) - i64::from(other.cx);
        let dz = i64::from(self.cz) - i64::from(other.cz);
        dx * dx + dz * dz
    }

    /// World-space minimum corner.
    #[inline]
    pub fn origin(self, chunk_size: u32) -> (f64, f64) {
        let s = f64::from(chunk_size);
        (f64::from(self.cx) * s, f64::from(self.cz) * s)
    }

    #[inline]
    pub fn center(self, chunk_size: u32) -> (f64, f64) {
        let (x, z) = self.origin(chunk_size);
        let h = f64::from(chunk_size) * 0.5;
        (x + h, z + h)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.cx, self.cz)
    }
}
