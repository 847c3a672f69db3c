use tessera_chunk::{ChunkCoord, ChunkManager};
use tessera_geom::{Aabb, Vec3};

/// Smallest edge length accepted for a user block.
pub const MIN_USER_BLOCK: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AabbOwner {
    Static(usize),
    Chunk(ChunkCoord, usize),
    User(u64),
    Terrain(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldAabb {
    pub bounds: Aabb,
    pub owner: AabbOwner,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub distance: f64,
    pub point: Vec3,
    pub normal: Vec3,
    pub owner: AabbOwner,
}

/// Nearest box hit along `dir` within `max_distance`; ties keep the earlier box.
pub fn raycast_boxes(boxes: &[WorldAabb], origin: Vec3, dir: Vec3, max_distance: f64) -> Option<RayHit> {
    let dir = dir.normalized();
    if dir.length_sq() == 0.0 || !origin.is_finite() {
        return None;
    }
    let mut best: Option<RayHit> = None;
    for b in boxes {
        let Some((t, normal)) = b.bounds.ray_intersect(origin, dir) else {
            continue;
        };
        if t > max_distance {
            continue;
        }
        if best.map_or(true, |h| t < h.distance) {
            best = Some(RayHit {
                distance: t,
                point: origin + dir * t,
                normal,
                owner: b.owner,
            });
        }
    }
    best
}

/// The five stepping platforms placed in a fresh world, by bottom centre and size.
pub fn default_presets() -> Vec<Aabb> {
    [
        ((0.0, 0.1, -10.0), (6.0, 1.0, 6.0)),
        ((8.0, 1.0, -16.0), (4.0, 1.0, 4.0)),
        ((14.0, 2.0, -22.0), (4.0, 1.0, 4.0)),
        ((20.0, 3.0, -26.0), (4.0, 1.0, 4.0)),
        ((26.0, 5.0, -30.0), (6.0, 1.0, 6.0)),
    ]
    .into_iter()
    .map(|((x, y, z), (sx, sy, sz))| Aabb::from_base(Vec3::new(x, y, z), Vec3::new(sx, sy, sz)))
    .collect()
}

/// Flat collision set rebuilt wholesale from statics, chunk decoration, user
/// blocks and terrain voxels. The set is swapped in whole at the end of a
/// rebuild, so it is never observed half filled.
pub struct WorldGeometryRegistry {
    statics: Vec<Aabb>,
    user: Vec<(u64, Aabb)>,
    next_user_id: u64,
    terrain: Vec<Aabb>,
    boxes: Vec<WorldAabb>,
    dirty: bool,
    chunk_revision: Option<u64>,
    generation: u64,
}

impl Default for WorldGeometryRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl WorldGeometryRegistry {
    pub fn new(statics: Vec<Aabb>) -> Self {
        Self {
            statics,
            user: Vec::new(),
            next_user_id: 1,
            terrain: Vec::new(),
            boxes: Vec::new(),
            dirty: true,
            chunk_revision: None,
            generation: 0,
        }
    }

    /// Adds a user block centred on `center`; each edge is at least 0.25.
    pub fn add_user_block(&mut self, center: Vec3, size: Vec3) -> Option<u64> {
        if !center.is_finite() || !size.is_finite() {
            return None;
        }
        let size = Vec3::new(
            size.x.abs().max(MIN_USER_BLOCK),
            size.y.abs().max(MIN_USER_BLOCK),
            size.z.abs().max(MIN_USER_BLOCK),
        );
        let id = self.next_user_id;
        self.next_user_id += 1;
        self.user.push((id, Aabb::from_center(center, size)));
        self.dirty = true;
        Some(id)
    }

    pub fn clear_user_blocks(&mut self) -> usize {
        let n = self.user.len();
        self.user.clear();
        self.dirty |= n > 0;
        n
    }

    #[inline]
    pub fn user_block_count(&self) -> usize {
        self.user.len()
    }

    pub fn set_terrain_boxes(&mut self, terrain: Vec<Aabb>) {
        self.terrain = terrain;
        self.dirty = true;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True when a local mutation or a chunk load/unload happened since the last rebuild.
    pub fn is_stale(&self, chunks: &ChunkManager) -> bool {
        self.dirty || self.chunk_revision != Some(chunks.revision())
    }

    pub fn rebuild(&mut self, chunks: &ChunkManager) {
        let deco = chunks.decoration_boxes();
        let mut out =
            Vec::with_capacity(self.statics.len() + deco.len() + self.user.len() + self.terrain.len());
        out.extend(self.statics.iter().enumerate().map(|(i, b)| WorldAabb {
            bounds: *b,
            owner: AabbOwner::Static(i),
        }));
        out.extend(deco.into_iter().map(|(c, i, b)| WorldAabb {
            bounds: b,
            owner: AabbOwner::Chunk(c, i),
        }));
        out.extend(self.user.iter().map(|(id, b)| WorldAabb {
            bounds: *b,
            owner: AabbOwner::User(*id),
        }));
        out.extend(self.terrain.iter().enumerate().map(|(i, b)| WorldAabb {
            bounds: *b,
            owner: AabbOwner::Terrain(i),
        }));
        self.boxes = out;
        self.dirty = false;
        self.chunk_revision = Some(chunks.revision());
        self.generation += 1;
        log::trace!("collision set rebuilt: {} boxes (gen {})", self.boxes.len(), self.generation);
    }

    /// The current set. Querying after a mutation without a rebuild is a bug.
    pub fn query(&self) -> &[WorldAabb] {
        debug_assert!(!self.dirty, "collision set queried before rebuild");
        &self.boxes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f64) -> Option<RayHit> {
        raycast_boxes(self.query(), origin, dir, max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use tessera_chunk::{ScatterBlocks, StreamConfig};

    fn chunks() -> ChunkManager {
        ChunkManager::new(StreamConfig::default(), StdArc::new(ScatterBlocks::default()))
    }

    #[test]
    fn presets_sit_on_their_bases() {
        let p = default_presets();
        assert_eq!(p.len(), 5);
        assert_eq!(p[0].min, Vec3::new(-3.0, 0.1, -13.0));
        assert_eq!(p[4].max.y, 6.0);
    }

    #[test]
    fn rebuild_orders_by_provenance() {
        let cm = chunks();
        let mut r = WorldGeometryRegistry::new(default_presets());
        let id = r.add_user_block(Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 1.0, 1.0)).unwrap();
        r.set_terrain_boxes(vec![Aabb::new(Vec3::ZERO, Vec3::new(4.0, 4.0, 4.0))]);
        assert!(r.is_dirty());
        r.rebuild(&cm);
        let q = r.query();
        assert_eq!(q.len(), 7);
        assert_eq!(q[0].owner, AabbOwner::Static(0));
        assert_eq!(q[5].owner, AabbOwner::User(id));
        assert_eq!(q[6].owner, AabbOwner::Terrain(0));
        assert!(!r.is_stale(&cm));
    }

    #[test]
    fn user_block_size_is_clamped() {
        let mut r = WorldGeometryRegistry::default();
        r.add_user_block(Vec3::ZERO, Vec3::new(0.01, 2.0, -0.1)).unwrap();
        r.rebuild(&chunks());
        let s = r.query()[0].bounds.size();
        assert_eq!(s, Vec3::new(0.25, 2.0, 0.25));
        assert!(r.add_user_block(Vec3::new(f64::NAN, 0.0, 0.0), Vec3::ZERO).is_none());
    }

    #[test]
    fn clear_marks_dirty_only_when_something_went() {
        let mut r = WorldGeometryRegistry::default();
        r.rebuild(&chunks());
        assert_eq!(r.clear_user_blocks(), 0);
        assert!(!r.is_dirty());
        r.add_user_block(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
        r.rebuild(&chunks());
        assert_eq!(r.clear_user_blocks(), 1);
        assert!(r.is_dirty());
    }

    #[test]
    fn raycast_reports_nearest_owner() {
        let mut r = WorldGeometryRegistry::new(vec![
            Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 1.0, 1.0)),
            Aabb::new(Vec3::new(-1.0, 3.0, -1.0), Vec3::new(1.0, 4.0, 1.0)),
        ]);
        r.rebuild(&chunks());
        let hit = r.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::DOWN, 100.0).unwrap();
        assert_eq!(hit.owner, AabbOwner::Static(1));
        assert!((hit.distance - 6.0).abs() < 1e-12);
        assert!(r.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::DOWN, 5.0).is_none());
    }
}
