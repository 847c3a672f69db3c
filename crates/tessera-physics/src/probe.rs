use tessera_geom::Vec3;
use tessera_world::HeightSampler;

/// Clearance kept above the surface when placing a body at spawn.
pub const SPAWN_LIFT: f64 = 2.0;

/// What the integrator needs to know about terrain that is not in the box set.
pub trait TerrainQuery {
    /// Height of `origin` above the surface straight below or above it;
    /// negative when the origin is under the surface. `None` when there is no
    /// surface to measure against.
    fn ground_distance(&self, origin: Vec3) -> Option<f64>;

    /// Safe position for fall recovery.
    fn spawn_point(&self) -> Vec3;
}

/// Heightfield terrain from a [`HeightSampler`]. In the voxel variant the
/// terrain lives in the box set instead, so only the spawn query is answered.
pub struct TerrainProbe<'a> {
    sampler: &'a HeightSampler,
    spawn_x: f64,
    spawn_z: f64,
}

impl<'a> TerrainProbe<'a> {
    pub fn new(sampler: &'a HeightSampler, spawn_x: f64, spawn_z: f64) -> Self {
        Self {
            sampler,
            spawn_x,
            spawn_z,
        }
    }

    /// Feet height for a body placed at `(x, z)`: above both ground and water.
    pub fn spawn_height(sampler: &HeightSampler, x: f64, z: f64) -> f64 {
        sampler.surface_top(x, z).max(sampler.sea_level()) + SPAWN_LIFT
    }
}

impl TerrainQuery for TerrainProbe<'_> {
    fn ground_distance(&self, origin: Vec3) -> Option<f64> {
        if self.sampler.is_voxelized() || !origin.is_finite() {
            return None;
        }
        Some(origin.y - self.sampler.surface_top(origin.x, origin.z))
    }

    fn spawn_point(&self) -> Vec3 {
        Vec3::new(
            self.spawn_x,
            Self::spawn_height(self.sampler, self.spawn_x, self.spawn_z),
            self.spawn_z,
        )
    }
}

/// No terrain at all; everything solid comes from boxes.
#[derive(Clone, Copy, Debug)]
pub struct OpenSpace {
    pub spawn: Vec3,
}

impl TerrainQuery for OpenSpace {
    fn ground_distance(&self, _origin: Vec3) -> Option<f64> {
        None
    }

    fn spawn_point(&self) -> Vec3 {
        self.spawn
    }
}
