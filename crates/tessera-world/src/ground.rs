use crate::config::GroundConfig;
use crate::sampler::{HeightSampler, SurfaceKind};
use tessera_geom::{Aabb, Vec3};

/// Vertex heights for a square ground mesh, row-major in Z then X.
#[derive(Clone, Debug)]
pub struct GroundGrid {
    pub origin_x: f64,
    pub origin_z: f64,
    pub spacing: f64,
    pub segments: usize,
    pub heights: Vec<f64>,
    pub surfaces: Vec<SurfaceKind>,
}

impl GroundGrid {
    #[inline]
    pub fn verts_per_side(&self) -> usize {
        self.segments + 1
    }

    #[inline]
    pub fn height(&self, ix: usize, iz: usize) -> Option<f64> {
        let n = self.verts_per_side();
        if ix >= n || iz >= n {
            return None;
        }
        self.heights.get(iz * n + ix).copied()
    }
}

/// The square of terrain kept around the player, with floating-origin recentering.
#[derive(Clone, Debug)]
pub struct GroundWindow {
    center_x: f64,
    center_z: f64,
    size: f64,
    cfg: GroundConfig,
}

impl GroundWindow {
    pub fn new(cfg: GroundConfig, size: f64) -> Self {
        let mut w = Self {
            center_x: 0.0,
            center_z: 0.0,
            size: 0.0,
            cfg: cfg.sanitized(),
        };
        w.set_size(size);
        w
    }

    /// Side length that covers the streamed chunk square plus one chunk of margin.
    #[inline]
    pub fn size_for_view(view_distance: u32, chunk_size: u32) -> f64 {
        (f64::from(view_distance) * 2.0 + 2.0) * f64::from(chunk_size)
    }

    #[inline]
    pub fn max_size(&self) -> f64 {
        self.cfg.grid_step * self.cfg.max_segments as f64
    }

    #[inline]
    pub fn config(&self) -> &GroundConfig {
        &self.cfg
    }

    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_z)
    }

    #[inline]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Returns true when the clamped size actually changed.
    pub fn set_size(&mut self, size: f64) -> bool {
        let size = if size.is_finite() { size } else { self.max_size() };
        let size = size.clamp(self.cfg.grid_step, self.max_size());
        if size == self.size {
            return false;
        }
        self.size = size;
        true
    }

    pub fn segments(&self) -> usize {
        let seg = (self.size / self.cfg.grid_step).floor() as usize;
        seg.clamp(1, self.cfg.max_segments)
    }

    #[inline]
    pub fn recenter_threshold(&self) -> f64 {
        self.size * self.cfg.recenter_fraction
    }

    /// Shifts the centre by whole thresholds when the player strays past one on
    /// either axis. Returns the applied `(dx, dz)`; the sampler cache is dropped
    /// whenever the origin moves.
    pub fn maybe_recenter(&mut self, px: f64, pz: f64, sampler: &HeightSampler) -> Option<(f64, f64)> {
        if !px.is_finite() || !pz.is_finite() {
            return None;
        }
        let threshold = self.recenter_threshold();
        let dx = px - self.center_x;
        let dz = pz - self.center_z;
        let shift_x = if dx.abs() > threshold { dx.signum() * threshold } else { 0.0 };
        let shift_z = if dz.abs() > threshold { dz.signum() * threshold } else { 0.0 };
        if shift_x == 0.0 && shift_z == 0.0 {
            return None;
        }
        self.center_x += shift_x;
        self.center_z += shift_z;
        sampler.invalidate_cache();
        log::debug!(
            "ground recentered by ({:.1}, {:.1}) to ({:.1}, {:.1})",
            shift_x,
            shift_z,
            self.center_x,
            self.center_z
        );
        Some((shift_x, shift_z))
    }

    pub fn height_grid(&self, sampler: &HeightSampler) -> GroundGrid {
        let segments = self.segments();
        let spacing = self.size / segments as f64;
        let origin_x = self.center_x - self.size * 0.5;
        let origin_z = self.center_z - self.size * 0.5;
        let n = segments + 1;
        let mut heights = Vec::with_capacity(n * n);
        let mut surfaces = Vec::with_capacity(n * n);
        for iz in 0..n {
            let wz = origin_z + iz as f64 * spacing;
            for ix in 0..n {
                let wx = origin_x + ix as f64 * spacing;
                let s = sampler.surface_at(wx, wz, &self.cfg);
                heights.push(s.height);
                surfaces.push(s.kind);
            }
        }
        GroundGrid {
            origin_x,
            origin_z,
            spacing,
            segments,
            heights,
            surfaces,
        }
    }

    /// Solid voxels with at least one open face, in the voxel variant only.
    /// Columns are world-aligned to the voxel size; cells outside the window
    /// count as solid.
    pub fn voxel_boxes(&self, sampler: &HeightSampler) -> Vec<Aabb> {
        if !sampler.is_voxelized() {
            return Vec::new();
        }
        let step = sampler.voxel_size();
        let col = &sampler.config().column;
        let half = self.cfg.voxel_extent.min(self.size) * 0.5;
        let x0 = ((self.center_x - half) / step).floor() as i64;
        let x1 = ((self.center_x + half) / step).ceil() as i64;
        let z0 = ((self.center_z - half) / step).floor() as i64;
        let z1 = ((self.center_z + half) / step).ceil() as i64;
        let nx = (x1 - x0).max(0) as usize;
        let nz = (z1 - z0).max(0) as usize;
        let ny = ((col.top - col.bottom) / step).floor().max(0.0) as usize;
        let ys: Vec<f64> = (0..ny).map(|j| col.bottom + j as f64 * step).collect();

        let mut solid = vec![false; nx * nz * ny];
        let mut column = Vec::with_capacity(ny);
        for iz in 0..nz {
            for ix in 0..nx {
                let wx = (x0 + ix as i64) as f64 * step;
                let wz = (z0 + iz as i64) as f64 * step;
                sampler.column_densities(wx, wz, &ys, &mut column);
                let base = (iz * nx + ix) * ny;
                solid[base..base + ny].copy_from_slice(&column);
            }
        }

        let at = |ix: i64, iy: i64, iz: i64| -> bool {
            if ix < 0 || iz < 0 || iy < 0 || ix >= nx as i64 || iz >= nz as i64 {
                return true;
            }
            if iy >= ny as i64 {
                return false;
            }
            solid[((iz as usize) * nx + ix as usize) * ny + iy as usize]
        };

        let mut out = Vec::new();
        for iz in 0..nz as i64 {
            for ix in 0..nx as i64 {
                for iy in 0..ny as i64 {
                    if !at(ix, iy, iz) {
                        continue;
                    }
                    let exposed = !at(ix, iy + 1, iz)
                        || !at(ix + 1, iy, iz)
                        || !at(ix - 1, iy, iz)
                        || !at(ix, iy, iz + 1)
                        || !at(ix, iy, iz - 1);
                    if !exposed {
                        continue;
                    }
                    let min = Vec3::new(
                        (x0 + ix) as f64 * step,
                        ys[iy as usize],
                        (z0 + iz) as f64 * step,
                    );
                    out.push(Aabb::new(min, min + Vec3::new(step, step, step)));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;

    fn sampler() -> HeightSampler {
        HeightSampler::new(TerrainConfig::default())
    }

    #[test]
    fn size_is_clamped() {
        let mut w = GroundWindow::new(GroundConfig::default(), 800.0);
        assert_eq!(w.size(), 800.0);
        w.set_size(1.0e9);
        assert_eq!(w.size(), 2048.0);
        w.set_size(0.0);
        assert_eq!(w.size(), 2.0);
        assert_eq!(w.segments(), 1);
    }

    #[test]
    fn recenter_moves_in_threshold_steps() {
        let s = sampler();
        let mut w = GroundWindow::new(GroundConfig::default(), 400.0);
        assert_eq!(w.maybe_recenter(39.0, 0.0, &s), None);
        assert_eq!(w.maybe_recenter(41.0, -100.0, &s), Some((40.0, -40.0)));
        assert_eq!(w.center(), (40.0, -40.0));
    }

    #[test]
    fn grid_has_expected_vertex_count() {
        let s = sampler();
        let w = GroundWindow::new(GroundConfig::default(), 64.0);
        let g = w.height_grid(&s);
        assert_eq!(g.segments, 32);
        assert_eq!(g.heights.len(), 33 * 33);
        assert_eq!(g.height(0, 0), Some(s.height_at(-32.0, -32.0)));
        assert_eq!(g.height(33, 0), None);
    }

    #[test]
    fn heightmap_mode_has_no_voxels() {
        let s = sampler();
        let w = GroundWindow::new(GroundConfig::default(), 64.0);
        assert!(w.voxel_boxes(&s).is_empty());
    }
}
