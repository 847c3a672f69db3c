use crate::cache::{HeightCache, HeightCacheStats, quantize};
use crate::config::{Channel, GroundConfig, TerrainConfig, TerrainType};
use tessera_geom::Vec3;
use tessera_noise::{Mulberry32, NoiseField};

const LAYER_SALT: u32 = 0x9E37_79B9;
const CHANNEL_SALT: u32 = 0x85EB_CA6B;
const CAVE_SALT: u32 = 0xC2B2_AE35;
const RAY_STEP: f64 = 0.5;
const RAY_BISECT_ITERS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceFeature {
    Road,
    River,
    Ground,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    SeaFloor,
    Beach,
    Grass,
    Rock,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    pub kind: SurfaceKind,
    pub height: f64,
    pub slope: f64,
    /// 0 = grass, 1 = bare rock.
    pub rock_mix: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainHit {
    pub distance: f64,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Seed-derived shift in noise space. Gradient noise is zero on the integer
/// lattice for every seed, so sample origins are moved to a fractional offset
/// that differs per seed and per salt.
fn lattice_offset(seed: u32, salt: u32) -> (f64, f64) {
    let mut rng = Mulberry32::new(seed ^ salt);
    let mut axis = || f64::from(rng.next_u32() % 4096) + rng.range(0.25, 0.75);
    let ox = axis();
    let oz = axis();
    (ox, oz)
}

/// Terrain height and density as a pure function of the owned [`TerrainConfig`].
pub struct HeightSampler {
    config: TerrainConfig,
    noise: NoiseField,
    fingerprint: u64,
    cache: HeightCache,
}

impl HeightSampler {
    pub fn new(config: TerrainConfig) -> Self {
        Self::with_cache_capacity(config, GroundConfig::default().cache_capacity)
    }

    pub fn with_cache_capacity(config: TerrainConfig, capacity: usize) -> Self {
        let config = config.sanitized();
        let fingerprint = config.fingerprint();
        Self {
            noise: NoiseField::new(config.seed),
            cache: HeightCache::new(capacity, fingerprint),
            fingerprint,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    #[inline]
    pub fn seed(&self) -> u32 {
        self.config.seed
    }

    #[inline]
    pub fn sea_level(&self) -> f64 {
        self.config.sea_level
    }

    #[inline]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// True when heights come from the density column scan.
    #[inline]
    pub fn is_voxelized(&self) -> bool {
        self.config.caves.enable
    }

    #[inline]
    pub fn voxel_size(&self) -> f64 {
        self.config.column.step
    }

    /// Swaps the whole config; the height cache is always dropped.
    pub fn set_config(&mut self, config: TerrainConfig) {
        self.config = config.sanitized();
        self.noise = NoiseField::new(self.config.seed);
        self.fingerprint = self.config.fingerprint();
        self.cache.invalidate(self.fingerprint);
        log::debug!(
            "terrain config applied: seed={} type={:?} mountain={} valley={} sea={}",
            self.config.seed,
            self.config.terrain_type,
            self.config.mountain_amplitude,
            self.config.valley_amplitude,
            self.config.sea_level
        );
    }

    pub fn set_seed(&mut self, seed: u32) {
        let mut cfg = self.config.clone();
        cfg.seed = seed;
        self.set_config(cfg);
    }

    pub fn set_amplitudes(&mut self, mountain: f64, valley: f64) {
        let mut cfg = self.config.clone();
        cfg.mountain_amplitude = mountain;
        cfg.valley_amplitude = valley;
        self.set_config(cfg);
    }

    pub fn set_terrain_type(&mut self, kind: TerrainType) {
        let mut cfg = self.config.clone();
        cfg.terrain_type = kind;
        self.set_config(cfg);
    }

    pub fn set_sea_level(&mut self, level: f64) {
        let mut cfg = self.config.clone();
        cfg.sea_level = level;
        self.set_config(cfg);
    }

    /// Drops cached samples without changing the config (origin shifts, resizes).
    pub fn invalidate_cache(&self) {
        self.cache.invalidate(self.fingerprint);
    }

    pub fn cache_stats(&self) -> HeightCacheStats {
        self.cache.snapshot()
    }

    /// Weighted blend of the configured layers, in `[-1, 1]`.
    pub fn blended_noise(&self, x: f64, z: f64) -> f64 {
        let fractal = self.config.terrain_type.fractal();
        let mut sum = 0.0;
        let mut weight = 0.0;
        for (i, layer) in self.config.layers.iter().enumerate() {
            let salt = LAYER_SALT.wrapping_mul(i as u32 + 1);
            let seed = self.config.seed.wrapping_add(salt);
            let (ox, oz) = lattice_offset(self.config.seed, salt);
            let n = fractal.sample_2d(
                seed,
                x * layer.frequency + ox,
                z * layer.frequency + oz,
                layer.octaves,
            );
            sum += n * layer.weight;
            weight += layer.weight;
        }
        if weight > 0.0 { (sum / weight).clamp(-1.0, 1.0) } else { 0.0 }
    }

    /// Sharp peaks, gentle valleys.
    pub fn hill_valley(&self, x: f64, z: f64) -> f64 {
        let n = self.blended_noise(x, z);
        let mountain = n.max(0.0).powi(3) * self.config.mountain_amplitude;
        let valley = -(-n).max(0.0).powi(2) * self.config.valley_amplitude;
        mountain + valley
    }

    #[inline]
    fn channel_depth(&self, c: &Channel, x: f64, z: f64) -> f64 {
        if !c.enable {
            return 0.0;
        }
        let (ox, oz) = lattice_offset(self.config.seed, CHANNEL_SALT);
        let r = self
            .noise
            .noise_2d((x + c.offset_x) * c.frequency + ox, (z + c.offset_z) * c.frequency + oz)
            .abs();
        (c.threshold - r).max(0.0) * c.depth_scale
    }

    pub fn river_depth(&self, x: f64, z: f64) -> f64 {
        self.channel_depth(&self.config.rivers, x, z)
    }

    pub fn road_depth(&self, x: f64, z: f64) -> f64 {
        self.channel_depth(&self.config.roads, x, z)
    }

    /// Heightmap elevation before any cave term.
    pub fn base_height(&self, x: f64, z: f64) -> f64 {
        self.hill_valley(x, z) - self.river_depth(x, z) - self.road_depth(x, z)
            + self.config.base_offset
    }

    #[inline]
    fn density_with_base(&self, base: f64, x: f64, y: f64, z: f64) -> f64 {
        let caves = &self.config.caves;
        let f = caves.frequency;
        let cave = if caves.enable {
            let (ox, oz) = lattice_offset(self.config.seed, CAVE_SALT);
            self.noise.fbm_3d(x * f + ox, y * f, z * f + oz, caves.octaves) * caves.amplitude
        } else {
            0.0
        };
        base + cave - y
    }

    /// Positive inside solid material.
    pub fn density_at(&self, x: f64, y: f64, z: f64) -> f64 {
        self.density_with_base(self.base_height(x, z), x, y, z)
    }

    pub(crate) fn column_densities(&self, x: f64, z: f64, ys: &[f64], out: &mut Vec<bool>) {
        let base = self.base_height(x, z);
        out.clear();
        out.extend(ys.iter().map(|&y| self.density_with_base(base, x, y, z) > 0.0));
    }

    fn compute_height(&self, x: f64, z: f64) -> f64 {
        if !self.config.caves.enable {
            return self.base_height(x, z);
        }
        let col = &self.config.column;
        let base = self.base_height(x, z);
        let steps = ((col.top - col.bottom) / col.step).floor() as i64;
        for i in 0..=steps {
            let y = col.top - i as f64 * col.step;
            if self.density_with_base(base, x, y, z) > 0.0 {
                return y;
            }
        }
        col.bottom
    }

    /// Surface elevation. In the voxel variant this is the base of the topmost
    /// solid voxel, or the column floor when the column is empty.
    pub fn height_at(&self, x: f64, z: f64) -> f64 {
        let Some(key) = quantize(x, z) else {
            return self.compute_height(x, z);
        };
        if let Some(h) = self.cache.get(key, self.fingerprint) {
            return h;
        }
        let h = self.compute_height(x, z);
        self.cache.insert(key, h, self.fingerprint);
        h
    }

    /// Height a body can stand on. Voxel columns are world-aligned, so the
    /// sample snaps to the column origin and reports the voxel's top face.
    pub fn surface_top(&self, x: f64, z: f64) -> f64 {
        if !self.is_voxelized() {
            return self.height_at(x, z);
        }
        let s = self.voxel_size();
        let cx = (x / s).floor() * s;
        let cz = (z / s).floor() * s;
        self.height_at(cx, cz) + s
    }

    pub fn feature_at(&self, x: f64, z: f64) -> SurfaceFeature {
        if self.road_depth(x, z) > 0.0 {
            SurfaceFeature::Road
        } else if self.river_depth(x, z) > 0.0 {
            SurfaceFeature::River
        } else {
            SurfaceFeature::Ground
        }
    }

    pub fn surface_at(&self, x: f64, z: f64, ground: &GroundConfig) -> SurfaceSample {
        let h = self.height_at(x, z);
        let step = ground.grid_step;
        let hdx = self.height_at(x + step, z);
        let hdz = self.height_at(x, z + step);
        let slope = ((h - hdx).abs() + (h - hdz).abs()) / step;
        let sea = self.config.sea_level;
        let (kind, rock_mix) = if h < sea {
            (SurfaceKind::SeaFloor, 0.0)
        } else if h < sea + ground.beach_height {
            (SurfaceKind::Beach, 0.0)
        } else {
            let mix = ((slope - ground.rock_slope_start) / ground.rock_slope_range).clamp(0.0, 1.0);
            let kind = if mix >= 0.5 {
                SurfaceKind::Rock
            } else {
                SurfaceKind::Grass
            };
            (kind, mix)
        };
        SurfaceSample {
            kind,
            height: h,
            slope,
            rock_mix,
        }
    }

    fn surface_normal(&self, x: f64, z: f64) -> Vec3 {
        if self.is_voxelized() {
            return Vec3::UP;
        }
        let e = 0.5;
        let dhdx = (self.height_at(x + e, z) - self.height_at(x - e, z)) / (2.0 * e);
        let dhdz = (self.height_at(x, z + e) - self.height_at(x, z - e)) / (2.0 * e);
        Vec3::new(-dhdx, 1.0, -dhdz).normalized()
    }

    /// Marches along the ray in fixed steps, then bisects the first crossing.
    /// Rays starting below the surface report no hit.
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f64) -> Option<TerrainHit> {
        let dir = dir.normalized();
        if !origin.is_finite() || !dir.is_finite() || dir.length_sq() == 0.0 {
            return None;
        }
        if !(max_distance.is_finite() && max_distance > 0.0) {
            return None;
        }
        let clearance = |t: f64| {
            let p = origin + dir * t;
            p.y - self.surface_top(p.x, p.z)
        };
        if clearance(0.0) < 0.0 {
            return None;
        }
        let mut t0 = 0.0;
        while t0 < max_distance {
            let t1 = (t0 + RAY_STEP).min(max_distance);
            if clearance(t1) <= 0.0 {
                let (mut lo, mut hi) = (t0, t1);
                for _ in 0..RAY_BISECT_ITERS {
                    let mid = 0.5 * (lo + hi);
                    if clearance(mid) <= 0.0 {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }
                let point = origin + dir * hi;
                return Some(TerrainHit {
                    distance: hi,
                    point,
                    normal: self.surface_normal(point.x, point.z),
                });
            }
            t0 = t1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_config() -> TerrainConfig {
        let mut cfg = TerrainConfig::default();
        cfg.mountain_amplitude = 0.0;
        cfg.valley_amplitude = 0.0;
        cfg.rivers.enable = false;
        cfg.roads.enable = false;
        cfg
    }

    #[test]
    fn flat_terrain_sits_at_base_offset() {
        let s = HeightSampler::new(flat_config());
        assert_eq!(s.height_at(10.0, -33.0), -5.0);
        assert_eq!(s.height_at(0.123, 9.87), -5.0);
    }

    #[test]
    fn column_scan_returns_floor_for_empty_column() {
        let mut cfg = flat_config();
        cfg.caves.enable = true;
        cfg.caves.amplitude = 0.0;
        cfg.base_offset = -1000.0;
        let s = HeightSampler::new(cfg);
        assert_eq!(s.height_at(4.0, 8.0), -40.0);
    }

    #[test]
    fn column_scan_lands_on_voxel_lattice() {
        let mut cfg = flat_config();
        cfg.caves.enable = true;
        cfg.caves.amplitude = 0.0;
        cfg.base_offset = 10.0;
        let s = HeightSampler::new(cfg);
        // density = 10 - y > 0 first at y = 8 scanning 80, 76, ...
        assert_eq!(s.height_at(0.0, 0.0), 8.0);
        assert_eq!(s.surface_top(1.0, 2.0), 12.0);
    }

    #[test]
    fn raycast_hits_flat_ground_from_above() {
        let s = HeightSampler::new(flat_config());
        let hit = s
            .raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::DOWN, 100.0)
            .expect("hit");
        assert!((hit.distance - 15.0).abs() < 1e-3);
        assert!((hit.normal.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn raycast_from_below_misses() {
        let s = HeightSampler::new(flat_config());
        assert!(s.raycast(Vec3::new(0.0, -20.0, 0.0), Vec3::DOWN, 100.0).is_none());
    }

    #[test]
    fn surface_classes_follow_sea_level() {
        let mut cfg = flat_config();
        cfg.sea_level = 0.0;
        let ground = GroundConfig::default();
        let s = HeightSampler::new(cfg.clone());
        assert_eq!(s.surface_at(0.0, 0.0, &ground).kind, SurfaceKind::SeaFloor);
        cfg.sea_level = -6.0;
        let s = HeightSampler::new(cfg.clone());
        assert_eq!(s.surface_at(0.0, 0.0, &ground).kind, SurfaceKind::Beach);
        cfg.sea_level = -50.0;
        let s = HeightSampler::new(cfg);
        assert_eq!(s.surface_at(0.0, 0.0, &ground).kind, SurfaceKind::Grass);
    }
}
