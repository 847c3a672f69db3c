use crate::coord::ChunkCoord;
use crate::lod::Lod;
use tessera_geom::{Aabb, Vec3};
use tessera_noise::{Mulberry32, cell_hash_2d};
use tessera_world::HeightSampler;

/// One placed object in a chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decoration {
    pub bounds: Aabb,
    /// Colour hint for the render side, in `[0, 1)`.
    pub hue: f64,
}

/// Everything a generator needs to build one chunk; also the unit of work
/// handed to background workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkJob {
    pub coord: ChunkCoord,
    pub lod: Lod,
    pub chunk_size: u32,
    pub world_seed: u32,
    pub epoch: u64,
}

impl ChunkJob {
    /// `world_seed ^ hash(cx) ^ hash(cz)`.
    #[inline]
    pub fn sub_seed(&self) -> u32 {
        chunk_seed(self.world_seed, self.coord)
    }
}

#[inline]
pub fn chunk_seed(world_seed: u32, coord: ChunkCoord) -> u32 {
    cell_hash_2d(world_seed, i64::from(coord.cx), i64::from(coord.cz))
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerateError {
    InvalidChunkSize(u32),
    Generator(String),
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateError::InvalidChunkSize(s) => write!(f, "invalid chunk size: {}", s),
            GenerateError::Generator(msg) => write!(f, "generator failed: {}", msg),
        }
    }
}

impl std::error::Error for GenerateError {}

/// Builds the decoration of one chunk. Must be a pure function of the job and
/// the sampler so reloads reproduce the same objects.
pub trait DecorationGenerator: Send + Sync {
    fn generate(
        &self,
        job: &ChunkJob,
        sampler: &HeightSampler,
    ) -> Result<Vec<Decoration>, GenerateError>;
}

/// Scatters a handful of boxes over the chunk, thinned by LOD, skipping water.
#[derive(Clone, Debug, PartialEq)]
pub struct ScatterBlocks {
    pub base_count: f64,
    pub extra_count: f64,
    pub lod_density: [f64; 4],
    pub lift: f64,
}

impl Default for ScatterBlocks {
    fn default() -> Self {
        Self {
            base_count: 12.0,
            extra_count: 10.0,
            lod_density: [1.0, 0.5, 0.25, 0.1],
            lift: 0.2,
        }
    }
}

impl ScatterBlocks {
    pub fn with_density(lod_density: [f64; 4]) -> Self {
        Self {
            lod_density,
            ..Self::default()
        }
    }
}

impl DecorationGenerator for ScatterBlocks {
    fn generate(
        &self,
        job: &ChunkJob,
        sampler: &HeightSampler,
    ) -> Result<Vec<Decoration>, GenerateError> {
        if job.chunk_size < 2 {
            return Err(GenerateError::InvalidChunkSize(job.chunk_size));
        }
        let mut rng = Mulberry32::new(job.sub_seed());
        let density = self.lod_density[job.lod.index()].clamp(0.0, 1.0);
        let count = ((self.base_count + rng.next_f64() * self.extra_count) * density).floor();
        let count = count.max(0.0) as usize;
        let size = f64::from(job.chunk_size);
        let (cx, cz) = job.coord.center(job.chunk_size);
        let sea = sampler.sea_level();
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            // Draw every value up front so a skipped object does not shift the stream.
            let sx = 1.0 + (rng.next_f64() * 3.0).floor();
            let sy = 0.6 + rng.next_f64() * 1.8;
            let sz = 1.0 + (rng.next_f64() * 3.0).floor();
            let lx = (rng.next_f64() - 0.5) * (size - 2.0);
            let lz = (rng.next_f64() - 0.5) * (size - 2.0);
            let hue = (rng.next_f64() * 0.25 + 0.55) % 1.0;
            let wx = cx + lx;
            let wz = cz + lz;
            let ground = sampler.surface_top(wx, wz);
            if !ground.is_finite() {
                log::debug!(
                    "chunk {} skipped placement at ({:.2},{:.2}): non-finite height",
                    job.coord,
                    wx,
                    wz
                );
                continue;
            }
            if ground <= sea {
                continue;
            }
            let base = Vec3::new(wx, ground + self.lift, wz);
            let bounds = Aabb::from_base(base, Vec3::new(sx, sy, sz));
            if !bounds.is_finite() {
                continue;
            }
            out.push(Decoration { bounds, hue });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_world::TerrainConfig;

    fn job(coord: ChunkCoord, lod: Lod) -> ChunkJob {
        ChunkJob {
            coord,
            lod,
            chunk_size: 32,
            world_seed: 1,
            epoch: 0,
        }
    }

    fn dry_sampler() -> HeightSampler {
        let mut cfg = TerrainConfig::default();
        cfg.sea_level = -1.0e6;
        HeightSampler::new(cfg)
    }

    #[test]
    fn same_job_same_objects() {
        let s = dry_sampler();
        let g = ScatterBlocks::default();
        let a = g.generate(&job(ChunkCoord::new(3, -2), Lod::Full), &s).unwrap();
        let b = g.generate(&job(ChunkCoord::new(3, -2), Lod::Full), &s).unwrap();
        assert_eq!(a, b);
        assert!((12..22).contains(&a.len()));
    }

    #[test]
    fn objects_stay_inside_their_chunk() {
        let s = dry_sampler();
        let g = ScatterBlocks::default();
        let c = ChunkCoord::new(-4, 7);
        let (ox, oz) = c.origin(32);
        for d in g.generate(&job(c, Lod::Full), &s).unwrap() {
            let ctr = d.bounds.center();
            assert!(ctr.x > ox && ctr.x < ox + 32.0);
            assert!(ctr.z > oz && ctr.z < oz + 32.0);
        }
    }

    #[test]
    fn lod_thins_decoration() {
        let s = dry_sampler();
        let g = ScatterBlocks::default();
        let c = ChunkCoord::new(1, 1);
        let full = g.generate(&job(c, Lod::Full), &s).unwrap().len();
        let sparse = g.generate(&job(c, Lod::Sparse), &s).unwrap().len();
        assert!(sparse < full);
        assert!(sparse <= 2);
    }

    #[test]
    fn underwater_placements_are_skipped() {
        let mut cfg = TerrainConfig::default();
        cfg.sea_level = 1.0e6;
        let s = HeightSampler::new(cfg);
        let out = ScatterBlocks::default()
            .generate(&job(ChunkCoord::new(0, 0), Lod::Full), &s)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn objects_rest_above_terrain() {
        let s = dry_sampler();
        let out = ScatterBlocks::default()
            .generate(&job(ChunkCoord::new(2, 5), Lod::Full), &s)
            .unwrap();
        for d in out {
            let c = d.bounds.center();
            let ground = s.surface_top(c.x, c.z);
            assert!((d.bounds.min.y - (ground + 0.2)).abs() < 1e-9);
        }
    }

    #[test]
    fn tiny_chunk_is_an_error() {
        let s = dry_sampler();
        let mut j = job(ChunkCoord::new(0, 0), Lod::Full);
        j.chunk_size = 1;
        assert_eq!(
            ScatterBlocks::default().generate(&j, &s),
            Err(GenerateError::InvalidChunkSize(1))
        );
    }
}
