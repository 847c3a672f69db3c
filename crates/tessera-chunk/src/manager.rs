use crate::coord::ChunkCoord;
use crate::decoration::{ChunkJob, Decoration, DecorationGenerator, GenerateError};
use crate::lod::Lod;
use hashbrown::HashMap;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tessera_geom::{Aabb, Vec3};
use tessera_world::HeightSampler;

pub const MIN_CHUNK_SIZE: u32 = 8;
pub const MIN_VIEW_DISTANCE: u32 = 1;
pub const MAX_VIEW_DISTANCE: u32 = 64;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StreamConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    #[serde(default = "default_view_distance")]
    pub view_distance: u32,
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default = "default_lod_bands")]
    pub lod_bands: [f64; 3],
    #[serde(default = "default_lod_density")]
    pub lod_density: [f64; 4],
    #[serde(default = "default_procgen")]
    pub procgen: bool,
}
fn default_chunk_size() -> u32 {
    32
}
fn default_view_distance() -> u32 {
    5
}
fn default_throttle_ms() -> u64 {
    250
}
fn default_lod_bands() -> [f64; 3] {
    [0.4, 0.6, 0.8]
}
fn default_lod_density() -> [f64; 4] {
    [1.0, 0.5, 0.25, 0.1]
}
fn default_procgen() -> bool {
    true
}
impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            view_distance: default_view_distance(),
            throttle_ms: default_throttle_ms(),
            lod_bands: default_lod_bands(),
            lod_density: default_lod_density(),
            procgen: default_procgen(),
        }
    }
}

impl StreamConfig {
    pub fn sanitized(mut self) -> Self {
        self.chunk_size = self.chunk_size.max(MIN_CHUNK_SIZE);
        self.view_distance = self.view_distance.clamp(MIN_VIEW_DISTANCE, MAX_VIEW_DISTANCE);
        if self.lod_bands.iter().any(|b| !b.is_finite()) {
            self.lod_bands = default_lod_bands();
        }
        let mut prev = 0.0;
        for b in &mut self.lod_bands {
            *b = b.clamp(prev, 1.0);
            prev = *b;
        }
        for d in &mut self.lod_density {
            *d = if d.is_finite() { d.clamp(0.0, 1.0) } else { 0.0 };
        }
        self
    }
}

#[derive(Clone, Debug)]
pub struct ChunkRecord {
    pub coord: ChunkCoord,
    pub lod: Lod,
    pub epoch: u64,
    pub decorations: Vec<Decoration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LodChange {
    pub coord: ChunkCoord,
    pub from: Lod,
    pub to: Lod,
}

/// What one streaming pass changed, for the render side and the collision registry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkEffects {
    pub loaded: Vec<(ChunkCoord, Lod)>,
    pub unloaded: Vec<ChunkCoord>,
    pub lod_changed: Vec<LodChange>,
}

impl ChunkEffects {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty() && self.lod_changed.is_empty()
    }

    pub fn merge(&mut self, other: ChunkEffects) {
        self.loaded.extend(other.loaded);
        self.unloaded.extend(other.unloaded);
        self.lod_changed.extend(other.lod_changed);
    }

    pub fn sort(&mut self) {
        self.loaded.sort();
        self.unloaded.sort();
        self.lod_changed.sort_by_key(|c| c.coord);
    }
}

/// Unloads already applied plus the generation work still owed.
#[derive(Clone, Debug, Default)]
pub struct StreamPlan {
    pub center: ChunkCoord,
    pub jobs: Vec<ChunkJob>,
    pub effects: ChunkEffects,
}

#[derive(Clone, Debug)]
pub struct ChunkResult {
    pub job: ChunkJob,
    pub decorations: Result<Vec<Decoration>, GenerateError>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InstallOutcome {
    Loaded(ChunkCoord, Lod),
    LodChanged(LodChange),
    /// Superseded by a reset, an unload or a different LOD.
    Discarded,
    Failed(GenerateError),
}

/// Sole owner of chunk records. Streams a square of chunks around the viewer.
pub struct ChunkManager {
    cfg: StreamConfig,
    generator: Arc<dyn DecorationGenerator>,
    records: HashMap<ChunkCoord, ChunkRecord>,
    wanted: HashMap<ChunkCoord, Lod>,
    pending: HashMap<ChunkCoord, (Lod, u64)>,
    epoch: u64,
    revision: u64,
    last_update: Option<Instant>,
}

impl ChunkManager {
    pub fn new(cfg: StreamConfig, generator: Arc<dyn DecorationGenerator>) -> Self {
        Self {
            cfg: cfg.sanitized(),
            generator,
            records: HashMap::new(),
            wanted: HashMap::new(),
            pending: HashMap::new(),
            epoch: 0,
            revision: 0,
            last_update: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &StreamConfig {
        &self.cfg
    }

    #[inline]
    pub fn chunk_size(&self) -> u32 {
        self.cfg.chunk_size
    }

    #[inline]
    pub fn view_distance(&self) -> u32 {
        self.cfg.view_distance
    }

    #[inline]
    pub fn procgen_enabled(&self) -> bool {
        self.cfg.procgen
    }

    /// Bumped by every reset; results from an older epoch are dropped.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Bumped whenever the loaded record set changes.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub fn generator(&self) -> Arc<dyn DecorationGenerator> {
        Arc::clone(&self.generator)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> Option<&ChunkRecord> {
        self.records.get(&coord)
    }

    pub fn loaded_coords(&self) -> Vec<ChunkCoord> {
        let mut v: Vec<ChunkCoord> = self.records.keys().copied().collect();
        v.sort();
        v
    }

    /// Records in coordinate order.
    pub fn records_sorted(&self) -> Vec<&ChunkRecord> {
        let mut v: Vec<&ChunkRecord> = self.records.values().collect();
        v.sort_by_key(|r| r.coord);
        v
    }

    /// Every decoration box with its chunk and index, in a stable order.
    pub fn decoration_boxes(&self) -> Vec<(ChunkCoord, usize, Aabb)> {
        self.records_sorted()
            .into_iter()
            .flat_map(|r| {
                r.decorations
                    .iter()
                    .enumerate()
                    .map(move |(i, d)| (r.coord, i, d.bounds))
            })
            .collect()
    }

    #[inline]
    pub fn world_to_chunk(&self, x: f64, z: f64) -> ChunkCoord {
        ChunkCoord::from_world(x, z, self.cfg.chunk_size)
    }

    /// All coordinates within the view distance of `center`, nearest first.
    pub fn required_set(&self, center: ChunkCoord) -> Vec<(ChunkCoord, Lod)> {
        let r = self.cfg.view_distance as i32;
        let mut out = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        for dz in -r..=r {
            for dx in -r..=r {
                let c = center.offset(dx, dz);
                let d = c.chebyshev(center);
                out.push((c, Lod::for_distance(d, self.cfg.view_distance, &self.cfg.lod_bands)));
            }
        }
        out.sort_by_key(|(c, _)| (c.distance_sq(center), *c));
        out
    }

    pub fn set_view_distance(&mut self, view_distance: u32) {
        self.cfg.view_distance = view_distance.clamp(MIN_VIEW_DISTANCE, MAX_VIEW_DISTANCE);
    }

    /// A new chunk size invalidates every coordinate, so the set is dropped.
    pub fn set_chunk_size(&mut self, chunk_size: u32) -> ChunkEffects {
        let size = chunk_size.max(MIN_CHUNK_SIZE);
        if size == self.cfg.chunk_size {
            return ChunkEffects::default();
        }
        self.cfg.chunk_size = size;
        self.reset()
    }

    pub fn set_procgen_enabled(&mut self, on: bool) -> ChunkEffects {
        if self.cfg.procgen == on {
            return ChunkEffects::default();
        }
        self.cfg.procgen = on;
        log::info!("procedural decoration {}", if on { "on" } else { "off" });
        if on { ChunkEffects::default() } else { self.reset() }
    }

    /// Drops every record and pending job and starts a new epoch.
    pub fn reset(&mut self) -> ChunkEffects {
        let unloaded = self.loaded_coords();
        self.records.clear();
        self.wanted.clear();
        self.pending.clear();
        self.epoch += 1;
        self.revision += 1;
        self.last_update = None;
        log::debug!("chunks reset: {} unloaded, epoch {}", unloaded.len(), self.epoch);
        ChunkEffects {
            unloaded,
            ..ChunkEffects::default()
        }
    }

    /// Throttled streaming pass. Returns `None` when called again within the
    /// throttle window.
    pub fn update(
        &mut self,
        viewer: Vec3,
        sampler: &HeightSampler,
        now: Instant,
    ) -> Option<ChunkEffects> {
        if let Some(last) = self.last_update {
            if now.saturating_duration_since(last) < Duration::from_millis(self.cfg.throttle_ms) {
                return None;
            }
        }
        self.last_update = Some(now);
        Some(self.run_pass(viewer, sampler))
    }

    /// Unthrottled pass; also restarts the throttle window.
    pub fn force_update(&mut self, viewer: Vec3, sampler: &HeightSampler) -> ChunkEffects {
        self.last_update = Some(Instant::now());
        self.run_pass(viewer, sampler)
    }

    fn run_pass(&mut self, viewer: Vec3, sampler: &HeightSampler) -> ChunkEffects {
        let plan = self.plan(viewer, sampler.seed());
        let mut effects = plan.effects;
        for job in plan.jobs {
            let decorations = self.generator.generate(&job, sampler);
            match self.install(ChunkResult { job, decorations }) {
                InstallOutcome::Loaded(c, lod) => effects.loaded.push((c, lod)),
                InstallOutcome::LodChanged(change) => effects.lod_changed.push(change),
                InstallOutcome::Discarded | InstallOutcome::Failed(_) => {}
            }
        }
        effects.sort();
        effects
    }

    /// Computes the wanted set, unloads what fell out of it, and returns jobs
    /// for missing or re-banded chunks. Jobs already in flight are not repeated.
    pub fn plan(&mut self, viewer: Vec3, world_seed: u32) -> StreamPlan {
        if !viewer.is_finite() {
            log::warn!("chunk update skipped: non-finite viewer position {:?}", viewer);
            return StreamPlan::default();
        }
        let center = self.world_to_chunk(viewer.x, viewer.z);
        let required = if self.cfg.procgen {
            self.required_set(center)
        } else {
            Vec::new()
        };
        let wanted: HashMap<ChunkCoord, Lod> = required.iter().copied().collect();

        let mut effects = ChunkEffects::default();
        let mut gone: Vec<ChunkCoord> = self
            .records
            .keys()
            .filter(|c| !wanted.contains_key(*c))
            .copied()
            .collect();
        gone.sort();
        for c in &gone {
            self.records.remove(c);
        }
        if !gone.is_empty() {
            self.revision += 1;
        }
        effects.unloaded = gone;
        self.pending.retain(|c, _| wanted.contains_key(c));

        let mut jobs = Vec::new();
        for (coord, lod) in required {
            if self.records.get(&coord).map(|r| r.lod) == Some(lod) {
                continue;
            }
            if self.pending.get(&coord) == Some(&(lod, self.epoch)) {
                continue;
            }
            self.pending.insert(coord, (lod, self.epoch));
            jobs.push(ChunkJob {
                coord,
                lod,
                chunk_size: self.cfg.chunk_size,
                world_seed,
                epoch: self.epoch,
            });
        }
        self.wanted = wanted;
        debug_assert!(self.records.keys().all(|c| self.wanted.contains_key(c)));
        log::trace!(
            "chunk plan at {}: {} jobs, {} unloaded",
            center,
            jobs.len(),
            effects.unloaded.len()
        );
        StreamPlan {
            center,
            jobs,
            effects,
        }
    }

    /// Publishes a generated chunk if it is still wanted at that LOD in the
    /// current epoch; anything else is dropped without touching the set.
    pub fn install(&mut self, result: ChunkResult) -> InstallOutcome {
        let job = result.job;
        if self.pending.get(&job.coord) == Some(&(job.lod, job.epoch)) {
            self.pending.remove(&job.coord);
        }
        if job.epoch != self.epoch || self.wanted.get(&job.coord) != Some(&job.lod) {
            log::trace!("discarding stale chunk {} (epoch {})", job.coord, job.epoch);
            return InstallOutcome::Discarded;
        }
        if self.records.get(&job.coord).map(|r| r.lod) == Some(job.lod) {
            return InstallOutcome::Discarded;
        }
        let decorations = match result.decorations {
            Ok(d) => d,
            Err(e) => {
                log::warn!("chunk {} generation failed: {}", job.coord, e);
                return InstallOutcome::Failed(e);
            }
        };
        let prev = self.records.insert(
            job.coord,
            ChunkRecord {
                coord: job.coord,
                lod: job.lod,
                epoch: job.epoch,
                decorations,
            },
        );
        self.revision += 1;
        match prev {
            Some(p) => InstallOutcome::LodChanged(LodChange {
                coord: job.coord,
                from: p.lod,
                to: job.lod,
            }),
            None => InstallOutcome::Loaded(job.coord, job.lod),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::ScatterBlocks;
    use tessera_world::TerrainConfig;

    fn manager(view: u32) -> ChunkManager {
        let cfg = StreamConfig {
            view_distance: view,
            ..StreamConfig::default()
        };
        ChunkManager::new(cfg, Arc::new(ScatterBlocks::default()))
    }

    fn sampler() -> HeightSampler {
        HeightSampler::new(TerrainConfig::default())
    }

    #[test]
    fn settings_are_clamped() {
        let cfg = StreamConfig {
            chunk_size: 2,
            view_distance: 500,
            ..StreamConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.chunk_size, 8);
        assert_eq!(cfg.view_distance, 64);
        let mut m = manager(3);
        m.set_view_distance(0);
        assert_eq!(m.view_distance(), 1);
    }

    #[test]
    fn throttle_skips_rapid_updates() {
        let s = sampler();
        let mut m = manager(1);
        let t0 = Instant::now();
        assert!(m.update(Vec3::ZERO, &s, t0).is_some());
        assert!(m.update(Vec3::ZERO, &s, t0 + Duration::from_millis(100)).is_none());
        assert!(m.update(Vec3::ZERO, &s, t0 + Duration::from_millis(260)).is_some());
    }

    #[test]
    fn lod_change_regenerates_in_place() {
        let s = sampler();
        let mut m = manager(5);
        m.force_update(Vec3::ZERO, &s);
        let c = ChunkCoord::new(3, 0);
        assert_eq!(m.get(c).map(|r| r.lod), Some(Lod::Half));
        // one chunk east: (3,0) is now two rings away
        let fx = m.force_update(Vec3::new(40.0, 0.0, 0.0), &s);
        assert_eq!(m.get(c).map(|r| r.lod), Some(Lod::Full));
        assert!(fx.lod_changed.iter().any(|l| l.coord == c && l.from == Lod::Half && l.to == Lod::Full));
    }

    #[test]
    fn stale_epoch_results_are_discarded() {
        let s = sampler();
        let mut m = manager(1);
        let plan = m.plan(Vec3::ZERO, s.seed());
        assert_eq!(plan.jobs.len(), 9);
        m.reset();
        let job = plan.jobs[0];
        let out = m.install(ChunkResult {
            job,
            decorations: Ok(Vec::new()),
        });
        assert_eq!(out, InstallOutcome::Discarded);
        assert!(m.is_empty());
    }

    #[test]
    fn in_flight_jobs_are_not_repeated() {
        let s = sampler();
        let mut m = manager(2);
        let first = m.plan(Vec3::ZERO, s.seed());
        assert_eq!(first.jobs.len(), 25);
        let again = m.plan(Vec3::ZERO, s.seed());
        assert!(again.jobs.is_empty());
        assert_eq!(m.pending_len(), 25);
    }

    #[test]
    fn failed_generation_is_retried_next_pass() {
        struct Flaky;
        impl DecorationGenerator for Flaky {
            fn generate(
                &self,
                job: &ChunkJob,
                _sampler: &HeightSampler,
            ) -> Result<Vec<Decoration>, GenerateError> {
                if job.coord == ChunkCoord::new(0, 0) {
                    Err(GenerateError::Generator("boom".into()))
                } else {
                    Ok(Vec::new())
                }
            }
        }
        let s = sampler();
        let mut m = ChunkManager::new(
            StreamConfig {
                view_distance: 1,
                ..StreamConfig::default()
            },
            Arc::new(Flaky),
        );
        let fx = m.force_update(Vec3::ZERO, &s);
        assert_eq!(fx.loaded.len(), 8);
        assert!(m.get(ChunkCoord::new(0, 0)).is_none());
        let plan = m.plan(Vec3::ZERO, s.seed());
        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].coord, ChunkCoord::new(0, 0));
    }

    #[test]
    fn procgen_off_unloads_everything() {
        let s = sampler();
        let mut m = manager(2);
        m.force_update(Vec3::ZERO, &s);
        assert_eq!(m.len(), 25);
        let fx = m.set_procgen_enabled(false);
        assert_eq!(fx.unloaded.len(), 25);
        assert!(m.is_empty());
        assert!(m.force_update(Vec3::ZERO, &s).is_empty());
        m.set_procgen_enabled(true);
        assert_eq!(m.force_update(Vec3::ZERO, &s).loaded.len(), 25);
    }
}
