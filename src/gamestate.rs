use std::sync::Arc;

use tessera_chunk::{ChunkCoord, ChunkEffects, ChunkManager, ScatterBlocks};
use tessera_geom::Vec3;
use tessera_physics::{
    MIN_USER_BLOCK, MotionIntegrator, MotionParams, MoveIntent, PlayerBody, SPAWN_LIFT, StepReport,
    TerrainProbe, WorldGeometryRegistry,
};
use tessera_world::{GroundWindow, HeightSampler};

use crate::config::SandboxConfig;
use crate::event::TerrainChange;

/// Reach of the block placement ray.
pub const PLACE_REACH: f64 = 200.0;
/// Gap left between a placed block and the surface it was aimed at.
pub const PLACE_GAP: f64 = 0.01;

pub struct GameState {
    pub tick: u64,
    pub sampler: Arc<HeightSampler>,
    pub ground: GroundWindow,
    pub chunks: ChunkManager,
    pub registry: WorldGeometryRegistry,
    pub motion: MotionIntegrator,
    pub body: PlayerBody,
    pub view_dir: Vec3,
    pub spawn_xz: (f64, f64),
    pub center_chunk: ChunkCoord,
}

impl GameState {
    pub fn new(cfg: &SandboxConfig) -> Self {
        let sampler = Arc::new(HeightSampler::with_cache_capacity(
            cfg.terrain.clone(),
            cfg.ground.cache_capacity,
        ));
        let stream = cfg.stream.clone().sanitized();
        let generator = Arc::new(ScatterBlocks::with_density(stream.lod_density));
        let chunks = ChunkManager::new(stream, generator);
        let ground = GroundWindow::new(
            cfg.ground.clone(),
            GroundWindow::size_for_view(chunks.view_distance(), chunks.chunk_size()),
        );
        let [sx, sz] = cfg.spawn;
        let spawn_xz = if sx.is_finite() && sz.is_finite() {
            (sx, sz)
        } else {
            (0.0, 8.0)
        };
        let spawn_y = TerrainProbe::spawn_height(&sampler, spawn_xz.0, spawn_xz.1);
        let body = PlayerBody::new(Vec3::new(spawn_xz.0, spawn_y, spawn_xz.1));
        let center_chunk = chunks.world_to_chunk(spawn_xz.0, spawn_xz.1);
        let mut gs = Self {
            tick: 0,
            sampler,
            ground,
            chunks,
            registry: WorldGeometryRegistry::new(cfg.preset_boxes()),
            motion: MotionIntegrator::new(cfg.player.clone()),
            body,
            view_dir: Vec3::new(0.0, 0.0, -1.0),
            spawn_xz,
            center_chunk,
        };
        gs.refresh_terrain_boxes();
        gs.registry.rebuild(&gs.chunks);
        log::info!(
            "world ready: seed={} type={:?} chunk={} view={} spawn=({:.1}, {:.1}, {:.1})",
            gs.sampler.seed(),
            gs.sampler.config().terrain_type,
            gs.chunks.chunk_size(),
            gs.chunks.view_distance(),
            gs.body.position.x,
            gs.body.position.y,
            gs.body.position.z
        );
        gs
    }

    #[inline]
    pub fn eye(&self) -> Vec3 {
        self.body.eye(self.motion.params().height)
    }

    /// Rebuilds the collision set if anything it depends on moved.
    pub fn ensure_registry(&mut self) -> bool {
        if !self.registry.is_stale(&self.chunks) {
            return false;
        }
        self.registry.rebuild(&self.chunks);
        true
    }

    pub fn refresh_terrain_boxes(&mut self) {
        let boxes = self.ground.voxel_boxes(&self.sampler);
        if !boxes.is_empty() {
            log::debug!("terrain voxels: {} exposed boxes", boxes.len());
        }
        self.registry.set_terrain_boxes(boxes);
    }

    /// One integration step against the current collision set.
    pub fn step_body(&mut self, intent: &MoveIntent, dt: f64) -> StepReport {
        self.ensure_registry();
        let probe = TerrainProbe::new(&self.sampler, self.spawn_xz.0, self.spawn_xz.1);
        self.motion
            .tick(&mut self.body, intent, dt, self.registry.query(), &probe)
    }

    /// Moves the ground window with the player. Returns the applied shift.
    pub fn recenter_ground(&mut self) -> Option<(f64, f64)> {
        let p = self.body.position;
        let shift = self.ground.maybe_recenter(p.x, p.z, &self.sampler)?;
        if self.sampler.is_voxelized() {
            self.refresh_terrain_boxes();
            self.ensure_registry();
        }
        Some(shift)
    }

    /// Applies one terrain setting. Anything that changes the terrain
    /// regenerates the world.
    pub fn retune_terrain(&mut self, change: TerrainChange) -> ChunkEffects {
        let mut next = HeightSampler::with_cache_capacity(
            self.sampler.config().clone(),
            self.ground.config().cache_capacity,
        );
        match change {
            TerrainChange::Seed(seed) => next.set_seed(seed),
            TerrainChange::MountainAmplitude(a) => {
                let valley = next.config().valley_amplitude;
                next.set_amplitudes(a, valley);
            }
            TerrainChange::ValleyAmplitude(a) => {
                let mountain = next.config().mountain_amplitude;
                next.set_amplitudes(mountain, a);
            }
            TerrainChange::Type(kind) => next.set_terrain_type(kind),
            TerrainChange::SeaLevel(level) => next.set_sea_level(level),
        }
        if next.fingerprint() == self.sampler.fingerprint() {
            return ChunkEffects::default();
        }
        self.sampler = Arc::new(next);
        self.regenerate()
    }

    /// Rebuilds everything derived from the terrain.
    pub fn regenerate(&mut self) -> ChunkEffects {
        self.sampler.invalidate_cache();
        let mut fx = self.chunks.reset();
        fx.merge(self.chunks.force_update(self.body.position, &self.sampler));
        self.refresh_terrain_boxes();
        self.registry.rebuild(&self.chunks);
        let lifted = self.lift_above_terrain();
        log::info!(
            "terrain regenerated: seed={} mountain={} valley={} type={:?} sea={} chunks={}{}",
            self.sampler.seed(),
            self.sampler.config().mountain_amplitude,
            self.sampler.config().valley_amplitude,
            self.sampler.config().terrain_type,
            self.sampler.sea_level(),
            self.chunks.len(),
            if lifted { " (player lifted)" } else { "" }
        );
        fx
    }

    /// Puts the player back above ground and water if terrain rose under them.
    pub fn lift_above_terrain(&mut self) -> bool {
        let p = self.body.position;
        let floor = self
            .sampler
            .surface_top(p.x, p.z)
            .max(self.sampler.sea_level());
        if p.y >= floor {
            return false;
        }
        self.body.position.y = floor + SPAWN_LIFT;
        self.body.velocity = Vec3::ZERO;
        true
    }

    pub fn set_chunk_size(&mut self, chunk_size: u32) -> ChunkEffects {
        let fx = self.chunks.set_chunk_size(chunk_size);
        self.resize_ground();
        fx
    }

    pub fn set_view_distance(&mut self, view_distance: u32) -> bool {
        self.chunks.set_view_distance(view_distance);
        self.resize_ground()
    }

    fn resize_ground(&mut self) -> bool {
        let size = GroundWindow::size_for_view(self.chunks.view_distance(), self.chunks.chunk_size());
        if !self.ground.set_size(size) {
            return false;
        }
        self.sampler.invalidate_cache();
        if self.sampler.is_voxelized() {
            self.refresh_terrain_boxes();
        }
        true
    }

    fn retune_motion(&mut self, f: impl FnOnce(&mut MotionParams)) {
        let mut p = self.motion.params().clone();
        f(&mut p);
        self.motion.set_params(p);
    }

    pub fn set_walk_speed(&mut self, v: f64) {
        self.retune_motion(|p| p.walk_speed = v);
    }

    pub fn set_run_multiplier(&mut self, v: f64) {
        self.retune_motion(|p| p.run_multiplier = v);
    }

    pub fn set_jump_strength(&mut self, v: f64) {
        self.retune_motion(|p| p.jump_strength = v);
    }

    pub fn set_step_height(&mut self, v: f64) {
        self.retune_motion(|p| p.step_height = v);
    }

    pub fn spawn_block(&mut self, center: Vec3, size: Vec3) -> Option<u64> {
        let id = self.registry.add_user_block(center, size)?;
        self.ensure_registry();
        Some(id)
    }

    /// Places a block where the view ray meets terrain or a box, resting on
    /// the hit face.
    pub fn spawn_block_at_view(&mut self, size: Vec3) -> Option<u64> {
        self.ensure_registry();
        let eye = self.eye();
        let dir = self.view_dir;
        let on_box = self
            .registry
            .raycast(eye, dir, PLACE_REACH)
            .map(|h| (h.distance, h.point, h.normal));
        let on_ground = self
            .sampler
            .raycast(eye, dir, PLACE_REACH)
            .map(|h| (h.distance, h.point, h.normal));
        let (_, point, normal) = match (on_box, on_ground) {
            (Some(a), Some(b)) => {
                if a.0 <= b.0 {
                    a
                } else {
                    b
                }
            }
            (a, b) => a.or(b)?,
        };
        let half = if size.y.is_finite() {
            size.y.abs().max(MIN_USER_BLOCK) * 0.5
        } else {
            MIN_USER_BLOCK * 0.5
        };
        self.spawn_block(point + normal * (half + PLACE_GAP), size)
    }

    /// Removes every user block and resets the procedural chunks.
    pub fn clear_user_blocks(&mut self) -> (usize, ChunkEffects) {
        let removed = self.registry.clear_user_blocks();
        let fx = self.chunks.reset();
        self.registry.rebuild(&self.chunks);
        (removed, fx)
    }

    pub fn set_procgen_enabled(&mut self, on: bool) -> ChunkEffects {
        let mut fx = self.chunks.set_procgen_enabled(on);
        if on {
            fx.merge(self.chunks.force_update(self.body.position, &self.sampler));
        }
        self.ensure_registry();
        fx
    }
}
