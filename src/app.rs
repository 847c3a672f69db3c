use std::time::{Duration, Instant};

use tessera_chunk::ChunkEffects;
use tessera_physics::MoveIntent;
use tessera_runtime::ChunkWorkers;

use crate::config::SandboxConfig;
use crate::event::{Event, EventQueue, RebuildCause};
use crate::gamestate::GameState;
use crate::scene::SceneSink;

pub struct App {
    pub gs: GameState,
    pub queue: EventQueue,
    pub scene: Box<dyn SceneSink>,
    workers: Option<ChunkWorkers>,
    last_schedule: Option<Instant>,
}

impl App {
    pub fn new(cfg: &SandboxConfig, scene: Box<dyn SceneSink>) -> Self {
        let mut app = Self {
            gs: GameState::new(cfg),
            queue: EventQueue::new(),
            scene,
            workers: None,
            last_schedule: None,
        };
        let grid = app.gs.ground.height_grid(&app.gs.sampler);
        app.scene.ground_rebuilt(&grid);
        app
    }

    /// Moves chunk generation onto `workers` from the next frame on.
    pub fn attach_workers(&mut self, workers: ChunkWorkers) {
        log::info!("chunk generation on {} worker threads", workers.worker_count());
        self.workers = Some(workers);
        self.last_schedule = None;
    }

    pub fn background(&self) -> bool {
        self.workers.is_some()
    }

    /// One frame: queue the frame's intents, then drain everything due this tick.
    pub fn step(&mut self, dt: f64, intent: MoveIntent, now: Instant) {
        self.gs.tick = self.queue.now;
        self.queue.emit_now(Event::Tick);
        let dt_ms = if dt.is_finite() {
            (dt.max(0.0) * 1000.0).round().min(f64::from(u32::MAX)) as u32
        } else {
            0
        };
        self.queue.emit_now(Event::MovementRequested { dt_ms, intent });
        self.drain(now);
        self.queue.advance_tick();
    }

    /// Handles every event due now, including ones emitted while handling.
    pub fn drain(&mut self, now: Instant) {
        while let Some(env) = self.queue.pop_ready() {
            log::trace!(target: "events", "[tick {}] dispatch #{}", env.tick, env.id);
            Self::log_event(env.tick, &env.kind);
            self.handle_event(env.kind, now);
        }
    }

    fn handle_event(&mut self, ev: Event, now: Instant) {
        match ev {
            Event::Tick => {}
            Event::MovementRequested { dt_ms, intent } => {
                self.advance(f64::from(dt_ms) / 1000.0, intent, now);
            }
            Event::BlockSpawnRequested { center, size } => {
                match self.gs.spawn_block(center, size) {
                    Some(_) => self.scene.user_blocks_changed(self.gs.registry.user_block_count()),
                    None => log::warn!("block spawn rejected: center={:?} size={:?}", center, size),
                }
            }
            Event::BlockSpawnAtViewRequested { size } => match self.gs.spawn_block_at_view(size) {
                Some(_) => self.scene.user_blocks_changed(self.gs.registry.user_block_count()),
                None => log::debug!("nothing under the view ray to place on"),
            },
            Event::UserBlocksClearRequested => {
                let (removed, fx) = self.gs.clear_user_blocks();
                log::info!("cleared {} user blocks", removed);
                self.scene.user_blocks_changed(0);
                self.publish(fx);
                self.queue.emit_now(Event::RegistryRebuildRequested {
                    cause: RebuildCause::UserBlocks,
                });
            }
            Event::TerrainRetuneRequested { change } => {
                let fx = self.gs.retune_terrain(change);
                let grid = self.gs.ground.height_grid(&self.gs.sampler);
                self.scene.ground_rebuilt(&grid);
                self.publish(fx);
                self.queue.emit_now(Event::RegistryRebuildRequested {
                    cause: RebuildCause::Terrain,
                });
            }
            Event::ProcgenToggled { enabled } => {
                let fx = self.gs.set_procgen_enabled(enabled);
                self.publish(fx);
            }
            Event::GroundRecentered { .. } => {
                let grid = self.gs.ground.height_grid(&self.gs.sampler);
                self.scene.ground_rebuilt(&grid);
                self.queue.emit_now(Event::RegistryRebuildRequested {
                    cause: RebuildCause::Recenter,
                });
            }
            Event::ChunkLoaded { coord, .. } => {
                if let Some(r) = self.gs.chunks.get(coord) {
                    self.scene.chunk_loaded(r);
                }
            }
            Event::ChunkUnloaded { coord } => self.scene.chunk_unloaded(coord),
            Event::ChunkLodChanged { coord, from, .. } => {
                if let Some(r) = self.gs.chunks.get(coord) {
                    self.scene.chunk_lod_changed(r, from);
                }
            }
            Event::RegistryRebuildRequested { .. } => {
                self.gs.ensure_registry();
            }
            Event::ViewCenterChanged { .. } | Event::PlayerRecovered { .. } => {}
        }
    }

    fn advance(&mut self, dt: f64, intent: MoveIntent, now: Instant) {
        let dir = intent.view_dir;
        if dir.is_finite() && dir.length_sq() > 1e-12 {
            self.gs.view_dir = dir.normalized();
        }
        let viewer = self.gs.body.position;

        let fx = match &self.workers {
            Some(w) => {
                let mut fx = w.pump(&mut self.gs.chunks);
                let throttle = Duration::from_millis(self.gs.chunks.config().throttle_ms);
                let due = self
                    .last_schedule
                    .is_none_or(|t| now.saturating_duration_since(t) >= throttle);
                if due {
                    self.last_schedule = Some(now);
                    match w.schedule(&mut self.gs.chunks, viewer, &self.gs.sampler) {
                        Ok(unloaded) => fx.merge(unloaded),
                        Err(e) => log::error!("background generation unavailable: {}", e),
                    }
                }
                fx
            }
            None => self
                .gs
                .chunks
                .update(viewer, &self.gs.sampler, now)
                .unwrap_or_default(),
        };
        let structural = !fx.is_empty();
        self.publish(fx);
        if structural {
            self.queue.emit_now(Event::RegistryRebuildRequested {
                cause: RebuildCause::Chunks,
            });
        }

        let center = self.gs.chunks.world_to_chunk(viewer.x, viewer.z);
        if center != self.gs.center_chunk {
            self.gs.center_chunk = center;
            self.queue.emit_now(Event::ViewCenterChanged { center });
        }

        let report = self.gs.step_body(&intent, dt);
        if report.recovered {
            self.queue.emit_now(Event::PlayerRecovered {
                position: self.gs.body.position,
            });
        }
        if let Some((dx, dz)) = self.gs.recenter_ground() {
            self.queue.emit_now(Event::GroundRecentered { dx, dz });
        }
        let eye = self.gs.eye();
        self.scene.camera_pose(eye, self.gs.view_dir);
    }

    /// Forwards chunk changes to the scene as events, unloads first.
    fn publish(&mut self, fx: ChunkEffects) {
        for coord in fx.unloaded {
            self.queue.emit_now(Event::ChunkUnloaded { coord });
        }
        for (coord, lod) in fx.loaded {
            self.queue.emit_now(Event::ChunkLoaded { coord, lod });
        }
        for c in fx.lod_changed {
            self.queue.emit_now(Event::ChunkLodChanged {
                coord: c.coord,
                from: c.from,
                to: c.to,
            });
        }
    }

    /// Finishes outstanding background work; a no-op without workers.
    pub fn settle(&mut self, timeout: Duration, now: Instant) {
        let Some(w) = &self.workers else {
            return;
        };
        let fx = match w.pump_until_idle(&mut self.gs.chunks, timeout) {
            Ok(fx) => fx,
            Err(e) => {
                log::error!("background generation unavailable: {}", e);
                return;
            }
        };
        let (queued, inflight) = w.queue_counts();
        log::debug!("chunk workers settled: queued={} inflight={}", queued, inflight);
        self.publish(fx);
        self.gs.ensure_registry();
        self.drain(now);
    }

    fn log_event(tick: u64, ev: &Event) {
        match ev {
            Event::Tick => {
                log::trace!(target: "events", "[tick {}] Tick", tick);
            }
            Event::MovementRequested { dt_ms, intent } => {
                log::trace!(target: "events", "[tick {}] MovementRequested dt_ms={} f={} b={} l={} r={} run={} jump={}",
                    tick, dt_ms, intent.forward, intent.back, intent.left, intent.right, intent.run, intent.jump);
            }
            Event::BlockSpawnRequested { center, size } => {
                log::info!(target: "events", "[tick {}] BlockSpawnRequested at ({:.2}, {:.2}, {:.2}) size=({:.2}, {:.2}, {:.2})",
                    tick, center.x, center.y, center.z, size.x, size.y, size.z);
            }
            Event::BlockSpawnAtViewRequested { size } => {
                log::info!(target: "events", "[tick {}] BlockSpawnAtViewRequested size=({:.2}, {:.2}, {:.2})",
                    tick, size.x, size.y, size.z);
            }
            Event::UserBlocksClearRequested => {
                log::info!(target: "events", "[tick {}] UserBlocksClearRequested", tick);
            }
            Event::TerrainRetuneRequested { change } => {
                log::info!(target: "events", "[tick {}] TerrainRetuneRequested {:?}", tick, change);
            }
            Event::ProcgenToggled { enabled } => {
                log::info!(target: "events", "[tick {}] ProcgenToggled {}", tick, if *enabled { "on" } else { "off" });
            }
            Event::ViewCenterChanged { center } => {
                log::info!(target: "events", "[tick {}] ViewCenterChanged cc={}", tick, center);
            }
            Event::PlayerRecovered { position } => {
                log::info!(target: "events", "[tick {}] PlayerRecovered at ({:.1}, {:.1}, {:.1})",
                    tick, position.x, position.y, position.z);
            }
            Event::GroundRecentered { dx, dz } => {
                log::info!(target: "events", "[tick {}] GroundRecentered by ({:.1}, {:.1})", tick, dx, dz);
            }
            Event::ChunkLoaded { coord, lod } => {
                log::debug!(target: "events", "[tick {}] ChunkLoaded {} lod={:?}", tick, coord, lod);
            }
            Event::ChunkUnloaded { coord } => {
                log::debug!(target: "events", "[tick {}] ChunkUnloaded {}", tick, coord);
            }
            Event::ChunkLodChanged { coord, from, to } => {
                log::debug!(target: "events", "[tick {}] ChunkLodChanged {} {:?} -> {:?}", tick, coord, from, to);
            }
            Event::RegistryRebuildRequested { cause } => {
                log::debug!(target: "events", "[tick {}] RegistryRebuildRequested cause={:?}", tick, cause);
            }
        }
    }
}
