use std::collections::{BTreeMap, VecDeque};

use tessera_chunk::{ChunkCoord, Lod};
use tessera_geom::Vec3;
use tessera_physics::MoveIntent;
use tessera_world::TerrainType;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RebuildCause {
    Chunks,
    UserBlocks,
    Terrain,
    Recenter,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    // Time housekeeping
    Tick,

    // Input-derived intents
    MovementRequested { dt_ms: u32, intent: MoveIntent },
    BlockSpawnRequested { center: Vec3, size: Vec3 },
    BlockSpawnAtViewRequested { size: Vec3 },
    UserBlocksClearRequested,

    // Settings
    TerrainRetuneRequested { change: TerrainChange },
    ProcgenToggled { enabled: bool },

    // Player/view
    ViewCenterChanged { center: ChunkCoord },
    PlayerRecovered { position: Vec3 },
    GroundRecentered { dx: f64, dz: f64 },

    // Streaming
    ChunkLoaded { coord: ChunkCoord, lod: Lod },
    ChunkUnloaded { coord: ChunkCoord },
    ChunkLodChanged { coord: ChunkCoord, from: Lod, to: Lod },

    // Collision set
    RegistryRebuildRequested { cause: RebuildCause },
}

/// One terrain setting from the configuration surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TerrainChange {
    Seed(u32),
    MountainAmplitude(f64),
    ValleyAmplitude(f64),
    Type(TerrainType),
    SeaLevel(f64),
}

pub struct EventEnvelope {
    pub id: u64,
    pub tick: u64,
    pub kind: Event,
}

pub struct EventQueue {
    // map of tick -> FIFO queue of events
    by_tick: BTreeMap<u64, VecDeque<EventEnvelope>>,
    pub now: u64,
    next_id: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self {
            by_tick: BTreeMap::new(),
            now: 0,
            next_id: 1,
        }
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    pub fn emit_now(&mut self, kind: Event) -> u64 {
        self.emit_at(self.now, kind)
    }

    pub fn emit_at(&mut self, tick: u64, kind: Event) -> u64 {
        let id = self.alloc_id();
        // Never schedule into a tick that has already been drained.
        let tick = tick.max(self.now);
        let env = EventEnvelope { id, tick, kind };
        self.by_tick.entry(tick).or_default().push_back(env);
        id
    }

    pub fn pop_ready(&mut self) -> Option<EventEnvelope> {
        self.by_tick
            .get_mut(&self.now)
            .and_then(|q| q.pop_front())
    }

    pub fn pending(&self) -> usize {
        self.by_tick.values().map(VecDeque::len).sum()
    }

    pub fn advance_tick(&mut self) {
        if self.by_tick.get(&self.now).is_some_and(VecDeque::is_empty) {
            self.by_tick.remove(&self.now);
        }
        self.now = self.now.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tick_is_fifo_and_future_waits() {
        let mut q = EventQueue::new();
        q.emit_at(1, Event::UserBlocksClearRequested);
        let a = q.emit_now(Event::Tick);
        let b = q.emit_now(Event::ProcgenToggled { enabled: false });
        assert_eq!(q.pop_ready().map(|e| e.id), Some(a));
        assert_eq!(q.pop_ready().map(|e| e.id), Some(b));
        assert!(q.pop_ready().is_none());
        assert_eq!(q.pending(), 1);

        q.advance_tick();
        let e = q.pop_ready().unwrap();
        assert_eq!(e.tick, 1);
        assert_eq!(e.kind, Event::UserBlocksClearRequested);
        q.advance_tick();
        assert_eq!(q.pending(), 0);
    }
}
