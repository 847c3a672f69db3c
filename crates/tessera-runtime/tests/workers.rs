use std::sync::Arc;
use std::time::Duration;

use tessera_chunk::{ChunkManager, ScatterBlocks, StreamConfig};
use tessera_geom::Vec3;
use tessera_runtime::ChunkWorkers;
use tessera_world::{HeightSampler, TerrainConfig};

fn manager() -> ChunkManager {
    ChunkManager::new(
        StreamConfig {
            view_distance: 3,
            ..StreamConfig::default()
        },
        Arc::new(ScatterBlocks::default()),
    )
}

fn sampler() -> Arc<HeightSampler> {
    Arc::new(HeightSampler::new(TerrainConfig::default()))
}

#[test]
fn background_pass_matches_synchronous_pass() {
    let sampler = sampler();
    let mut sync = manager();
    sync.force_update(Vec3::new(40.0, 0.0, -70.0), &sampler);

    let mut bg = manager();
    let workers = ChunkWorkers::new(3, bg.generator()).unwrap();
    workers
        .schedule(&mut bg, Vec3::new(40.0, 0.0, -70.0), &sampler)
        .unwrap();
    let fx = workers
        .pump_until_idle(&mut bg, Duration::from_secs(30))
        .unwrap();

    assert_eq!(fx.loaded.len(), 49);
    assert_eq!(workers.queue_counts(), (0, 0));
    assert_eq!(bg.loaded_coords(), sync.loaded_coords());
    for (a, b) in bg.records_sorted().into_iter().zip(sync.records_sorted()) {
        assert_eq!(a.lod, b.lod);
        assert_eq!(a.decorations, b.decorations);
    }
}

#[test]
fn results_from_before_a_reset_are_discarded() {
    let sampler = sampler();
    let mut m = manager();
    let workers = ChunkWorkers::new(2, m.generator()).unwrap();
    workers.schedule(&mut m, Vec3::ZERO, &sampler).unwrap();
    m.reset();

    // Let the old jobs finish, then publish whatever arrived.
    std::thread::sleep(Duration::from_millis(200));
    let fx = workers.pump(&mut m);
    assert!(fx.loaded.is_empty());
    assert!(m.is_empty());

    // A new pass after the reset still fills the world.
    workers.schedule(&mut m, Vec3::ZERO, &sampler).unwrap();
    workers
        .pump_until_idle(&mut m, Duration::from_secs(30))
        .unwrap();
    assert_eq!(m.len(), 49);
}

#[test]
fn repeated_schedule_does_not_duplicate_jobs() {
    let sampler = sampler();
    let mut m = manager();
    let workers = ChunkWorkers::new(1, m.generator()).unwrap();
    workers.schedule(&mut m, Vec3::ZERO, &sampler).unwrap();
    let pending = m.pending_len();
    workers.schedule(&mut m, Vec3::ZERO, &sampler).unwrap();
    assert_eq!(m.pending_len(), pending);
    workers
        .pump_until_idle(&mut m, Duration::from_secs(30))
        .unwrap();
    assert_eq!(m.pending_len(), 0);
}
