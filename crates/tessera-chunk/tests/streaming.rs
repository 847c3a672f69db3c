use std::collections::BTreeSet;
use std::sync::Arc;
use tessera_chunk::{ChunkCoord, ChunkManager, ScatterBlocks, StreamConfig};
use tessera_geom::Vec3;
use tessera_world::{HeightSampler, TerrainConfig};

fn manager(view: u32) -> ChunkManager {
    ChunkManager::new(
        StreamConfig {
            view_distance: view,
            ..StreamConfig::default()
        },
        Arc::new(ScatterBlocks::default()),
    )
}

fn chebyshev_square(center: ChunkCoord, r: i32) -> BTreeSet<ChunkCoord> {
    let mut s = BTreeSet::new();
    for dz in -r..=r {
        for dx in -r..=r {
            s.insert(center.offset(dx, dz));
        }
    }
    s
}

#[test]
fn loaded_set_is_exact_chebyshev_square() {
    let sampler = HeightSampler::new(TerrainConfig::default());
    let mut m = manager(5);
    let fx = m.force_update(Vec3::ZERO, &sampler);
    let loaded: BTreeSet<ChunkCoord> = m.loaded_coords().into_iter().collect();
    assert_eq!(loaded, chebyshev_square(ChunkCoord::new(0, 0), 5));
    assert_eq!(fx.loaded.len(), 121);
    assert!(fx.unloaded.is_empty());
}

#[test]
fn far_move_swaps_the_whole_set() {
    let sampler = HeightSampler::new(TerrainConfig::default());
    let mut m = manager(5);
    m.force_update(Vec3::ZERO, &sampler);
    let before: BTreeSet<ChunkCoord> = m.loaded_coords().into_iter().collect();

    let far = Vec3::new(10_000.0, 0.0, 10_000.0);
    let fx = m.force_update(far, &sampler);
    let unloaded: BTreeSet<ChunkCoord> = fx.unloaded.iter().copied().collect();
    assert_eq!(unloaded, before);

    let center = ChunkCoord::from_world(far.x, far.z, 32);
    assert_eq!(center, ChunkCoord::new(312, 312));
    let loaded: BTreeSet<ChunkCoord> = m.loaded_coords().into_iter().collect();
    assert_eq!(loaded, chebyshev_square(center, 5));
    assert!(loaded.is_disjoint(&before));
}

#[test]
fn decoration_survives_unload_reload_cycle() {
    // Nothing is underwater, so every chunk carries decoration.
    let sampler = HeightSampler::new(TerrainConfig {
        sea_level: -1000.0,
        ..TerrainConfig::default()
    });
    let mut m = manager(3);
    m.force_update(Vec3::ZERO, &sampler);
    let coord = ChunkCoord::new(1, -1);
    let first = m.get(coord).expect("loaded").decorations.clone();
    assert!(!first.is_empty());

    m.force_update(Vec3::new(5_000.0, 0.0, 0.0), &sampler);
    assert!(m.get(coord).is_none());

    m.force_update(Vec3::ZERO, &sampler);
    let second = m.get(coord).expect("reloaded").decorations.clone();
    assert_eq!(first.len(), second.len());
    assert_eq!(first, second);
}

#[test]
fn reset_then_update_reproduces_the_same_world() {
    let sampler = HeightSampler::new(TerrainConfig::default());
    let mut m = manager(2);
    m.force_update(Vec3::ZERO, &sampler);
    let a = m.decoration_boxes();
    let epoch = m.epoch();
    m.reset();
    assert!(m.epoch() > epoch);
    m.force_update(Vec3::ZERO, &sampler);
    assert_eq!(a, m.decoration_boxes());
}

#[test]
fn chunk_size_change_drops_every_chunk() {
    let sampler = HeightSampler::new(TerrainConfig::default());
    let mut m = manager(2);
    m.force_update(Vec3::ZERO, &sampler);
    let fx = m.set_chunk_size(64);
    assert_eq!(fx.unloaded.len(), 25);
    assert!(m.is_empty());
    assert_eq!(m.set_chunk_size(3).unloaded.len(), 0);
    assert_eq!(m.chunk_size(), 8);
}

#[test]
fn revision_tracks_structural_changes() {
    let sampler = HeightSampler::new(TerrainConfig::default());
    let mut m = manager(1);
    let r0 = m.revision();
    m.force_update(Vec3::ZERO, &sampler);
    let r1 = m.revision();
    assert!(r1 > r0);
    // same viewer chunk: nothing to do
    let fx = m.force_update(Vec3::new(1.0, 0.0, 1.0), &sampler);
    assert!(fx.is_empty());
    assert_eq!(m.revision(), r1);
}
