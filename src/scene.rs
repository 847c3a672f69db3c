use tessera_chunk::{ChunkCoord, ChunkRecord, Lod};
use tessera_geom::Vec3;
use tessera_world::GroundGrid;

/// What the renderer is told about. The session never names an engine; a
/// front end implements this and draws whatever it receives.
pub trait SceneSink {
    fn chunk_loaded(&mut self, record: &ChunkRecord);
    fn chunk_unloaded(&mut self, coord: ChunkCoord);
    fn chunk_lod_changed(&mut self, record: &ChunkRecord, from: Lod);
    fn ground_rebuilt(&mut self, grid: &GroundGrid);
    fn user_blocks_changed(&mut self, count: usize);
    fn camera_pose(&mut self, eye: Vec3, view_dir: Vec3);

    fn summary(&self) -> String {
        String::new()
    }
}

/// Headless sink: logs scene changes and keeps running totals.
#[derive(Default, Debug)]
pub struct LogScene {
    pub chunks: usize,
    pub decorations: usize,
    pub ground_builds: usize,
    pub last_eye: Option<Vec3>,
}

impl SceneSink for LogScene {
    fn chunk_loaded(&mut self, record: &ChunkRecord) {
        self.chunks += 1;
        self.decorations += record.decorations.len();
        log::trace!(
            "scene: chunk {} lod={:?} objects={}",
            record.coord,
            record.lod,
            record.decorations.len()
        );
    }

    fn chunk_unloaded(&mut self, coord: ChunkCoord) {
        self.chunks = self.chunks.saturating_sub(1);
        log::trace!("scene: drop chunk {}", coord);
    }

    fn chunk_lod_changed(&mut self, record: &ChunkRecord, from: Lod) {
        log::trace!("scene: chunk {} lod {:?} -> {:?}", record.coord, from, record.lod);
    }

    fn ground_rebuilt(&mut self, grid: &GroundGrid) {
        self.ground_builds += 1;
        log::debug!(
            "scene: ground {}x{} at ({:.1}, {:.1})",
            grid.segments,
            grid.segments,
            grid.origin_x,
            grid.origin_z
        );
    }

    fn user_blocks_changed(&mut self, count: usize) {
        log::debug!("scene: {} user blocks", count);
    }

    fn camera_pose(&mut self, eye: Vec3, _view_dir: Vec3) {
        self.last_eye = Some(eye);
    }

    fn summary(&self) -> String {
        let eye = self
            .last_eye
            .map(|e| format!("({:.1}, {:.1}, {:.1})", e.x, e.y, e.z))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} chunks, {} objects, {} ground builds, eye {}",
            self.chunks, self.decorations, self.ground_builds, eye
        )
    }
}
