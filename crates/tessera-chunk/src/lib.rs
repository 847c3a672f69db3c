//! Chunk streaming around a moving viewer, with LOD bands and deterministic decoration.
#![forbid(unsafe_code)]

mod coord;
mod decoration;
mod lod;
mod manager;

pub use coord::ChunkCoord;
pub use decoration::{
    ChunkJob, Decoration, DecorationGenerator, GenerateError, ScatterBlocks, chunk_seed,
};
pub use lod::Lod;
pub use manager::{
    ChunkEffects, ChunkManager, ChunkRecord, ChunkResult, InstallOutcome, LodChange,
    MAX_VIEW_DISTANCE, MIN_CHUNK_SIZE, MIN_VIEW_DISTANCE, StreamConfig, StreamPlan,
};
