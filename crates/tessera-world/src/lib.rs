//! Terrain sampling: height/density fields, the height cache, and the ground window.
#![forbid(unsafe_code)]

mod cache;
pub mod config;
mod ground;
mod sampler;

pub use cache::{CACHE_QUANT, HeightCache, HeightCacheStats, quantize};
pub use config::{
    Caves, Channel, Column, GroundConfig, NoiseLayer, TerrainConfig, TerrainType,
    load_terrain_config_from_path,
};
pub use ground::{GroundGrid, GroundWindow};
pub use sampler::{HeightSampler, SurfaceFeature, SurfaceKind, SurfaceSample, TerrainHit};
