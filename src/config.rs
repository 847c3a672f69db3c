use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

use tessera_chunk::StreamConfig;
use tessera_geom::{Aabb, Vec3};
use tessera_physics::{MotionParams, default_presets};
use tessera_world::{GroundConfig, TerrainConfig};

/// A static platform, placed by the centre of its bottom face.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct PresetBox {
    pub base: [f64; 3],
    pub size: [f64; 3],
}

impl PresetBox {
    pub fn to_aabb(self) -> Aabb {
        let [bx, by, bz] = self.base;
        let [sx, sy, sz] = self.size;
        Aabb::from_base(Vec3::new(bx, by, bz), Vec3::new(sx, sy, sz))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SandboxConfig {
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub player: MotionParams,
    #[serde(default)]
    pub ground: GroundConfig,
    /// Missing means the built-in platforms; an empty list means none.
    #[serde(default)]
    pub presets: Option<Vec<PresetBox>>,
    #[serde(default = "default_spawn")]
    pub spawn: [f64; 2],
}
fn default_spawn() -> [f64; 2] {
    [0.0, 8.0]
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            terrain: TerrainConfig::default(),
            stream: StreamConfig::default(),
            player: MotionParams::default(),
            ground: GroundConfig::default(),
            presets: None,
            spawn: default_spawn(),
        }
    }
}

impl SandboxConfig {
    pub fn preset_boxes(&self) -> Vec<Aabb> {
        match &self.presets {
            Some(list) => list
                .iter()
                .map(|p| p.to_aabb())
                .filter(|b| b.is_finite())
                .collect(),
            None => default_presets(),
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<SandboxConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: SandboxConfig = toml::from_str(&s)?;
    Ok(cfg)
}
