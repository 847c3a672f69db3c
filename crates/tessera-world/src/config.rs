use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::error::Error;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use tessera_noise::Fractal;

#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    #[serde(default = "default_seed")]
    pub seed: u32,
    #[serde(default = "default_mountain_amplitude")]
    pub mountain_amplitude: f64,
    #[serde(default = "default_valley_amplitude")]
    pub valley_amplitude: f64,
    #[serde(default)]
    pub terrain_type: TerrainType,
    #[serde(default = "default_sea_level")]
    pub sea_level: f64,
    #[serde(default = "default_base_offset")]
    pub base_offset: f64,
    #[serde(default = "default_layers")]
    pub layers: Vec<NoiseLayer>,
    #[serde(default = "default_rivers")]
    pub rivers: Channel,
    #[serde(default = "default_roads")]
    pub roads: Channel,
    #[serde(default)]
    pub caves: Caves,
    #[serde(default)]
    pub column: Column,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            mountain_amplitude: default_mountain_amplitude(),
            valley_amplitude: default_valley_amplitude(),
            terrain_type: TerrainType::default(),
            sea_level: default_sea_level(),
            base_offset: default_base_offset(),
            layers: default_layers(),
            rivers: default_rivers(),
            roads: default_roads(),
            caves: Caves::default(),
            column: Column::default(),
        }
    }
}

fn default_seed() -> u32 {
    1
}
fn default_mountain_amplitude() -> f64 {
    240.0
}
fn default_valley_amplitude() -> f64 {
    20.0
}
fn default_sea_level() -> f64 {
    -10.0
}
fn default_base_offset() -> f64 {
    -5.0
}

/// Smooth fBm hills or ridged "terragen" style peaks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainType {
    Smooth,
    #[default]
    #[serde(alias = "terragen")]
    Ridged,
}

impl TerrainType {
    #[inline]
    pub fn fractal(self) -> Fractal {
        match self {
            TerrainType::Smooth => Fractal::Smooth,
            TerrainType::Ridged => Fractal::Ridged,
        }
    }
}

impl std::str::FromStr for TerrainType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smooth" => Ok(TerrainType::Smooth),
            "ridged" | "terragen" => Ok(TerrainType::Ridged),
            other => Err(format!("unknown terrain type '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct NoiseLayer {
    pub frequency: f64,
    #[serde(default = "d_one")]
    pub weight: f64,
    #[serde(default = "default_layer_octaves")]
    pub octaves: u32,
}
fn d_one() -> f64 {
    1.0
}
fn default_layer_octaves() -> u32 {
    tessera_noise::DEFAULT_OCTAVES_2D
}

// Continent, hills, detail.
fn default_layers() -> Vec<NoiseLayer> {
    vec![
        NoiseLayer {
            frequency: 0.0025,
            weight: 0.35,
            octaves: 4,
        },
        NoiseLayer {
            frequency: 0.01,
            weight: 0.55,
            octaves: 6,
        },
        NoiseLayer {
            frequency: 0.04,
            weight: 0.10,
            octaves: 3,
        },
    ]
}

/// A linear depression carved where a low-frequency noise channel crosses zero.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Channel {
    #[serde(default = "d_true")]
    pub enable: bool,
    pub frequency: f64,
    pub threshold: f64,
    pub depth_scale: f64,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_z: f64,
}
fn d_true() -> bool {
    true
}
fn default_rivers() -> Channel {
    Channel {
        enable: true,
        frequency: 0.0008,
        threshold: 0.02,
        depth_scale: 100.0,
        offset_x: 0.0,
        offset_z: 0.0,
    }
}
fn default_roads() -> Channel {
    Channel {
        enable: true,
        frequency: 0.0009,
        threshold: 0.01,
        depth_scale: 50.0,
        offset_x: 1000.0,
        offset_z: -1000.0,
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Caves {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "default_cave_freq")]
    pub frequency: f64,
    #[serde(default = "default_cave_amp")]
    pub amplitude: f64,
    #[serde(default = "default_cave_octaves")]
    pub octaves: u32,
}
fn default_cave_freq() -> f64 {
    0.02
}
fn default_cave_amp() -> f64 {
    15.0
}
fn default_cave_octaves() -> u32 {
    tessera_noise::DEFAULT_OCTAVES_3D
}
impl Default for Caves {
    fn default() -> Self {
        Self {
            enable: false,
            frequency: default_cave_freq(),
            amplitude: default_cave_amp(),
            octaves: default_cave_octaves(),
        }
    }
}

/// Vertical scan range for the topmost solid voxel; `step` is the voxel size.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Column {
    #[serde(default = "default_column_top")]
    pub top: f64,
    #[serde(default = "default_column_bottom")]
    pub bottom: f64,
    #[serde(default = "default_column_step")]
    pub step: f64,
}
fn default_column_top() -> f64 {
    80.0
}
fn default_column_bottom() -> f64 {
    -40.0
}
fn default_column_step() -> f64 {
    4.0
}
impl Default for Column {
    fn default() -> Self {
        Self {
            top: default_column_top(),
            bottom: default_column_bottom(),
            step: default_column_step(),
        }
    }
}

#[inline]
fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}

impl TerrainConfig {
    /// Replaces non-finite or out-of-range values with defaults/minimums. Never fails.
    pub fn sanitized(mut self) -> Self {
        self.mountain_amplitude =
            finite_or(self.mountain_amplitude, default_mountain_amplitude()).max(0.0);
        self.valley_amplitude =
            finite_or(self.valley_amplitude, default_valley_amplitude()).max(0.0);
        self.sea_level = finite_or(self.sea_level, default_sea_level());
        self.base_offset = finite_or(self.base_offset, default_base_offset());
        self.layers.retain(|l| {
            l.frequency.is_finite() && l.frequency > 0.0 && l.weight.is_finite() && l.weight > 0.0
        });
        for l in &mut self.layers {
            l.octaves = l.octaves.clamp(1, 12);
        }
        if self.layers.is_empty() {
            self.layers = default_layers();
        }
        sanitize_channel(&mut self.rivers, default_rivers());
        sanitize_channel(&mut self.roads, default_roads());
        let caves = Caves::default();
        self.caves.frequency = finite_or(self.caves.frequency, caves.frequency);
        self.caves.amplitude = finite_or(self.caves.amplitude, caves.amplitude);
        self.caves.octaves = self.caves.octaves.clamp(1, 8);
        let col = Column::default();
        self.column.step = finite_or(self.column.step, col.step).max(0.25);
        self.column.top = finite_or(self.column.top, col.top);
        self.column.bottom = finite_or(self.column.bottom, col.bottom);
        if self.column.bottom >= self.column.top {
            self.column.top = col.top;
            self.column.bottom = col.bottom;
        }
        self
    }

    /// Stable digest of every value that affects sampled heights.
    pub fn fingerprint(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.seed.hash(&mut h);
        self.mountain_amplitude.to_bits().hash(&mut h);
        self.valley_amplitude.to_bits().hash(&mut h);
        self.terrain_type.hash(&mut h);
        self.sea_level.to_bits().hash(&mut h);
        self.base_offset.to_bits().hash(&mut h);
        for l in &self.layers {
            l.frequency.to_bits().hash(&mut h);
            l.weight.to_bits().hash(&mut h);
            l.octaves.hash(&mut h);
        }
        for c in [&self.rivers, &self.roads] {
            c.enable.hash(&mut h);
            c.frequency.to_bits().hash(&mut h);
            c.threshold.to_bits().hash(&mut h);
            c.depth_scale.to_bits().hash(&mut h);
            c.offset_x.to_bits().hash(&mut h);
            c.offset_z.to_bits().hash(&mut h);
        }
        self.caves.enable.hash(&mut h);
        self.caves.frequency.to_bits().hash(&mut h);
        self.caves.amplitude.to_bits().hash(&mut h);
        self.caves.octaves.hash(&mut h);
        self.column.top.to_bits().hash(&mut h);
        self.column.bottom.to_bits().hash(&mut h);
        self.column.step.to_bits().hash(&mut h);
        h.finish()
    }
}

fn sanitize_channel(c: &mut Channel, fallback: Channel) {
    if !(c.frequency.is_finite() && c.frequency > 0.0) {
        c.frequency = fallback.frequency;
    }
    c.threshold = finite_or(c.threshold, fallback.threshold).max(0.0);
    c.depth_scale = finite_or(c.depth_scale, fallback.depth_scale).max(0.0);
    c.offset_x = finite_or(c.offset_x, fallback.offset_x);
    c.offset_z = finite_or(c.offset_z, fallback.offset_z);
}

/// Surface shading and window sizing for the displaced ground mesh.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GroundConfig {
    #[serde(default = "default_grid_step")]
    pub grid_step: f64,
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,
    #[serde(default = "default_beach_height")]
    pub beach_height: f64,
    #[serde(default = "default_rock_slope_start")]
    pub rock_slope_start: f64,
    #[serde(default = "default_rock_slope_range")]
    pub rock_slope_range: f64,
    #[serde(default = "default_recenter_fraction")]
    pub recenter_fraction: f64,
    #[serde(default = "default_voxel_extent")]
    pub voxel_extent: f64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}
fn default_grid_step() -> f64 {
    2.0
}
fn default_max_segments() -> usize {
    1024
}
fn default_beach_height() -> f64 {
    3.0
}
fn default_rock_slope_start() -> f64 {
    2.0
}
fn default_rock_slope_range() -> f64 {
    10.0
}
fn default_recenter_fraction() -> f64 {
    0.1
}
fn default_voxel_extent() -> f64 {
    128.0
}
fn default_cache_capacity() -> usize {
    1 << 18
}
impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            grid_step: default_grid_step(),
            max_segments: default_max_segments(),
            beach_height: default_beach_height(),
            rock_slope_start: default_rock_slope_start(),
            rock_slope_range: default_rock_slope_range(),
            recenter_fraction: default_recenter_fraction(),
            voxel_extent: default_voxel_extent(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl GroundConfig {
    pub fn sanitized(mut self) -> Self {
        let d = GroundConfig::default();
        if !(self.grid_step.is_finite() && self.grid_step > 0.0) {
            self.grid_step = d.grid_step;
        }
        self.max_segments = self.max_segments.max(1);
        self.beach_height = finite_or(self.beach_height, d.beach_height).max(0.0);
        self.rock_slope_start = finite_or(self.rock_slope_start, d.rock_slope_start);
        if !(self.rock_slope_range.is_finite() && self.rock_slope_range > 0.0) {
            self.rock_slope_range = d.rock_slope_range;
        }
        if !(self.recenter_fraction.is_finite() && self.recenter_fraction > 0.0) {
            self.recenter_fraction = d.recenter_fraction;
        }
        self.recenter_fraction = self.recenter_fraction.min(0.5);
        if !(self.voxel_extent.is_finite() && self.voxel_extent > 0.0) {
            self.voxel_extent = d.voxel_extent;
        }
        self.cache_capacity = self.cache_capacity.max(1);
        self
    }
}

pub fn load_terrain_config_from_path(path: &Path) -> Result<TerrainConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: TerrainConfig = toml::from_str(&s)?;
    Ok(cfg.sanitized())
}
