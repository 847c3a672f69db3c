#![forbid(unsafe_code)]

mod app;
mod config;
mod event;
mod gamestate;
mod scene;

use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tessera_geom::Vec3;
use tessera_physics::MoveIntent;
use tessera_runtime::ChunkWorkers;
use tessera_world::TerrainType;

use crate::app::App;
use crate::config::{SandboxConfig, load_config_from_path};
use crate::event::{Event, TerrainChange};
use crate::scene::LogScene;

#[derive(Parser, Debug)]
#[command(name = "tessera", about = "Headless terrain sandbox: streams chunks and walks a player through them")]
struct Cli {
    /// TOML settings file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u32>,
    /// Frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u64,
    #[arg(long)]
    view_distance: Option<u32>,
    #[arg(long)]
    chunk_size: Option<u32>,
    /// smooth | ridged
    #[arg(long)]
    terrain_type: Option<TerrainType>,
    /// Generate chunk decorations on worker threads
    #[arg(long)]
    background: bool,
    #[arg(long)]
    mountain_amplitude: Option<f64>,
    #[arg(long)]
    valley_amplitude: Option<f64>,
    #[arg(long)]
    sea_level: Option<f64>,
    #[arg(long)]
    walk_speed: Option<f64>,
    #[arg(long)]
    run_multiplier: Option<f64>,
    #[arg(long)]
    jump_strength: Option<f64>,
    #[arg(long)]
    step_height: Option<f64>,
    /// Start with procedural decoration switched off
    #[arg(long)]
    no_procgen: bool,
    #[arg(long, default_value = "info")]
    log_level: String,
    #[arg(long, default_value_t = 60.0)]
    fps: f64,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str()))
        .init();

    let cfg = match &cli.config {
        Some(path) => load_config_from_path(path)?,
        None => SandboxConfig::default(),
    };

    let mut app = App::new(&cfg, Box::new(LogScene::default()));
    if cli.background {
        let workers = ChunkWorkers::new(ChunkWorkers::default_worker_count(), app.gs.chunks.generator())?;
        app.attach_workers(workers);
    }
    apply_overrides(&mut app, &cli);

    let fps = if cli.fps.is_finite() && cli.fps > 1.0 { cli.fps } else { 60.0 };
    let dt = 1.0 / fps;
    let start = Instant::now();
    for frame in 0..cli.frames {
        let now = start + Duration::from_secs_f64(frame as f64 * dt);
        let intent = scripted_intent(frame, dt);
        if frame % 400 == 120 {
            // A knee-high crate just ahead, to be stepped over.
            let (fwd, _) = intent.basis();
            let center = app.gs.body.position + fwd * 3.0 + Vec3::new(0.0, 0.4, 0.0);
            app.queue.emit_now(Event::BlockSpawnRequested {
                center,
                size: Vec3::new(1.0, 0.8, 1.0),
            });
        }
        if frame > 0 && frame % 240 == 0 {
            app.queue.emit_now(Event::BlockSpawnAtViewRequested {
                size: Vec3::new(1.0, 1.0, 1.0),
            });
        }
        if frame % 1200 == 1199 {
            app.queue.emit_now(Event::UserBlocksClearRequested);
        }
        app.step(dt, intent, now);
    }
    app.settle(Duration::from_secs(10), Instant::now());

    let p = app.gs.body.position;
    let stats = app.gs.sampler.cache_stats();
    log::info!(
        "done: {} ticks ({}), player=({:.1}, {:.1}, {:.1}) chunks={} boxes={} user={} cache hits={} misses={} evictions={} events left={} (in {:.2?})",
        app.gs.tick,
        if app.background() { "background" } else { "inline" },
        p.x,
        p.y,
        p.z,
        app.gs.chunks.len(),
        app.gs.registry.len(),
        app.gs.registry.user_block_count(),
        stats.hits,
        stats.misses,
        stats.evictions,
        app.queue.pending(),
        start.elapsed()
    );
    log::info!("scene: {}", app.scene.summary());
    Ok(())
}

/// Flags that map onto runtime setters rather than the loaded config.
fn apply_overrides(app: &mut App, cli: &Cli) {
    if let Some(v) = cli.view_distance {
        app.gs.set_view_distance(v);
    }
    if let Some(c) = cli.chunk_size {
        app.gs.set_chunk_size(c);
    }
    if let Some(v) = cli.walk_speed {
        app.gs.set_walk_speed(v);
    }
    if let Some(v) = cli.run_multiplier {
        app.gs.set_run_multiplier(v);
    }
    if let Some(v) = cli.jump_strength {
        app.gs.set_jump_strength(v);
    }
    if let Some(v) = cli.step_height {
        app.gs.set_step_height(v);
    }
    let retunes = [
        cli.seed.map(TerrainChange::Seed),
        cli.terrain_type.map(TerrainChange::Type),
        cli.mountain_amplitude.map(TerrainChange::MountainAmplitude),
        cli.valley_amplitude.map(TerrainChange::ValleyAmplitude),
        cli.sea_level.map(TerrainChange::SeaLevel),
    ];
    for change in retunes.into_iter().flatten() {
        app.queue.emit_now(Event::TerrainRetuneRequested { change });
    }
    if cli.no_procgen {
        app.queue.emit_now(Event::ProcgenToggled { enabled: false });
    }
}

/// Walks forward while slowly turning, hopping now and then.
fn scripted_intent(frame: u64, dt: f64) -> MoveIntent {
    let yaw = frame as f64 * dt * 0.2;
    MoveIntent {
        forward: true,
        run: (frame / 300) % 2 == 1,
        jump: frame % 90 == 45,
        view_dir: Vec3::new(yaw.sin(), -0.25, -yaw.cos()),
        ..MoveIntent::default()
    }
}
