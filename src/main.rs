//! # Paged Voxel World Demo
//!
//! Generates a terrain level, walks a viewer across it with a headless
//! backend so chunks page out and back in, then saves the level.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json] [output.dat]
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use cgmath::Point3;
use web_time::{Duration, Instant};

use paged_voxel_world::{
    init_logger, CameraFrame, ChunkAction, EngineState, PerlinTerrain, RecordingBackend,
    RendererCommand, WorldConfig,
};

const TERRAIN_RADIUS: i32 = 160;
const WALK_FRAMES: usize = 600;
const TASK_TIMEOUT: Duration = Duration::from_secs(60);

/// Pumps the engine until a bulk operation reports back.
fn wait_for_task(engine: &mut EngineState) -> Option<RendererCommand> {
    let deadline = Instant::now() + TASK_TIMEOUT;
    while Instant::now() < deadline {
        if let Some(command) = engine.process_tasks().into_iter().next() {
            return Some(command);
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

fn main() -> ExitCode {
    init_logger();

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => match WorldConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(error) => {
                log::error!("Could not read configuration {:?}: {}", path, error);
                return ExitCode::FAILURE;
            }
        },
        None => WorldConfig::default(),
    };
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("paged-voxel-world-demo.dat"));

    let mut engine = match EngineState::new(config) {
        Ok(engine) => engine,
        Err(error) => {
            log::error!("Could not create level: {}", error);
            return ExitCode::FAILURE;
        }
    };

    let seed = fastrand::u32(..);
    log::info!("Generating terrain with seed {}", seed);
    engine.generate(Arc::new(PerlinTerrain::new(seed)), TERRAIN_RADIUS);
    match wait_for_task(&mut engine) {
        Some(RendererCommand::LevelReplaced { blocks }) => log::info!("Level holds {} blocks", blocks),
        other => {
            log::error!("Generation did not complete: {:?}", other);
            return ExitCode::FAILURE;
        }
    }

    let mut backend = RecordingBackend::new();
    let (mut loads, mut evictions) = (0, 0);
    for frame in 0..WALK_FRAMES {
        let x = -200.0 + 400.0 * frame as f32 / WALK_FRAMES as f32;
        let camera = CameraFrame {
            position: Point3::new(x, 20.0, 0.0),
            ..CameraFrame::default()
        };
        for action in engine.update(camera).unwrap_or_default() {
            match action.action {
                ChunkAction::Loaded => loads += 1,
                ChunkAction::Evicted => evictions += 1,
                _ => {}
            }
        }
        backend.clear_frame();
        engine.render(&mut backend, &|_| true);
    }
    log::info!(
        "Walk finished: {} chunk loads, {} evictions, {} live templates, {} draws in the last frame",
        loads,
        evictions,
        backend.live_templates(),
        backend.draws.len()
    );

    engine.save(&output);
    match wait_for_task(&mut engine) {
        Some(RendererCommand::LevelSaved { path, blocks }) => {
            log::info!("Saved {} blocks to {:?}", blocks, path);
            ExitCode::SUCCESS
        }
        other => {
            log::error!("Save did not complete: {:?}", other);
            ExitCode::FAILURE
        }
    }
}
