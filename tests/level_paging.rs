//! # Level Paging Integration Tests
//!
//! Drives a level through its public surface: culling, capacity, paging to
//! the disk cache and back, persistence and the bulk operation guard.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cgmath::Point3;
use paged_voxel_world::engine_state::voxels::block::block_side::BlockSide;
use paged_voxel_world::engine_state::voxels::chunk::chunk_grid::{chunk_func, inv_chunk_func, CHUNK_WIDTH, GRID_SIZE};
use paged_voxel_world::engine_state::voxels::chunk::ChunkState;
use paged_voxel_world::{
    Block, BlockKind, BlockPos, ChunkAction, ChunkId, CodecError, EngineState, Level, LevelError, PerlinTerrain,
    RecordingBackend, RendererCommand, WorldConfig,
};

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("paged-voxel-world-it-{}-{}", name, std::process::id()))
}

fn config(name: &str) -> WorldConfig {
    WorldConfig {
        vision_radius: 1,
        time_to_live: 1,
        ..WorldConfig::default()
    }
    .with_cache_dir(scratch_dir(name))
}

fn stone(x: f32, y: f32, z: f32) -> Block {
    Block::solid(Point3::new(x, y, z), "stone")
}

/// Every tuple member carries the tuple's texture and face mask, and that
/// mask agrees with the adjacency index.
fn assert_tuples_consistent(level: &Level) {
    for kind in [BlockKind::Solid, BlockKind::Fluid] {
        for chunk in level.chunk_set(kind).chunks() {
            for tuple in chunk.tuples() {
                for block in tuple.members() {
                    assert_eq!(block.face_mask, tuple.key().mask);
                    assert_eq!(block.texture(), tuple.key().texture);
                    assert_eq!(level.face_mask_at(kind, block.position), Some(block.face_mask));
                }
            }
        }
    }
}

/// Ticks until `done` holds, with the viewer parked at `viewer`.
fn tick_until(level: &mut Level, viewer: Point3<f32>, done: impl Fn(&Level) -> bool) {
    for _ in 0..GRID_SIZE * 8 {
        if done(level) {
            return;
        }
        level.determine_visible(viewer);
        level.chunk_operations();
    }
    assert!(done(level), "paging did not settle");
}

fn sorted_records(blocks: &[Block]) -> Vec<(String, BlockPos, [u32; 3], BlockKind)> {
    let mut records: Vec<_> = blocks
        .iter()
        .map(|block| {
            (
                block.texture().as_str().to_string(),
                block.position,
                block.material.color.map(f32::to_bits),
                block.kind,
            )
        })
        .collect();
    records.sort_by(|a, b| (a.1, &a.0).cmp(&(b.1, &b.0)));
    records
}

#[test]
fn neighbouring_stones_hide_shared_faces() {
    let mut level = Level::new(config("stones")).unwrap();
    assert!(level.add_block(stone(0.0, 0.0, 0.0), true));
    assert!(level.add_block(stone(2.0, 0.0, 0.0), true));

    let left = level.face_mask_at(BlockKind::Solid, BlockPos::new(0, 0, 0)).unwrap();
    let right = level.face_mask_at(BlockKind::Solid, BlockPos::new(2, 0, 0)).unwrap();
    assert!(!left.contains(BlockSide::RIGHT));
    assert!(!right.contains(BlockSide::LEFT));
    assert_eq!(left.count(), 5);
    assert_eq!(right.count(), 5);
    assert_tuples_consistent(&level);

    assert!(level.remove_block(&stone(2.0, 0.0, 0.0), true));
    let restored = level.face_mask_at(BlockKind::Solid, BlockPos::new(0, 0, 0)).unwrap();
    assert_eq!(restored.bits(), 63);
    assert_eq!(level.block_at(BlockPos::new(0, 0, 0)).unwrap().face_mask.bits(), 63);
    assert_tuples_consistent(&level);
}

#[test]
fn faces_across_chunk_borders_are_culled() {
    let mut level = Level::new(config("border")).unwrap();
    let east = stone(0.0, 0.0, 0.0);
    let west = stone(-2.0, 0.0, 0.0);
    assert_ne!(chunk_func(east.position.to_point()), chunk_func(west.position.to_point()));

    level.add_block(east, true);
    level.add_block(west, true);
    let mask = level.block_at(east.position).unwrap().face_mask;
    assert!(!mask.contains(BlockSide::LEFT));
    let mask = level.block_at(west.position).unwrap().face_mask;
    assert!(!mask.contains(BlockSide::RIGHT));
    assert_tuples_consistent(&level);
}

#[test]
fn adding_then_removing_restores_the_index() {
    let mut level = Level::new(config("symmetry")).unwrap();
    let mut rng = fastrand::Rng::with_seed(5);
    let mut placed = Vec::new();
    for _ in 0..300 {
        let block = stone(
            (rng.i32(-20..20) * 2) as f32,
            (rng.i32(-4..4) * 2) as f32,
            (rng.i32(-20..20) * 2) as f32,
        );
        if level.add_block(block, true) {
            placed.push(block);
        }
    }
    assert_eq!(level.total_size(), placed.len());
    assert_tuples_consistent(&level);

    rng.shuffle(&mut placed);
    for block in &placed {
        assert!(level.remove_block(block, true));
    }
    assert!(level.adjacency(BlockKind::Solid).is_empty());
    assert_eq!(level.total_size(), 0);
}

#[test]
fn placement_beyond_capacity_is_rejected() {
    let config = WorldConfig {
        max_solid_blocks: 2,
        ..config("capacity")
    };
    let mut level = Level::new(config).unwrap();
    assert!(level.add_block(stone(0.0, 0.0, 0.0), true));
    assert!(!level.add_block(stone(0.0, 0.0, 0.0), true));
    assert!(level.add_block(stone(4.0, 0.0, 0.0), true));
    assert!(level.max_reached(BlockKind::Solid));
    assert!(!level.add_block(stone(8.0, 0.0, 0.0), true));
    assert!(level.add_block(Block::fluid(Point3::new(8.0, 0.0, 0.0), "water"), true));
    assert_eq!(level.chunk_set(BlockKind::Solid).total_size(), 2);
}

#[test]
fn evicted_chunks_reload_identically() {
    let mut level = Level::new(config("evict")).unwrap();
    let home = inv_chunk_func(ChunkId(0));
    let id = ChunkId(0);
    let mut originals = Vec::new();
    for dx in 0..4 {
        for dz in 0..3 {
            let block = stone(home.x + (dx * 2) as f32, 0.0, home.z + (dz * 2) as f32);
            assert!(level.add_block(block, true));
            originals.push(*level.block_at(block.position).unwrap());
        }
    }
    let water = Block::fluid(Point3::new(home.x, 2.0, home.z), "water");
    level.add_block(water, true);
    let total = level.total_size();

    let far = inv_chunk_func(ChunkId((GRID_SIZE - 1) as u8));
    tick_until(&mut level, far, |level| level.chunk_state(BlockKind::Solid, id) == ChunkState::Cached);
    let cache_file = level.chunk_set(BlockKind::Solid).cache().path(id);
    assert!(cache_file.exists());
    assert!(level.block_at(originals[0].position).is_none());
    assert_eq!(level.total_size(), total);
    assert_eq!(level.chunk_set(BlockKind::Solid).scan_total_size().unwrap(), originals.len());

    tick_until(&mut level, home, |level| {
        matches!(level.chunk_state(BlockKind::Solid, id), ChunkState::Resident { .. })
    });
    assert!(!cache_file.exists());
    for original in &originals {
        assert_eq!(level.block_at(original.position), Some(original));
    }
    assert_eq!(level.total_size(), total);
    assert_tuples_consistent(&level);
}

#[test]
fn editing_a_paged_chunk_reloads_it_first() {
    let mut level = Level::new(config("edit-paged")).unwrap();
    let home = inv_chunk_func(ChunkId(17));
    level.add_block(stone(home.x, 0.0, home.z), true);

    let far = inv_chunk_func(ChunkId((GRID_SIZE - 1) as u8));
    tick_until(&mut level, far, |level| {
        level.chunk_state(BlockKind::Solid, ChunkId(17)) == ChunkState::Cached
    });

    assert!(level.add_block(stone(home.x + 2.0, 0.0, home.z), true));
    assert!(matches!(
        level.chunk_state(BlockKind::Solid, ChunkId(17)),
        ChunkState::Resident { .. }
    ));
    let first = level.block_at(BlockPos::quantize(home)).unwrap();
    assert!(!first.face_mask.contains(BlockSide::RIGHT));
    assert_eq!(level.total_size(), 2);
    assert_tuples_consistent(&level);
}

#[test]
fn chunk_ids_are_deterministic() {
    let mut rng = fastrand::Rng::with_seed(11);
    for _ in 0..500 {
        let point = Point3::new(rng.f32() * 500.0 - 250.0, rng.f32() * 40.0, rng.f32() * 500.0 - 250.0);
        let id = chunk_func(point);
        assert_eq!(id, chunk_func(point));
        let centroid = inv_chunk_func(id);
        assert!((centroid.x - point.x).abs() <= CHUNK_WIDTH as f32 / 2.0);
        assert!((centroid.z - point.z).abs() <= CHUNK_WIDTH as f32 / 2.0);
        assert_eq!(chunk_func(centroid), id);
    }
}

#[test]
fn levels_survive_a_save_and_load() {
    let mut level = Level::new(config("roundtrip")).unwrap();
    level.generate(&PerlinTerrain::new(9), 40).unwrap();
    let far = inv_chunk_func(ChunkId(0));
    for _ in 0..GRID_SIZE * 3 {
        level.determine_visible(far);
        level.chunk_operations();
    }
    let before = level.snapshot().unwrap();
    assert!(!level.chunk_set(BlockKind::Solid).cache().is_empty());

    let path = scratch_dir("roundtrip-file").with_extension("dat");
    let written = level.save_level(&path).unwrap();
    assert_eq!(written, level.total_size());

    let mut other = Level::new(config("roundtrip-other")).unwrap();
    let placed = other.load_level(&path).unwrap();
    assert_eq!(placed, written);
    let after = other.snapshot().unwrap();
    for kind in [BlockKind::Solid, BlockKind::Fluid] {
        assert_eq!(sorted_records(before.blocks(kind)), sorted_records(after.blocks(kind)));
    }
    assert_eq!(other.camera(), level.camera());
    assert_tuples_consistent(&other);
    fs::remove_file(path).unwrap();
}

#[test]
fn a_bad_marker_leaves_the_level_untouched() {
    let mut level = Level::new(config("bad-marker")).unwrap();
    level.add_block(stone(0.0, 0.0, 0.0), true);
    level.add_block(stone(0.0, 2.0, 0.0), true);

    let path = scratch_dir("bad-marker-file").with_extension("dat");
    let mut bytes = b"DS".to_vec();
    bytes.extend([0u8; 48]);
    bytes.extend(b"SOLIX");
    fs::write(&path, bytes).unwrap();

    let result = level.load_level(&path);
    assert!(matches!(
        result,
        Err(LevelError::Codec(CodecError::BadMarker { .. }))
    ));
    assert_eq!(level.total_size(), 2);
    assert!(level.block_at(BlockPos::new(0, 2, 0)).is_some());
    assert!(!level.progress().is_working());
    fs::remove_file(path).unwrap();
}

#[test]
fn far_away_blocks_are_clamped_not_overflowed() {
    let mut level = Level::new(config("far-away")).unwrap();
    assert!(level.add_block(stone(3.0e9, 0.0, 0.0), true));
    let clamped = BlockPos::quantize(Point3::new(3.0e9, 0.0, 0.0));
    assert!(level.block_at(clamped).is_some());
    assert_eq!(level.face_mask_at(BlockKind::Solid, clamped).map(|mask| mask.count()), Some(6));
    level.remove_block(&stone(3.0e9, 0.0, 0.0), true);
    assert_eq!(level.total_size(), 0);
}

#[test]
fn a_record_outside_the_world_fails_the_load() {
    let mut level = Level::new(config("far-record")).unwrap();
    level.add_block(stone(0.0, 0.0, 0.0), true);

    let path = scratch_dir("far-record-file").with_extension("dat");
    let mut bytes = b"DS".to_vec();
    bytes.extend([0u8; 48]);
    bytes.extend(b"SOLID");
    bytes.extend(1u16.to_le_bytes());
    bytes.extend(b"stone");
    for value in [3.0e9f32, 0.0, 0.0, 0.5, 0.5, 0.5] {
        bytes.extend(value.to_le_bytes());
    }
    bytes.extend(b"FLUID");
    bytes.extend(0u16.to_le_bytes());
    bytes.extend(b"END");
    fs::write(&path, bytes).unwrap();

    let result = level.load_level(&path);
    assert!(matches!(
        result,
        Err(LevelError::Codec(CodecError::BadPosition(_)))
    ));
    assert_eq!(level.total_size(), 1);
    assert!(level.block_at(BlockPos::new(0, 0, 0)).is_some());
    fs::remove_file(path).unwrap();
}

#[test]
fn a_missing_file_is_an_io_error() {
    let mut level = Level::new(config("missing")).unwrap();
    let result = level.load_level(&scratch_dir("nowhere").with_extension("dat"));
    assert!(matches!(result, Err(LevelError::Codec(CodecError::Io(_)))));
}

#[test]
fn bulk_operations_refuse_while_another_runs() {
    let mut level = Level::new(config("busy")).unwrap();
    level.add_block(stone(0.0, 0.0, 0.0), true);
    let path = scratch_dir("busy-file").with_extension("dat");

    let guard = level.progress().try_begin().unwrap();
    assert!(matches!(level.save_level(&path), Err(LevelError::Busy)));
    assert!(matches!(level.load_level(&path), Err(LevelError::Busy)));
    assert!(matches!(level.new_level(), Err(LevelError::Busy)));
    assert!(matches!(level.generate(&PerlinTerrain::new(1), 8), Err(LevelError::Busy)));
    assert_eq!(level.total_size(), 1);
    assert!(!path.exists());

    drop(guard);
    level.new_level().unwrap();
    assert_eq!(level.total_size(), 0);
}

#[test]
fn a_new_level_releases_every_template() {
    let mut level = Level::new(config("release")).unwrap();
    let mut backend = RecordingBackend::new();
    level.generate(&PerlinTerrain::new(4), 20).unwrap();
    level.buffer_pending(&mut backend);
    let live = backend.live_templates();
    assert!(live > 0);

    level.new_level().unwrap();
    assert_eq!(level.release_pending(&mut backend), live);
    assert_eq!(backend.live_templates(), 0);
    assert_eq!(level.render(&mut backend, &|_| true), 0);
}

fn wait_for_command(engine: &mut EngineState) -> RendererCommand {
    let deadline = Instant::now() + Duration::from_secs(30);
    while Instant::now() < deadline {
        if let Some(command) = engine.process_tasks().into_iter().next() {
            return command;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("task did not report back");
}

#[test]
fn engine_runs_bulk_operations_on_workers() {
    let mut engine = EngineState::new(config("engine")).unwrap();
    engine.generate(Arc::new(PerlinTerrain::new(2)), 30);
    let generated = match wait_for_command(&mut engine) {
        RendererCommand::LevelReplaced { blocks } => blocks,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(engine.level.get().total_size(), generated);

    let path = scratch_dir("engine-file").with_extension("dat");
    engine.save(&path);
    match wait_for_command(&mut engine) {
        RendererCommand::LevelSaved { blocks, .. } => assert_eq!(blocks, generated),
        other => panic!("unexpected {:?}", other),
    }

    engine.level.get_mut().new_level().unwrap();
    engine.load(&path);
    match wait_for_command(&mut engine) {
        RendererCommand::LevelReplaced { blocks } => assert_eq!(blocks, generated),
        other => panic!("unexpected {:?}", other),
    }

    let mut backend = RecordingBackend::new();
    let actions = engine.update(paged_voxel_world::CameraFrame::default()).unwrap();
    assert!(actions.iter().all(|action| action.action != ChunkAction::Evicted));
    assert!(engine.render(&mut backend, &|_| true).unwrap() > 0);
    fs::remove_file(path).unwrap();
}

#[test]
fn engine_reports_refused_operations() {
    let mut engine = EngineState::new(config("engine-busy")).unwrap();
    let progress = engine.level.get().progress();
    let guard = progress.try_begin().unwrap();
    assert!(engine.is_busy());

    engine.save(scratch_dir("engine-busy-file").with_extension("dat"));
    match wait_for_command(&mut engine) {
        RendererCommand::OperationFailed { operation, error } => {
            assert_eq!(operation, "save");
            assert!(matches!(error, LevelError::Busy));
        }
        other => panic!("unexpected {:?}", other),
    }
    drop(guard);
}

#[test]
fn saving_during_generation_is_refused_at_once() {
    let mut engine = EngineState::new(config("engine-overlap")).unwrap();
    engine.generate(Arc::new(PerlinTerrain::new(9)), 254);

    let deadline = Instant::now() + Duration::from_secs(10);
    while !engine.is_busy() && Instant::now() < deadline {
        engine.process_tasks();
        thread::sleep(Duration::from_millis(1));
    }
    assert!(engine.is_busy());

    let start = Instant::now();
    engine.save(scratch_dir("engine-overlap-file").with_extension("dat"));
    assert!(start.elapsed() < Duration::from_millis(20));

    let mut commands = engine.process_tasks();
    let deadline = Instant::now() + Duration::from_secs(60);
    while commands.len() < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
        commands.extend(engine.process_tasks());
    }
    assert!(matches!(
        commands.first(),
        Some(RendererCommand::OperationFailed {
            operation: "save",
            error: LevelError::Busy
        })
    ));
    assert!(matches!(commands.get(1), Some(RendererCommand::LevelReplaced { blocks }) if *blocks > 0));
    assert!(!scratch_dir("engine-overlap-file").with_extension("dat").exists());
}
