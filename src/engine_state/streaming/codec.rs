//! # Binary Codec
//!
//! Readers and writers for the two on-disk formats. All integers are
//! little-endian; positions and colors are three `f32` each.
//!
//! ## Block record (29 bytes)
//!
//! | bytes | content                  |
//! |-------|--------------------------|
//! | 5     | texture name             |
//! | 12    | position x, y, z         |
//! | 12    | color r, g, b            |
//!
//! ## Chunk cache file
//!
//! One byte chunk id, a `u16` block count, then `count` block records.
//!
//! ## Level file
//!
//! `"DS"`, camera position, front, up and right (4 x 12 bytes), `"SOLID"`,
//! `u16` count, records, `"FLUID"`, `u16` count, records, `"END"`.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use cgmath::{Point3, Vector3};

use crate::engine_state::camera_state::CameraFrame;
use crate::engine_state::voxels::block::texture::{TextureName, TEXTURE_NAME_LEN};
use crate::engine_state::voxels::block::{Block, BlockKind, BlockPos, COORDINATE_LIMIT};
use crate::engine_state::voxels::chunk::chunk_grid::ChunkId;
use crate::error::{CodecError, CodecResult};

/// Size in bytes of one serialized block.
pub const BLOCK_RECORD_LEN: usize = TEXTURE_NAME_LEN + 12 + 12;

/// Level file magic.
pub const LEVEL_MAGIC: &[u8] = b"DS";

/// Level file trailer.
pub const LEVEL_END: &[u8] = b"END";

/// Everything a level file holds, fully parsed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LevelData {
    /// Saved viewer frame
    pub camera: CameraFrame,
    /// Solid blocks
    pub solid: Vec<Block>,
    /// Fluid blocks
    pub fluid: Vec<Block>,
}

impl LevelData {
    /// The blocks of one category.
    pub fn blocks(&self, kind: BlockKind) -> &[Block] {
        match kind {
            BlockKind::Solid => &self.solid,
            BlockKind::Fluid => &self.fluid,
        }
    }

    /// Number of blocks of both categories.
    pub fn len(&self) -> usize {
        self.solid.len() + self.fluid.len()
    }

    /// Whether the level has no blocks.
    pub fn is_empty(&self) -> bool {
        self.solid.is_empty() && self.fluid.is_empty()
    }
}

fn read_array<const N: usize>(reader: &mut impl Read, what: &'static str) -> CodecResult<[u8; N]> {
    let mut bytes = [0u8; N];
    reader.read_exact(&mut bytes).map_err(|error| match error.kind() {
        io::ErrorKind::UnexpectedEof => CodecError::Truncated(what),
        _ => CodecError::Io(error),
    })?;
    Ok(bytes)
}

fn read_f32x3(reader: &mut impl Read, what: &'static str) -> CodecResult<[f32; 3]> {
    let bytes: [u8; 12] = read_array(reader, what)?;
    let mut values = [0.0f32; 3];
    for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(values)
}

fn write_f32x3(writer: &mut impl Write, values: [f32; 3]) -> io::Result<()> {
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn read_u16(reader: &mut impl Read, what: &'static str) -> CodecResult<u16> {
    Ok(u16::from_le_bytes(read_array(reader, what)?))
}

fn write_count(writer: &mut impl Write, count: usize) -> CodecResult<()> {
    let count = u16::try_from(count).map_err(|_| CodecError::CountOverflow(count))?;
    writer.write_all(&count.to_le_bytes())?;
    Ok(())
}

/// Reads `marker.len()` bytes and checks they equal `marker`.
pub fn expect_marker(reader: &mut impl Read, marker: &[u8]) -> CodecResult<()> {
    let mut found = vec![0u8; marker.len()];
    match reader.read_exact(&mut found) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(CodecError::BadMarker {
                expected: String::from_utf8_lossy(marker).into_owned(),
                found: String::new(),
            });
        }
        Err(error) => return Err(CodecError::Io(error)),
    }
    if found != marker {
        return Err(CodecError::BadMarker {
            expected: String::from_utf8_lossy(marker).into_owned(),
            found: String::from_utf8_lossy(&found).into_owned(),
        });
    }
    Ok(())
}

/// Writes one 29 byte block record.
pub fn write_block(writer: &mut impl Write, block: &Block) -> io::Result<()> {
    writer.write_all(block.texture().as_bytes())?;
    let position = block.position.to_point();
    write_f32x3(writer, [position.x, position.y, position.z])?;
    write_f32x3(writer, block.material.color)
}

/// Reads one block record as a block of `kind` with every face enabled.
pub fn read_block(reader: &mut impl Read, kind: BlockKind) -> CodecResult<Block> {
    let texture = TextureName::from_bytes(read_array(reader, "block texture")?);
    let [x, y, z] = read_f32x3(reader, "block position")?;
    if [x, y, z].iter().any(|value| !value.is_finite() || value.abs() > COORDINATE_LIMIT) {
        return Err(CodecError::BadPosition([x, y, z]));
    }
    let color = read_f32x3(reader, "block color")?;
    Ok(Block::from_parts(
        BlockPos::quantize(Point3::new(x, y, z)),
        texture,
        color,
        kind,
    ))
}

fn write_section(writer: &mut impl Write, blocks: &[Block]) -> CodecResult<()> {
    write_count(writer, blocks.len())?;
    for block in blocks {
        write_block(writer, block)?;
    }
    Ok(())
}

fn read_section(reader: &mut impl Read, kind: BlockKind) -> CodecResult<Vec<Block>> {
    let count = read_u16(reader, "block count")?;
    (0..count).map(|_| read_block(reader, kind)).collect()
}

/// Writes a chunk cache file body.
pub fn write_chunk(writer: &mut impl Write, id: ChunkId, blocks: &[Block]) -> CodecResult<()> {
    writer.write_all(&[id.0])?;
    write_section(writer, blocks)
}

/// Reads only the header of a chunk cache file.
///
/// # Returns
/// The stored chunk id and block count.
pub fn read_chunk_header(reader: &mut impl Read) -> CodecResult<(ChunkId, u16)> {
    let [id] = read_array::<1>(reader, "chunk id")?;
    let count = read_u16(reader, "block count")?;
    Ok((ChunkId(id), count))
}

/// Reads a whole chunk cache file, checking that it holds chunk `expected`.
pub fn read_chunk(reader: &mut impl Read, expected: ChunkId, kind: BlockKind) -> CodecResult<Vec<Block>> {
    let (found, count) = read_chunk_header(reader)?;
    if found != expected {
        return Err(CodecError::ChunkIdMismatch { expected, found });
    }
    (0..count).map(|_| read_block(reader, kind)).collect()
}

fn write_vector(writer: &mut impl Write, vector: Vector3<f32>) -> io::Result<()> {
    write_f32x3(writer, vector.into())
}

/// Writes a complete level.
pub fn write_level(writer: &mut impl Write, level: &LevelData) -> CodecResult<()> {
    writer.write_all(LEVEL_MAGIC)?;
    let camera = &level.camera;
    write_f32x3(writer, camera.position.into())?;
    write_vector(writer, camera.front)?;
    write_vector(writer, camera.up)?;
    write_vector(writer, camera.right)?;

    for kind in [BlockKind::Solid, BlockKind::Fluid] {
        writer.write_all(kind.level_marker())?;
        write_section(writer, level.blocks(kind))?;
    }
    writer.write_all(LEVEL_END)?;
    Ok(())
}

/// Parses a complete level. Nothing is returned unless every section,
/// including the trailer, parsed.
pub fn read_level(reader: &mut impl Read) -> CodecResult<LevelData> {
    expect_marker(reader, LEVEL_MAGIC)?;
    let position = read_f32x3(reader, "camera position")?;
    let front = read_f32x3(reader, "camera front")?;
    let up = read_f32x3(reader, "camera up")?;
    let right = read_f32x3(reader, "camera right")?;
    let camera = CameraFrame::from_vectors(position.into(), front.into(), up.into(), right.into());

    expect_marker(reader, BlockKind::Solid.level_marker())?;
    let solid = read_section(reader, BlockKind::Solid)?;
    expect_marker(reader, BlockKind::Fluid.level_marker())?;
    let fluid = read_section(reader, BlockKind::Fluid)?;
    expect_marker(reader, LEVEL_END)?;

    Ok(LevelData { camera, solid, fluid })
}

/// Writes a level to `path`, replacing any existing file.
pub fn save_level_file(path: &Path, level: &LevelData) -> CodecResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_level(&mut writer, level)?;
    writer.flush()?;
    Ok(())
}

/// Reads the level stored at `path`.
pub fn load_level_file(path: &Path) -> CodecResult<LevelData> {
    let mut reader = BufReader::new(File::open(path)?);
    read_level(&mut reader)
}
