//! # Block Module
//!
//! This module provides the core block-related functionality: quantized block
//! positions, face masks, block categories, materials and the `Block` itself.
//!
//! A block is built by composition rather than as a specialised drawable: a
//! position component (`BlockPos`), a material component (`Material`) and the
//! face mask selecting which faces of the shared tuple template it draws.

use std::fmt;

use cgmath::{Matrix4, Point3, Vector3};

use block_side::BlockSide;
use texture::TextureName;

use crate::engine_state::rendering::InstanceUniform;

pub mod block_side;
pub mod texture;

/// Edge length of a block in world units. Block centers sit on even integers.
pub const BLOCK_SPAN: i32 = 2;

/// Mask with all six face bits set.
pub const FACE_BITS: u8 = 0b11_1111;

/// Light value handed to every instance. Lighting is not computed.
pub const FULL_LIGHT: f32 = 1.0;

/// Largest coordinate magnitude a block may have. Beyond it `f32` no longer
/// holds every integer, so positions are clamped to it.
pub const COORDINATE_LIMIT: f32 = 16_777_216.0;

/// Default alpha of fluid blocks.
pub const FLUID_ALPHA: f32 = 0.6;

/// An immutable, quantized block position used as a lookup key.
///
/// Each coordinate is an even integer. Ordering is lexicographic over
/// `(x, y, z)` and is what tuples sort their members by.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    /// X coordinate in world units
    pub x: i32,
    /// Y coordinate in world units
    pub y: i32,
    /// Z coordinate in world units
    pub z: i32,
}

impl BlockPos {
    /// Creates a position, snapping each coordinate to the nearest even integer.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        BlockPos {
            x: Self::snap(x as f32),
            y: Self::snap(y as f32),
            z: Self::snap(z as f32),
        }
    }

    /// Quantizes a floating point world position to the block grid.
    pub fn quantize(point: Point3<f32>) -> Self {
        BlockPos {
            x: Self::snap(point.x),
            y: Self::snap(point.y),
            z: Self::snap(point.z),
        }
    }

    /// NaN snaps to zero; anything past `COORDINATE_LIMIT` is clamped to it.
    fn snap(value: f32) -> i32 {
        let value = value.clamp(-COORDINATE_LIMIT, COORDINATE_LIMIT);
        (value / BLOCK_SPAN as f32).round() as i32 * BLOCK_SPAN
    }

    /// The position as floating point world coordinates.
    pub fn to_point(self) -> Point3<f32> {
        Point3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    /// The adjacent position on the given side.
    pub fn neighbor(self, side: BlockSide) -> Self {
        let offset = side.offset();
        BlockPos {
            x: self.x.saturating_add(offset.x),
            y: self.y.saturating_add(offset.y),
            z: self.z.saturating_add(offset.z),
        }
    }

    /// All six adjacent positions, in bit order.
    pub fn neighbors(self) -> [(BlockSide, BlockPos); 6] {
        BlockSide::all().map(|side| (side, self.neighbor(side)))
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A 6-bit set of faces to draw. Bit `j` corresponds to `BlockSide` `j`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceMask(u8);

impl FaceMask {
    /// Every face drawn.
    pub const ALL: FaceMask = FaceMask(FACE_BITS);

    /// No face drawn.
    pub const NONE: FaceMask = FaceMask(0);

    /// Builds a mask from raw bits, discarding anything above bit 5.
    pub fn from_bits(bits: u8) -> Self {
        FaceMask(bits & FACE_BITS)
    }

    /// The drawable faces of a block with the given neighbor byte: the
    /// complement of the neighbors within six bits.
    pub fn from_neighbors(neighbors: u8) -> Self {
        FaceMask(!neighbors & FACE_BITS)
    }

    /// The raw bits.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether the given face is drawn.
    pub fn contains(self, side: BlockSide) -> bool {
        self.0 & side.bit() != 0
    }

    /// Iterates the drawn faces in bit order.
    pub fn sides(self) -> impl Iterator<Item = BlockSide> {
        (0..6u8)
            .filter(move |bit| self.0 & (1 << bit) != 0)
            .filter_map(BlockSide::from_index)
    }

    /// Number of drawn faces.
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}

/// The two block categories. Each category has its own chunk set, adjacency
/// index and cache files; blocks of different categories never occlude each
/// other.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    /// Opaque, collidable blocks
    Solid,
    /// Translucent, animated blocks the camera may be inside of
    Fluid,
}

impl BlockKind {
    /// Prefix character of this category's cache file names.
    pub fn cache_prefix(self) -> char {
        match self {
            BlockKind::Solid => 's',
            BlockKind::Fluid => 'f',
        }
    }

    /// Opacity given to new blocks of this category.
    pub fn default_alpha(self) -> f32 {
        match self {
            BlockKind::Solid => 1.0,
            BlockKind::Fluid => FLUID_ALPHA,
        }
    }

    /// Marker written before this category's section of a level file.
    pub fn level_marker(self) -> &'static [u8] {
        match self {
            BlockKind::Solid => b"SOLID",
            BlockKind::Fluid => b"FLUID",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Solid => f.write_str("solid"),
            BlockKind::Fluid => f.write_str("fluid"),
        }
    }
}

/// Surface appearance of a block.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    /// Texture sampled on every drawn face
    pub texture: TextureName,
    /// RGB tint multiplied with the texture
    pub color: [f32; 3],
    /// Opacity handed to the instance uniform
    pub alpha: f32,
}

/// A positioned, textured, colored voxel.
///
/// # Ownership
/// A block lives in exactly one tuple at a time. Eviction to disk destroys the
/// value; reloading reconstructs an equal, not identical, block.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Block {
    /// Quantized world position
    pub position: BlockPos,
    /// Texture, tint and opacity
    pub material: Material,
    /// Solid or fluid
    pub kind: BlockKind,
    /// Faces currently drawn
    pub face_mask: FaceMask,
}

impl Block {
    /// Creates a block with every face enabled.
    ///
    /// # Arguments
    /// * `position` - World position, quantized to the block grid
    /// * `texture` - Texture name (truncated or padded to five bytes)
    /// * `color` - RGB tint
    /// * `kind` - Solid or fluid; fluids get a translucent alpha
    pub fn new(position: Point3<f32>, texture: &str, color: [f32; 3], kind: BlockKind) -> Self {
        Block::from_parts(BlockPos::quantize(position), TextureName::new(texture), color, kind)
    }

    /// Creates a block from already quantized parts, every face enabled.
    pub fn from_parts(position: BlockPos, texture: TextureName, color: [f32; 3], kind: BlockKind) -> Self {
        Block {
            position,
            material: Material {
                texture,
                color,
                alpha: kind.default_alpha(),
            },
            kind,
            face_mask: FaceMask::ALL,
        }
    }

    /// Shorthand for a white solid block.
    pub fn solid(position: Point3<f32>, texture: &str) -> Self {
        Block::new(position, texture, [1.0, 1.0, 1.0], BlockKind::Solid)
    }

    /// Shorthand for a white fluid block.
    pub fn fluid(position: Point3<f32>, texture: &str) -> Self {
        Block::new(position, texture, [1.0, 1.0, 1.0], BlockKind::Fluid)
    }

    /// The block's texture.
    pub fn texture(&self) -> TextureName {
        self.material.texture
    }

    /// Per-draw uniform data for this block.
    pub fn instance_uniform(&self) -> InstanceUniform {
        let translation = Vector3::new(
            self.position.x as f32,
            self.position.y as f32,
            self.position.z as f32,
        );
        InstanceUniform::new(
            Matrix4::from_translation(translation),
            self.material.color,
            FULL_LIGHT,
            self.material.alpha,
        )
    }
}
