//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the bit each one
//! occupies in face masks and neighbor bytes.

use cgmath::Vector3;
use num_derive::FromPrimitive;

use super::BLOCK_SPAN;

/// Represents the six possible faces of a voxel block.
///
/// Each variant's discriminant is the bit index used in face masks and in the
/// adjacency neighbor byte. Faces come in mirrored pairs: an even index and the
/// following odd index point in opposite directions, so the mirror of face `j`
/// is always `j ^ 1`.
///
/// The order is: [LEFT, RIGHT, BOTTOM, TOP, BACK, FRONT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum BlockSide {
    /// The left face (facing negative X)
    LEFT = 0,

    /// The right face (facing positive X)
    RIGHT = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The back face (facing negative Z)
    BACK = 4,

    /// The front face (facing positive Z)
    FRONT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in bit order.
    ///
    /// # Returns
    /// An array containing all `BlockSide` variants.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::LEFT,
            BlockSide::RIGHT,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::BACK,
            BlockSide::FRONT,
        ]
    }

    /// Converts a bit index back into a side.
    ///
    /// # Returns
    /// `None` when `index` is not in `0..6`.
    pub fn from_index(index: u8) -> Option<Self> {
        num_traits::FromPrimitive::from_u8(index)
    }

    /// The bit this side occupies in a face mask or neighbor byte.
    #[inline]
    pub fn bit(self) -> u8 {
        1 << self as u8
    }

    /// The side pointing the opposite way (`j ^ 1`).
    pub fn opposite(self) -> Self {
        match self {
            BlockSide::LEFT => BlockSide::RIGHT,
            BlockSide::RIGHT => BlockSide::LEFT,
            BlockSide::BOTTOM => BlockSide::TOP,
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::BACK => BlockSide::FRONT,
            BlockSide::FRONT => BlockSide::BACK,
        }
    }

    /// Offset, in world units, from a block to its neighbor on this side.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockSide::LEFT => Vector3::new(-BLOCK_SPAN, 0, 0),
            BlockSide::RIGHT => Vector3::new(BLOCK_SPAN, 0, 0),
            BlockSide::BOTTOM => Vector3::new(0, -BLOCK_SPAN, 0),
            BlockSide::TOP => Vector3::new(0, BLOCK_SPAN, 0),
            BlockSide::BACK => Vector3::new(0, 0, -BLOCK_SPAN),
            BlockSide::FRONT => Vector3::new(0, 0, BLOCK_SPAN),
        }
    }

    /// Unit outward normal of this face.
    pub fn normal(self) -> Vector3<f32> {
        let offset = self.offset();
        Vector3::new(offset.x.signum() as f32, offset.y.signum() as f32, offset.z.signum() as f32)
    }
}
