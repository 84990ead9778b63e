//! # Adjacency Index
//!
//! A position-keyed index recording, for every placed block of one category,
//! which of its six neighbor positions are occupied. It is the source of truth
//! for face culling: a block's drawable face mask is the complement of its
//! neighbor byte.
//!
//! ## Invariant
//!
//! Bit `j` of an entry's neighbor byte is set iff the index holds an entry at
//! the adjacent position in direction `j`. The relation is kept symmetric:
//! whenever bit `j` is set on one entry, the mirrored bit `j ^ 1` is set on the
//! neighbor.
//!
//! ## Performance
//!
//! `put` and `remove` perform exactly six hash lookups. Nothing ever scans the
//! whole index.

use std::collections::HashMap;

use super::block::{block_side::BlockSide, texture::TextureName, Block, BlockPos, FaceMask};

/// One index entry: the block's texture and its neighbor-presence byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AdjacencyEntry {
    /// Texture of the block at this position
    pub texture: TextureName,
    /// Bit `j` set when a neighbor exists in direction `j`
    pub neighbors: u8,
}

impl AdjacencyEntry {
    /// Faces of this block that should be drawn.
    pub fn face_mask(&self) -> FaceMask {
        FaceMask::from_neighbors(self.neighbors)
    }
}

/// Adjacency index for a single block category.
///
/// Each world owns one index per category and passes it explicitly to the
/// chunk and chunk set operations that need it.
#[derive(Debug, Default)]
pub struct AdjacencyIndex {
    entries: HashMap<BlockPos, AdjacencyEntry>,
}

impl AdjacencyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a block and links it with every existing neighbor.
    ///
    /// For each direction with a neighbor entry, the bit for that direction is
    /// set on the new entry and the mirrored bit on the neighbor's entry.
    ///
    /// # Returns
    /// The neighbor byte stored for the block.
    pub fn put(&mut self, block: &Block) -> u8 {
        let mut neighbors = 0;
        for (side, neighbor_pos) in block.position.neighbors() {
            if let Some(neighbor) = self.entries.get_mut(&neighbor_pos) {
                neighbor.neighbors |= side.opposite().bit();
                neighbors |= side.bit();
            }
        }

        self.entries.insert(
            block.position,
            AdjacencyEntry {
                texture: block.texture(),
                neighbors,
            },
        );
        neighbors
    }

    /// Deletes the entry at `position` and clears the mirrored bit on every
    /// neighbor it was linked with.
    ///
    /// # Returns
    /// The removed entry, or `None` if nothing was recorded there.
    pub fn remove(&mut self, position: BlockPos) -> Option<AdjacencyEntry> {
        let entry = self.entries.remove(&position)?;
        if entry.neighbors != 0 {
            for side in BlockSide::all() {
                if entry.neighbors & side.bit() == 0 {
                    continue;
                }
                if let Some(neighbor) = self.entries.get_mut(&position.neighbor(side)) {
                    neighbor.neighbors &= !side.opposite().bit();
                }
            }
        }
        Some(entry)
    }

    /// The entry at `position`, if any.
    pub fn get(&self, position: BlockPos) -> Option<&AdjacencyEntry> {
        self.entries.get(&position)
    }

    /// Whether a block is recorded at `position`.
    pub fn contains(&self, position: BlockPos) -> bool {
        self.entries.contains_key(&position)
    }

    /// Drawable faces of the block at `position`.
    pub fn face_mask(&self, position: BlockPos) -> Option<FaceMask> {
        self.entries.get(&position).map(AdjacencyEntry::face_mask)
    }

    /// Number of recorded blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    fn stone(x: f32, y: f32, z: f32) -> Block {
        Block::solid(Point3::new(x, y, z), "stone")
    }

    fn snapshot(index: &AdjacencyIndex) -> Vec<(BlockPos, AdjacencyEntry)> {
        let mut entries: Vec<_> = index.entries.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by_key(|(pos, _)| *pos);
        entries
    }

    #[test]
    fn put_links_both_sides() {
        let mut index = AdjacencyIndex::new();
        assert_eq!(index.put(&stone(0.0, 0.0, 0.0)), 0);
        let neighbors = index.put(&stone(2.0, 0.0, 0.0));

        assert_eq!(neighbors, BlockSide::LEFT.bit());
        assert_eq!(
            index.get(BlockPos::new(0, 0, 0)).unwrap().neighbors,
            BlockSide::RIGHT.bit()
        );
        assert_eq!(
            index.face_mask(BlockPos::new(0, 0, 0)).unwrap().bits(),
            0b11_1101
        );
    }

    #[test]
    fn remove_clears_mirrored_bits() {
        let mut index = AdjacencyIndex::new();
        index.put(&stone(0.0, 0.0, 0.0));
        index.put(&stone(0.0, 2.0, 0.0));
        index.put(&stone(0.0, 0.0, -2.0));

        let removed = index.remove(BlockPos::new(0, 0, 0)).unwrap();
        assert_eq!(removed.neighbors, BlockSide::TOP.bit() | BlockSide::BACK.bit());
        assert_eq!(index.get(BlockPos::new(0, 2, 0)).unwrap().neighbors, 0);
        assert_eq!(index.get(BlockPos::new(0, 0, -2)).unwrap().neighbors, 0);
        assert!(index.remove(BlockPos::new(0, 0, 0)).is_none());
    }

    #[test]
    fn add_then_remove_restores_previous_state() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut index = AdjacencyIndex::new();
        for _ in 0..200 {
            let x = rng.i32(-6..6) as f32 * 2.0;
            let y = rng.i32(-6..6) as f32 * 2.0;
            let z = rng.i32(-6..6) as f32 * 2.0;
            index.put(&stone(x, y, z));
        }
        let before = snapshot(&index);

        let anchor = stone(40.0, 0.0, 0.0);
        let mut added = Vec::new();
        for offset in [0.0, 2.0, 4.0] {
            let block = stone(anchor.position.x as f32 + offset, 0.0, 0.0);
            index.put(&block);
            added.push(block.position);
        }
        for position in added.into_iter().rev() {
            index.remove(position);
        }

        assert_eq!(snapshot(&index), before);
    }

    #[test]
    fn neighbor_bits_stay_symmetric() {
        let mut rng = fastrand::Rng::with_seed(99);
        let mut index = AdjacencyIndex::new();
        let mut placed = Vec::new();
        for _ in 0..300 {
            let block = stone(
                rng.i32(-4..4) as f32 * 2.0,
                rng.i32(-4..4) as f32 * 2.0,
                rng.i32(-4..4) as f32 * 2.0,
            );
            if !index.contains(block.position) {
                index.put(&block);
                placed.push(block.position);
            }
            if rng.bool() {
                if let Some(position) = placed.pop() {
                    index.remove(position);
                }
            }
        }

        for (position, entry) in &index.entries {
            for (side, neighbor_pos) in position.neighbors() {
                let present = index.contains(neighbor_pos);
                assert_eq!(entry.neighbors & side.bit() != 0, present);
                if present {
                    let mirrored = index.get(neighbor_pos).unwrap().neighbors;
                    assert_ne!(mirrored & side.opposite().bit(), 0);
                }
            }
        }
    }
}
