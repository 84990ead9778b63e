//! # Chunk Grid
//!
//! The fixed column grid that partitions the world in the x/z plane. Height is
//! unbounded: every block in a grid cell belongs to the same chunk, whatever
//! its y coordinate.
//!
//! The grid is `GRID_CELLS` x `GRID_CELLS` cells centred on the origin. Cell
//! ids are row-major, `id = row * GRID_CELLS + column`, with columns running
//! along +x and rows along +z. Positions outside the grid are clamped onto the
//! border cells.

use std::fmt;

use cgmath::Point3;

use crate::engine_state::voxels::block::BLOCK_SPAN;

/// Number of blocks along one edge of a chunk column.
pub const CHUNK_BLOCKS: i32 = 16;

/// Width of a chunk column in world units.
pub const CHUNK_WIDTH: i32 = CHUNK_BLOCKS * BLOCK_SPAN;

/// Number of cells along each grid axis.
pub const GRID_CELLS: i32 = 16;

/// Total number of chunk ids.
pub const GRID_SIZE: usize = (GRID_CELLS * GRID_CELLS) as usize;

/// Distance from the origin to the grid border along x and z.
pub const WORLD_HALF_EXTENT: i32 = GRID_CELLS * CHUNK_WIDTH / 2;

/// Identifier of a chunk column. Fits the one byte id of a cache file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u8);

impl ChunkId {
    /// Builds an id from grid coordinates, clamping both onto the grid.
    pub fn from_cell(column: i32, row: i32) -> Self {
        let column = column.clamp(0, GRID_CELLS - 1);
        let row = row.clamp(0, GRID_CELLS - 1);
        ChunkId((row * GRID_CELLS + column) as u8)
    }

    /// Column (x axis) of the cell.
    pub fn column(self) -> i32 {
        self.0 as i32 % GRID_CELLS
    }

    /// Row (z axis) of the cell.
    pub fn row(self) -> i32 {
        self.0 as i32 / GRID_CELLS
    }

    /// Every id in ascending order.
    pub fn all() -> impl Iterator<Item = ChunkId> {
        (0..GRID_SIZE).map(|id| ChunkId(id as u8))
    }

    /// Squared distance between two cells, measured in cells.
    pub fn cell_distance_sq(self, other: ChunkId) -> u32 {
        let dx = self.column() - other.column();
        let dz = self.row() - other.row();
        (dx * dx + dz * dz) as u32
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn cell_of(coordinate: f32) -> i32 {
    ((coordinate + WORLD_HALF_EXTENT as f32) / CHUNK_WIDTH as f32).floor() as i32
}

/// Maps a world position to the id of the chunk column containing it.
///
/// Depends on x and z only.
pub fn chunk_func(position: Point3<f32>) -> ChunkId {
    ChunkId::from_cell(cell_of(position.x), cell_of(position.z))
}

/// The centroid of a chunk column, at height zero.
pub fn inv_chunk_func(id: ChunkId) -> Point3<f32> {
    let half_width = CHUNK_WIDTH as f32 / 2.0;
    Point3::new(
        (id.column() * CHUNK_WIDTH - WORLD_HALF_EXTENT) as f32 + half_width,
        0.0,
        (id.row() * CHUNK_WIDTH - WORLD_HALF_EXTENT) as f32 + half_width,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_depend_on_x_and_z_only() {
        let low = chunk_func(Point3::new(10.0, -400.0, -6.0));
        let high = chunk_func(Point3::new(10.0, 900.0, -6.0));
        assert_eq!(low, high);
        assert_ne!(low, chunk_func(Point3::new(10.0 + CHUNK_WIDTH as f32, 0.0, -6.0)));
    }

    #[test]
    fn centroid_is_within_one_cell() {
        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..500 {
            let extent = WORLD_HALF_EXTENT as f32;
            let point = Point3::new(
                rng.f32() * 2.0 * extent - extent,
                rng.f32() * 100.0,
                rng.f32() * 2.0 * extent - extent,
            );
            let centroid = inv_chunk_func(chunk_func(point));
            let half_width = CHUNK_WIDTH as f32 / 2.0;
            assert!((centroid.x - point.x).abs() <= half_width);
            assert!((centroid.z - point.z).abs() <= half_width);
            assert_eq!(chunk_func(centroid), chunk_func(point));
        }
    }

    #[test]
    fn positions_outside_the_grid_are_clamped() {
        let far = chunk_func(Point3::new(1.0e6, 0.0, -1.0e6));
        assert_eq!(far.column(), GRID_CELLS - 1);
        assert_eq!(far.row(), 0);
        assert_eq!(ChunkId::all().count(), GRID_SIZE);
        assert_eq!(ChunkId(0).cell_distance_sq(ChunkId::from_cell(3, 4)), 25);
    }
}
