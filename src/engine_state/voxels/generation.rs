//! # Terrain Generation
//!
//! The world core does not own a generator; it ingests whatever blocks one
//! produces. `TerrainGenerator` is that seam, and `PerlinTerrain` is a small
//! heightmap generator used by the demo binary, tests and benchmarks.

use cgmath::Point3;
use noise::{NoiseFn, Perlin};

use super::block::{Block, BlockKind, BLOCK_SPAN};

/// Produces the blocks of one world column.
pub trait TerrainGenerator: Send + Sync {
    /// Blocks of the column whose center is at world `x`, `z`. Positions
    /// are on the block grid.
    fn column(&self, x: i32, z: i32) -> Vec<Block>;
}

/// Scaling factor applied to world coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// Heightmap terrain: a grass, sand or snow surface over one layer of dirt,
/// with water filling every column below sea level.
#[derive(Clone, Debug)]
pub struct PerlinTerrain {
    perlin: Perlin,
    /// Height of the surface where the noise is zero
    pub base_height: i32,
    /// Surface height change at noise extremes
    pub amplitude: f64,
    /// Water fills columns up to this height
    pub sea_level: i32,
    /// Surfaces at or above this height are snow
    pub snow_line: i32,
}

impl PerlinTerrain {
    /// Creates a generator with the given noise seed.
    pub fn new(seed: u32) -> Self {
        PerlinTerrain {
            perlin: Perlin::new(seed),
            base_height: 0,
            amplitude: 12.0,
            sea_level: -2,
            snow_line: 10,
        }
    }

    /// Surface height of the column at `x`, `z`, snapped to the block grid.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let sample = self
            .perlin
            .get([x as f64 * PERLIN_SCALE_FACTOR, z as f64 * PERLIN_SCALE_FACTOR]);
        let height = self.base_height as f64 + sample * self.amplitude;
        (height / BLOCK_SPAN as f64).round() as i32 * BLOCK_SPAN
    }

    fn surface_texture(&self, height: i32) -> &'static str {
        if height >= self.snow_line {
            "snow"
        } else if height <= self.sea_level {
            "sand"
        } else {
            "grass"
        }
    }
}

impl TerrainGenerator for PerlinTerrain {
    fn column(&self, x: i32, z: i32) -> Vec<Block> {
        let height = self.surface_height(x, z);
        let at = |y: i32| Point3::new(x as f32, y as f32, z as f32);

        let mut blocks = vec![
            Block::new(at(height), self.surface_texture(height), [1.0, 1.0, 1.0], BlockKind::Solid),
            Block::new(at(height - BLOCK_SPAN), "dirt", [0.9, 0.9, 0.9], BlockKind::Solid),
        ];
        let mut water = height + BLOCK_SPAN;
        while water <= self.sea_level {
            blocks.push(Block::new(at(water), "water", [0.6, 0.7, 1.0], BlockKind::Fluid));
            water += BLOCK_SPAN;
        }
        blocks
    }
}
