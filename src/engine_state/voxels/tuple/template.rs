//! Cube templates shared by every member of a tuple.

use crate::engine_state::{
    rendering::TemplateVertex,
    voxels::block::{block_side::BlockSide, texture::remap_uv, FaceMask, BLOCK_SPAN},
};

use super::TupleKey;

/// Half the block edge, in world units.
const HALF: f32 = BLOCK_SPAN as f32 / 2.0;

/// Face-local texture coordinates of the four corners, in corner order.
const CORNER_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

/// Two counter-clockwise triangles over the four corners of a face.
const FACE_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Corners of a face as seen from outside the cube: bottom-left,
/// bottom-right, top-right, top-left.
fn face_corners(side: BlockSide) -> [[f32; 3]; 4] {
    let h = HALF;
    match side {
        BlockSide::LEFT => [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]],
        BlockSide::RIGHT => [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]],
        BlockSide::BOTTOM => [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]],
        BlockSide::TOP => [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]],
        BlockSide::BACK => [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]],
        BlockSide::FRONT => [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
    }
}

/// Vertex and index data of a unit cube restricted to a set of faces.
#[derive(Clone, Debug, PartialEq)]
pub struct CubeTemplate {
    vertices: Vec<TemplateVertex>,
    indices: Vec<u16>,
    uv_phase: usize,
    key: TupleKey,
}

impl CubeTemplate {
    /// Builds the template for a tuple key: four vertices and six indices per
    /// enabled face, with texture coordinates remapped into the atlas.
    pub fn build(key: TupleKey) -> Self {
        let face_count = key.mask.count() as usize;
        let mut vertices = Vec::with_capacity(face_count * 4);
        let mut indices = Vec::with_capacity(face_count * 6);

        for side in key.mask.sides() {
            let base = vertices.len() as u16;
            let normal: [f32; 3] = side.normal().into();
            for (corner, uv) in face_corners(side).iter().zip(CORNER_UVS.iter()) {
                vertices.push(TemplateVertex::new(
                    *corner,
                    remap_uv(key.texture, uv[0], uv[1]),
                    normal,
                ));
            }
            indices.extend(FACE_INDICES.iter().map(|index| base + index));
        }

        CubeTemplate {
            vertices,
            indices,
            uv_phase: 0,
            key,
        }
    }

    /// The template's vertices.
    pub fn vertices(&self) -> &[TemplateVertex] {
        &self.vertices
    }

    /// The template's triangle indices.
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Number of indices drawn per instance.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Faces present in this template.
    pub fn mask(&self) -> FaceMask {
        self.key.mask
    }

    /// Flips the winding order of every triangle.
    pub fn reverse_winding(&mut self) {
        for triangle in self.indices.chunks_exact_mut(3) {
            triangle.swap(1, 2);
        }
    }

    /// Advances the texture coordinates of every face one corner around the
    /// quad. Four steps return to the original mapping.
    pub fn cycle_tex_coords(&mut self) {
        self.uv_phase = (self.uv_phase + 1) % CORNER_UVS.len();
        for face in self.vertices.chunks_exact_mut(4) {
            for (corner, vertex) in face.iter_mut().enumerate() {
                let uv = CORNER_UVS[(corner + self.uv_phase) % CORNER_UVS.len()];
                vertex.tex_coords = remap_uv(self.key.texture, uv[0], uv[1]);
            }
        }
    }
}
