//! Vertex data structures and layouts for tuple templates.
//!
//! Every tuple shares one small vertex/index template describing a unit cube
//! restricted to the tuple's enabled faces. Blocks never carry their own
//! geometry; they are drawn by re-binding the template with a per-instance
//! uniform.

/// A vertex of a tuple template.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes), relative to the block center
/// - Texture Coordinates: [f32; 2] (8 bytes), already remapped into the atlas
/// - Normal: [f32; 3] (12 bytes)
///
/// Total size: 32 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TemplateVertex {
    /// Corner position relative to the block center
    pub position: [f32; 3],
    /// Atlas texture coordinates
    pub tex_coords: [f32; 2],
    /// Outward face normal
    pub normal: [f32; 3],
}

impl TemplateVertex {
    /// Creates a new template vertex.
    pub fn new(position: [f32; 3], tex_coords: [f32; 2], normal: [f32; 3]) -> Self {
        TemplateVertex {
            position,
            tex_coords,
            normal,
        }
    }

    /// Returns the vertex buffer layout description for a backend pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<f32>)
    /// - `location = 1`: tex_coords (vec2<f32>)
    /// - `location = 2`: normal (vec3<f32>)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TemplateVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}
