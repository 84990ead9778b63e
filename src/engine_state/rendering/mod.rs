//! Rendering interface of the world core.
//!
//! The graphics backend itself lives outside this crate. This module defines
//! the seam it plugs into:
//!
//! * [`RenderBackend`] - uploads tuple templates, binds them and issues one
//!   draw per instance
//! * [`InstanceUniform`] - the per-draw data (transform, light, color, alpha)
//! * [`TemplateVertex`] - vertex format of the shared templates
//! * [`RendererCommand`] - messages from background work to the render loop
//! * [`RecordingBackend`] - a headless backend that records every call
//!
//! # Threading
//!
//! GPU resources may only be created and destroyed on the render thread.
//! Chunks evicted or tuples emptied on the update thread therefore never
//! release their template handles directly; the handles are queued and handed
//! back through `Level::release_pending` from the render loop.

use std::path::PathBuf;

use cgmath::Matrix4;

use crate::error::LevelError;

mod recording;
mod vertex;

pub use recording::RecordingBackend;
pub use vertex::TemplateVertex;

/// Opaque handle of an uploaded template, issued by the backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateHandle(pub u32);

/// Per-instance uniform data updated before each draw call.
///
/// # Memory Layout
/// 96 bytes: a column-major 4x4 transform, RGB color, light, alpha and
/// padding to a 16 byte multiple.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceUniform {
    /// Model transform of the instance
    pub transform: [[f32; 4]; 4],
    /// RGB tint
    pub color: [f32; 3],
    /// Constant light factor
    pub light: f32,
    /// Opacity
    pub alpha: f32,
    _padding: [f32; 3],
}

impl InstanceUniform {
    /// Packs the per-instance values.
    pub fn new(transform: Matrix4<f32>, color: [f32; 3], light: f32, alpha: f32) -> Self {
        InstanceUniform {
            transform: transform.into(),
            color,
            light,
            alpha,
            _padding: [0.0; 3],
        }
    }
}

/// The graphics backend seen from the world core.
///
/// Drawing is uniform-per-draw instancing: a template is bound once, then each
/// member block gets one uniform update and one indexed draw of the whole
/// template.
pub trait RenderBackend {
    /// Uploads a new template and returns its handle.
    fn upload_template(&mut self, vertices: &[TemplateVertex], indices: &[u16]) -> TemplateHandle;

    /// Replaces the contents of an uploaded template.
    fn update_template(&mut self, handle: TemplateHandle, vertices: &[TemplateVertex], indices: &[u16]);

    /// Frees an uploaded template.
    fn release_template(&mut self, handle: TemplateHandle);

    /// Binds a template's vertex and index buffers for subsequent draws.
    fn bind_template(&mut self, handle: TemplateHandle);

    /// Uploads one instance uniform and draws the bound template.
    fn draw_instance(&mut self, uniform: &InstanceUniform, index_count: u32);
}

/// Work handed from background tasks to the render loop.
#[derive(Debug)]
pub enum RendererCommand {
    /// The level was replaced by a load or generation; every resident chunk
    /// needs buffering.
    LevelReplaced {
        /// Blocks in the new level
        blocks: usize,
    },
    /// The level was written to disk.
    LevelSaved {
        /// Destination file
        path: PathBuf,
        /// Blocks written
        blocks: usize,
    },
    /// A bulk operation failed or was refused.
    OperationFailed {
        /// Operation name, for display
        operation: &'static str,
        /// Why it failed
        error: LevelError,
    },
}
