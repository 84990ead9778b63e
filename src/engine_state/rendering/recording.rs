//! A headless [`RenderBackend`] that records what it is asked to do.
//!
//! Used by the demo binary and by tests, and usable by collaborators that run
//! the world without a window (servers, tools).

use std::collections::HashMap;

use super::{InstanceUniform, RenderBackend, TemplateHandle, TemplateVertex};

/// Records uploads, binds and draws without touching a GPU.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_handle: u32,
    live: HashMap<TemplateHandle, (Vec<TemplateVertex>, Vec<u16>)>,
    bound: Option<TemplateHandle>,
    /// Number of `bind_template` calls
    pub binds: usize,
    /// Every draw issued, with the template bound at the time
    pub draws: Vec<(TemplateHandle, InstanceUniform)>,
    /// Number of `update_template` calls
    pub updates: usize,
    /// Number of templates released
    pub releases: usize,
}

impl RecordingBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of templates currently uploaded.
    pub fn live_templates(&self) -> usize {
        self.live.len()
    }

    /// Contents of an uploaded template.
    pub fn template(&self, handle: TemplateHandle) -> Option<(&[TemplateVertex], &[u16])> {
        self.live
            .get(&handle)
            .map(|(vertices, indices)| (vertices.as_slice(), indices.as_slice()))
    }

    /// Forgets recorded draws, keeping uploaded templates.
    pub fn clear_frame(&mut self) {
        self.draws.clear();
        self.binds = 0;
        self.bound = None;
    }
}

impl RenderBackend for RecordingBackend {
    fn upload_template(&mut self, vertices: &[TemplateVertex], indices: &[u16]) -> TemplateHandle {
        let handle = TemplateHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle, (vertices.to_vec(), indices.to_vec()));
        handle
    }

    fn update_template(&mut self, handle: TemplateHandle, vertices: &[TemplateVertex], indices: &[u16]) {
        if let Some(entry) = self.live.get_mut(&handle) {
            *entry = (vertices.to_vec(), indices.to_vec());
            self.updates += 1;
        } else {
            log::warn!("Update of unknown template {:?}", handle);
        }
    }

    fn release_template(&mut self, handle: TemplateHandle) {
        if self.live.remove(&handle).is_some() {
            self.releases += 1;
        }
        if self.bound == Some(handle) {
            self.bound = None;
        }
    }

    fn bind_template(&mut self, handle: TemplateHandle) {
        self.bound = Some(handle);
        self.binds += 1;
    }

    fn draw_instance(&mut self, uniform: &InstanceUniform, _index_count: u32) {
        match self.bound {
            Some(handle) => self.draws.push((handle, *uniform)),
            None => log::error!("Draw issued with no template bound"),
        }
    }
}
