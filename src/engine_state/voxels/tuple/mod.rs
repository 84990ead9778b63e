//! # Tuple Module
//!
//! A tuple groups every block of a chunk that shares the same texture and the
//! same face mask. It is the unit of drawing: the tuple owns one cube template
//! restricted to its enabled faces and draws each member by re-binding that
//! template with a per-instance uniform.
//!
//! ## Invariants
//!
//! * Every member's texture and face mask equal the tuple key.
//! * Members are sorted by position, so point lookups are logarithmic.
//! * Empty tuples are dropped by their chunk as soon as they empty.

use crate::engine_state::rendering::{RenderBackend, TemplateHandle};

use super::block::{texture::TextureName, Block, BlockKind, BlockPos, FaceMask};

mod template;

pub use template::CubeTemplate;

/// Composite tuple key, ordered by texture and then by face mask.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleKey {
    /// Shared texture
    pub texture: TextureName,
    /// Shared face mask
    pub mask: FaceMask,
}

impl TupleKey {
    /// Creates a key.
    pub fn new(texture: TextureName, mask: FaceMask) -> Self {
        TupleKey { texture, mask }
    }

    /// The key a block currently belongs under.
    pub fn of(block: &Block) -> Self {
        TupleKey::new(block.texture(), block.face_mask)
    }
}

/// A group of blocks drawn with one shared template.
#[derive(Debug)]
pub struct Tuple {
    key: TupleKey,
    kind: BlockKind,
    template: CubeTemplate,
    members: Vec<Block>,
    handle: Option<TemplateHandle>,
    inverted_winding: bool,
}

impl Tuple {
    /// Creates an empty, unbuffered tuple.
    pub fn new(key: TupleKey, kind: BlockKind) -> Self {
        Tuple {
            key,
            kind,
            template: CubeTemplate::build(key),
            members: Vec::new(),
            handle: None,
            inverted_winding: false,
        }
    }

    /// The tuple's key.
    pub fn key(&self) -> TupleKey {
        self.key
    }

    /// Category of the member blocks.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// The shared template.
    pub fn template(&self) -> &CubeTemplate {
        &self.template
    }

    /// Members, sorted by position.
    pub fn members(&self) -> &[Block] {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the tuple has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the winding is currently reversed for an in-fluid camera.
    pub fn is_winding_inverted(&self) -> bool {
        self.inverted_winding
    }

    fn search(&self, position: BlockPos) -> Result<usize, usize> {
        self.members.binary_search_by_key(&position, |member| member.position)
    }

    /// Inserts a block at its sorted position.
    ///
    /// # Returns
    /// `false`, without inserting, when the block's key differs from the
    /// tuple's or a member already occupies that position.
    pub fn insert(&mut self, block: Block) -> bool {
        if TupleKey::of(&block) != self.key {
            log::error!(
                "Block {} with key {:?} offered to tuple {:?}",
                block.position,
                TupleKey::of(&block),
                self.key
            );
            return false;
        }
        match self.search(block.position) {
            Ok(_) => false,
            Err(slot) => {
                self.members.insert(slot, block);
                true
            }
        }
    }

    /// Removes and returns the member at `position`.
    pub fn remove(&mut self, position: BlockPos) -> Option<Block> {
        self.search(position).ok().map(|slot| self.members.remove(slot))
    }

    /// The member at `position`.
    pub fn get(&self, position: BlockPos) -> Option<&Block> {
        self.search(position).ok().map(|slot| &self.members[slot])
    }

    /// Whether a member occupies `position`.
    pub fn contains(&self, position: BlockPos) -> bool {
        self.search(position).is_ok()
    }

    /// Whether the template has been uploaded.
    pub fn is_buffered(&self) -> bool {
        self.handle.is_some()
    }

    /// Uploads the template if it is not already resident on the backend.
    /// Must run on the render thread.
    pub fn buffer(&mut self, backend: &mut dyn RenderBackend) {
        if self.handle.is_none() {
            self.handle = Some(backend.upload_template(self.template.vertices(), self.template.indices()));
        }
    }

    /// Detaches the template handle. The caller is responsible for getting it
    /// released on the render thread.
    pub fn unbuffer(&mut self) -> Option<TemplateHandle> {
        self.handle.take()
    }

    /// Draws every member.
    ///
    /// # Returns
    /// Number of draw calls issued.
    pub fn render(&self, backend: &mut dyn RenderBackend) -> usize {
        self.render_if(backend, &|_| true)
    }

    /// Binds the template once, then issues one uniform update and one draw
    /// for every member accepted by `predicate`. Rejected members stay in the
    /// tuple. Unbuffered tuples draw nothing.
    ///
    /// # Returns
    /// Number of draw calls issued.
    pub fn render_if(&self, backend: &mut dyn RenderBackend, predicate: &dyn Fn(&Block) -> bool) -> usize {
        let Some(handle) = self.handle else {
            return 0;
        };
        if self.template.index_count() == 0 {
            return 0;
        }

        backend.bind_template(handle);
        let mut draws = 0;
        for member in self.members.iter().filter(|member| predicate(member)) {
            backend.draw_instance(&member.instance_uniform(), self.template.index_count());
            draws += 1;
        }
        draws
    }

    /// Advances the fluid wave animation and re-uploads the vertex data.
    /// Solid tuples are left untouched.
    pub fn animate(&mut self, backend: &mut dyn RenderBackend) {
        if self.kind != BlockKind::Fluid {
            return;
        }
        self.template.cycle_tex_coords();
        self.reupload(backend);
    }

    /// Reverses face winding exactly when the camera's in-fluid state differs
    /// from the winding state the tuple was last prepared for.
    ///
    /// # Returns
    /// `true` if the winding was flipped.
    pub fn prepare(&mut self, backend: &mut dyn RenderBackend, camera_in_fluid: bool) -> bool {
        if camera_in_fluid == self.inverted_winding {
            return false;
        }
        self.template.reverse_winding();
        self.inverted_winding = camera_in_fluid;
        self.reupload(backend);
        true
    }

    fn reupload(&self, backend: &mut dyn RenderBackend) {
        if let Some(handle) = self.handle {
            backend.update_template(handle, self.template.vertices(), self.template.indices());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::RecordingBackend;
    use cgmath::Point3;

    fn water(x: f32) -> Block {
        Block::fluid(Point3::new(x, 0.0, 0.0), "water")
    }

    fn full_water_tuple() -> Tuple {
        Tuple::new(TupleKey::of(&water(0.0)), BlockKind::Fluid)
    }

    #[test]
    fn members_stay_sorted_and_unique() {
        let mut tuple = full_water_tuple();
        for x in [8.0, -4.0, 2.0, 0.0] {
            assert!(tuple.insert(water(x)));
        }
        assert!(!tuple.insert(water(2.0)));

        let xs: Vec<i32> = tuple.members().iter().map(|m| m.position.x).collect();
        assert_eq!(xs, vec![-4, 0, 2, 8]);
        assert!(tuple.get(BlockPos::new(8, 0, 0)).is_some());
        assert_eq!(tuple.remove(BlockPos::new(0, 0, 0)).map(|b| b.position.x), Some(0));
        assert_eq!(tuple.len(), 3);
    }

    #[test]
    fn rejects_blocks_with_another_key() {
        let mut tuple = full_water_tuple();
        let mut hidden = water(0.0);
        hidden.face_mask = FaceMask::NONE;
        assert!(!tuple.insert(hidden));
        assert!(tuple.is_empty());
    }

    #[test]
    fn render_binds_once_and_draws_per_member() {
        let mut backend = RecordingBackend::new();
        let mut tuple = full_water_tuple();
        for x in [0.0, 2.0, 4.0] {
            tuple.insert(water(x));
        }
        assert_eq!(tuple.render(&mut backend), 0);

        tuple.buffer(&mut backend);
        assert_eq!(tuple.render(&mut backend), 3);
        assert_eq!(backend.binds, 1);

        backend.clear_frame();
        let drawn = tuple.render_if(&mut backend, &|block| block.position.x != 2);
        assert_eq!(drawn, 2);
        assert_eq!(tuple.len(), 3);
    }

    #[test]
    fn prepare_toggles_only_on_state_change() {
        let mut backend = RecordingBackend::new();
        let mut tuple = full_water_tuple();
        tuple.insert(water(0.0));
        tuple.buffer(&mut backend);

        assert!(!tuple.prepare(&mut backend, false));
        assert!(tuple.prepare(&mut backend, true));
        assert!(!tuple.prepare(&mut backend, true));
        assert!(tuple.is_winding_inverted());
        assert!(tuple.prepare(&mut backend, false));
        assert_eq!(backend.updates, 2);
    }

    #[test]
    fn only_fluids_animate() {
        let mut backend = RecordingBackend::new();
        let mut fluid = full_water_tuple();
        fluid.buffer(&mut backend);
        fluid.animate(&mut backend);
        assert_eq!(backend.updates, 1);

        let stone = Block::solid(Point3::new(0.0, 0.0, 0.0), "stone");
        let mut solid = Tuple::new(TupleKey::of(&stone), BlockKind::Solid);
        solid.buffer(&mut backend);
        let before = solid.template().clone();
        solid.animate(&mut backend);
        assert_eq!(solid.template(), &before);
        assert_eq!(backend.updates, 1);
    }
}
