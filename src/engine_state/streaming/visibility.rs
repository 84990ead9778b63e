//! # Visibility Scheduler
//!
//! Drives chunk paging from the viewer's position. Two min-priority queues
//! rank every grid cell by squared cell distance from the viewer's chunk: one
//! for cells within the vision radius, one for the rest.
//!
//! Each tick pops at most one entry from each queue and applies it to both
//! block categories, so a tick costs at most one load and one eviction per
//! category whatever the size of the world. Queues are cleared when the
//! viewer enters another chunk and refilled once both have drained.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use cgmath::Point3;

use crate::engine_state::voxels::adjacency::AdjacencyIndex;
use crate::engine_state::voxels::block::BlockKind;
use crate::engine_state::voxels::chunk::chunk_grid::{chunk_func, ChunkId};
use crate::engine_state::voxels::chunk::ChunkState;
use crate::engine_state::voxels::chunk_set::ChunkSet;

/// A queued grid cell, ordered so the nearest cell pops first.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct QueueEntry {
    distance: u32,
    id: ChunkId,
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .cmp(&self.distance)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// What a tick did to one chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkAction {
    /// A visible resident chunk had its time-to-live refreshed
    KeptAlive,
    /// A visible cached chunk was read back into residency
    Loaded,
    /// An invisible chunk lost one tick of time-to-live; the remainder
    Decayed(u32),
    /// An invisible dead chunk was unbuffered, written out and dropped
    Evicted,
}

/// One paging decision taken during a tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TickAction {
    /// Category the chunk belongs to
    pub kind: BlockKind,
    /// Grid cell of the chunk
    pub id: ChunkId,
    /// What happened
    pub action: ChunkAction,
}

/// Distance-ranked paging scheduler.
#[derive(Debug)]
pub struct VisibilityScheduler {
    vision_radius: u32,
    viewer_chunk: Option<ChunkId>,
    visible: BinaryHeap<QueueEntry>,
    invisible: BinaryHeap<QueueEntry>,
}

impl VisibilityScheduler {
    /// Creates a scheduler treating cells within `vision_radius` cells of the
    /// viewer as visible.
    pub fn new(vision_radius: u32) -> Self {
        VisibilityScheduler {
            vision_radius,
            viewer_chunk: None,
            visible: BinaryHeap::new(),
            invisible: BinaryHeap::new(),
        }
    }

    /// The chunk the viewer was last seen in.
    pub fn viewer_chunk(&self) -> Option<ChunkId> {
        self.viewer_chunk
    }

    /// Entries left in the visible and invisible queues.
    pub fn pending(&self) -> (usize, usize) {
        (self.visible.len(), self.invisible.len())
    }

    /// Forgets the viewer and both queues.
    pub fn reset(&mut self) {
        self.viewer_chunk = None;
        self.visible.clear();
        self.invisible.clear();
    }

    /// Updates the viewer position. Entering a new chunk clears both queues;
    /// empty queues are refilled from the whole grid.
    ///
    /// # Returns
    /// `true` if the queues were refilled.
    pub fn determine_visible(&mut self, viewer: Point3<f32>) -> bool {
        let current = chunk_func(viewer);
        if self.viewer_chunk != Some(current) {
            log::debug!("Viewer entered chunk {}", current);
            self.viewer_chunk = Some(current);
            self.visible.clear();
            self.invisible.clear();
        }
        if !self.visible.is_empty() || !self.invisible.is_empty() {
            return false;
        }

        let radius_sq = self.vision_radius * self.vision_radius;
        for id in ChunkId::all() {
            let entry = QueueEntry {
                distance: current.cell_distance_sq(id),
                id,
            };
            if entry.distance <= radius_sq {
                self.visible.push(entry);
            } else {
                self.invisible.push(entry);
            }
        }
        true
    }

    /// Runs one scheduling tick over both categories.
    ///
    /// # Returns
    /// Every paging decision taken, in the order applied.
    pub fn chunk_operations(&mut self, layers: [(&mut ChunkSet, &mut AdjacencyIndex); 2]) -> Vec<TickAction> {
        let visible = self.visible.pop();
        let invisible = self.invisible.pop();
        let mut actions = Vec::new();

        for (set, index) in layers {
            if let Some(entry) = visible {
                if let Some(action) = Self::apply_visible(set, index, entry.id) {
                    actions.push(TickAction {
                        kind: set.kind(),
                        id: entry.id,
                        action,
                    });
                }
            }
            if let Some(entry) = invisible {
                if let Some(action) = Self::apply_invisible(set, entry.id) {
                    actions.push(TickAction {
                        kind: set.kind(),
                        id: entry.id,
                        action,
                    });
                }
            }
        }

        for action in &actions {
            log::debug!("{} chunk {}: {:?}", action.kind, action.id, action.action);
        }
        actions
    }

    fn apply_visible(set: &mut ChunkSet, index: &mut AdjacencyIndex, id: ChunkId) -> Option<ChunkAction> {
        let time_to_live = set.time_to_live();
        if let Some(chunk) = set.get_chunk_mut(id) {
            chunk.refresh(time_to_live);
            return Some(ChunkAction::KeptAlive);
        }
        if set.state_of(id) != ChunkState::Cached {
            return None;
        }
        match set.load_chunk(id, index) {
            Ok(true) => Some(ChunkAction::Loaded),
            Ok(false) => None,
            Err(error) => {
                log::error!("Could not load {} chunk {}: {}", set.kind(), id, error);
                None
            }
        }
    }

    fn apply_invisible(set: &mut ChunkSet, id: ChunkId) -> Option<ChunkAction> {
        let chunk = set.get_chunk_mut(id)?;
        if chunk.is_alive() {
            return Some(ChunkAction::Decayed(chunk.decay()));
        }
        match set.evict_chunk(id) {
            Ok(true) => Some(ChunkAction::Evicted),
            Ok(false) => None,
            Err(error) => {
                log::error!("Could not evict {} chunk {}: {}", set.kind(), id, error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::Block;
    use crate::engine_state::voxels::chunk::chunk_grid::{inv_chunk_func, GRID_SIZE};
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("paged-voxel-world-{}-{}", name, std::process::id()))
    }

    struct Fixture {
        solid: ChunkSet,
        solid_index: AdjacencyIndex,
        fluid: ChunkSet,
        fluid_index: AdjacencyIndex,
    }

    impl Fixture {
        fn new(name: &str) -> Self {
            let dir = scratch_dir(name);
            Fixture {
                solid: ChunkSet::new(BlockKind::Solid, &dir, 1000, 2).unwrap(),
                solid_index: AdjacencyIndex::new(),
                fluid: ChunkSet::new(BlockKind::Fluid, &dir, 1000, 2).unwrap(),
                fluid_index: AdjacencyIndex::new(),
            }
        }

        fn tick(&mut self, scheduler: &mut VisibilityScheduler, viewer: Point3<f32>) -> Vec<TickAction> {
            scheduler.determine_visible(viewer);
            scheduler.chunk_operations([
                (&mut self.solid, &mut self.solid_index),
                (&mut self.fluid, &mut self.fluid_index),
            ])
        }
    }

    #[test]
    fn queues_pop_nearest_first() {
        let mut scheduler = VisibilityScheduler::new(1);
        assert!(scheduler.determine_visible(Point3::new(0.0, 0.0, 0.0)));
        assert_eq!(scheduler.pending(), (5, GRID_SIZE - 5));
        assert!(!scheduler.determine_visible(Point3::new(1.0, 0.0, 1.0)));

        let viewer = scheduler.viewer_chunk().unwrap();
        let first = scheduler.visible.pop().unwrap();
        assert_eq!(first.id, viewer);
        let mut last = 0;
        while let Some(entry) = scheduler.invisible.pop() {
            assert!(entry.distance >= last);
            last = entry.distance;
        }
    }

    #[test]
    fn entering_a_new_chunk_rebuilds_queues() {
        let mut scheduler = VisibilityScheduler::new(2);
        scheduler.determine_visible(Point3::new(0.0, 0.0, 0.0));
        scheduler.visible.pop();
        let far = inv_chunk_func(ChunkId(0));
        assert!(scheduler.determine_visible(far));
        assert_eq!(scheduler.viewer_chunk(), Some(ChunkId(0)));
        // A corner cell sees a quarter disc of radius two.
        assert_eq!(scheduler.pending().0, 6);
    }

    #[test]
    fn distant_chunks_decay_then_evict_then_reload() {
        let mut fixture = Fixture::new("scheduler-cycle");
        let mut scheduler = VisibilityScheduler::new(1);
        let block = Block::solid(inv_chunk_func(ChunkId(0)), "stone");
        assert!(fixture.solid.add_block(block, true, &mut fixture.solid_index));

        let far_viewer = inv_chunk_func(ChunkId((GRID_SIZE - 1) as u8));
        let mut decisions = Vec::new();
        for _ in 0..(GRID_SIZE * 4) {
            decisions.extend(
                fixture
                    .tick(&mut scheduler, far_viewer)
                    .into_iter()
                    .filter(|action| action.id == ChunkId(0))
                    .map(|action| action.action),
            );
        }
        assert_eq!(
            &decisions[..3],
            &[ChunkAction::Decayed(1), ChunkAction::Decayed(0), ChunkAction::Evicted]
        );
        assert_eq!(fixture.solid.state_of(ChunkId(0)), ChunkState::Cached);
        assert_eq!(fixture.solid.total_size(), 1);

        let near_viewer = inv_chunk_func(ChunkId(0));
        let actions = fixture.tick(&mut scheduler, near_viewer);
        assert!(actions.contains(&TickAction {
            kind: BlockKind::Solid,
            id: ChunkId(0),
            action: ChunkAction::Loaded,
        }));
        assert_eq!(fixture.solid.get_block(block.position), Some(&block));
    }

    #[test]
    fn visible_chunks_are_kept_alive() {
        let mut fixture = Fixture::new("scheduler-alive");
        let mut scheduler = VisibilityScheduler::new(1);
        let viewer = Point3::new(0.0, 0.0, 0.0);
        let water = Block::fluid(viewer, "water");
        fixture.fluid.add_block(water, true, &mut fixture.fluid_index);
        let id = chunk_func(viewer);
        fixture.fluid.get_chunk_mut(id).unwrap().decay();

        let actions = fixture.tick(&mut scheduler, viewer);
        assert!(actions.contains(&TickAction {
            kind: BlockKind::Fluid,
            id,
            action: ChunkAction::KeptAlive,
        }));
        assert_eq!(fixture.fluid.get_chunk(id).unwrap().time_to_live(), 2);
    }

    #[test]
    fn each_tick_loads_at_most_one_chunk_per_category() {
        let mut fixture = Fixture::new("scheduler-one-load");
        let mut scheduler = VisibilityScheduler::new(1);
        let viewer = inv_chunk_func(ChunkId::from_cell(8, 8));
        let center = chunk_func(viewer);
        let visible = [
            center,
            ChunkId::from_cell(center.column() - 1, center.row()),
            ChunkId::from_cell(center.column() + 1, center.row()),
            ChunkId::from_cell(center.column(), center.row() - 1),
            ChunkId::from_cell(center.column(), center.row() + 1),
        ];
        for id in visible {
            let centroid = inv_chunk_func(id);
            fixture.solid.add_block(Block::solid(centroid, "stone"), true, &mut fixture.solid_index);
            fixture.fluid.add_block(Block::fluid(centroid, "water"), true, &mut fixture.fluid_index);
            assert!(fixture.solid.evict_chunk(id).unwrap());
            assert!(fixture.fluid.evict_chunk(id).unwrap());
        }

        let actions = fixture.tick(&mut scheduler, viewer);
        for kind in [BlockKind::Solid, BlockKind::Fluid] {
            let loaded = actions
                .iter()
                .filter(|action| action.kind == kind && action.action == ChunkAction::Loaded)
                .count();
            assert_eq!(loaded, 1);
            let set = match kind {
                BlockKind::Solid => &fixture.solid,
                BlockKind::Fluid => &fixture.fluid,
            };
            let cached = visible.iter().filter(|id| set.state_of(**id) == ChunkState::Cached).count();
            assert_eq!(cached, visible.len() - 1);
        }
        assert!(actions.len() <= 4);

        for _ in 1..visible.len() {
            fixture.tick(&mut scheduler, viewer);
        }
        for id in visible {
            assert!(matches!(fixture.solid.state_of(id), ChunkState::Resident { .. }));
            assert!(matches!(fixture.fluid.state_of(id), ChunkState::Resident { .. }));
        }
    }
}
