// Dense 3D voxel grid standing in for the game server's chunk store.
//
// The world is stored as a flat `Vec<BlockKind>` indexed by
// `x + z * size_x + y * size_x * size_z`, giving O(1) read/write access.
// Out-of-bounds reads return `Air`; out-of-bounds writes are no-ops.
//
// On top of block lookup this module answers the geometric queries the bot
// core needs from its world collaborator:
// - `collision_boxes_in()`: every block box overlapping a swept region.
// - `standing_on_solid_block()`: which block is directly supporting a box.
// - `min_collision_between()`: the distance a box can travel toward a target
//   box before it first hits a block.
// - `is_in_liquid()` / `is_on_ladder()`: special surfaces for the integrator.
//
// See also: `block.rs` for the per-kind flags and collision heights,
// `navmesh.rs` which is notified of every `set()` that changes a block,
// `movement.rs` which sweeps the agent box against these queries.

use crate::aabb::Aabb;
use crate::block::{Block, BlockKind};
use crate::types::{FLOAT_EPSILON, VoxelCoord, float_eq};
use glam::DVec3;

/// Dense 3D voxel grid.
#[derive(Clone, Debug, Default)]
pub struct VoxelWorld {
    /// Flat storage: index = x + z * size_x + y * size_x * size_z.
    blocks: Vec<BlockKind>,
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
}

impl VoxelWorld {
    /// Create a new world filled with `Air`.
    pub fn new(size_x: u32, size_y: u32, size_z: u32) -> Self {
        let total = (size_x as usize) * (size_y as usize) * (size_z as usize);
        Self {
            blocks: vec![BlockKind::Air; total],
            size_x,
            size_y,
            size_z,
        }
    }

    /// Check whether a coordinate is within bounds.
    pub fn in_bounds(&self, coord: VoxelCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && coord.z >= 0
            && (coord.x as u32) < self.size_x
            && (coord.y as u32) < self.size_y
            && (coord.z as u32) < self.size_z
    }

    fn index(&self, coord: VoxelCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            let x = coord.x as usize;
            let y = coord.y as usize;
            let z = coord.z as usize;
            let sx = self.size_x as usize;
            let sz = self.size_z as usize;
            Some(x + z * sx + y * sx * sz)
        } else {
            None
        }
    }

    /// Read a block kind. Returns `Air` for out-of-bounds coordinates.
    pub fn get(&self, coord: VoxelCoord) -> BlockKind {
        self.index(coord)
            .map(|i| self.blocks[i])
            .unwrap_or(BlockKind::Air)
    }

    pub fn block_at(&self, coord: VoxelCoord) -> Block {
        Block::new(coord, self.get(coord))
    }

    /// Write a block. Returns `true` if the stored kind changed; out-of-bounds
    /// writes are ignored and return `false`.
    pub fn set(&mut self, coord: VoxelCoord, kind: BlockKind) -> bool {
        match self.index(coord) {
            Some(i) if self.blocks[i] != kind => {
                self.blocks[i] = kind;
                true
            }
            _ => false,
        }
    }

    /// Fill the inclusive box between two corners.
    pub fn fill(&mut self, a: VoxelCoord, b: VoxelCoord, kind: BlockKind) {
        for y in a.y.min(b.y)..=a.y.max(b.y) {
            for z in a.z.min(b.z)..=a.z.max(b.z) {
                for x in a.x.min(b.x)..=a.x.max(b.x) {
                    self.set(VoxelCoord::new(x, y, z), kind);
                }
            }
        }
    }

    /// Visit every block whose voxel could hold a collision box overlapping
    /// `region`. Starts one voxel lower than the region so that tall boxes
    /// (fences) poking up from below are included.
    fn blocks_near(&self, region: &Aabb) -> impl Iterator<Item = Block> + '_ {
        let lo = VoxelCoord::containing(region.min).offset(0, -1, 0);
        let hi = VoxelCoord::containing(region.max);
        (lo.y..=hi.y).flat_map(move |y| {
            (lo.z..=hi.z).flat_map(move |z| {
                (lo.x..=hi.x).map(move |x| self.block_at(VoxelCoord::new(x, y, z)))
            })
        })
    }

    /// Collision boxes of all blocks that strictly overlap `region`.
    pub fn collision_boxes_in(&self, region: &Aabb) -> Vec<Aabb> {
        self.blocks_near(region)
            .filter_map(|b| b.collision_box())
            .filter(|bb| bb.intersects(region))
            .collect()
    }

    pub fn aabb_collides(&self, bb: &Aabb) -> bool {
        self.blocks_near(bb)
            .filter_map(|b| b.collision_box())
            .any(|block_bb| block_bb.intersects(bb))
    }

    /// The block whose top face the box rests on, preferring the one closest
    /// to the box's horizontal center.
    pub fn standing_on_solid_block(&self, bb: &Aabb) -> Option<Block> {
        let probe = Aabb::new(
            DVec3::new(bb.min.x, bb.min.y - 0.5, bb.min.z),
            DVec3::new(bb.max.x, bb.min.y, bb.max.z),
        );
        let center = bb.horizontal_center();
        self.blocks_near(&probe)
            .filter_map(|b| b.collision_box().map(|block_bb| (b, block_bb)))
            .filter(|(_, block_bb)| {
                block_bb.intersects_horizontally(bb) && float_eq(block_bb.max.y, bb.min.y)
            })
            .min_by(|(a, a_bb), (b, b_bb)| {
                let da = a_bb.horizontal_center().distance_squared(center);
                let db = b_bb.horizontal_center().distance_squared(center);
                da.total_cmp(&db).then_with(|| a.coord.cmp(&b.coord))
            })
            .map(|(b, _)| b)
    }

    /// The nav-graph coordinate of an agent occupying `bb`: the voxel its feet
    /// are in when supported by a block, a liquid or a climbable. `None` while
    /// airborne.
    pub fn standing_voxel(&self, bb: &Aabb) -> Option<VoxelCoord> {
        let feet = feet_voxel(bb);
        (self.standing_on_solid_block(bb).is_some() || self.get(feet).can_stand_in())
            .then_some(feet)
    }

    /// Whether any voxel the box overlaps holds a liquid.
    pub fn is_in_liquid(&self, bb: &Aabb) -> bool {
        self.blocks_near(bb)
            .any(|b| b.kind.is_liquid() && voxel_box(b.coord).intersects(bb))
    }

    /// Whether the voxel holding the box's feet is a ladder or vine.
    pub fn is_on_ladder(&self, bb: &Aabb) -> bool {
        self.get(feet_voxel(bb)).is_climbable()
    }

    /// Sweep `from` toward the position of `to` and report the distance
    /// travelled before the first block contact, with the box that was hit.
    /// With `horizontal` set, the vertical part of the move is ignored.
    pub fn min_collision_between(
        &self,
        from: &Aabb,
        to: &Aabb,
        horizontal: bool,
    ) -> Option<(f64, Aabb)> {
        let mut delta = to.min - from.min;
        if horizontal {
            delta.y = 0.0;
        }
        let length = delta.length();
        if length == 0.0 {
            return None;
        }
        let region = from.extend_to(delta);
        self.collision_boxes_in(&region)
            .into_iter()
            .filter_map(|bb| from.sweep_time_of_impact(delta, &bb).map(|t| (t, bb)))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(t, bb)| (t * length, bb))
    }
}

/// The voxel containing the bottom center of a box. Nudged up so that feet
/// resting exactly on a block top land in the voxel above it.
fn feet_voxel(bb: &Aabb) -> VoxelCoord {
    VoxelCoord::containing(bb.bottom_center() + DVec3::new(0.0, FLOAT_EPSILON, 0.0))
}

fn voxel_box(coord: VoxelCoord) -> Aabb {
    let min = DVec3::new(
        f64::from(coord.x),
        f64::from(coord.y),
        f64::from(coord.z),
    );
    Aabb::new(min, min + DVec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerDimensions;
    use approx::assert_relative_eq;

    fn floor_world() -> VoxelWorld {
        let mut world = VoxelWorld::new(8, 8, 8);
        world.fill(VoxelCoord::new(0, 0, 0), VoxelCoord::new(7, 0, 7), BlockKind::Stone);
        world
    }

    fn player_at(x: f64, y: f64, z: f64) -> Aabb {
        Aabb::from_player_position(DVec3::new(x, y, z), &PlayerDimensions::default())
    }

    #[test]
    fn new_world_is_all_air() {
        let world = VoxelWorld::new(4, 4, 4);
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    assert_eq!(world.get(VoxelCoord::new(x, y, z)), BlockKind::Air);
                }
            }
        }
    }

    #[test]
    fn set_reports_changes() {
        let mut world = VoxelWorld::new(8, 8, 8);
        let coord = VoxelCoord::new(3, 5, 2);
        assert!(world.set(coord, BlockKind::Stone));
        assert!(!world.set(coord, BlockKind::Stone));
        assert_eq!(world.get(coord), BlockKind::Stone);
        assert_eq!(world.get(VoxelCoord::new(3, 5, 3)), BlockKind::Air);
    }

    #[test]
    fn out_of_bounds_is_air_and_unwritable() {
        let mut world = VoxelWorld::new(4, 4, 4);
        assert!(!world.set(VoxelCoord::new(-1, 0, 0), BlockKind::Stone));
        assert_eq!(world.get(VoxelCoord::new(-1, 0, 0)), BlockKind::Air);
        assert_eq!(world.get(VoxelCoord::new(100, 100, 100)), BlockKind::Air);
        assert_eq!(VoxelWorld::default().get(VoxelCoord::new(0, 0, 0)), BlockKind::Air);
    }

    #[test]
    fn indexing_is_correct() {
        let mut world = VoxelWorld::new(10, 8, 6);
        let coord = VoxelCoord::new(5, 3, 4);
        world.set(coord, BlockKind::Slab);
        assert_eq!(world.get(coord), BlockKind::Slab);
        assert_eq!(world.get(VoxelCoord::new(4, 3, 4)), BlockKind::Air);
        assert_eq!(world.get(VoxelCoord::new(5, 2, 4)), BlockKind::Air);
        assert_eq!(world.get(VoxelCoord::new(5, 3, 3)), BlockKind::Air);
    }

    #[test]
    fn resting_box_does_not_collide_with_floor() {
        let world = floor_world();
        let bb = player_at(2.5, 1.0, 2.5);
        assert!(!world.aabb_collides(&bb));
        assert!(world.aabb_collides(&bb.offset(DVec3::new(0.0, -0.1, 0.0))));
    }

    #[test]
    fn collision_boxes_include_tall_fences_from_below() {
        let mut world = floor_world();
        world.set(VoxelCoord::new(3, 1, 3), BlockKind::Fence);
        // A region entirely inside voxel y = 2 still meets the fence's top half.
        let region = Aabb::new(DVec3::new(3.2, 2.1, 3.2), DVec3::new(3.8, 2.4, 3.8));
        assert_eq!(world.collision_boxes_in(&region).len(), 1);
    }

    #[test]
    fn standing_block_prefers_the_center() {
        let world = floor_world();
        let bb = player_at(2.9, 1.0, 2.5);
        let support = world.standing_on_solid_block(&bb).unwrap();
        assert_eq!(support.coord, VoxelCoord::new(2, 0, 2));
        assert_eq!(world.standing_voxel(&bb), Some(VoxelCoord::new(2, 1, 2)));
        assert!(world.standing_on_solid_block(&bb.offset(DVec3::new(0.0, 0.3, 0.0))).is_none());
    }

    #[test]
    fn standing_voxel_on_a_slab_is_the_slab() {
        let mut world = floor_world();
        world.set(VoxelCoord::new(4, 1, 4), BlockKind::Slab);
        let bb = player_at(4.5, 1.5, 4.5);
        assert_eq!(world.standing_voxel(&bb), Some(VoxelCoord::new(4, 1, 4)));
    }

    #[test]
    fn standing_voxel_in_water_while_floating() {
        let mut world = VoxelWorld::new(8, 8, 8);
        world.set(VoxelCoord::new(1, 3, 1), BlockKind::Water);
        let bb = player_at(1.5, 3.2, 1.5);
        assert_eq!(world.standing_voxel(&bb), Some(VoxelCoord::new(1, 3, 1)));
        assert!(world.is_in_liquid(&bb));
        assert!(world.standing_voxel(&player_at(5.5, 3.2, 5.5)).is_none());
    }

    #[test]
    fn ladder_detection_uses_feet_voxel() {
        let mut world = floor_world();
        world.set(VoxelCoord::new(1, 1, 1), BlockKind::Ladder);
        assert!(world.is_on_ladder(&player_at(1.5, 1.0, 1.5)));
        assert!(!world.is_on_ladder(&player_at(2.5, 1.0, 1.5)));
    }

    #[test]
    fn min_collision_distance_to_a_step() {
        let mut world = floor_world();
        world.set(VoxelCoord::new(4, 1, 2), BlockKind::Stone);
        let from = player_at(2.5, 1.0, 2.5);
        let to = player_at(4.5, 2.0, 2.5);
        let (distance, hit) = world.min_collision_between(&from, &to, true).unwrap();
        // Body edge at 2.8, block face at 4.0.
        assert_relative_eq!(distance, 1.2, epsilon = 1e-9);
        assert_relative_eq!(hit.min.x, 4.0);
        // Walking along the flat floor hits nothing.
        let flat = player_at(6.5, 1.0, 6.5);
        assert!(world.min_collision_between(&from, &flat, true).is_none());
    }
}
