// Block kinds and their classification flags.
//
// Every voxel holds a `BlockKind`. The walkability classifier, the nav mesh
// and the movement integrator never look at kinds directly: they read the
// flags below, so adding a kind means filling in one row of each table.
//
// Flag meanings:
// - `is_cube`: a full solid block; nothing may stand inside it.
// - `is_free`: empty space (air). Nothing to collide with, nothing to hold on to.
// - `is_fall_through`: the agent's body passes through it (air, plants,
//   liquids, ladders). Fall-through blocks above a coordinate give headroom.
// - `can_stand_in`: the agent's feet may occupy this voxel and be supported
//   by it (liquids, climbables, and partial blocks such as slabs and stairs).
// - `can_stand_on`: the block's top face supports an agent in the voxel above.
// - `fence_overlap`: a fence in the voxel below pokes into this voxel.
// - `stand_in_over2`: the block raises the standing surface inside its own
//   voxel, so the voxel two above must also be clear.
//
// Collision geometry is one box per block, anchored at the voxel's floor:
// full cubes are 1.0 high, slabs and stairs 0.5, fences 1.5.
//
// See also: `world.rs` which stores kinds and turns them into `Block`s,
// `walkability.rs` for the classifier that consumes these flags.

use crate::aabb::Aabb;
use crate::types::VoxelCoord;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Friction coefficient of ordinary blocks.
pub const DEFAULT_SLIPPERINESS: f64 = 0.6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    #[default]
    Air,
    Stone,
    Ice,
    /// Bottom half slab.
    Slab,
    /// Stairs, collided as their bottom half.
    Stairs,
    Fence,
    TallGrass,
    Water,
    Ladder,
    Vine,
}

impl BlockKind {
    pub fn is_cube(self) -> bool {
        matches!(self, Self::Stone | Self::Ice)
    }

    pub fn is_free(self) -> bool {
        self == Self::Air
    }

    pub fn is_fall_through(self) -> bool {
        matches!(
            self,
            Self::Air | Self::TallGrass | Self::Water | Self::Ladder | Self::Vine
        )
    }

    pub fn can_stand_in(self) -> bool {
        matches!(
            self,
            Self::Slab | Self::Stairs | Self::Water | Self::Ladder | Self::Vine
        )
    }

    pub fn can_stand_on(self) -> bool {
        self.is_cube()
    }

    pub fn is_fence(self) -> bool {
        self == Self::Fence
    }

    pub fn is_stairs(self) -> bool {
        self == Self::Stairs
    }

    pub fn fence_overlap(self) -> bool {
        matches!(self, Self::Water | Self::Ladder | Self::Vine)
    }

    pub fn stand_in_over2(self) -> bool {
        self == Self::Slab
    }

    pub fn is_climbable(self) -> bool {
        matches!(self, Self::Ladder | Self::Vine)
    }

    pub fn is_liquid(self) -> bool {
        self == Self::Water
    }

    pub fn slipperiness(self) -> f64 {
        match self {
            Self::Ice => 0.98,
            _ => DEFAULT_SLIPPERINESS,
        }
    }

    /// Height of the collision box above the voxel floor, or `None` for
    /// blocks the agent passes through.
    pub fn collision_height(self) -> Option<f64> {
        match self {
            Self::Stone | Self::Ice => Some(1.0),
            Self::Slab | Self::Stairs => Some(0.5),
            Self::Fence => Some(1.5),
            Self::Air | Self::TallGrass | Self::Water | Self::Ladder | Self::Vine => None,
        }
    }
}

/// A block kind at a concrete coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub coord: VoxelCoord,
    pub kind: BlockKind,
}

impl Block {
    pub fn new(coord: VoxelCoord, kind: BlockKind) -> Self {
        Self { coord, kind }
    }

    pub fn collision_box(&self) -> Option<Aabb> {
        let height = self.kind.collision_height()?;
        let min = DVec3::new(
            f64::from(self.coord.x),
            f64::from(self.coord.y),
            f64::from(self.coord.z),
        );
        Some(Aabb::new(min, min + DVec3::new(1.0, height, 1.0)))
    }

    /// Bottom of the block's collision box, or the voxel floor if it has none.
    pub fn min_y(&self) -> f64 {
        f64::from(self.coord.y)
    }

    /// Top of the block's collision box, or the voxel floor if it has none.
    pub fn max_y(&self) -> f64 {
        f64::from(self.coord.y) + self.kind.collision_height().unwrap_or(0.0)
    }
}
