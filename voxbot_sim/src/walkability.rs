// Walkability classifier and neighbour enumeration.
//
// `classify()` is a pure function of the four vertically stacked blocks at a
// coordinate: the block below (`under`), the block the feet occupy (`at`),
// the block the head occupies (`above`) and, for partial blocks that raise
// the standing surface, the block above that (`above2`). It yields one of
// `Blocked`, `FreeFall` (the agent would sink through) or `Standable`.
//
// Decision order:
// 0. `at` obstructs the body (a cube, or neither fall-through nor
//    stand-in-able) → blocked.
// 1. `above` is not fall-through → blocked (no headroom).
// 2. `at` can be stood in (liquid, climbable, slab, stairs): stairs are
//    standable; a fence below an overlapping stand-in block, and slabs,
//    additionally need `above2` clear of the raised head; otherwise standable.
// 3. `under` can be stood on: free-fall if both `under` and `at` are
//    fall-through, else standable.
// 4. `at` is fall-through → free-fall.
// 5. Otherwise blocked.
//
// The nav mesh re-runs this classifier incrementally after block changes, so
// identical inputs must always give identical verdicts.
//
// `neighbours()` enumerates the outgoing candidate coordinates of a node: for
// each of the 8 horizontal directions, the same level, one level up when the
// same level is blocked, or the first standable level up to
// `max_fall_probe` blocks down when it is free-fall. Directly above and
// below are checked too.
//
// See also: `block.rs` for the flags read here, `navmesh.rs` which turns
// verdicts into graph nodes and edges.

use crate::block::Block;
use crate::config::BotConfig;
use crate::types::{ADJACENCY, VoxelCoord, float_gt};
use crate::world::VoxelWorld;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Walkability {
    Blocked,
    FreeFall,
    Standable,
}

/// Classify the coordinate whose four stacked blocks are given.
pub fn classify(
    under: &Block,
    at: &Block,
    above: &Block,
    above2: &Block,
    player_height: f64,
) -> Walkability {
    if at.kind.is_cube() || !(at.kind.is_fall_through() || at.kind.can_stand_in()) {
        return Walkability::Blocked;
    }
    if !above.kind.is_fall_through() {
        return Walkability::Blocked;
    }
    if at.kind.can_stand_in() {
        if at.kind.is_stairs() {
            return Walkability::Standable;
        }
        let raised_top = if under.kind.is_fence() && at.kind.fence_overlap() {
            Some(under.max_y())
        } else if at.kind.stand_in_over2() {
            Some(at.max_y())
        } else {
            None
        };
        return match raised_top {
            Some(top)
                if !(above2.kind.is_fall_through()
                    || float_gt(above2.min_y(), top + player_height)) =>
            {
                Walkability::Blocked
            }
            _ => Walkability::Standable,
        };
    }
    if under.kind.can_stand_on() {
        if under.kind.is_fall_through() && at.kind.is_fall_through() {
            return Walkability::FreeFall;
        }
        return Walkability::Standable;
    }
    if at.kind.is_fall_through() {
        return Walkability::FreeFall;
    }
    Walkability::Blocked
}

/// Classify `coord` by reading its column from the world.
pub fn classify_at(world: &VoxelWorld, coord: VoxelCoord, player_height: f64) -> Walkability {
    classify(
        &world.block_at(coord.below()),
        &world.block_at(coord),
        &world.block_at(coord.above()),
        &world.block_at(coord.offset(0, 2, 0)),
        player_height,
    )
}

/// Height of the standing surface of a node at `coord`: the top of a partial
/// block at the coordinate, else the top of the block below when it reaches
/// into this voxel, else the voxel floor.
pub fn node_min_y(world: &VoxelWorld, coord: VoxelCoord) -> f64 {
    let at = world.block_at(coord);
    if at.kind.collision_height().is_some() {
        return at.max_y();
    }
    let under = world.block_at(coord.below());
    let floor = f64::from(coord.y);
    if under.kind.collision_height().is_some() && under.max_y() > floor {
        return under.max_y();
    }
    floor
}

/// Outgoing neighbour candidates of `coord`. Every returned coordinate
/// classifies as standable.
pub fn neighbours(
    world: &VoxelWorld,
    coord: VoxelCoord,
    config: &BotConfig,
) -> SmallVec<[VoxelCoord; 10]> {
    let height = config.player.height;
    let mut out = SmallVec::new();
    for &(dx, dz) in &ADJACENCY {
        let side = coord.offset(dx, 0, dz);
        match classify_at(world, side, height) {
            Walkability::Standable => out.push(side),
            Walkability::Blocked => {
                let up = side.above();
                if classify_at(world, up, height) == Walkability::Standable {
                    out.push(up);
                }
            }
            Walkability::FreeFall => {
                for depth in 1..=config.pathfinding.max_fall_probe {
                    let down = side.offset(0, -depth, 0);
                    match classify_at(world, down, height) {
                        Walkability::Standable => {
                            out.push(down);
                            break;
                        }
                        Walkability::Blocked => break,
                        Walkability::FreeFall => {}
                    }
                }
            }
        }
    }
    for vertical in [coord.above(), coord.below()] {
        if classify_at(world, vertical, height) == Walkability::Standable {
            out.push(vertical);
        }
    }
    out
}
