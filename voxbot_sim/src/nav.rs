// Navigation graph for agent pathfinding.
//
// The nav graph is a directed, weighted graph keyed by `VoxelCoord`. A node
// names the voxel the agent's feet occupy and carries the height of its
// standing surface (`min_y`). Each node stores both its outgoing (`succ`) and
// incoming (`pred`) edges so that removing a node can drop every edge that
// touches it without scanning the graph. Edge costs are asymmetric: a jump up
// and the matching fall down cost different amounts, and some edges exist in
// one direction only.
//
// All storage uses `BTreeMap` so iteration order (and therefore A* tie
// breaking) is deterministic.
//
// `edge_cost()` is the cost table: horizontal moves cost `cost_direct` or
// `cost_diagonal`; a rise within the step height is free, a rise within the
// jump height adds `cost_jump`, a higher rise is only possible between two
// climbable or liquid voxels; descents add `cost_fall` per block; pure vertical
// moves cost `cost_ladder` per level.
//
// See also: `navmesh.rs` which keeps this graph in sync with the world,
// `pathfinding.rs` for A* search over it.

use crate::config::BotConfig;
use crate::types::{VoxelCoord, float_gt, float_lte};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A position the agent can stand at.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NavNode {
    /// World-space height of the standing surface.
    pub min_y: f64,
    succ: BTreeMap<VoxelCoord, f32>,
    pred: BTreeMap<VoxelCoord, f32>,
}

/// The navigation graph container.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NavGraph {
    nodes: BTreeMap<VoxelCoord, NavNode>,
    edge_count: usize,
}

impl NavGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or update the standing height of an existing one. Returns
    /// `true` if the node is new.
    pub fn add_node(&mut self, coord: VoxelCoord, min_y: f64) -> bool {
        match self.nodes.get_mut(&coord) {
            Some(node) => {
                node.min_y = min_y;
                false
            }
            None => {
                self.nodes.insert(
                    coord,
                    NavNode {
                        min_y,
                        ..NavNode::default()
                    },
                );
                true
            }
        }
    }

    /// Remove a node and every edge touching it. Returns the coordinates of
    /// the nodes that lost an edge, which may need reconciling.
    pub fn remove_node(&mut self, coord: VoxelCoord) -> BTreeSet<VoxelCoord> {
        let mut affected = BTreeSet::new();
        let Some(node) = self.nodes.remove(&coord) else {
            return affected;
        };
        for succ in node.succ.keys() {
            if let Some(n) = self.nodes.get_mut(succ) {
                n.pred.remove(&coord);
            }
            affected.insert(*succ);
        }
        for pred in node.pred.keys() {
            if let Some(n) = self.nodes.get_mut(pred) {
                n.succ.remove(&coord);
            }
            affected.insert(*pred);
        }
        // A self-loop would be counted in both maps; graphs never hold one.
        self.edge_count -= node.succ.len() + node.pred.len();
        affected.remove(&coord);
        affected
    }

    pub fn has_node(&self, coord: VoxelCoord) -> bool {
        self.nodes.contains_key(&coord)
    }

    pub fn min_y(&self, coord: VoxelCoord) -> Option<f64> {
        self.nodes.get(&coord).map(|n| n.min_y)
    }

    /// Add or re-weight the directed edge `from -> to`. Both nodes must exist;
    /// returns `false` (and changes nothing) otherwise.
    pub fn add_edge(&mut self, from: VoxelCoord, to: VoxelCoord, cost: f32) -> bool {
        if from == to || !self.nodes.contains_key(&to) {
            return false;
        }
        let Some(from_node) = self.nodes.get_mut(&from) else {
            return false;
        };
        if from_node.succ.insert(to, cost).is_none() {
            self.edge_count += 1;
        }
        if let Some(to_node) = self.nodes.get_mut(&to) {
            to_node.pred.insert(from, cost);
        }
        true
    }

    /// Remove the directed edge `from -> to`. Returns `true` if it existed.
    pub fn remove_edge(&mut self, from: VoxelCoord, to: VoxelCoord) -> bool {
        let removed = self
            .nodes
            .get_mut(&from)
            .is_some_and(|n| n.succ.remove(&to).is_some());
        if removed {
            if let Some(to_node) = self.nodes.get_mut(&to) {
                to_node.pred.remove(&from);
            }
            self.edge_count -= 1;
        }
        removed
    }

    pub fn has_edge(&self, from: VoxelCoord, to: VoxelCoord) -> bool {
        self.edge_cost(from, to).is_some()
    }

    pub fn edge_cost(&self, from: VoxelCoord, to: VoxelCoord) -> Option<f32> {
        self.nodes.get(&from)?.succ.get(&to).copied()
    }

    /// Outgoing edges of `coord` with their costs. Empty for unknown nodes.
    pub fn successors(&self, coord: VoxelCoord) -> impl Iterator<Item = (VoxelCoord, f32)> + '_ {
        self.nodes
            .get(&coord)
            .into_iter()
            .flat_map(|n| n.succ.iter().map(|(&c, &cost)| (c, cost)))
    }

    /// Incoming edges of `coord` with their costs.
    pub fn predecessors(&self, coord: VoxelCoord) -> impl Iterator<Item = (VoxelCoord, f32)> + '_ {
        self.nodes
            .get(&coord)
            .into_iter()
            .flat_map(|n| n.pred.iter().map(|(&c, &cost)| (c, cost)))
    }

    pub fn coords(&self) -> impl Iterator<Item = VoxelCoord> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edge_count = 0;
    }
}

/// Cost of moving from a node at `from` (standing height `from_min_y`) to an
/// adjacent node at `to`. `None` when the move is not traversable.
/// `from_is_climbable` and `to_is_climbable` mark voxels inside a ladder, vine
/// or liquid. A rise above the jump height needs both: a standing agent can
/// only step or jump.
pub fn edge_cost(
    from: VoxelCoord,
    from_min_y: f64,
    from_is_climbable: bool,
    to: VoxelCoord,
    to_min_y: f64,
    to_is_climbable: bool,
    config: &BotConfig,
) -> Option<f32> {
    let costs = &config.pathfinding;
    let physics = &config.physics;
    let dx = (to.x - from.x).abs();
    let dz = (to.z - from.z).abs();
    let dy = to.y - from.y;

    if dx == 0 && dz == 0 {
        if dy == 0 {
            return None;
        }
        return Some(costs.cost_ladder * dy.unsigned_abs() as f32);
    }

    let base = if dx + dz == 2 {
        costs.cost_diagonal
    } else {
        costs.cost_direct
    };
    let rise = to_min_y - from_min_y;
    if float_lte(rise, 0.0) {
        return Some(base + costs.cost_fall * rise.abs() as f32);
    }
    if float_lte(rise, physics.max_step_height) {
        return Some(base);
    }
    if float_lte(rise, physics.max_jump_height) {
        return Some(base + costs.cost_jump);
    }
    if from_is_climbable && to_is_climbable && float_gt(rise, 0.0) {
        return Some(base + costs.cost_ladder * rise as f32);
    }
    None
}
