// Keeps the nav graph in sync with the voxel world.
//
// `NavMesh` owns the `NavGraph` and knows how to derive it from world blocks:
// a coordinate is a node iff the walkability classifier reports it
// standable (or it was forced in as the agent's own standing voxel), and a
// node's outgoing edges are exactly its classifier neighbours that are
// themselves nodes and have a finite cost in the edge-cost table.
//
// Updates are incremental. A block change at `B` can only change the verdict
// of the four coordinates whose classifier column contains `B` (`B+1` reads
// it as `under`, `B` as `at`, `B-1` as `above`, `B-2` as `above2`). Those are
// reclassified, then edges are reconciled for every node that could list one
// of them as a neighbour: the horizontal ring around each changed coordinate
// from one level below to three levels above (step-ups reach one level up,
// fall probes three levels down), plus the changed coordinates themselves and
// their vertical neighbours.
//
// Reconciliation (`refresh_edges`) recomputes the desired successor set from
// the world and diffs it against the stored one, so running it on an
// unchanged column leaves the graph untouched.
//
// See also: `walkability.rs` for the classifier and neighbour enumeration,
// `nav.rs` for the graph and cost table, `sim.rs` which forwards block
// changes and agent locations here.

use crate::config::BotConfig;
use crate::nav::{self, NavGraph};
use crate::types::{ADJACENCY, VoxelCoord};
use crate::walkability::{self, Walkability};
use crate::world::VoxelWorld;
use log::debug;
use std::collections::BTreeSet;

/// Counts of what an update changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavDelta {
    pub nodes_added: usize,
    pub nodes_removed: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
}

impl NavDelta {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn absorb(&mut self, other: NavDelta) {
        self.nodes_added += other.nodes_added;
        self.nodes_removed += other.nodes_removed;
        self.edges_added += other.edges_added;
        self.edges_removed += other.edges_removed;
    }
}

#[derive(Clone, Debug, Default)]
pub struct NavMesh {
    pub graph: NavGraph,
}

impl NavMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the graph and classify every coordinate of the world.
    pub fn rebuild_all(&mut self, world: &VoxelWorld, config: &BotConfig) -> NavDelta {
        self.graph.clear();
        let mut delta = NavDelta::default();
        let height = config.player.height;
        for y in 0..=world.size_y as i32 {
            for z in 0..world.size_z as i32 {
                for x in 0..world.size_x as i32 {
                    let coord = VoxelCoord::new(x, y, z);
                    if walkability::classify_at(world, coord, height) == Walkability::Standable {
                        self.graph
                            .add_node(coord, walkability::node_min_y(world, coord));
                        delta.nodes_added += 1;
                    }
                }
            }
        }
        let coords: Vec<VoxelCoord> = self.graph.coords().collect();
        for coord in coords {
            delta.absorb(self.refresh_edges(world, coord, config));
        }
        debug!(
            "nav rebuild: {} nodes, {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        );
        delta
    }

    /// Reconcile the graph after the block at `coord` changed.
    pub fn block_change(
        &mut self,
        world: &VoxelWorld,
        coord: VoxelCoord,
        config: &BotConfig,
    ) -> NavDelta {
        let mut delta = NavDelta::default();
        let changed = [
            coord.above(),
            coord,
            coord.below(),
            coord.offset(0, -2, 0),
        ];
        let mut dirty = BTreeSet::new();
        for c in changed {
            let (node_delta, affected) = self.refresh_node(world, c, config);
            delta.absorb(node_delta);
            dirty.extend(affected);
        }
        for c in changed {
            dirty.extend(edge_candidates(c));
        }
        for c in dirty {
            delta.absorb(self.refresh_edges(world, c, config));
        }
        if !delta.is_empty() {
            debug!("block change at {coord}: {delta:?}");
        }
        delta
    }

    /// Add or remove the node at `coord` to match the classifier. Returns the
    /// delta and the nodes that lost edges through a removal.
    fn refresh_node(
        &mut self,
        world: &VoxelWorld,
        coord: VoxelCoord,
        config: &BotConfig,
    ) -> (NavDelta, BTreeSet<VoxelCoord>) {
        let mut delta = NavDelta::default();
        match walkability::classify_at(world, coord, config.player.height) {
            Walkability::Standable => {
                if self
                    .graph
                    .add_node(coord, walkability::node_min_y(world, coord))
                {
                    delta.nodes_added += 1;
                }
                (delta, BTreeSet::new())
            }
            _ if self.graph.has_node(coord) => {
                let before = self.graph.edge_count();
                let affected = self.graph.remove_node(coord);
                delta.nodes_removed += 1;
                delta.edges_removed += before - self.graph.edge_count();
                (delta, affected)
            }
            _ => (delta, BTreeSet::new()),
        }
    }

    /// Make the outgoing edges of `coord` match what the world allows. No-op
    /// for coordinates that are not nodes.
    pub fn refresh_edges(
        &mut self,
        world: &VoxelWorld,
        coord: VoxelCoord,
        config: &BotConfig,
    ) -> NavDelta {
        let mut delta = NavDelta::default();
        let Some(from_min_y) = self.graph.min_y(coord) else {
            return delta;
        };
        let climbable = |at: VoxelCoord| {
            let block = world.get(at);
            block.is_climbable() || block.is_liquid()
        };
        let from_climbable = climbable(coord);
        let desired: Vec<(VoxelCoord, f32)> = walkability::neighbours(world, coord, config)
            .into_iter()
            .filter_map(|to| {
                let to_min_y = self.graph.min_y(to)?;
                nav::edge_cost(
                    coord,
                    from_min_y,
                    from_climbable,
                    to,
                    to_min_y,
                    climbable(to),
                    config,
                )
                .map(|cost| (to, cost))
            })
            .collect();

        let stale: Vec<VoxelCoord> = self
            .graph
            .successors(coord)
            .filter(|(to, _)| !desired.iter().any(|(d, _)| d == to))
            .map(|(to, _)| to)
            .collect();
        for to in stale {
            self.graph.remove_edge(coord, to);
            delta.edges_removed += 1;
        }
        for (to, cost) in desired {
            match self.graph.edge_cost(coord, to) {
                Some(existing) if existing == cost => {}
                Some(_) => {
                    self.graph.add_edge(coord, to, cost);
                }
                None => {
                    self.graph.add_edge(coord, to, cost);
                    delta.edges_added += 1;
                }
            }
        }
        delta
    }

    /// Make sure the voxel the agent stands in is a node, even if the
    /// classifier disagrees (e.g. a server-placed position on an odd block).
    pub fn force_standing_node(
        &mut self,
        world: &VoxelWorld,
        coord: VoxelCoord,
        config: &BotConfig,
    ) -> NavDelta {
        if self.graph.has_node(coord) {
            return NavDelta::default();
        }
        debug!("forcing standing node {coord}");
        self.graph
            .add_node(coord, walkability::node_min_y(world, coord));
        let mut delta = NavDelta {
            nodes_added: 1,
            ..NavDelta::default()
        };
        let mut dirty: BTreeSet<VoxelCoord> = edge_candidates(coord).into_iter().collect();
        dirty.insert(coord);
        for c in dirty {
            delta.absorb(self.refresh_edges(world, c, config));
        }
        delta
    }
}

/// Nodes whose neighbour enumeration can include `c`, plus `c` itself.
fn edge_candidates(c: VoxelCoord) -> Vec<VoxelCoord> {
    let mut out = Vec::with_capacity(8 * 5 + 3);
    for &(dx, dz) in &ADJACENCY {
        for dy in -1..=3 {
            out.push(c.offset(dx, dy, dz));
        }
    }
    out.push(c);
    out.push(c.above());
    out.push(c.below());
    out
}
