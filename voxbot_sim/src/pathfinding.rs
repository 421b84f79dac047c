// Resumable A* pathfinding over the navigation graph.
//
// Implements A* with a `BinaryHeap` (min-heap via reversed ordering). Unlike a
// run-to-completion search, `PathSearch` keeps its whole frontier (open heap,
// g-scores, came-from links, closed set) in the struct so that the caller can
// advance it a few nodes at a time with `step()`. The travel behaviour gives
// each search `nodes_per_slice` expansions per tick, so a large search is
// spread over many ticks instead of stalling the one it started in.
//
// `step()` returns `Poll::Pending` while the search still has work to do and
// `Poll::Ready` with the path or a `SearchFailure` once it is done. A search
// can be abandoned with `cancel()`; the flag is checked at the start of the
// next `step()`. The search also fails if the agent changes dimension while
// it is in flight, if its goal disappears from the graph, or once it expands
// more than `max_expanded_nodes` nodes.
//
// Edges are followed only if the agent's box, lifted to the higher of the two
// standing heights, can sweep from one node center to the other without
// touching a block. This rules out diagonal corner cutting and jumps without
// headroom even where the classifier admitted both endpoints.
//
// The heuristic is the larger of two lower bounds: the octile distance over
// x/z in units of `cost_direct`/`cost_diagonal`, and the number of edges
// needed to cover the vertical distance times the cheapest edge. Both are
// admissible and consistent, so the first time the goal is popped its path
// is optimal.
//
// See also: `nav.rs` for the graph, `navmesh.rs` which keeps it current,
// `behaviour.rs` where the travel behaviour drives searches.

use crate::aabb::Aabb;
use crate::config::{PathfindingConfig, PlayerDimensions};
use crate::nav::NavGraph;
use crate::types::{Dimension, VoxelCoord};
use crate::world::VoxelWorld;
use glam::DVec3;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::task::Poll;
use thiserror::Error;

/// Why a search ended without a path. None of these are fatal: the owning
/// behaviour turns them into a goal failure.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SearchFailure {
    #[error("start is not a nav node")]
    StartNotInGraph,
    #[error("goal is not a nav node")]
    GoalNotInGraph,
    #[error("goal is beyond the search distance limit")]
    GoalOutOfRange,
    #[error("exploration limit reached")]
    ExplorationLimit,
    #[error("no route to goal")]
    NoRoute,
    #[error("agent changed dimension during the search")]
    DimensionChanged,
    #[error("search cancelled")]
    Cancelled,
}

/// The result of a successful search.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    /// Node coordinates from start to goal (inclusive).
    pub nodes: Vec<VoxelCoord>,
    pub total_cost: f32,
}

impl Path {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn goal(&self) -> Option<VoxelCoord> {
        self.nodes.last().copied()
    }

    /// Whether every consecutive pair is still an edge of `graph`.
    pub fn is_adjacent_in(&self, graph: &NavGraph) -> bool {
        self.nodes.windows(2).all(|w| graph.has_edge(w[0], w[1]))
    }

    /// Sweep the agent's box along the path and report whether it stays clear
    /// of blocks. `current` is the agent's box right now; it must be free too.
    pub fn check_path(
        &self,
        world: &VoxelWorld,
        graph: &NavGraph,
        current: &Aabb,
        player: &PlayerDimensions,
    ) -> bool {
        if self.nodes.is_empty() || world.aabb_collides(current) {
            return false;
        }
        self.nodes.windows(2).all(|w| {
            match (graph.min_y(w[0]), graph.min_y(w[1])) {
                (Some(a), Some(b)) => edge_clear(world, w[0], a, w[1], b, player),
                _ => false,
            }
        })
    }
}

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    coord: VoxelCoord,
    f_score: f32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f_score.total_cmp(&other.f_score) == Ordering::Equal && self.coord == other.coord
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f_score is "greatest".
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

/// An in-flight A* search.
pub struct PathSearch {
    dimension: Dimension,
    start: VoxelCoord,
    goal: VoxelCoord,
    player: PlayerDimensions,
    limits: PathfindingConfig,
    open: BinaryHeap<OpenEntry>,
    g_score: FxHashMap<VoxelCoord, f32>,
    came_from: FxHashMap<VoxelCoord, VoxelCoord>,
    closed: FxHashSet<VoxelCoord>,
    expanded: usize,
    started: bool,
    cancelled: bool,
}

impl PathSearch {
    pub fn new(
        dimension: Dimension,
        start: VoxelCoord,
        goal: VoxelCoord,
        player: &PlayerDimensions,
        limits: &PathfindingConfig,
    ) -> Self {
        Self {
            dimension,
            start,
            goal,
            player: player.clone(),
            limits: limits.clone(),
            open: BinaryHeap::new(),
            g_score: FxHashMap::default(),
            came_from: FxHashMap::default(),
            closed: FxHashSet::default(),
            expanded: 0,
            started: false,
            cancelled: false,
        }
    }

    /// Nodes expanded so far.
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    /// Request that the search stop. Takes effect on the next `step()`.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Expand up to `budget` nodes (at least one). `dimension` is the agent's
    /// current dimension.
    pub fn step(
        &mut self,
        graph: &NavGraph,
        world: &VoxelWorld,
        dimension: Dimension,
        budget: usize,
    ) -> Poll<Result<Path, SearchFailure>> {
        if self.cancelled {
            return Poll::Ready(Err(SearchFailure::Cancelled));
        }
        if dimension != self.dimension {
            return Poll::Ready(Err(SearchFailure::DimensionChanged));
        }
        if !self.started {
            if !graph.has_node(self.start) {
                return Poll::Ready(Err(SearchFailure::StartNotInGraph));
            }
            if self.start.chebyshev_distance(self.goal) > self.limits.search_distance_limit {
                return Poll::Ready(Err(SearchFailure::GoalOutOfRange));
            }
            self.started = true;
            self.g_score.insert(self.start, 0.0);
            self.open.push(OpenEntry {
                coord: self.start,
                f_score: self.heuristic(self.start),
            });
        }
        if !graph.has_node(self.goal) {
            return Poll::Ready(Err(SearchFailure::GoalNotInGraph));
        }

        let mut work = 0;
        while work < budget.max(1) {
            let Some(current) = self.open.pop() else {
                debug!(
                    "no route {} -> {} after {} nodes",
                    self.start, self.goal, self.expanded
                );
                return Poll::Ready(Err(SearchFailure::NoRoute));
            };
            let coord = current.coord;
            if coord == self.goal {
                let path = self.reconstruct_path();
                debug!(
                    "path {} -> {}: {} nodes, cost {:.2}, {} expanded",
                    self.start,
                    self.goal,
                    path.len(),
                    path.total_cost,
                    self.expanded
                );
                return Poll::Ready(Ok(path));
            }
            if !self.closed.insert(coord) {
                continue;
            }
            // Nodes can vanish between slices.
            let Some(from_min_y) = graph.min_y(coord) else {
                continue;
            };
            self.expanded += 1;
            work += 1;
            if self.expanded > self.limits.max_expanded_nodes {
                return Poll::Ready(Err(SearchFailure::ExplorationLimit));
            }

            let current_g = self.g_score.get(&coord).copied().unwrap_or(f32::INFINITY);
            for (neighbor, cost) in graph.successors(coord) {
                if self.closed.contains(&neighbor)
                    || neighbor.chebyshev_distance(self.start) > self.limits.search_distance_limit
                {
                    continue;
                }
                let tentative_g = current_g + cost;
                let known = self.g_score.get(&neighbor).copied().unwrap_or(f32::INFINITY);
                if tentative_g >= known {
                    continue;
                }
                let Some(to_min_y) = graph.min_y(neighbor) else {
                    continue;
                };
                if !edge_clear(world, coord, from_min_y, neighbor, to_min_y, &self.player) {
                    continue;
                }
                self.g_score.insert(neighbor, tentative_g);
                self.came_from.insert(neighbor, coord);
                self.open.push(OpenEntry {
                    coord: neighbor,
                    f_score: tentative_g + self.heuristic(neighbor),
                });
            }
        }
        Poll::Pending
    }

    fn heuristic(&self, from: VoxelCoord) -> f32 {
        let dx = (self.goal.x - from.x).unsigned_abs() as f32;
        let dz = (self.goal.z - from.z).unsigned_abs() as f32;
        let dy = (self.goal.y - from.y).unsigned_abs() as f32;
        let (long, short) = if dx > dz { (dx, dz) } else { (dz, dx) };
        let octile =
            self.limits.cost_direct * (long - short) + self.limits.cost_diagonal * short;
        let vertical =
            self.limits.min_edge_cost() * (dy / self.limits.max_levels_per_edge() as f32).ceil();
        octile.max(vertical)
    }

    fn reconstruct_path(&self) -> Path {
        let mut nodes = vec![self.goal];
        let mut current = self.goal;
        while current != self.start {
            match self.came_from.get(&current) {
                Some(&prev) => {
                    nodes.push(prev);
                    current = prev;
                }
                None => break,
            }
        }
        nodes.reverse();
        Path {
            nodes,
            total_cost: self.g_score.get(&self.goal).copied().unwrap_or(0.0),
        }
    }
}

/// Run a search to completion in one call.
pub fn find_path(
    graph: &NavGraph,
    world: &VoxelWorld,
    dimension: Dimension,
    start: VoxelCoord,
    goal: VoxelCoord,
    player: &PlayerDimensions,
    limits: &PathfindingConfig,
) -> Result<Path, SearchFailure> {
    let mut search = PathSearch::new(dimension, start, goal, player, limits);
    loop {
        if let Poll::Ready(result) = search.step(graph, world, dimension, usize::MAX) {
            return result;
        }
    }
}

/// Whether the agent's box can move from node `from` to node `to` without
/// touching a block. Horizontal moves are swept at the higher standing
/// height; vertical moves sweep the whole column between the two.
pub fn edge_clear(
    world: &VoxelWorld,
    from: VoxelCoord,
    from_min_y: f64,
    to: VoxelCoord,
    to_min_y: f64,
    player: &PlayerDimensions,
) -> bool {
    let level = from_min_y.max(to_min_y);
    let start = DVec3::new(f64::from(from.x) + 0.5, level, f64::from(from.z) + 0.5);
    let end = DVec3::new(f64::from(to.x) + 0.5, level, f64::from(to.z) + 0.5);
    let swept = if from.x == to.x && from.z == to.z {
        let low = from_min_y.min(to_min_y);
        let bottom = DVec3::new(start.x, low, start.z);
        Aabb::from_player_position(bottom, player).extend_to(DVec3::new(0.0, level - low, 0.0))
    } else {
        Aabb::from_player_position(start, player).extend_to(end - start)
    };
    !world.aabb_collides(&swept)
}
