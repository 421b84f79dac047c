// Named waypoints and ordered waypoint groups.
//
// A waypoint is a marker placed in the world (a sign, in-game) with a name
// and optionally a group plus a numeric order. The agent walks to the voxel
// below the marker (`nav_coords`), which is where a standing agent's feet are
// when the sign hangs at head height.
//
// Waypoints with both a group and an order join that group. Members are kept
// sorted by order; a new member whose order equals existing ones goes after
// them. Each group has a cursor used by the walk behaviours:
// - circulate: ping-pong from head to tail and back,
// - rotate: head to tail, then wrap around to the head.
// The first call after `reset_group` returns the head. A group with fewer
// than two members yields nothing. Removing the member under the cursor moves
// the cursor to the previous member (or the next one when it was the head),
// so a walk in progress continues from where it was.
//
// See also: `behaviour.rs` for the walk-signs and go-to-sign frames that read
// these cursors.

use crate::nav::NavGraph;
use crate::types::VoxelCoord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Where the marker itself is.
    pub coords: VoxelCoord,
    pub name: String,
    pub group: Option<String>,
    pub order: Option<f64>,
}

impl Waypoint {
    /// The nav node an agent walks to in order to visit this waypoint.
    pub fn nav_coords(&self) -> VoxelCoord {
        self.coords.below()
    }

    /// The group and order this waypoint sorts under, if it is a group member.
    fn group_key(&self) -> Option<(&str, f64)> {
        match (&self.group, self.order) {
            (Some(group), Some(order)) => Some((group.as_str(), order)),
            _ => None,
        }
    }
}

/// Walk direction of a circulating cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
enum Heading {
    #[default]
    TowardTail,
    TowardHead,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct WaypointGroup {
    /// Sorted by `order`.
    members: Vec<Waypoint>,
    cursor: Option<usize>,
    heading: Heading,
}

impl WaypointGroup {
    fn insert(&mut self, waypoint: Waypoint) {
        let order = waypoint.order.unwrap_or(f64::INFINITY);
        let index = self
            .members
            .iter()
            .position(|m| m.order.unwrap_or(f64::INFINITY).total_cmp(&order).is_gt())
            .unwrap_or(self.members.len());
        self.members.insert(index, waypoint);
        if let Some(cursor) = self.cursor.as_mut() {
            if index <= *cursor {
                *cursor += 1;
            }
        }
    }

    fn remove(&mut self, coords: VoxelCoord) -> Option<Waypoint> {
        let index = self.members.iter().position(|m| m.coords == coords)?;
        let removed = self.members.remove(index);
        self.cursor = match self.cursor {
            _ if self.members.is_empty() => None,
            Some(cursor) if cursor == index => Some(index.saturating_sub(1)),
            Some(cursor) if cursor > index => Some(cursor - 1),
            other => other,
        };
        Some(removed)
    }

    fn reset(&mut self) {
        self.cursor = None;
        self.heading = Heading::TowardTail;
    }

    fn next_circulate(&mut self) -> Option<&Waypoint> {
        let len = self.members.len();
        if len < 2 {
            return None;
        }
        let next = match self.cursor {
            None => {
                self.heading = Heading::TowardTail;
                0
            }
            Some(cursor) => match self.heading {
                Heading::TowardTail if cursor + 1 < len => cursor + 1,
                Heading::TowardTail => {
                    self.heading = Heading::TowardHead;
                    cursor - 1
                }
                Heading::TowardHead if cursor > 0 => cursor - 1,
                Heading::TowardHead => {
                    self.heading = Heading::TowardTail;
                    cursor + 1
                }
            },
        };
        self.cursor = Some(next);
        self.members.get(next)
    }

    fn next_rotate(&mut self) -> Option<&Waypoint> {
        let len = self.members.len();
        if len < 2 {
            return None;
        }
        let next = match self.cursor {
            None => 0,
            Some(cursor) => (cursor + 1) % len,
        };
        self.cursor = Some(next);
        self.members.get(next)
    }
}

/// All known waypoints, keyed by marker position, plus their groups.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Waypoints {
    by_coords: BTreeMap<VoxelCoord, Waypoint>,
    groups: BTreeMap<String, WaypointGroup>,
}

impl Waypoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a waypoint, replacing any waypoint already at the same position.
    pub fn add(&mut self, waypoint: Waypoint) {
        self.remove(waypoint.coords);
        if let Some((group, _)) = waypoint.group_key() {
            self.groups
                .entry(group.to_string())
                .or_default()
                .insert(waypoint.clone());
        }
        self.by_coords.insert(waypoint.coords, waypoint);
    }

    /// Remove the waypoint at `coords`. Empty groups disappear.
    pub fn remove(&mut self, coords: VoxelCoord) -> Option<Waypoint> {
        let removed = self.by_coords.remove(&coords)?;
        if let Some((group, _)) = removed.group_key() {
            if let Some(members) = self.groups.get_mut(group) {
                members.remove(coords);
                if members.members.is_empty() {
                    self.groups.remove(group);
                }
            }
        }
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.by_coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_coords.is_empty()
    }

    pub fn get(&self, coords: VoxelCoord) -> Option<&Waypoint> {
        self.by_coords.get(&coords)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn group_len(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, |g| g.members.len())
    }

    pub fn reset_group(&mut self, group: &str) {
        if let Some(g) = self.groups.get_mut(group) {
            g.reset();
        }
    }

    pub fn next_circulate(&mut self, group: &str) -> Option<Waypoint> {
        self.groups.get_mut(group)?.next_circulate().cloned()
    }

    pub fn next_rotate(&mut self, group: &str) -> Option<Waypoint> {
        self.groups.get_mut(group)?.next_rotate().cloned()
    }

    /// The waypoint named `name`. With duplicates, the one at the smallest
    /// position wins.
    pub fn get_namepoint(&self, name: &str) -> Option<&Waypoint> {
        self.by_coords.values().find(|w| w.name == name)
    }

    /// The first member of the group named `name`.
    pub fn get_name_from_group(&self, name: &str) -> Option<&Waypoint> {
        self.groups.get(name)?.members.first()
    }

    /// A waypoint can be visited while its nav coordinate is a graph node.
    pub fn is_present(waypoint: &Waypoint, graph: &NavGraph) -> bool {
        graph.has_node(waypoint.nav_coords())
    }
}
