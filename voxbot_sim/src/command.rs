// Commands that drive the simulation.
//
// Every external input reaches the sim as a `SimCommand`: operator goals
// (walk a waypoint group, go to a named waypoint, travel to a coordinate,
// cancel) and the collaborator notifications that a network layer would
// otherwise deliver (block changes, the agent's location as set by the
// server, tracked entities, waypoint markers, dimension changes). The sim is
// a function `(state, commands) -> (new_state, events)`, and commands are its
// only input.
//
// A new goal replaces the running one: `SimState` hands it to the behaviour
// manager, which cancels the current stack before starting the new goal on
// the same tick.
//
// See also: `sim.rs` for `apply_command()` which dispatches these,
// `behaviour.rs` for the goals they start, `event.rs` for the output side.

use crate::behaviour::WalkMode;
use crate::block::BlockKind;
use crate::types::{Dimension, EntityId, VoxelCoord};
use crate::waypoint::Waypoint;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// An input to apply at a specific simulation tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimCommand {
    pub tick: u64,
    pub action: SimAction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SimAction {
    /// Walk the waypoints of a group, forever.
    WalkSigns { group: String, mode: WalkMode },
    /// Travel to the waypoint with this name, or to the first member of the
    /// group with this name.
    GoToSign { name: String },
    /// Travel to a nav node.
    TravelTo { coords: VoxelCoord },
    /// Drop any goal and go back to watching the commander.
    LookAtCommander,
    /// Cancel every running goal. Takes effect on the next tick.
    CancelBehaviours,
    /// A block changed in the world.
    SetBlock { coord: VoxelCoord, kind: BlockKind },
    /// The server placed the agent. Resets its velocity.
    SetAgentLocation { position: DVec3 },
    EntitySpawned {
        id: EntityId,
        name: String,
        position: DVec3,
    },
    EntityMoved { id: EntityId, position: DVec3 },
    EntityRemoved { id: EntityId },
    AddWaypoint(Waypoint),
    RemoveWaypoint { coord: VoxelCoord },
    /// The agent moved to another dimension (respawn, portal).
    ChangeDimension { dimension: Dimension },
}
