// voxbot_sim: navigation and movement core of a voxel-world bot.
//
// This crate contains the bot's brain and legs: which voxels a player-sized
// body can stand in, the navigation graph built from them, resumable A*
// search, a per-tick physics integrator with step-up and jump decisions, and
// a stack of goal frames that turns operator commands into movement. It has
// no networking, rendering or wall-clock dependencies and can be tested,
// benchmarked and run headless.
//
// Module overview:
// - `sim.rs`:         Top-level SimState, tick loop, command/event processing.
// - `types.rs`:       VoxelCoord, EntityId, Dimension, adjacency table, float helpers.
// - `block.rs`:       BlockKind classification flags and collision boxes.
// - `aabb.rs`:        Axis-aligned boxes: per-axis clamping and swept contact.
// - `world.rs`:       Dense 3D voxel grid plus the collision queries over it.
// - `walkability.rs`: Classifies voxels as standable, free-fall or blocked.
// - `nav.rs`:         NavGraph (directed, weighted) and the edge-cost table.
// - `navmesh.rs`:     Full graph build and incremental block-change updates.
// - `pathfinding.rs`: Resumable A* search and path validation.
// - `movement.rs`:    AgentBody, MovementController, step/jump decision table.
// - `waypoint.rs`:    Named waypoints and ordered groups with walk cursors.
// - `behaviour.rs`:   BehaviourManager: the goal-frame stack and its drive loop.
// - `command.rs`:     SimCommand / SimAction, every input to the sim.
// - `event.rs`:       SimEvent: chat lines, goal lifecycle, nav statistics.
// - `config.rs`:      BotConfig, every tunable constant, loadable from JSON.
// - `error.rs`:       SimError, conditions that halt the sim.
//
// **Critical constraint: determinism.** The simulation is a pure function:
// `(state, commands) -> (new_state, events)`. No system time, no OS entropy,
// no iteration over randomly-seeded hash maps. Use `BTreeMap` for ordered
// collections; Fx hash maps are only used for lookups.

pub mod aabb;
pub mod behaviour;
pub mod block;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod movement;
pub mod nav;
pub mod navmesh;
pub mod pathfinding;
pub mod sim;
pub mod types;
pub mod walkability;
pub mod waypoint;
pub mod world;
