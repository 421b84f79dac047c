// Core simulation state and tick loop.
//
// `SimState` is the single source of truth for the bot: the voxel world, its
// navigation graph, the agent's physical body, the behaviour stack, waypoints
// and tracked entities, all threaded with one `BotConfig`. The sim is a pure
// function: `(state, commands) -> (new_state, events)`. There is no I/O, no
// wall-clock time and no global state; the caller decides how many fixed
// ticks (`physics.time_step` seconds each) to advance.
//
// ## Tick order
//
// `step()` advances one tick at a time up to `target_tick`. Each tick:
//   1. Apply every command whose tick has been reached, in slice order.
//      World changes reconcile the nav graph immediately and report a
//      `NavGraphChanged` event.
//   2. Drive the behaviour stack (`BehaviourManager::run_tick`). Goals steer
//      the body by setting its jump flag and direction for this tick.
//   3. Integrate the body for one tick (`MovementController::tick`).
//
// ## Halting
//
// A `SimError` from the drive loop leaves the behaviour stack in a state no
// later tick can trust. `step()` logs it, marks the sim halted and returns
// it; every later `step()` returns `SimError::Halted` without touching the
// state. Events emitted earlier in the failing call are kept and can be
// collected with `take_halt_events()`.
//
// ## Dimension changes
//
// The blocks and nav nodes of the old dimension are no longer meaningful
// once the agent moves on. `ChangeDimension` cancels every goal, clears the
// world stand-in to air and empties the nav graph; `SetBlock` commands then
// describe the new dimension.
//
// See also: `command.rs` / `event.rs` for the I/O types, `behaviour.rs` for
// the goal stack, `movement.rs` for the integrator, `navmesh.rs` for graph
// reconciliation.

use crate::behaviour::{BehaviourContext, BehaviourKind, BehaviourManager};
use crate::command::{SimAction, SimCommand};
use crate::config::BotConfig;
use crate::error::SimError;
use crate::event::{SimEvent, SimEventKind};
use crate::movement::{AgentBody, MovementController};
use crate::navmesh::{NavDelta, NavMesh};
use crate::types::{Dimension, EntityId, VoxelCoord};
use crate::waypoint::Waypoints;
use crate::world::VoxelWorld;
use glam::{DVec3, DVec2};
use log::{error, info};
use std::collections::BTreeMap;

/// Another entity the bot knows about.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub name: String,
    /// Feet position.
    pub position: DVec3,
}

pub struct SimState {
    /// Ticks simulated so far.
    pub tick: u64,
    pub config: BotConfig,
    pub world: VoxelWorld,
    pub navmesh: NavMesh,
    pub body: AgentBody,
    pub behaviours: BehaviourManager,
    pub waypoints: Waypoints,
    pub entities: BTreeMap<EntityId, Entity>,
    /// The tracked entity named `behaviour.commander_name`, if present.
    pub commander: Option<EntityId>,
    pub dimension: Dimension,
    halted: bool,
    /// Events of the `step()` call that halted the sim, until taken.
    halt_events: Vec<SimEvent>,
}

/// The result of processing commands and advancing the simulation.
pub struct StepResult {
    /// Events emitted during this step, in tick order.
    pub events: Vec<SimEvent>,
}

impl SimState {
    /// Create a simulation over an all-air world of `config.world_size`.
    pub fn new(config: BotConfig) -> Self {
        let (x, y, z) = config.world_size;
        Self::with_world(config, VoxelWorld::new(x, y, z))
    }

    /// Create a simulation over an existing world and build its nav graph.
    /// The agent floats at the origin until a `SetAgentLocation` places it.
    pub fn with_world(config: BotConfig, world: VoxelWorld) -> Self {
        let mut navmesh = NavMesh::new();
        navmesh.rebuild_all(&world, &config);
        Self {
            tick: 0,
            config,
            world,
            navmesh,
            body: AgentBody::new(DVec3::ZERO),
            behaviours: BehaviourManager::new(),
            waypoints: Waypoints::new(),
            entities: BTreeMap::new(),
            commander: None,
            dimension: Dimension::default(),
            halted: false,
            halt_events: Vec::new(),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Events emitted by the `step()` call that halted the sim, up to the
    /// failing tick. Empty once taken or while the sim is running.
    pub fn take_halt_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.halt_events)
    }

    /// Apply a batch of commands and advance the sim to the target tick.
    ///
    /// Commands must be sorted by tick. A command scheduled for a tick that
    /// has already passed is applied on the next simulated tick.
    pub fn step(
        &mut self,
        commands: &[SimCommand],
        target_tick: u64,
    ) -> Result<StepResult, SimError> {
        if self.halted {
            return Err(SimError::Halted);
        }
        let mut events = Vec::new();
        let mut cmd_idx = 0;

        while self.tick < target_tick {
            self.tick += 1;

            while let Some(cmd) = commands.get(cmd_idx).filter(|c| c.tick <= self.tick) {
                cmd_idx += 1;
                self.apply_command(cmd, &mut events);
            }

            if let Err(e) = self.run_tick(&mut events) {
                error!(
                    "halting at tick {}: {e} ({} events held)",
                    self.tick,
                    events.len()
                );
                self.halted = true;
                self.halt_events = events;
                return Err(e);
            }
        }

        Ok(StepResult { events })
    }

    fn run_tick(&mut self, events: &mut Vec<SimEvent>) -> Result<(), SimError> {
        let commander_position = self
            .commander
            .and_then(|id| self.entities.get(&id))
            .map(|e| e.position);
        let mut ctx = BehaviourContext {
            tick: self.tick,
            config: &self.config,
            world: &self.world,
            navmesh: &self.navmesh,
            dimension: self.dimension,
            body: &mut self.body,
            waypoints: &mut self.waypoints,
            commander_position,
            events,
        };
        self.behaviours.run_tick(&mut ctx)?;
        MovementController::new(&self.world, &self.config).tick(&mut self.body);
        Ok(())
    }

    /// Apply a single command to the simulation.
    fn apply_command(&mut self, cmd: &SimCommand, events: &mut Vec<SimEvent>) {
        match &cmd.action {
            SimAction::WalkSigns { group, mode } => {
                self.behaviours
                    .command(BehaviourKind::walk_signs(group.clone(), *mode));
            }
            SimAction::GoToSign { name } => {
                self.behaviours
                    .command(BehaviourKind::go_to_sign(name.clone()));
            }
            SimAction::TravelTo { coords } => {
                self.behaviours.command(BehaviourKind::travel_to(*coords));
            }
            SimAction::LookAtCommander | SimAction::CancelBehaviours => {
                self.behaviours.request_cancel();
            }
            SimAction::SetBlock { coord, kind } => {
                if self.world.set(*coord, *kind) {
                    let delta = self.navmesh.block_change(&self.world, *coord, &self.config);
                    self.report_nav_change(delta, events);
                }
            }
            SimAction::SetAgentLocation { position } => {
                self.body.position = *position;
                self.body.velocity = DVec3::ZERO;
                let bb = self.body.aabb(&self.config.player);
                if let Some(coord) = self.world.standing_voxel(&bb) {
                    let delta = self
                        .navmesh
                        .force_standing_node(&self.world, coord, &self.config);
                    self.report_nav_change(delta, events);
                }
            }
            SimAction::EntitySpawned { id, name, position } => {
                if *name == self.config.behaviour.commander_name {
                    info!("commander {name} is {id}");
                    self.commander = Some(*id);
                }
                self.entities.insert(
                    *id,
                    Entity {
                        name: name.clone(),
                        position: *position,
                    },
                );
            }
            SimAction::EntityMoved { id, position } => {
                if let Some(entity) = self.entities.get_mut(id) {
                    entity.position = *position;
                }
            }
            SimAction::EntityRemoved { id } => {
                self.entities.remove(id);
                if self.commander == Some(*id) {
                    self.commander = None;
                }
            }
            SimAction::AddWaypoint(waypoint) => {
                self.waypoints.add(waypoint.clone());
            }
            SimAction::RemoveWaypoint { coord } => {
                self.waypoints.remove(*coord);
            }
            SimAction::ChangeDimension { dimension } => {
                if *dimension != self.dimension {
                    info!("dimension changed to {dimension:?}");
                    self.dimension = *dimension;
                    self.behaviours.request_cancel();
                    self.world =
                        VoxelWorld::new(self.world.size_x, self.world.size_y, self.world.size_z);
                    let delta = NavDelta {
                        nodes_removed: self.navmesh.graph.node_count(),
                        edges_removed: self.navmesh.graph.edge_count(),
                        ..NavDelta::default()
                    };
                    self.navmesh.graph.clear();
                    self.waypoints = Waypoints::new();
                    self.report_nav_change(delta, events);
                }
            }
        }
    }

    fn report_nav_change(&self, delta: NavDelta, events: &mut Vec<SimEvent>) {
        if delta.is_empty() {
            return;
        }
        events.push(SimEvent {
            tick: self.tick,
            kind: SimEventKind::NavGraphChanged {
                nodes: self.navmesh.graph.node_count(),
                edges: self.navmesh.graph.edge_count(),
            },
        });
    }

    /// Horizontal offset from the agent's feet to the center of `coord`'s
    /// floor.
    pub fn offset_to(&self, coord: VoxelCoord) -> DVec2 {
        let target = coord.floor_center();
        DVec2::new(target.x - self.body.position.x, target.z - self.body.position.z)
    }
}
