// Behaviour scheduler: a stack of goal frames driven once per tick.
//
// The agent's current intent is a stack of `Frame`s owned by
// `BehaviourManager`. Each frame holds a `BehaviourKind` (a closed set of
// goal variants, each with its own per-tick logic and state), a `Status`
// and the `cancelled` / `floating` flags. A frame's parent is the frame
// directly below it on the stack; there are no other links between frames.
// When the stack is empty the manager runs a default look-at-commander frame
// that never finishes.
//
// Frame lifecycle:
//   Running --push child--> Suspended --child popped--> Running --> Success/Failure
// A terminal frame is popped by the drive loop and its parent is told the
// outcome (`on_child_finished`) and resumes running. Terminal frames are
// never ticked again.
//
// Drive loop (`run_tick`, once per sim tick):
//   1. Start a pending operator command, cancelling the current stack first.
//   2. Drop the stack if its top frame was cancelled.
//   3. Tick the top frame if it is running and copy its `floating` flag to
//      the agent body.
//   4. A frame that pushed a child or finished lets control pass to the new
//      top within the same tick; a frame still running ends the tick.
// The loop also stops after `max_transitions_per_tick` pushes and pops so a
// goal that fails instantly every time cannot spin forever inside one tick.
//
// Cancellation is signal-then-check: `request_cancel` only marks frames (and
// any in-flight search); the stack is dropped the next time the drive loop
// looks at it, without notifying parents.
//
// Goal failures (unknown waypoint, no route, stale path, stuck movement) end
// a frame with `Status::Failure`. Only geometry the step/jump table cannot
// handle surfaces as a `SimError`, which aborts the tick.
//
// See also: `pathfinding.rs` for the resumable search the travel frame
// drives, `movement.rs` for `steer()`, `waypoint.rs` for group cursors,
// `sim.rs` which builds the `BehaviourContext` each tick.

use crate::config::BotConfig;
use crate::error::SimError;
use crate::event::{SimEvent, SimEventKind};
use crate::movement::{AgentBody, MovementController, platform_box};
use crate::navmesh::NavMesh;
use crate::pathfinding::{Path, PathSearch};
use crate::types::{Dimension, VoxelCoord, float_lte};
use crate::waypoint::{Waypoint, Waypoints};
use crate::world::VoxelWorld;
use glam::DVec3;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::task::Poll;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    Suspended,
    Success,
    Failure,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

/// How a waypoint group is walked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalkMode {
    /// Head to tail and back again.
    Circulate,
    /// Head to tail, then start over at the head.
    Rotate,
}

impl fmt::Display for WalkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Circulate => write!(f, "circulate"),
            Self::Rotate => write!(f, "rotate"),
        }
    }
}

/// Everything a frame may read or change during its tick.
pub struct BehaviourContext<'a> {
    pub tick: u64,
    pub config: &'a BotConfig,
    pub world: &'a VoxelWorld,
    pub navmesh: &'a NavMesh,
    pub dimension: Dimension,
    pub body: &'a mut AgentBody,
    pub waypoints: &'a mut Waypoints,
    /// Feet position of the commander, when tracked.
    pub commander_position: Option<DVec3>,
    pub events: &'a mut Vec<SimEvent>,
}

impl BehaviourContext<'_> {
    fn chat(&mut self, message: String) {
        info!("chat: {message}");
        self.events.push(SimEvent {
            tick: self.tick,
            kind: SimEventKind::Chat { message },
        });
    }

    fn emit(&mut self, kind: SimEventKind) {
        self.events.push(SimEvent {
            tick: self.tick,
            kind,
        });
    }
}

/// What a frame's tick asks of the drive loop.
enum Outcome {
    /// Stay as is; tick again next time.
    Continue,
    /// Suspend and run this child on top.
    Push(BehaviourKind),
    /// End with a terminal status.
    Finish(Status),
}

// ---------------------------------------------------------------------------
// Goal kinds
// ---------------------------------------------------------------------------

pub enum BehaviourKind {
    /// Face the commander's eyes. Never finishes.
    LookAt,
    WalkSigns(WalkSigns),
    GoToSign(GoToSign),
    TravelTo(TravelTo),
    MoveTo(MoveTo),
}

impl BehaviourKind {
    pub fn walk_signs(group: impl Into<String>, mode: WalkMode) -> Self {
        Self::WalkSigns(WalkSigns {
            group: group.into(),
            mode,
            started: false,
        })
    }

    pub fn go_to_sign(name: impl Into<String>) -> Self {
        Self::GoToSign(GoToSign { name: name.into() })
    }

    pub fn travel_to(coords: VoxelCoord) -> Self {
        Self::TravelTo(TravelTo {
            coords,
            search: None,
            attempts: 0,
        })
    }

    pub fn move_to(path: Path) -> Self {
        Self::MoveTo(MoveTo {
            path,
            index: 0,
            ticks_on_node: 0,
        })
    }

    /// Human-readable description for logs and events.
    pub fn describe(&self) -> String {
        match self {
            Self::LookAt => "look at commander".to_string(),
            Self::WalkSigns(w) => format!("{} signs in group \"{}\"", w.mode, w.group),
            Self::GoToSign(g) => format!("go to {}", g.name),
            Self::TravelTo(t) => format!("travel to {}", t.coords),
            Self::MoveTo(m) => match m.path.goal() {
                Some(goal) => format!("move along {} nodes to {goal}", m.path.len()),
                None => "move along empty path".to_string(),
            },
        }
    }

    fn floating(&self) -> bool {
        matches!(self, Self::LookAt)
    }
}

impl fmt::Display for BehaviourKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Walk the waypoints of a group, one travel goal at a time.
pub struct WalkSigns {
    group: String,
    mode: WalkMode,
    started: bool,
}

impl WalkSigns {
    fn tick(&mut self, ctx: &mut BehaviourContext<'_>) -> Outcome {
        if !self.started {
            ctx.waypoints.reset_group(&self.group);
            self.started = true;
        }
        if !ctx.waypoints.has_group(&self.group) {
            ctx.chat(format!("cannot {} group named {}", self.mode, self.group));
            return Outcome::Finish(Status::Failure);
        }
        let next = match self.mode {
            WalkMode::Circulate => ctx.waypoints.next_circulate(&self.group),
            WalkMode::Rotate => ctx.waypoints.next_rotate(&self.group),
        };
        let Some(waypoint) = next else {
            ctx.chat(format!(
                "cannot {} group named {} with {} sign(s)",
                self.mode,
                self.group,
                ctx.waypoints.group_len(&self.group)
            ));
            return Outcome::Finish(Status::Failure);
        };
        if !Waypoints::is_present(&waypoint, &ctx.navmesh.graph) {
            debug!("waypoint {} not reachable yet", waypoint.name);
            return Outcome::Continue;
        }
        Outcome::Push(BehaviourKind::travel_to(waypoint.nav_coords()))
    }
}

/// Travel to a waypoint picked by name.
pub struct GoToSign {
    name: String,
}

impl GoToSign {
    fn tick(&mut self, ctx: &mut BehaviourContext<'_>) -> Outcome {
        let waypoint: Option<Waypoint> = ctx
            .waypoints
            .get_namepoint(&self.name)
            .or_else(|| ctx.waypoints.get_name_from_group(&self.name))
            .cloned();
        let Some(waypoint) = waypoint else {
            ctx.chat(format!("cannot identify sign with name {}", self.name));
            return Outcome::Finish(Status::Failure);
        };
        if !Waypoints::is_present(&waypoint, &ctx.navmesh.graph) {
            return Outcome::Finish(Status::Failure);
        }
        Outcome::Push(BehaviourKind::travel_to(waypoint.nav_coords()))
    }
}

/// Plan a route to a nav node and follow it, re-planning when the route
/// goes stale.
pub struct TravelTo {
    coords: VoxelCoord,
    search: Option<PathSearch>,
    /// Searches started so far.
    attempts: u32,
}

impl TravelTo {
    pub fn coords(&self) -> VoxelCoord {
        self.coords
    }

    fn tick(&mut self, ctx: &mut BehaviourContext<'_>) -> Outcome {
        let player = &ctx.config.player;
        if self.search.is_none() {
            if self.attempts >= ctx.config.behaviour.max_travel_attempts {
                warn!("giving up on {} after {} searches", self.coords, self.attempts);
                return Outcome::Finish(Status::Failure);
            }
            // Mid-air or off the map: try again next tick.
            let Some(start) = ctx.world.standing_voxel(&ctx.body.aabb(player)) else {
                return Outcome::Continue;
            };
            self.attempts += 1;
            self.search = Some(PathSearch::new(
                ctx.dimension,
                start,
                self.coords,
                player,
                &ctx.config.pathfinding,
            ));
        }
        let Some(search) = self.search.as_mut() else {
            return Outcome::Continue;
        };
        let poll = search.step(
            &ctx.navmesh.graph,
            ctx.world,
            ctx.dimension,
            ctx.config.pathfinding.nodes_per_slice,
        );
        let result = match poll {
            Poll::Pending => return Outcome::Continue,
            Poll::Ready(result) => result,
        };
        let expanded = search.expanded();
        self.search = None;
        match result {
            Err(failure) => {
                debug!(
                    "search for {} failed after {expanded} expanded nodes: {failure}",
                    self.coords
                );
                Outcome::Finish(Status::Failure)
            }
            Ok(path) => {
                let graph = &ctx.navmesh.graph;
                if path.is_adjacent_in(graph)
                    && path.check_path(ctx.world, graph, &ctx.body.aabb(player), player)
                {
                    Outcome::Push(BehaviourKind::move_to(path))
                } else {
                    warn!("path to {} failed validation, re-planning", self.coords);
                    Outcome::Continue
                }
            }
        }
    }

    /// A failed walk re-plans from wherever the agent ended up.
    fn on_child_finished(&self, status: Status) -> Status {
        if status == Status::Success {
            Status::Success
        } else {
            Status::Running
        }
    }

    fn cancel(&mut self) {
        if let Some(search) = self.search.as_mut() {
            search.cancel();
        }
    }
}

/// Walk a path node by node with the movement controller.
pub struct MoveTo {
    path: Path,
    /// Node currently aimed at.
    index: usize,
    ticks_on_node: u32,
}

impl MoveTo {
    fn tick(&mut self, ctx: &mut BehaviourContext<'_>) -> Result<Outcome, SimError> {
        let player = &ctx.config.player;
        let graph = &ctx.navmesh.graph;
        loop {
            let Some(&target) = self.path.nodes.get(self.index) else {
                return Ok(Outcome::Finish(Status::Success));
            };
            let Some(min_y) = graph.min_y(target) else {
                warn!("next node {target} left the nav graph");
                return Ok(Outcome::Finish(Status::Failure));
            };
            let target_box = platform_box(target, min_y, player);
            let bb = ctx.body.aabb(player);
            let arrived = bb.horizontal_distance_to(&target_box)
                <= ctx.config.behaviour.arrival_tolerance
                && float_lte(
                    (bb.min_y() - min_y).abs(),
                    ctx.config.physics.max_step_height,
                );
            if arrived {
                self.index += 1;
                self.ticks_on_node = 0;
                if self.index == self.path.nodes.len() {
                    ctx.body.velocity.x = 0.0;
                    ctx.body.velocity.z = 0.0;
                    return Ok(Outcome::Finish(Status::Success));
                }
                continue;
            }

            self.ticks_on_node += 1;
            if self.ticks_on_node > ctx.config.behaviour.stuck_tick_limit {
                warn!(
                    "stuck for {} ticks short of {target}",
                    self.ticks_on_node - 1
                );
                return Ok(Outcome::Finish(Status::Failure));
            }
            MovementController::new(ctx.world, ctx.config).steer(ctx.body, &target_box)?;
            return Ok(Outcome::Continue);
        }
    }
}

fn look_at_commander(ctx: &mut BehaviourContext<'_>) -> Outcome {
    // Commander unknown: nothing to look at yet.
    if let Some(position) = ctx.commander_position {
        let player = &ctx.config.player;
        let eyes = position + DVec3::new(0.0, player.eye_level, 0.0);
        ctx.body.turn_to_point(eyes, player, true);
    }
    Outcome::Continue
}

// ---------------------------------------------------------------------------
// Frames and the manager
// ---------------------------------------------------------------------------

pub struct Frame {
    pub kind: BehaviourKind,
    pub status: Status,
    pub cancelled: bool,
    /// Copied to the agent body while this frame runs; disables gravity.
    pub floating: bool,
}

impl Frame {
    fn new(kind: BehaviourKind) -> Self {
        let floating = kind.floating();
        Self {
            kind,
            status: Status::Running,
            cancelled: false,
            floating,
        }
    }

    fn tick(&mut self, ctx: &mut BehaviourContext<'_>) -> Result<Option<BehaviourKind>, SimError> {
        if self.cancelled {
            return Ok(None);
        }
        let outcome = match &mut self.kind {
            BehaviourKind::LookAt => look_at_commander(ctx),
            BehaviourKind::WalkSigns(w) => w.tick(ctx),
            BehaviourKind::GoToSign(g) => g.tick(ctx),
            BehaviourKind::TravelTo(t) => t.tick(ctx),
            BehaviourKind::MoveTo(m) => m.tick(ctx)?,
        };
        Ok(match outcome {
            Outcome::Continue => None,
            Outcome::Push(child) => {
                self.status = Status::Suspended;
                Some(child)
            }
            Outcome::Finish(status) => {
                self.status = status;
                None
            }
        })
    }

    /// Resume after the child above this frame finished with `status`.
    fn on_child_finished(&mut self, status: Status) {
        self.status = match &mut self.kind {
            BehaviourKind::GoToSign(_) => status,
            BehaviourKind::TravelTo(t) => t.on_child_finished(status),
            _ => Status::Running,
        };
    }

    fn cancel(&mut self) {
        self.cancelled = true;
        if let BehaviourKind::TravelTo(t) = &mut self.kind {
            t.cancel();
        }
    }
}

pub struct BehaviourManager {
    stack: Vec<Frame>,
    default: Frame,
    new_command: Option<BehaviourKind>,
}

impl Default for BehaviourManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviourManager {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            default: Frame::new(BehaviourKind::LookAt),
            new_command: None,
        }
    }

    /// The frame the drive loop would tick next.
    pub fn current(&self) -> &Frame {
        self.stack.last().unwrap_or(&self.default)
    }

    /// Number of frames above the default one.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_idle(&self) -> bool {
        self.stack.is_empty() && self.new_command.is_none()
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.stack.iter()
    }

    /// Queue a new top-level goal. It replaces the running one on the next
    /// drive loop pass.
    pub fn command(&mut self, kind: BehaviourKind) {
        info!("added command {kind}");
        self.new_command = Some(kind);
    }

    /// Mark every frame cancelled. The stack is dropped on the next tick.
    pub fn request_cancel(&mut self) {
        self.new_command = None;
        for frame in &mut self.stack {
            frame.cancel();
        }
    }

    /// Drop the whole stack now.
    pub fn cancel_running(&mut self, ctx: &mut BehaviourContext<'_>) {
        if let Some(bottom) = self.stack.first() {
            info!("cancelling {}", bottom.kind);
        }
        for mut frame in self.stack.drain(..).rev() {
            frame.cancel();
            ctx.emit(SimEventKind::BehaviourCancelled {
                name: frame.kind.describe(),
            });
        }
    }

    /// Drive the stack for one tick.
    pub fn run_tick(&mut self, ctx: &mut BehaviourContext<'_>) -> Result<(), SimError> {
        let limit = ctx.config.behaviour.max_transitions_per_tick;
        let mut transitions = 0;
        loop {
            if let Some(kind) = self.new_command.take() {
                self.cancel_running(ctx);
                self.push(kind, ctx);
            }
            if self.stack.last().is_some_and(|f| f.cancelled) {
                self.cancel_running(ctx);
            }

            let frame = match self.stack.last_mut() {
                Some(frame) => frame,
                None => &mut self.default,
            };
            let child = if frame.status == Status::Running {
                frame.tick(ctx)?
            } else {
                None
            };
            ctx.body.floating = frame.floating;
            let status = frame.status;

            if let Some(child) = child {
                self.push(child, ctx);
            } else if status.is_terminal() {
                self.pop_finished(ctx);
            } else if status == Status::Running {
                break;
            }
            transitions += 1;
            if transitions >= limit {
                debug!("frame transition limit reached, resuming next tick");
                break;
            }
        }
        Ok(())
    }

    fn push(&mut self, kind: BehaviourKind, ctx: &mut BehaviourContext<'_>) {
        let name = kind.describe();
        info!("starting {name}");
        ctx.emit(SimEventKind::BehaviourStarted { name });
        self.stack.push(Frame::new(kind));
    }

    fn pop_finished(&mut self, ctx: &mut BehaviourContext<'_>) {
        let Some(child) = self.stack.pop() else {
            return;
        };
        let name = child.kind.describe();
        let success = child.status == Status::Success;
        info!("{name} finished: {:?}", child.status);
        ctx.emit(SimEventKind::BehaviourFinished { name, success });
        if let Some(parent) = self.stack.last_mut() {
            parent.on_child_finished(child.status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockKind;
    use glam::DVec2;

    fn c(x: i32, y: i32, z: i32) -> VoxelCoord {
        VoxelCoord::new(x, y, z)
    }

    struct Harness {
        config: BotConfig,
        world: VoxelWorld,
        navmesh: NavMesh,
        body: AgentBody,
        waypoints: Waypoints,
        commander: Option<DVec3>,
        events: Vec<SimEvent>,
        tick: u64,
    }

    impl Harness {
        fn flat(size: u32) -> Self {
            let config = BotConfig::default();
            let mut world = VoxelWorld::new(size, 8, size);
            world.fill(
                c(0, 0, 0),
                c(size as i32 - 1, 0, size as i32 - 1),
                BlockKind::Stone,
            );
            let mut navmesh = NavMesh::new();
            navmesh.rebuild_all(&world, &config);
            let mut body = AgentBody::new(DVec3::new(1.5, 1.0, 1.5));
            body.on_ground = true;
            Self {
                config,
                world,
                navmesh,
                body,
                waypoints: Waypoints::new(),
                commander: None,
                events: Vec::new(),
                tick: 0,
            }
        }

        fn run(&mut self, manager: &mut BehaviourManager) -> Result<(), SimError> {
            self.tick += 1;
            let mut ctx = BehaviourContext {
                tick: self.tick,
                config: &self.config,
                world: &self.world,
                navmesh: &self.navmesh,
                dimension: Dimension::Overworld,
                body: &mut self.body,
                waypoints: &mut self.waypoints,
                commander_position: self.commander,
                events: &mut self.events,
            };
            manager.run_tick(&mut ctx)?;
            MovementController::new(&self.world, &self.config).tick(&mut self.body);
            Ok(())
        }

        /// Run ticks until `done` holds, up to `limit` ticks.
        fn run_until(
            &mut self,
            manager: &mut BehaviourManager,
            limit: usize,
            done: impl Fn(&BehaviourManager) -> bool,
        ) -> bool {
            for _ in 0..limit {
                self.run(manager).unwrap();
                if done(manager) {
                    return true;
                }
            }
            false
        }

        fn chats(&self) -> Vec<&str> {
            self.events.iter().filter_map(SimEvent::chat_message).collect()
        }

        fn add_sign(&mut self, x: i32, z: i32, name: &str, group: Option<&str>, order: f64) {
            self.waypoints.add(Waypoint {
                coords: c(x, 2, z),
                name: name.to_string(),
                group: group.map(str::to_string),
                order: group.map(|_| order),
            });
        }
    }

    #[test]
    fn idle_manager_runs_look_at_and_tracks_the_commander() {
        let mut h = Harness::flat(8);
        let mut manager = BehaviourManager::new();
        h.commander = Some(DVec3::new(1.5, 1.0, 6.5));
        h.run(&mut manager).unwrap();
        assert!(matches!(manager.current().kind, BehaviourKind::LookAt));
        assert_eq!(manager.depth(), 0);
        assert!(h.body.yaw.abs() < 1e-9 || (h.body.yaw - 360.0).abs() < 1e-9);
        assert!(h.body.floating);
    }

    #[test]
    fn unknown_group_fails_with_one_chat_line() {
        let mut h = Harness::flat(8);
        let mut manager = BehaviourManager::new();
        manager.command(BehaviourKind::walk_signs("X", WalkMode::Circulate));
        h.run(&mut manager).unwrap();
        h.run(&mut manager).unwrap();
        assert_eq!(h.chats(), ["cannot circulate group named X"]);
        assert_eq!(manager.depth(), 0);
        assert!(h.events.iter().any(|e| matches!(
            e.kind,
            SimEventKind::BehaviourFinished { success: false, .. }
        )));
    }

    #[test]
    fn single_sign_group_fails_with_one_chat_line() {
        let mut h = Harness::flat(8);
        h.add_sign(3, 3, "lonely", Some("solo"), 1.0);
        let mut manager = BehaviourManager::new();
        manager.command(BehaviourKind::walk_signs("solo", WalkMode::Rotate));
        h.run(&mut manager).unwrap();
        h.run(&mut manager).unwrap();
        assert_eq!(h.chats(), ["cannot rotate group named solo with 1 sign(s)"]);
        assert_eq!(manager.depth(), 0);
        assert!(h.events.iter().any(|e| matches!(
            e.kind,
            SimEventKind::BehaviourFinished { success: false, .. }
        )));
    }

    #[test]
    fn unknown_sign_name_fails_with_chat() {
        let mut h = Harness::flat(8);
        let mut manager = BehaviourManager::new();
        manager.command(BehaviourKind::go_to_sign("nowhere"));
        h.run(&mut manager).unwrap();
        assert_eq!(h.chats(), ["cannot identify sign with name nowhere"]);
        assert_eq!(manager.depth(), 0);
    }

    #[test]
    fn travel_pushes_move_and_arrives() {
        let mut h = Harness::flat(10);
        let mut manager = BehaviourManager::new();
        manager.command(BehaviourKind::travel_to(c(6, 1, 4)));
        assert!(h.run_until(&mut manager, 5, |m| m.depth() == 2));
        assert!(matches!(manager.current().kind, BehaviourKind::MoveTo(_)));
        assert!(!h.body.floating);
        assert!(h.run_until(&mut manager, 200, |m| m.depth() == 0));
        let target = c(6, 1, 4).floor_center();
        let offset = DVec2::new(h.body.position.x - target.x, h.body.position.z - target.z);
        assert!(offset.length() <= h.config.behaviour.arrival_tolerance + 0.05);
        assert!(h.events.iter().any(|e| matches!(
            &e.kind,
            SimEventKind::BehaviourFinished { name, success: true } if name.starts_with("travel")
        )));
    }

    #[test]
    fn go_to_sign_resolves_group_names() {
        let mut h = Harness::flat(10);
        h.add_sign(5, 5, "a", Some("yard"), 1.0);
        h.add_sign(7, 2, "b", Some("yard"), 2.0);
        let mut manager = BehaviourManager::new();
        manager.command(BehaviourKind::go_to_sign("yard"));
        h.run(&mut manager).unwrap();
        assert!(manager.depth() >= 2);
        match manager.frames().nth(1).map(|f| &f.kind) {
            Some(BehaviourKind::TravelTo(t)) => assert_eq!(t.coords(), c(5, 1, 5)),
            _ => panic!("expected a travel frame"),
        }
    }

    #[test]
    fn cancel_empties_the_stack_without_notifying_parents() {
        let mut h = Harness::flat(10);
        let mut manager = BehaviourManager::new();
        manager.command(BehaviourKind::travel_to(c(8, 1, 8)));
        assert!(h.run_until(&mut manager, 5, |m| m.depth() == 2));
        manager.request_cancel();
        assert!(manager.frames().all(|f| f.cancelled));
        // Nothing happens until the next tick boundary.
        assert_eq!(manager.depth(), 2);
        h.events.clear();
        h.run(&mut manager).unwrap();
        assert_eq!(manager.depth(), 0);
        assert!(matches!(manager.current().kind, BehaviourKind::LookAt));
        assert!(!h.events.iter().any(|e| matches!(
            e.kind,
            SimEventKind::BehaviourFinished { .. }
        )));
        let cancelled = h
            .events
            .iter()
            .filter(|e| matches!(e.kind, SimEventKind::BehaviourCancelled { .. }))
            .count();
        assert_eq!(cancelled, 2);
    }

    #[test]
    fn new_command_replaces_the_running_goal() {
        let mut h = Harness::flat(10);
        let mut manager = BehaviourManager::new();
        manager.command(BehaviourKind::travel_to(c(8, 1, 8)));
        h.run(&mut manager).unwrap();
        manager.command(BehaviourKind::travel_to(c(1, 1, 8)));
        h.run(&mut manager).unwrap();
        match manager.frames().next().map(|f| &f.kind) {
            Some(BehaviourKind::TravelTo(t)) => assert_eq!(t.coords(), c(1, 1, 8)),
            _ => panic!("expected the new travel goal at the bottom"),
        }
    }

    #[test]
    fn walled_off_goal_fails() {
        let mut h = Harness::flat(10);
        // Wall the agent into the corner.
        h.world.fill(c(3, 1, 0), c(3, 3, 9), BlockKind::Stone);
        h.navmesh.rebuild_all(&h.world, &h.config);
        let mut manager = BehaviourManager::new();
        manager.command(BehaviourKind::travel_to(c(7, 1, 7)));
        for _ in 0..20 {
            h.run(&mut manager).unwrap();
        }
        assert_eq!(manager.depth(), 0);
        assert!(h.events.iter().any(|e| matches!(
            &e.kind,
            SimEventKind::BehaviourFinished { name, success: false } if name.starts_with("travel")
        )));
    }

    #[test]
    fn walk_signs_keeps_going_between_signs() {
        let mut h = Harness::flat(10);
        h.add_sign(1, 6, "a", Some("loop"), 1.0);
        h.add_sign(6, 6, "b", Some("loop"), 2.0);
        let mut manager = BehaviourManager::new();
        manager.command(BehaviourKind::walk_signs("loop", WalkMode::Rotate));
        let mut visited = Vec::new();
        for _ in 0..400 {
            h.run(&mut manager).unwrap();
            let feet = VoxelCoord::containing(h.body.position);
            if visited.last() != Some(&feet) {
                visited.push(feet);
            }
        }
        let a = visited.iter().position(|&v| v == c(1, 1, 6));
        let b = visited.iter().rposition(|&v| v == c(6, 1, 6));
        assert!(a.is_some() && b.is_some() && a < b);
        // Still walking.
        assert!(manager.depth() >= 1);
        assert!(h.chats().is_empty());
    }

    #[test]
    fn transition_cap_bounds_work_per_tick() {
        let mut h = Harness::flat(8);
        h.config.behaviour.max_transitions_per_tick = 4;
        h.config.pathfinding.search_distance_limit = 2;
        // Both signs are out of search range, so every travel attempt fails
        // on its first tick and the walk immediately picks the next sign.
        h.add_sign(6, 6, "a", Some("g"), 1.0);
        h.add_sign(6, 1, "b", Some("g"), 2.0);
        let mut manager = BehaviourManager::new();
        manager.command(BehaviourKind::walk_signs("g", WalkMode::Rotate));
        h.run(&mut manager).unwrap();
        assert!(manager.depth() >= 1);
        let started = h
            .events
            .iter()
            .filter(|e| matches!(e.kind, SimEventKind::BehaviourStarted { .. }))
            .count();
        assert!(started <= 4);
        h.run(&mut manager).unwrap();
        assert!(manager.depth() >= 1);
    }
}
