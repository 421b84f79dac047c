// Per-tick agent physics and the step/jump decision table.
//
// `AgentBody` is the agent's kinematic state: feet position, velocity,
// on-ground flag, orientation, and the per-tick motor inputs set by the
// behaviour layer (`direction`, `is_jumping`). `floating` disables gravity;
// the scheduler copies it from the running behaviour frame each tick.
//
// `MovementController::tick()` integrates one tick with the game's
// semantics:
// 1. Clip tiny velocity components, apply the jump impulse if requested,
//    add the horizontal input scaled by the speed factor.
// 2. Resolve the displacement against block boxes one axis at a time in the
//    order Y, X, Z. If the agent was on the ground and got blocked
//    horizontally, retry the move raised by the step height and keep it if
//    it gets further (automatic step-up onto slabs and stairs).
// 3. Recompute on-ground (the downward move was clamped), zero velocity on
//    every clamped axis, then apply gravity, drag and horizontal slowdown.
// Liquids and ladders replace step 3 with their own drag and descent rules.
//
// `decide_motion()` is the pure step/jump table used while following a path.
// An elevation the table has no bracket for is a `SimError`, not a silent
// no-op: it means the nav graph produced an edge movement cannot execute.
//
// See also: `aabb.rs` for the per-axis clamp, `world.rs` for block boxes and
// the collision-distance sweep, `behaviour.rs` for the move-along-path frame
// that calls `steer()` every tick.

use crate::aabb::{Aabb, Axis};
use crate::block::DEFAULT_SLIPPERINESS;
use crate::config::{BotConfig, PhysicsConfig, PlayerDimensions};
use crate::error::SimError;
use crate::types::{FLOAT_EPSILON, VoxelCoord, float_eq, float_gt, float_lt, float_lte};
use crate::world::VoxelWorld;
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Vanilla ground-acceleration constant: `0.6 * 0.91` cubed.
const GROUND_ACCEL_BASE: f64 = 0.16277136;
/// Fraction of the speed factor that reaches the agent.
const INPUT_EFFICIENCY: f64 = 0.98;

/// The controlled agent's physical state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentBody {
    /// Feet position: horizontal center, bottom of the collision box.
    pub position: DVec3,
    /// Blocks per tick.
    pub velocity: DVec3,
    pub on_ground: bool,
    /// Degrees, 0 facing +Z, increasing toward -X.
    pub yaw: f64,
    /// Degrees, positive looking down.
    pub pitch: f64,
    pub floating: bool,
    /// Jump requested for the next tick. Cleared by the integrator.
    pub is_jumping: bool,
    /// Horizontal movement input for the next tick. Cleared by the integrator.
    pub direction: Option<DVec2>,
}

impl AgentBody {
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            velocity: DVec3::ZERO,
            on_ground: false,
            yaw: 0.0,
            pitch: 0.0,
            floating: true,
            is_jumping: false,
            direction: None,
        }
    }

    pub fn aabb(&self, dims: &PlayerDimensions) -> Aabb {
        Aabb::from_player_position(self.position, dims)
    }

    pub fn eye_position(&self, dims: &PlayerDimensions) -> DVec3 {
        self.position + DVec3::new(0.0, dims.eye_level, 0.0)
    }

    pub fn horizontal_speed(&self) -> f64 {
        self.velocity.x.hypot(self.velocity.z)
    }

    /// Face `point` from eye level. Pitch is only changed with `elevation`;
    /// otherwise the agent looks level.
    pub fn turn_to_point(&mut self, point: DVec3, dims: &PlayerDimensions, elevation: bool) {
        if point.x == self.position.x && point.z == self.position.z {
            return;
        }
        if let Some((yaw, pitch)) = yaw_pitch_between(point, self.eye_position(dims)) {
            self.yaw = yaw;
            self.pitch = if elevation { pitch } else { 0.0 };
        }
    }

    /// Face a horizontal direction, looking level.
    pub fn turn_to_direction(&mut self, direction: DVec2) {
        let ahead = self.position + DVec3::new(direction.x, 0.0, direction.y);
        if let Some((yaw, _)) = yaw_pitch_between(ahead, self.position) {
            self.yaw = yaw;
            self.pitch = 0.0;
        }
    }
}

/// Yaw and pitch (degrees, game convention) of the direction from `from` to
/// `to`. `None` when `to` is straight above or below `from`, where yaw is
/// undefined.
pub fn yaw_pitch_between(to: DVec3, from: DVec3) -> Option<(f64, f64)> {
    let d = to - from;
    let xz = d.x.hypot(d.z);
    let pitch = if xz == 0.0 {
        0.0
    } else {
        (d.y / xz).atan().to_degrees()
    };
    let yaw = if d.z == 0.0 {
        if d.x > 0.0 {
            270.0
        } else if d.x < 0.0 {
            90.0
        } else {
            return None;
        }
    } else {
        let yaw = (-d.x).atan2(d.z).to_degrees();
        if yaw < 0.0 { yaw + 360.0 } else { yaw }
    };
    Some((yaw, -pitch))
}

/// Collision box the agent would occupy standing on node `coord` whose
/// standing surface is at `min_y`.
pub fn platform_box(coord: VoxelCoord, min_y: f64, dims: &PlayerDimensions) -> Aabb {
    Aabb::from_player_position(
        DVec3::new(f64::from(coord.x) + 0.5, min_y, f64::from(coord.z) + 0.5),
        dims,
    )
}

/// Where the agent is, as far as step/jump decisions are concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Footing {
    /// Inside a liquid or on a ladder/vine.
    Climbing,
    /// Supported by the top face of a block.
    Standing,
    Airborne,
}

/// Motor output of the step/jump table for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    Move,
    JumpAndMove,
    /// Stay put this tick.
    Hold,
}

/// Decide how to approach a platform `elevation` blocks above (negative:
/// below) the agent's feet. `collision_distance` is how far the agent can
/// move horizontally toward it before touching a block (`None`: no contact),
/// `speed` its current horizontal speed in blocks per tick.
pub fn decide_motion(
    physics: &PhysicsConfig,
    footing: Footing,
    elevation: f64,
    collision_distance: Option<f64>,
    speed: f64,
) -> Result<Motion, SimError> {
    match footing {
        Footing::Climbing => {
            if float_gt(elevation, 0.0) {
                Ok(Motion::JumpAndMove)
            } else if float_lt(elevation, 0.0) && collision_distance.is_some() {
                Ok(Motion::Hold)
            } else {
                Ok(Motion::Move)
            }
        }
        Footing::Airborne => Ok(Motion::Move),
        Footing::Standing => {
            let Some(distance) = collision_distance else {
                return Ok(Motion::Move);
            };
            if float_lte(elevation, physics.max_step_height) {
                return Ok(Motion::Move);
            }
            if float_lte(elevation, physics.max_jump_height) {
                let ticks_to_collision = if float_eq(distance, 0.0) {
                    0.0
                } else if float_eq(speed, 0.0) {
                    f64::INFINITY
                } else {
                    distance / speed
                };
                let ticks_to_apex =
                    (2.0 * elevation / physics.gravity).sqrt() * physics.ticks_per_second();
                return Ok(if ticks_to_collision < ticks_to_apex {
                    Motion::JumpAndMove
                } else {
                    Motion::Move
                });
            }
            Err(SimError::ElevationOutOfRange {
                elevation,
                collision_distance: distance,
            })
        }
    }
}

/// Outcome of one collision-resolved move.
struct Resolved {
    /// Displacement actually applied on each axis.
    offset: DVec3,
    /// The box after the move. Kept separately from `offset` so that a box
    /// clamped onto a face sits exactly on it.
    bb: Aabb,
    on_ground: bool,
}

pub struct MovementController<'a> {
    world: &'a VoxelWorld,
    config: &'a BotConfig,
}

impl<'a> MovementController<'a> {
    pub fn new(world: &'a VoxelWorld, config: &'a BotConfig) -> Self {
        Self { world, config }
    }

    pub fn footing(&self, body: &AgentBody) -> Footing {
        let bb = body.aabb(&self.config.player);
        if self.world.is_on_ladder(&bb) || self.world.is_in_liquid(&bb) {
            Footing::Climbing
        } else if self.world.standing_on_solid_block(&bb).is_some() {
            Footing::Standing
        } else {
            Footing::Airborne
        }
    }

    /// Set this tick's motor input so the agent heads for `target`, jumping
    /// when the decision table asks for it.
    pub fn steer(&self, body: &mut AgentBody, target: &Aabb) -> Result<Motion, SimError> {
        let bb = body.aabb(&self.config.player);
        let collision = self
            .world
            .min_collision_between(&bb, target, true)
            .map(|(distance, _)| distance);
        let motion = decide_motion(
            &self.config.physics,
            self.footing(body),
            target.min_y() - bb.min_y(),
            collision,
            body.horizontal_speed(),
        )?;
        if motion == Motion::Hold {
            return Ok(motion);
        }
        if motion == Motion::JumpAndMove {
            body.is_jumping = true;
        }
        let direction = bb.horizontal_direction_to(target);
        if direction != DVec2::ZERO {
            body.turn_to_direction(direction);
        }
        body.direction = Some(direction);
        Ok(motion)
    }

    /// Advance the body one tick.
    pub fn tick(&self, body: &mut AgentBody) {
        let physics = &self.config.physics;
        let bb = body.aabb(&self.config.player);
        let in_liquid = self.world.is_in_liquid(&bb);
        let on_ladder = !in_liquid && self.world.is_on_ladder(&bb);

        self.clip_velocity(body);
        if body.is_jumping {
            if in_liquid {
                body.velocity.y += physics.speed_liquid_jump;
            } else if on_ladder {
                body.velocity.y = physics.speed_climb;
            } else if body.on_ground {
                body.velocity.y = physics.speed_jump;
            }
        }
        if let Some(direction) = body.direction {
            let factor = if in_liquid {
                physics.speed_in_air * INPUT_EFFICIENCY
            } else {
                self.speed_factor(body)
            };
            body.velocity.x += direction.x * factor;
            body.velocity.z += direction.y * factor;
        }
        if on_ladder {
            body.velocity.y = body.velocity.y.max(-physics.ladder_max_descent);
        }

        self.do_move(body);

        if in_liquid {
            body.velocity *= physics.liquid_drag;
            if !body.floating {
                body.velocity.y -= physics.liquid_gravity;
            }
        } else {
            if !body.floating {
                body.velocity.y -= physics.block_fall;
                body.velocity.y *= physics.drag;
            }
            let slowdown = self.slowdown(body);
            body.velocity.x *= slowdown;
            body.velocity.z *= slowdown;
            if on_ladder {
                body.velocity.y = body.velocity.y.max(-physics.ladder_max_descent);
            }
        }
        body.is_jumping = false;
        body.direction = None;
    }

    fn clip_velocity(&self, body: &mut AgentBody) {
        let clip = self.config.physics.velocity_clip;
        for v in [
            &mut body.velocity.x,
            &mut body.velocity.y,
            &mut body.velocity.z,
        ] {
            if v.abs() < clip {
                *v = 0.0;
            }
        }
    }

    /// Horizontal velocity multiplier for the current footing.
    fn slowdown(&self, body: &AgentBody) -> f64 {
        let air = self.config.physics.air_slowdown;
        if !body.on_ground {
            return air;
        }
        let slipperiness = self
            .world
            .standing_on_solid_block(&body.aabb(&self.config.player))
            .map_or(DEFAULT_SLIPPERINESS, |b| b.kind.slipperiness());
        slipperiness * air
    }

    fn speed_factor(&self, body: &AgentBody) -> f64 {
        let physics = &self.config.physics;
        let factor = if body.on_ground {
            let slowdown = self.slowdown(body);
            physics.speed_on_ground * GROUND_ACCEL_BASE / (slowdown * slowdown * slowdown)
        } else {
            physics.speed_in_air
        };
        factor * INPUT_EFFICIENCY
    }

    /// Clamp `delta` against the world one axis at a time, Y first.
    fn resolve(&self, bb: &Aabb, delta: DVec3) -> Resolved {
        let boxes = self.world.collision_boxes_in(&bb.extend_to(delta));
        let mut moved = *bb;
        let mut dy = delta.y;
        for obstacle in &boxes {
            dy = moved.calculate_axis_offset(obstacle, dy, Axis::Y);
        }
        moved = moved.offset(DVec3::new(0.0, dy, 0.0));
        let mut dx = delta.x;
        for obstacle in &boxes {
            dx = moved.calculate_axis_offset(obstacle, dx, Axis::X);
        }
        moved = moved.offset(DVec3::new(dx, 0.0, 0.0));
        let mut dz = delta.z;
        for obstacle in &boxes {
            dz = moved.calculate_axis_offset(obstacle, dz, Axis::Z);
        }
        moved = moved.offset(DVec3::new(0.0, 0.0, dz));
        Resolved {
            offset: DVec3::new(dx, dy, dz),
            bb: moved,
            on_ground: delta.y < 0.0 && dy != delta.y,
        }
    }

    fn do_move(&self, body: &mut AgentBody) {
        let bb = body.aabb(&self.config.player);
        let velocity = body.velocity;
        let mut resolved = self.resolve(&bb, velocity);
        if velocity.y == 0.0 {
            resolved.on_ground = self.world.standing_on_solid_block(&resolved.bb).is_some();
        }

        let blocked_horizontally =
            resolved.offset.x != velocity.x || resolved.offset.z != velocity.z;
        if body.on_ground && velocity.y <= 0.0 && blocked_horizontally {
            if let Some(stepped) = self.try_step_up(&bb, velocity) {
                let progress = |o: DVec3| o.x * o.x + o.z * o.z;
                if progress(stepped.offset) > progress(resolved.offset) {
                    resolved = stepped;
                    body.velocity.y = 0.0;
                }
            }
        }

        let offset = resolved.offset;
        if offset.x != velocity.x {
            body.velocity.x = 0.0;
        }
        if offset.y != velocity.y {
            body.velocity.y = 0.0;
        }
        if offset.z != velocity.z {
            body.velocity.z = 0.0;
        }
        body.position = resolved.bb.bottom_center();
        body.on_ground = resolved.on_ground;
    }

    /// Raise the box by the step height, move horizontally, then settle back
    /// down onto whatever is below.
    fn try_step_up(&self, bb: &Aabb, velocity: DVec3) -> Option<Resolved> {
        let step = self.config.physics.max_step_height;
        if step <= 0.0 {
            return None;
        }
        let up = self.resolve(bb, DVec3::new(0.0, step + FLOAT_EPSILON, 0.0));
        if float_lte(up.offset.y, 0.0) {
            return None;
        }
        let horizontal = self.resolve(&up.bb, DVec3::new(velocity.x, 0.0, velocity.z));
        let down = self.resolve(&horizontal.bb, DVec3::new(0.0, -up.offset.y, 0.0));
        Some(Resolved {
            offset: DVec3::new(
                horizontal.offset.x,
                up.offset.y + down.offset.y,
                horizontal.offset.z,
            ),
            bb: down.bb,
            on_ground: down.on_ground,
        })
    }
}
