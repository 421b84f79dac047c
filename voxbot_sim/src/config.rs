// Data-driven bot configuration.
//
// All tunable parameters live in `BotConfig`, loaded from JSON at startup
// (`BotConfig::from_json`) or taken from `Default`. Nothing in the crate
// reads process-wide constants: the config value is passed explicitly to the
// classifier, nav mesh, pathfinder, movement controller and behaviours, so
// each can be tested with its own constants.
//
// Parameters are grouped by the subsystem that consumes them:
// - `PlayerDimensions`: the agent's collision volume.
// - `PhysicsConfig`: per-tick integrator constants and step/jump thresholds.
// - `PathfindingConfig`: edge-cost table and search budgets.
// - `BehaviourConfig`: scheduler and goal tuning.
//
// Defaults reproduce the vanilla game's movement constants at a 20 Hz tick
// (`time_step = 0.05`). Missing JSON fields fall back to these defaults.
//
// See also: `sim.rs` which owns the `BotConfig` as part of `SimState`,
// `nav.rs` for how the cost table becomes edge weights, `movement.rs` for the
// integrator that reads `PhysicsConfig`.

use crate::error::SimError;
use serde::{Deserialize, Serialize};

/// The agent's collision volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerDimensions {
    /// Height of the collision box in blocks.
    pub height: f64,
    /// Eye height above the feet, used for look-at targeting.
    pub eye_level: f64,
    /// Width of the (square) collision box footprint.
    pub body_diameter: f64,
}

impl Default for PlayerDimensions {
    fn default() -> Self {
        Self {
            height: 1.8,
            eye_level: 1.62,
            body_diameter: 0.6,
        }
    }
}

/// Per-tick movement integration constants. Velocities are in blocks per
/// tick; accelerations in blocks per tick squared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Highest ledge a standing agent can jump onto.
    pub max_jump_height: f64,
    /// Highest ledge the agent walks onto without jumping.
    pub max_step_height: f64,
    /// Highest ledge reachable by jumping out of a liquid.
    pub max_water_jump_height: f64,
    /// Highest ledge reachable by jumping off a vine or ladder.
    pub max_vine_jump_height: f64,
    /// Gravitational acceleration in blocks/s², used for jump-apex timing.
    pub gravity: f64,
    /// Downward velocity added every tick while airborne.
    pub block_fall: f64,
    /// Vertical velocity multiplier applied every tick.
    pub drag: f64,
    /// Base horizontal acceleration on the ground.
    pub speed_on_ground: f64,
    /// Horizontal acceleration while airborne.
    pub speed_in_air: f64,
    /// Vertical velocity of a jump from the ground.
    pub speed_jump: f64,
    /// Upward velocity added per tick when swimming up.
    pub speed_liquid_jump: f64,
    /// Upward velocity when climbing a ladder or vine.
    pub speed_climb: f64,
    /// Seconds per simulation tick.
    pub time_step: f64,
    /// Velocity components smaller than this snap to zero.
    pub velocity_clip: f64,
    /// Horizontal slowdown multiplier while airborne.
    pub air_slowdown: f64,
    /// Velocity multiplier inside liquids (all axes).
    pub liquid_drag: f64,
    /// Downward velocity added per tick inside liquids.
    pub liquid_gravity: f64,
    /// Fastest descent speed while holding onto a ladder.
    pub ladder_max_descent: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            max_jump_height: 1.25,
            max_step_height: 0.5,
            max_water_jump_height: 0.67,
            max_vine_jump_height: 0.35,
            gravity: 27.0,
            block_fall: 0.08,
            drag: 0.98,
            speed_on_ground: 0.1,
            speed_in_air: 0.02,
            speed_jump: 0.42,
            speed_liquid_jump: 0.04,
            speed_climb: 0.2,
            time_step: 0.05,
            velocity_clip: 0.005,
            air_slowdown: 0.91,
            liquid_drag: 0.8,
            liquid_gravity: 0.02,
            ladder_max_descent: 0.15,
        }
    }
}

impl PhysicsConfig {
    /// Simulation ticks per second.
    pub fn ticks_per_second(&self) -> f64 {
        1.0 / self.time_step
    }
}

/// Edge costs and search budgets for the navigation graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Cost of a straight horizontal move to a cross neighbour.
    pub cost_direct: f32,
    /// Cost of a horizontal diagonal move.
    pub cost_diagonal: f32,
    /// Extra cost for a move that needs a jump.
    pub cost_jump: f32,
    /// Extra cost per block of descent.
    pub cost_fall: f32,
    /// Cost per block of vertical ladder or liquid travel.
    pub cost_ladder: f32,
    /// Searches ignore nodes farther than this (Chebyshev, in blocks) from
    /// the start.
    pub search_distance_limit: u32,
    /// A search that expands more nodes than this fails.
    pub max_expanded_nodes: usize,
    /// Nodes a search may expand per cooperative slice (one slice per tick).
    pub nodes_per_slice: usize,
    /// How many blocks below a free-fall neighbour to probe for a landing.
    pub max_fall_probe: i32,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            cost_direct: 1.0,
            cost_diagonal: std::f32::consts::SQRT_2,
            cost_jump: 1.1,
            cost_fall: 1.1,
            // Common ground speed over the maximum ladder speed.
            cost_ladder: 0.21 / 0.15,
            search_distance_limit: 100,
            max_expanded_nodes: 20_000,
            nodes_per_slice: 200,
            max_fall_probe: 3,
        }
    }
}

impl PathfindingConfig {
    /// The cheapest single edge the cost table can produce. Every edge changes
    /// the voxel level by at most `max_levels_per_edge`, which bounds the
    /// vertical part of the A* heuristic.
    pub fn min_edge_cost(&self) -> f32 {
        self.cost_direct.min(self.cost_diagonal).min(self.cost_ladder)
    }

    /// Largest change in voxel level a single nav edge can make.
    pub fn max_levels_per_edge(&self) -> i32 {
        self.max_fall_probe.max(1)
    }
}

/// Scheduler and goal tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviourConfig {
    /// Name of the player whose commands the bot follows and who it watches.
    pub commander_name: String,
    /// Horizontal distance from a node's center at which it counts as reached.
    pub arrival_tolerance: f64,
    /// Ticks without reaching the next node before movement gives up.
    pub stuck_tick_limit: u32,
    /// Path searches a single travel goal may start before it fails.
    pub max_travel_attempts: u32,
    /// Frame pushes/pops the drive loop performs in one tick before yielding.
    pub max_transitions_per_tick: u32,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            commander_name: "commander".to_string(),
            arrival_tolerance: 0.25,
            stuck_tick_limit: 60,
            max_travel_attempts: 3,
            max_transitions_per_tick: 32,
        }
    }
}

/// Top-level configuration value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub player: PlayerDimensions,
    pub physics: PhysicsConfig,
    pub pathfinding: PathfindingConfig,
    pub behaviour: BehaviourConfig,
    /// Extent of the in-crate voxel world.
    pub world_size: (u32, u32, u32),
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            player: PlayerDimensions::default(),
            physics: PhysicsConfig::default(),
            pathfinding: PathfindingConfig::default(),
            behaviour: BehaviourConfig::default(),
            world_size: (64, 64, 64),
        }
    }
}

impl BotConfig {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = BotConfig::default();
        let json = config.to_json().unwrap();
        let restored = BotConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn config_loads_partial_json() {
        let json = r#"{
            "physics": { "max_jump_height": 1.5 },
            "behaviour": { "commander_name": "Alice" },
            "world_size": [32, 16, 32]
        }"#;
        let config = BotConfig::from_json(json).unwrap();
        assert_eq!(config.physics.max_jump_height, 1.5);
        // Unspecified fields keep their defaults.
        assert_eq!(config.physics.max_step_height, 0.5);
        assert_eq!(config.behaviour.commander_name, "Alice");
        assert_eq!(config.world_size, (32, 16, 32));
        assert_eq!(config.pathfinding.cost_direct, 1.0);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = BotConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn ladder_cost_is_ground_over_ladder_speed() {
        let config = PathfindingConfig::default();
        assert!((config.cost_ladder - 1.4).abs() < 1e-5);
        assert_eq!(config.min_edge_cost(), 1.0);
        assert_eq!(config.max_levels_per_edge(), 3);
    }

    #[test]
    fn twenty_ticks_per_second() {
        assert_eq!(PhysicsConfig::default().ticks_per_second(), 20.0);
    }
}
