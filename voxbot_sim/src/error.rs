// Fatal simulation errors.
//
// Expected goal failures (unknown waypoint, no route, stale path) are not
// errors: they end a behaviour frame with `Status::Failure` and, at most, a
// chat line. `SimError` is reserved for conditions the control loop cannot
// continue from. When `SimState::step` sees one it halts the simulation and
// every later step reports `SimError::Halted`.
//
// See also: `pathfinding.rs` for `SearchFailure`, the recoverable search
// outcome, `sim.rs` for the halting logic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// The step/jump decision table was consulted with an elevation outside
    /// every bracket it understands. Indicates broken geometry or config
    /// assumptions (e.g. a nav edge steeper than the jump height).
    #[error("move elevation {elevation:.3} with collision distance {collision_distance:.3} is outside the step/jump brackets")]
    ElevationOutOfRange {
        elevation: f64,
        collision_distance: f64,
    },

    /// A previous tick failed fatally; the control loop no longer runs.
    #[error("simulation halted after a fatal error")]
    Halted,

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
