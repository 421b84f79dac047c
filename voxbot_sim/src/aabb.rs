// Axis-aligned bounding boxes for agent and block collision.
//
// `Aabb` is immutable in use: every operation returns a new box. The agent's
// box is rebuilt from its feet position each time it is needed
// (`Aabb::from_player_position`) and movement updates the position from the
// resolved box, never the other way around.
//
// Overlap tests are strict: two boxes that only touch on a face do not
// collide. An agent resting on a floor has `min.y == floor.max.y` and must
// still be free to slide horizontally.
//
// Two kinds of sweep live here:
// - `calculate_axis_offset`: clamp a single-axis displacement against one
//   obstacle, used by the integrator's Y, X, Z resolution passes.
// - `sweep_time_of_impact`: the fraction of an arbitrary displacement at
//   which a moving box first penetrates an obstacle, used for collision
//   distance queries and path validation.
//
// See also: `world.rs` which produces block boxes, `movement.rs` which
// integrates the agent box every tick.

use crate::config::PlayerDimensions;
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Axis selector for single-axis sweeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn pick(self, v: DVec3) -> f64 {
        match self {
            Self::X => v.x,
            Self::Y => v.y,
            Self::Z => v.z,
        }
    }

    fn others(self) -> [Axis; 2] {
        match self {
            Self::X => [Self::Y, Self::Z],
            Self::Y => [Self::X, Self::Z],
            Self::Z => [Self::X, Self::Y],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// The agent's collision box with its feet centered at `feet`.
    pub fn from_player_position(feet: DVec3, dims: &PlayerDimensions) -> Self {
        let half = dims.body_diameter / 2.0;
        Self {
            min: DVec3::new(feet.x - half, feet.y, feet.z - half),
            max: DVec3::new(feet.x + half, feet.y + dims.height, feet.z + half),
        }
    }

    pub fn offset(&self, delta: DVec3) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Grow the box in the direction of `delta` so it covers every position
    /// the starting box passes through while moving by `delta`.
    pub fn extend_to(&self, delta: DVec3) -> Self {
        Self {
            min: self.min + delta.min(DVec3::ZERO),
            max: self.max + delta.max(DVec3::ZERO),
        }
    }

    pub fn min_y(&self) -> f64 {
        self.min.y
    }

    pub fn max_y(&self) -> f64 {
        self.max.y
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) / 2.0
    }

    /// The center of the bottom face (the "feet" point for the agent box).
    pub fn bottom_center(&self) -> DVec3 {
        let c = self.center();
        DVec3::new(c.x, self.min.y, c.z)
    }

    pub fn horizontal_center(&self) -> DVec2 {
        let c = self.center();
        DVec2::new(c.x, c.z)
    }

    fn overlaps_on(&self, other: &Aabb, axis: Axis) -> bool {
        axis.pick(self.min) < axis.pick(other.max) && axis.pick(self.max) > axis.pick(other.min)
    }

    /// Strict overlap on all three axes.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.overlaps_on(other, Axis::X)
            && self.overlaps_on(other, Axis::Y)
            && self.overlaps_on(other, Axis::Z)
    }

    /// Horizontal overlap only (X and Z).
    pub fn intersects_horizontally(&self, other: &Aabb) -> bool {
        self.overlaps_on(other, Axis::X) && self.overlaps_on(other, Axis::Z)
    }

    /// Clamp a displacement of `self` along `axis` so that it stops at the
    /// face of `obstacle` instead of penetrating it. Obstacles that do not
    /// overlap on the two other axes never constrain the move.
    pub fn calculate_axis_offset(&self, obstacle: &Aabb, offset: f64, axis: Axis) -> f64 {
        let [a, b] = axis.others();
        if !self.overlaps_on(obstacle, a) || !self.overlaps_on(obstacle, b) {
            return offset;
        }
        if offset > 0.0 && axis.pick(self.max) <= axis.pick(obstacle.min) {
            let gap = axis.pick(obstacle.min) - axis.pick(self.max);
            if gap < offset {
                return gap;
            }
        } else if offset < 0.0 && axis.pick(self.min) >= axis.pick(obstacle.max) {
            let gap = axis.pick(obstacle.max) - axis.pick(self.min);
            if gap > offset {
                return gap;
            }
        }
        offset
    }

    /// Fraction `t ∈ [0, 1)` of `delta` at which `self`, moving by
    /// `t * delta`, first penetrates `obstacle`. `None` when the move never
    /// penetrates it. A box already overlapping the obstacle returns `0.0`.
    pub fn sweep_time_of_impact(&self, delta: DVec3, obstacle: &Aabb) -> Option<f64> {
        let mut entry = f64::NEG_INFINITY;
        let mut exit = f64::INFINITY;
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let d = axis.pick(delta);
            let (lo, hi) = (axis.pick(self.min), axis.pick(self.max));
            let (olo, ohi) = (axis.pick(obstacle.min), axis.pick(obstacle.max));
            if d == 0.0 {
                if !(lo < ohi && hi > olo) {
                    return None;
                }
                continue;
            }
            let (t0, t1) = if d > 0.0 {
                ((olo - hi) / d, (ohi - lo) / d)
            } else {
                ((ohi - lo) / d, (olo - hi) / d)
            };
            entry = entry.max(t0);
            exit = exit.min(t1);
        }
        if entry < exit && entry < 1.0 && exit > 0.0 {
            Some(entry.max(0.0))
        } else {
            None
        }
    }

    /// Unit horizontal direction from this box's center to `target`'s center,
    /// or zero when they are horizontally concentric.
    pub fn horizontal_direction_to(&self, target: &Aabb) -> DVec2 {
        (target.horizontal_center() - self.horizontal_center()).normalize_or_zero()
    }

    /// Horizontal distance between the two centers.
    pub fn horizontal_distance_to(&self, target: &Aabb) -> f64 {
        self.horizontal_center()
            .distance(target.horizontal_center())
    }
}
