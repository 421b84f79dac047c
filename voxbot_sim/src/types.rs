// Core types shared across the bot simulation.
//
// Defines the integer voxel grid coordinate (`VoxelCoord`), entity and
// dimension identifiers, the horizontal adjacency tables used by neighbour
// enumeration, and the tolerant float comparisons used wherever physics
// results feed a discrete decision (standing, step/jump brackets).
//
// All plain data types derive `Serialize`/`Deserialize` so commands, events
// and config can be carried as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A cell in the voxel grid. Each component is in block units.
///
/// The coordinate system follows the game world:
/// - X: east  (positive) / west  (negative)
/// - Y: up    (positive) / down  (negative)
/// - Z: south (positive) / north (negative)
///
/// A coordinate used as a nav node names the voxel the agent's feet occupy,
/// not the block it stands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub const fn above(self) -> Self {
        self.offset(0, 1, 0)
    }

    pub const fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// Largest per-axis difference between two coordinates.
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
            .max((self.z - other.z).unsigned_abs())
    }

    /// The voxel containing a world-space point.
    pub fn containing(point: glam::DVec3) -> Self {
        Self::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        )
    }

    /// World-space center of the voxel's floor face.
    pub fn floor_center(self) -> glam::DVec3 {
        glam::DVec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y),
            f64::from(self.z) + 0.5,
        )
    }
}

impl fmt::Display for VoxelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// The 8 horizontal neighbour offsets `(dx, dz)`, cross directions first.
pub const ADJACENCY: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Server-assigned entity identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

/// The world dimension the agent currently inhabits. Nav data never crosses
/// dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Nether,
    #[default]
    Overworld,
    End,
}

// ---------------------------------------------------------------------------
// Tolerant float comparison
// ---------------------------------------------------------------------------

/// Precision used when comparing physics quantities.
pub const FLOAT_EPSILON: f64 = 1e-6;

pub fn float_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= FLOAT_EPSILON
}

pub fn float_gt(a: f64, b: f64) -> bool {
    a - b > FLOAT_EPSILON
}

pub fn float_lt(a: f64, b: f64) -> bool {
    b - a > FLOAT_EPSILON
}

pub fn float_lte(a: f64, b: f64) -> bool {
    !float_gt(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voxel_coord_chebyshev_distance() {
        let a = VoxelCoord::new(0, 0, 0);
        let b = VoxelCoord::new(-3, 7, 5);
        assert_eq!(a.chebyshev_distance(b), 7);
    }

    #[test]
    fn containing_floors_negative_components() {
        let p = glam::DVec3::new(-0.2, 3.0, 1.999);
        assert_eq!(VoxelCoord::containing(p), VoxelCoord::new(-1, 3, 1));
    }

    #[test]
    fn adjacency_has_no_duplicates_or_origin() {
        let mut seen = std::collections::BTreeSet::new();
        for &(dx, dz) in &ADJACENCY {
            assert!((dx, dz) != (0, 0));
            assert!(seen.insert((dx, dz)));
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn tolerant_comparisons() {
        assert!(float_eq(0.5, 0.5 + 1e-9));
        assert!(!float_gt(0.5 + 1e-9, 0.5));
        assert!(float_lte(0.5 + 1e-9, 0.5));
        assert!(float_lt(0.4, 0.5));
    }

    #[test]
    fn voxel_coord_ordering() {
        // VoxelCoord needs a total order for BTreeMap keys.
        let a = VoxelCoord::new(0, 0, 0);
        let b = VoxelCoord::new(1, 0, 0);
        assert!(a < b);
    }
}
