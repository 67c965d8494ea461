//! Shared primitive types used across the entire simulation.

use serde::{Deserialize, Serialize};

/// A simulation tick. The unit of deterministic time advancement.
pub type Tick = u64;

/// A stable, unique identifier for any entity in the simulation.
pub type EntityId = String;

/// The canonical session/run identifier.
pub type RunId = String;

/// Resource identifiers are data-driven ("wood", "tools", ...).
pub type ResourceId = String;

/// Wall-clock reading in seconds since an arbitrary epoch.
/// Only differences between readings are meaningful.
pub type WallTime = f64;

/// A map tile coordinate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shift by (dx, dy). None if the result leaves the i32 plane.
    pub fn checked_offset(self, dx: i64, dy: i64) -> Option<Self> {
        let x = i32::try_from(i64::from(self.x).checked_add(dx)?).ok()?;
        let y = i32::try_from(i64::from(self.y).checked_add(dy)?).ok()?;
        Some(Self::new(x, y))
    }

    /// Chebyshev distance, the metric facility radii are measured in.
    pub fn distance(self, other: TilePos) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}
