//! Sensor positions and placements
//!
//! A placement is a set of distinct grid positions sharing one detection radius.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid cell that can hold a sensor
///
/// Ordering is lexical on `(row, col)`, which is the tie-break order used by
/// every deterministic selection in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SensorPosition {
    /// Row index
    pub row: usize,
    /// Column index
    pub col: usize,
}

impl SensorPosition {
    /// Create a new position
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Squared Euclidean distance in cells
    #[inline]
    pub fn distance_sq(&self, other: SensorPosition) -> f64 {
        let dr = self.row.abs_diff(other.row) as f64;
        let dc = self.col.abs_diff(other.col) as f64;
        dr * dr + dc * dc
    }

    /// Whether `other` lies within `radius` cells of this position
    #[inline]
    pub fn within(&self, other: SensorPosition, radius: f64) -> bool {
        self.distance_sq(other) <= radius * radius
    }
}

impl From<(usize, usize)> for SensorPosition {
    fn from((row, col): (usize, usize)) -> Self {
        Self::new(row, col)
    }
}

impl fmt::Display for SensorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Set of sensors placed for one step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorPlacement {
    positions: Vec<SensorPosition>,
    radius: f64,
}

impl SensorPlacement {
    /// Create a placement, dropping repeated positions while keeping first-seen order
    pub fn new(positions: Vec<SensorPosition>, radius: f64) -> Self {
        let mut seen = rustc_hash::FxHashSet::default();
        let positions = positions.into_iter().filter(|p| seen.insert(*p)).collect();
        Self { positions, radius }
    }

    /// Placement with no sensors
    pub fn empty(radius: f64) -> Self {
        Self {
            positions: Vec::new(),
            radius,
        }
    }

    /// Sensor positions in selection order
    pub fn positions(&self) -> &[SensorPosition] {
        &self.positions
    }

    /// Shared detection radius
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Number of sensors placed
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when no sensors were placed
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether a sensor sits on `pos`
    pub fn contains(&self, pos: SensorPosition) -> bool {
        self.positions.contains(&pos)
    }

    /// Nearest sensor whose radius reaches `cell`; ties go to the earlier sensor
    pub fn nearest_covering(&self, cell: SensorPosition) -> Option<SensorPosition> {
        let radius_sq = self.radius * self.radius;
        let mut best: Option<(SensorPosition, f64)> = None;
        for &sensor in &self.positions {
            let d = sensor.distance_sq(cell);
            if d <= radius_sq && best.is_none_or(|(_, bd)| d < bd) {
                best = Some((sensor, d));
            }
        }
        best.map(|(sensor, _)| sensor)
    }
}
