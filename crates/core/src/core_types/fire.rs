//! Per-step fire state
//!
//! A `FireState` is produced once per time step by an external data source and
//! is never mutated afterwards.

use crate::core_types::grid::{Grid, GridShape};
use crate::core_types::sensor::SensorPosition;
use crate::error::DataShapeError;
use serde::{Deserialize, Serialize};

/// Discrete fire status of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FireStatus {
    /// Not yet reached by fire
    #[default]
    Unburned,
    /// Actively burning this step
    Burning,
    /// Burned out
    Burned,
}

impl FireStatus {
    /// True for `Burning`
    pub fn is_burning(self) -> bool {
        self == FireStatus::Burning
    }

    /// True once fire has touched the cell (burning or burned)
    pub fn has_ignited(self) -> bool {
        self != FireStatus::Unburned
    }
}

/// Fire status and intensity for one time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireState {
    status: Grid<FireStatus>,
    intensity: Grid<f64>,
}

impl FireState {
    /// Combine a status grid and an intensity grid
    ///
    /// Negative and non-finite intensities are clamped to 0.
    pub fn new(status: Grid<FireStatus>, intensity: Grid<f64>) -> Result<Self, DataShapeError> {
        status
            .shape()
            .ensure_matches(intensity.shape(), "intensity grid", None)?;
        let intensity = intensity.map(|&v| if v.is_finite() { v.max(0.0) } else { 0.0 });
        Ok(Self { status, intensity })
    }

    /// All cells unburned with zero intensity
    pub fn quiet(shape: GridShape) -> Self {
        Self {
            status: Grid::filled(shape, FireStatus::Unburned),
            intensity: Grid::filled(shape, 0.0),
        }
    }

    /// Derive status from a numeric intensity grid
    ///
    /// Cells at or above `ignition_threshold` are burning. Cells below it that
    /// were burning or burned in `previous` are burned. Everything else is
    /// unburned.
    pub fn from_intensity(
        intensity: Grid<f64>,
        ignition_threshold: f64,
        previous: Option<&FireState>,
    ) -> Result<Self, DataShapeError> {
        let shape = intensity.shape();
        if let Some(prev) = previous {
            shape.ensure_matches(prev.shape(), "previous fire state", None)?;
        }
        let statuses = intensity
            .iter()
            .map(|(pos, &value)| {
                if value.is_finite() && value >= ignition_threshold {
                    FireStatus::Burning
                } else if previous.is_some_and(|p| p.status_at(pos).has_ignited()) {
                    FireStatus::Burned
                } else {
                    FireStatus::Unburned
                }
            })
            .collect();
        let status = Grid::from_vec(shape, statuses)?;
        Self::new(status, intensity)
    }

    /// Grid dimensions
    pub fn shape(&self) -> GridShape {
        self.status.shape()
    }

    /// Status grid
    pub fn status(&self) -> &Grid<FireStatus> {
        &self.status
    }

    /// Intensity grid
    pub fn intensity(&self) -> &Grid<f64> {
        &self.intensity
    }

    /// Status at `pos`; out-of-bounds reads as unburned
    pub fn status_at(&self, pos: SensorPosition) -> FireStatus {
        self.status.get(pos).copied().unwrap_or_default()
    }

    /// Intensity at `pos`; out-of-bounds reads as zero
    pub fn intensity_at(&self, pos: SensorPosition) -> f64 {
        self.intensity.get(pos).copied().unwrap_or(0.0)
    }

    /// Positions of every burning cell, row-major
    pub fn burning_cells(&self) -> impl Iterator<Item = SensorPosition> + '_ {
        self.status
            .iter()
            .filter(|(_, s)| s.is_burning())
            .map(|(pos, _)| pos)
    }

    /// Number of burning cells
    pub fn burning_count(&self) -> usize {
        self.status
            .as_slice()
            .iter()
            .filter(|s| s.is_burning())
            .count()
    }

    /// Cells burning now that had not ignited in `previous`
    ///
    /// With no previous state every burning cell counts as a new ignition.
    pub fn ignitions_since(&self, previous: Option<&FireState>) -> Vec<SensorPosition> {
        self.burning_cells()
            .filter(|&pos| previous.is_none_or(|p| !p.status_at(pos).has_ignited()))
            .collect()
    }
}
