//! Burn probability map
//!
//! Per-cell ignition likelihood in [0, 1]. Each step, cells that are burning
//! are raised by the [`EvidenceRule`]; every other cell decays by
//! `decay_factor`. Repeated decay drives a cell toward 0 without any special
//! casing, and every write is clamped back into [0, 1].

use crate::core_types::{disk_offsets, FireState, Grid, GridShape, SensorPosition, SimRng};
use crate::error::DataShapeError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How fresh ignition evidence raises a cell's probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum EvidenceRule {
    /// Set the cell to 1.0
    Reset,
    /// Move the cell toward 1.0: `p + weight * (1 - p)`
    Blend {
        /// Fraction of the remaining gap closed per observation, in (0, 1]
        weight: f64,
    },
}

impl EvidenceRule {
    /// Probability after one observation of fire
    #[inline]
    pub fn raise(&self, p: f64) -> f64 {
        match *self {
            EvidenceRule::Reset => 1.0,
            EvidenceRule::Blend { weight } => p + weight * (1.0 - p),
        }
    }
}

/// Initial map used when no seed grid is supplied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BurnPrior {
    /// Every cell starts at `value`
    Uniform {
        /// Starting probability, in [0, 1]
        value: f64,
    },
    /// Every cell drawn uniformly from [0, 1)
    Random,
}

impl Default for BurnPrior {
    fn default() -> Self {
        BurnPrior::Uniform { value: 0.0 }
    }
}

/// Mutable per-cell burn probability, owned by the simulation engine
#[derive(Debug, Clone, PartialEq)]
pub struct BurnProbabilityMap {
    grid: Grid<f64>,
    decay_factor: f64,
    evidence: EvidenceRule,
}

impl BurnProbabilityMap {
    /// Every cell at `value`
    pub fn uniform(shape: GridShape, value: f64, decay_factor: f64, evidence: EvidenceRule) -> Self {
        Self {
            grid: Grid::filled(shape, value.clamp(0.0, 1.0)),
            decay_factor,
            evidence,
        }
    }

    /// Build from a prior, drawing from `rng` for [`BurnPrior::Random`]
    pub fn from_prior(
        shape: GridShape,
        prior: BurnPrior,
        decay_factor: f64,
        evidence: EvidenceRule,
        rng: &mut SimRng,
    ) -> Self {
        match prior {
            BurnPrior::Uniform { value } => Self::uniform(shape, value, decay_factor, evidence),
            BurnPrior::Random => {
                let mut grid = Grid::filled(shape, 0.0);
                for p in grid.as_mut_slice() {
                    *p = rng.random::<f64>();
                }
                Self {
                    grid,
                    decay_factor,
                    evidence,
                }
            }
        }
    }

    /// Build from a collaborator-supplied seed grid
    ///
    /// Values are clamped into [0, 1]; non-finite values become 0.
    pub fn from_seed(seed: Grid<f64>, decay_factor: f64, evidence: EvidenceRule) -> Self {
        let grid = seed.map(|&v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 });
        Self {
            grid,
            decay_factor,
            evidence,
        }
    }

    /// Grid dimensions
    pub fn shape(&self) -> GridShape {
        self.grid.shape()
    }

    /// Probability at `pos`; out-of-bounds reads as 0
    pub fn value_at(&self, pos: SensorPosition) -> f64 {
        self.grid.get(pos).copied().unwrap_or(0.0)
    }

    /// Underlying grid (read-only view for strategies and snapshots)
    pub fn grid(&self) -> &Grid<f64> {
        &self.grid
    }

    /// Decay factor applied per step
    pub fn decay_factor(&self) -> f64 {
        self.decay_factor
    }

    /// Evidence rule for burning cells
    pub fn evidence_rule(&self) -> EvidenceRule {
        self.evidence
    }

    /// Apply one step of evidence and decay
    ///
    /// Returns the number of cells that received ignition evidence.
    pub fn update(&mut self, fire: &FireState) -> Result<usize, DataShapeError> {
        self.shape()
            .ensure_matches(fire.shape(), "fire state", None)?;
        let mut evidenced = 0;
        let statuses = fire.status().as_slice();
        for (p, status) in self.grid.as_mut_slice().iter_mut().zip(statuses) {
            let next = if status.is_burning() {
                evidenced += 1;
                self.evidence.raise(*p)
            } else {
                *p * self.decay_factor
            };
            *p = next.clamp(0.0, 1.0);
        }
        Ok(evidenced)
    }

    /// Raise every cell within `radius` of `center` by the evidence rule
    ///
    /// Used when a sensor reports fire: the area it watches becomes likely to burn.
    pub fn raise_around(&mut self, center: SensorPosition, radius: f64) -> usize {
        let shape = self.shape();
        let offsets = disk_offsets(radius);
        let cells = self.grid.as_mut_slice();
        let mut raised = 0;
        for idx in shape.disk_indices(center, &offsets) {
            cells[idx] = self.evidence.raise(cells[idx]).clamp(0.0, 1.0);
            raised += 1;
        }
        raised
    }

    /// Copy of the current probabilities
    pub fn snapshot(&self) -> Grid<f64> {
        self.grid.clone()
    }
}
