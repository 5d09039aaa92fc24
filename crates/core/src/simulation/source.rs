//! Fire data sources
//!
//! The engine pulls one [`FireState`] per step from a [`FireSource`]. Parsing
//! persisted grids is left to the caller; [`FireSequence`] holds states that
//! were already parsed.

use crate::core_types::{FireState, Grid, GridShape};
use crate::error::DataShapeError;

/// Supplies the fire state for each time step
pub trait FireSource {
    /// Shape every state must have
    fn shape(&self) -> GridShape;

    /// Number of steps available
    fn len(&self) -> usize;

    /// True when no steps are available
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// State for zero-based `step`, or `None` past the end
    fn fire_state(&mut self, step: usize) -> Option<FireState>;
}

/// Pre-recorded, shape-checked sequence of fire states
#[derive(Debug, Clone, PartialEq)]
pub struct FireSequence {
    shape: GridShape,
    states: Vec<FireState>,
}

impl FireSequence {
    /// Wrap recorded states
    ///
    /// Every state must share the first state's shape; the first offender is
    /// reported with its step index.
    pub fn new(states: Vec<FireState>) -> Result<Self, DataShapeError> {
        let shape = states.first().ok_or(DataShapeError::Empty)?.shape();
        for (step, state) in states.iter().enumerate() {
            shape.ensure_matches(state.shape(), "fire state", Some(step))?;
        }
        Ok(Self { shape, states })
    }

    /// Derive states from raw intensity grids
    ///
    /// Each grid is thresholded with [`FireState::from_intensity`], using the
    /// previous step's state to mark burned-out cells.
    pub fn from_intensity_grids(
        grids: Vec<Grid<f64>>,
        ignition_threshold: f64,
    ) -> Result<Self, DataShapeError> {
        let mut states: Vec<FireState> = Vec::with_capacity(grids.len());
        for (step, grid) in grids.into_iter().enumerate() {
            if let Some(first) = states.first() {
                first
                    .shape()
                    .ensure_matches(grid.shape(), "fire grid", Some(step))?;
            }
            let state = FireState::from_intensity(grid, ignition_threshold, states.last())?;
            states.push(state);
        }
        Self::new(states)
    }

    /// Recorded states in step order
    pub fn states(&self) -> &[FireState] {
        &self.states
    }
}

impl FireSource for FireSequence {
    fn shape(&self) -> GridShape {
        self.shape
    }

    fn len(&self) -> usize {
        self.states.len()
    }

    fn fire_state(&mut self, step: usize) -> Option<FireState> {
        self.states.get(step).cloned()
    }
}
