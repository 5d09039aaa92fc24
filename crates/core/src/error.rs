//! Error types for sensor deployment runs
//!
//! Every failure in the core is deterministic given the same inputs, so none of
//! these errors are retryable. Each carries enough context (parameter name,
//! step index, offending shapes) to diagnose the bad input.

use crate::core_types::GridShape;
use thiserror::Error;

/// Invalid or unsupported configuration, surfaced before a run starts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Algorithm name that is not recognised at all
    #[error("unknown deployment algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// Algorithm that is recognised but has no implementation
    #[error("deployment algorithm '{0}' is reserved but not supported")]
    UnsupportedAlgorithm(&'static str),

    /// Numeric parameter outside its allowed range
    #[error("parameter `{parameter}` = {value} is out of range, expected {expected}")]
    OutOfRange {
        /// Configuration field name
        parameter: &'static str,
        /// Offending value
        value: f64,
        /// Human-readable allowed range
        expected: &'static str,
    },

    /// The data source holds fewer steps than the run asks for
    #[error("configured {requested} time steps but the fire data only has {available}")]
    InsufficientData {
        /// `num_time_steps` from the configuration
        requested: usize,
        /// Steps the data source can provide
        available: usize,
    },
}

impl ConfigError {
    pub(crate) fn out_of_range(parameter: &'static str, value: f64, expected: &'static str) -> Self {
        Self::OutOfRange {
            parameter,
            value,
            expected,
        }
    }
}

/// Grid dimensions that do not line up
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataShapeError {
    /// Two grids that must share a shape do not
    #[error("{what} is {found}, expected {expected}{}", step_suffix(.step))]
    Mismatch {
        /// Which grid was being checked
        what: &'static str,
        /// Step at which the mismatch was found, if any
        step: Option<usize>,
        /// Shape of the run
        expected: GridShape,
        /// Shape that was supplied
        found: GridShape,
    },

    /// A row-wise grid with rows of different lengths
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        /// Zero-based row index
        row: usize,
        /// Column count of the first row
        expected: usize,
        /// Column count of the offending row
        found: usize,
    },

    /// A grid with zero rows or zero columns
    #[error("grid has no cells")]
    Empty,
}

#[allow(clippy::ref_option)]
fn step_suffix(step: &Option<usize>) -> String {
    step.map(|s| format!(" at step {s}")).unwrap_or_default()
}

/// A strategy could not produce a placement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot place {requested} sensors on a grid with {available} distinct positions")]
pub struct PlacementError {
    /// Sensors asked for
    pub requested: usize,
    /// Distinct in-bounds positions
    pub available: usize,
}

/// Top-level error for a simulation run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Configuration rejected before stepping
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Grid shapes disagree
    #[error("data shape error: {0}")]
    DataShape(#[from] DataShapeError),

    /// The active strategy could not place sensors
    #[error("placement failed at step {step}: {source}")]
    Placement {
        /// Step where placement was attempted
        step: usize,
        /// Cause raised by the strategy
        #[source]
        source: PlacementError,
    },

    /// A data source reported a step count but could not supply the state
    #[error("fire data source has no state for step {0}")]
    MissingFireState(usize),

    /// The engine was driven again after a fatal error
    #[error("run was aborted at step {0} and cannot continue")]
    Aborted(usize),
}

/// Result alias for simulation operations
pub type Result<T> = std::result::Result<T, SimulationError>;
