//! Per-step output records
//!
//! The engine hands every [`StepReport`] to a [`StepObserver`]. Observers
//! decide where records go (log files, dashboards, nothing at all); the
//! engine never writes them itself.

use crate::core_types::{Grid, SensorPlacement};
use crate::detection::DetectionEvent;
use crate::metrics::RunMetrics;
use serde::{Deserialize, Serialize};

/// Everything produced by one time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Zero-based step index
    pub step: usize,
    /// Placement in force for this step
    pub placement: SensorPlacement,
    /// Whether the strategy was asked for a new placement this step
    pub replanned: bool,
    /// Detected burning cells / burning cells (1.0 when nothing burns)
    pub coverage: f64,
    /// Cells burning this step
    pub burning_cells: usize,
    /// Burning cells that were detected
    pub detected_cells: usize,
    /// Cells that ignited this step
    pub new_ignitions: usize,
    /// Detection events for this step
    pub events: Vec<DetectionEvent>,
    /// Burn probability after this step's update
    pub burn_probability: Grid<f64>,
}

/// Receives output records as a run progresses
pub trait StepObserver {
    /// Called after each completed step
    fn on_step(&mut self, report: &StepReport);

    /// Called once when the run reaches DONE
    fn on_complete(&mut self, _metrics: &RunMetrics) {}
}

/// Observer that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl StepObserver for NullObserver {
    fn on_step(&mut self, _report: &StepReport) {}
}

/// Observer that keeps every report in memory
#[derive(Debug, Clone, Default)]
pub struct CollectingObserver {
    /// Reports in step order
    pub reports: Vec<StepReport>,
    /// Final metrics, once the run completes
    pub metrics: Option<RunMetrics>,
}

impl StepObserver for CollectingObserver {
    fn on_step(&mut self, report: &StepReport) {
        self.reports.push(report.clone());
    }

    fn on_complete(&mut self, metrics: &RunMetrics) {
        self.metrics = Some(metrics.clone());
    }
}
