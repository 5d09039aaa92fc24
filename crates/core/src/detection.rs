//! Detection evaluation for one time step
//!
//! A burning cell is detected when it lies within the sensor radius of at
//! least one placed sensor and its weighted signal
//! (`alpha * burn_probability + beta * intensity`) reaches the detection
//! threshold. Each detected cell yields one [`DetectionEvent`] attributed to
//! the nearest covering sensor.

use crate::burn_probability::BurnProbabilityMap;
use crate::config::SignalWeights;
use crate::core_types::{FireState, SensorPlacement, SensorPosition};
use crate::error::DataShapeError;
use serde::{Deserialize, Serialize};

/// A burning cell seen by a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Zero-based step index
    pub step: usize,
    /// Sensor credited with the detection
    pub sensor: SensorPosition,
    /// Burning cell that was detected
    pub cell: SensorPosition,
}

/// Detection results for one step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepDetection {
    /// One event per detected cell, row-major by cell
    pub events: Vec<DetectionEvent>,
    /// Cells burning this step
    pub burning_cells: usize,
    /// Burning cells that were detected
    pub detected_cells: usize,
}

impl StepDetection {
    /// Detected burning cells / burning cells, or 1.0 when nothing burns
    pub fn coverage_fraction(&self) -> f64 {
        if self.burning_cells == 0 {
            1.0
        } else {
            (self.detected_cells as f64 / self.burning_cells as f64).clamp(0.0, 1.0)
        }
    }

    /// Sensors that produced at least one event, in first-event order
    pub fn reporting_sensors(&self) -> Vec<SensorPosition> {
        let mut seen = rustc_hash::FxHashSet::default();
        self.events
            .iter()
            .map(|e| e.sensor)
            .filter(|s| seen.insert(*s))
            .collect()
    }
}

/// Evaluate which burning cells the placement detects at `step`
pub fn evaluate_detection(
    step: usize,
    fire: &FireState,
    burn_map: &BurnProbabilityMap,
    placement: &SensorPlacement,
    weights: SignalWeights,
    detection_threshold: f64,
) -> Result<StepDetection, DataShapeError> {
    burn_map
        .shape()
        .ensure_matches(fire.shape(), "fire state", Some(step))?;

    let mut detection = StepDetection::default();
    for cell in fire.burning_cells() {
        detection.burning_cells += 1;
        let Some(sensor) = placement.nearest_covering(cell) else {
            continue;
        };
        let signal = weights.signal(burn_map.value_at(cell), fire.intensity_at(cell));
        if signal >= detection_threshold {
            detection.detected_cells += 1;
            detection.events.push(DetectionEvent { step, sensor, cell });
        }
    }
    Ok(detection)
}
