//! Marginal-gain greedy placement
//!
//! Repeatedly picks the position whose detection disk adds the most
//! not-yet-covered signal (`alpha * burn_probability + beta * intensity`).
//! Stops after `num_sensors` picks or when no position adds positive signal.
//! Scans run in row-major order and a later position must beat the current
//! best by more than a relative tolerance, so ties (including sums that only
//! differ by rounding) go to the lowest `(row, col)`.

use super::{exceeds, DeploymentStrategy, PlacementContext};
use crate::core_types::{disk_offsets, SensorPlacement, SensorPosition};
use crate::error::PlacementError;
use tracing::debug;

/// Deterministic marginal-gain strategy
#[derive(Debug, Clone, PartialEq)]
pub struct GreedyStrategy {
    revisit_penalty: f64,
}

impl GreedyStrategy {
    /// Create a greedy strategy
    ///
    /// `revisit_penalty` multiplies the gain of positions occupied in the
    /// previous step; 1.0 disables it.
    pub fn new(revisit_penalty: f64) -> Self {
        Self { revisit_penalty }
    }
}

impl Default for GreedyStrategy {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DeploymentStrategy for GreedyStrategy {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn place_sensors(
        &mut self,
        ctx: &PlacementContext<'_>,
    ) -> Result<SensorPlacement, PlacementError> {
        ctx.ensure_capacity()?;

        let shape = ctx.shape();
        let signal = ctx.signal_grid();
        let offsets = disk_offsets(ctx.sensor_radius);
        let mut covered = vec![false; shape.cell_count()];
        let mut chosen = vec![false; shape.cell_count()];
        let mut selected: Vec<SensorPosition> = Vec::with_capacity(ctx.num_sensors);

        while selected.len() < ctx.num_sensors {
            let mut best: Option<(usize, f64)> = None;

            for idx in 0..shape.cell_count() {
                if chosen[idx] {
                    continue;
                }
                let pos = shape.position_of(idx);
                let mut gain: f64 = shape
                    .disk_indices(pos, &offsets)
                    .filter(|&c| !covered[c])
                    .map(|c| signal[c])
                    .sum();
                if ctx.previous.is_some_and(|prev| prev.contains(pos)) {
                    gain *= self.revisit_penalty;
                }
                if best.is_none_or(|(_, best_gain)| exceeds(gain, best_gain)) {
                    best = Some((idx, gain));
                }
            }

            let Some((idx, gain)) = best else { break };
            if gain <= 0.0 {
                break;
            }
            let pos = shape.position_of(idx);
            chosen[idx] = true;
            for c in shape.disk_indices(pos, &offsets) {
                covered[c] = true;
            }
            debug!(step = ctx.step, %pos, gain, "greedy pick");
            selected.push(pos);
        }

        Ok(SensorPlacement::new(selected, ctx.sensor_radius))
    }
}
