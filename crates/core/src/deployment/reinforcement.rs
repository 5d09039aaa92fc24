//! Epsilon-greedy placement over a learned value table
//!
//! The strategy keeps a running estimate of `alpha * burn_probability +
//! beta * intensity` for every position. Each call first folds the current
//! observation into every estimate with an exponential moving average, then
//! fills each sensor slot by exploring (uniform random free position, with
//! probability `epsilon`) or exploiting (highest estimate among free
//! positions, ties to the lowest `(row, col)`).
//!
//! The table is the learning state: it survives across every step of a run
//! and is cleared only by [`DeploymentStrategy::reset`].

use super::{exceeds, random_free_position, DeploymentStrategy, PlacementContext};
use crate::config::ReinforcementParams;
use crate::core_types::{SensorPlacement, SensorPosition, SimRng};
use crate::error::PlacementError;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Running value estimate for one position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueEstimate {
    /// Current estimate
    pub value: f64,
    /// Number of observations folded in
    pub visits: u64,
}

/// Position → running value estimate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueTable {
    entries: FxHashMap<SensorPosition, ValueEstimate>,
}

impl ValueTable {
    /// Estimate for `pos`; unseen positions read as 0
    pub fn value(&self, pos: SensorPosition) -> f64 {
        self.entries.get(&pos).map_or(0.0, |e| e.value)
    }

    /// Full entry for `pos`, if observed
    pub fn estimate(&self, pos: SensorPosition) -> Option<ValueEstimate> {
        self.entries.get(&pos).copied()
    }

    /// Fold one observation in: `v ← v + rate · (observed − v)`
    pub fn observe(&mut self, pos: SensorPosition, observed: f64, rate: f64) {
        let entry = self.entries.entry(pos).or_default();
        entry.value += rate * (observed - entry.value);
        entry.visits += 1;
    }

    /// Number of positions with an estimate
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been observed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Epsilon-greedy learning strategy
#[derive(Debug, Clone)]
pub struct ReinforcementStrategy {
    params: ReinforcementParams,
    revisit_penalty: f64,
    table: ValueTable,
    rng: SimRng,
}

impl ReinforcementStrategy {
    /// Create a strategy with an empty value table
    pub fn new(params: ReinforcementParams, revisit_penalty: f64, rng: SimRng) -> Self {
        Self {
            params,
            revisit_penalty,
            table: ValueTable::default(),
            rng,
        }
    }

    /// Learned value table
    pub fn value_table(&self) -> &ValueTable {
        &self.table
    }

    /// Fold the context's signal into every position's estimate
    fn learn(&mut self, ctx: &PlacementContext<'_>) {
        let shape = ctx.shape();
        let signal = ctx.signal_grid();
        for (idx, observed) in signal.into_iter().enumerate() {
            self.table
                .observe(shape.position_of(idx), observed, self.params.learning_rate);
        }
    }

    /// Highest-value free position, ties to the lowest `(row, col)`
    fn exploit(
        &self,
        ctx: &PlacementContext<'_>,
        taken: &FxHashSet<SensorPosition>,
    ) -> Option<SensorPosition> {
        let mut best: Option<(SensorPosition, f64)> = None;
        for pos in ctx.shape().positions() {
            if taken.contains(&pos) {
                continue;
            }
            let mut value = self.table.value(pos);
            if ctx.previous.is_some_and(|prev| prev.contains(pos)) {
                value *= self.revisit_penalty;
            }
            if best.is_none_or(|(_, v)| exceeds(value, v)) {
                best = Some((pos, value));
            }
        }
        best.map(|(pos, _)| pos)
    }

    /// Uniform random free position
    fn explore(
        &mut self,
        ctx: &PlacementContext<'_>,
        taken: &FxHashSet<SensorPosition>,
    ) -> Option<SensorPosition> {
        random_free_position(&mut self.rng, ctx.shape(), taken)
    }
}

impl DeploymentStrategy for ReinforcementStrategy {
    fn name(&self) -> &'static str {
        "reinforcement_learning"
    }

    fn place_sensors(
        &mut self,
        ctx: &PlacementContext<'_>,
    ) -> Result<SensorPlacement, PlacementError> {
        ctx.ensure_capacity()?;
        self.learn(ctx);

        let epsilon = self.params.epsilon.clamp(0.0, 1.0);
        let mut taken = FxHashSet::default();
        let mut selected = Vec::with_capacity(ctx.num_sensors);
        let mut explored = 0usize;

        while selected.len() < ctx.num_sensors {
            let pick = if self.rng.random_bool(epsilon) {
                explored += 1;
                self.explore(ctx, &taken)
            } else {
                self.exploit(ctx, &taken)
            };
            let Some(pos) = pick else { break };
            taken.insert(pos);
            selected.push(pos);
        }

        debug!(
            step = ctx.step,
            explored,
            exploited = selected.len() - explored,
            "epsilon-greedy selection"
        );
        Ok(SensorPlacement::new(selected, ctx.sensor_radius))
    }

    fn replans_each_step(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.table.clear();
    }
}
