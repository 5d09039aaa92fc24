//! Sensor deployment strategies
//!
//! Every strategy implements [`DeploymentStrategy`]: given a read-only view of
//! the current burn-probability map and fire state it returns a
//! [`SensorPlacement`], or a [`PlacementError`] when the request cannot be met.
//! The engine holds the active strategy as a [`Strategy`] value and dispatches
//! by match, so the set of variants is closed and chosen by configuration.

pub mod genetic;
pub mod greedy;
pub mod reinforcement;

pub use genetic::{Candidate, EvolutionOutcome, GeneticStrategy};
pub use greedy::GreedyStrategy;
pub use reinforcement::{ReinforcementStrategy, ValueTable};

use crate::burn_probability::BurnProbabilityMap;
use crate::config::{Algorithm, SignalWeights, SimulationConfig};
use crate::core_types::{FireState, GridShape, SensorPlacement, SensorPosition, SimRng};
use crate::error::{ConfigError, PlacementError};
use rand::Rng;
use rustc_hash::FxHashSet;

/// Relative slack below which two scores count as tied
const TIE_TOLERANCE: f64 = 1e-9;

/// `candidate` beats `incumbent` by more than floating-point noise
///
/// Row-major scans keep the earlier position unless a later one clears this,
/// so sums that differ only in summation order still tie to the lowest cell.
pub(crate) fn exceeds(candidate: f64, incumbent: f64) -> bool {
    candidate > incumbent + TIE_TOLERANCE * incumbent.abs().max(1.0)
}

/// Uniform draw from the positions not in `taken`, `None` when the grid is full
///
/// One draw picks an index into the free cells, so the cost stays linear in
/// the grid size however crowded it is.
pub(crate) fn random_free_position(
    rng: &mut SimRng,
    shape: GridShape,
    taken: &FxHashSet<SensorPosition>,
) -> Option<SensorPosition> {
    let free = shape.positions().filter(|p| !taken.contains(p)).count();
    if free == 0 {
        return None;
    }
    let k = rng.random_range(0..free);
    shape.positions().filter(|p| !taken.contains(p)).nth(k)
}

/// Everything a strategy may read when placing sensors
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    /// Burn probability after this step's update
    pub burn_map: &'a BurnProbabilityMap,
    /// Fire state for this step
    pub fire: &'a FireState,
    /// Zero-based step index
    pub step: usize,
    /// Sensors to place
    pub num_sensors: usize,
    /// Detection radius in cells
    pub sensor_radius: f64,
    /// Weights of the combined cell signal
    pub weights: SignalWeights,
    /// Placement in force during the previous step, if any
    pub previous: Option<&'a SensorPlacement>,
}

impl PlacementContext<'_> {
    /// Grid dimensions of the run
    pub fn shape(&self) -> GridShape {
        self.burn_map.shape()
    }

    /// Combined signal for every cell, row-major
    pub fn signal_grid(&self) -> Vec<f64> {
        self.burn_map
            .grid()
            .as_slice()
            .iter()
            .zip(self.fire.intensity().as_slice())
            .map(|(&bp, &intensity)| self.weights.signal(bp, intensity))
            .collect()
    }

    /// Fail when the grid has fewer distinct positions than requested sensors
    pub fn ensure_capacity(&self) -> Result<(), PlacementError> {
        let available = self.shape().cell_count();
        if self.num_sensors > available {
            Err(PlacementError {
                requested: self.num_sensors,
                available,
            })
        } else {
            Ok(())
        }
    }
}

/// Capability shared by all placement strategies
pub trait DeploymentStrategy {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Choose sensor positions for the current step
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError`] when `num_sensors` exceeds the number of
    /// distinct grid positions. Partial placements are never returned for
    /// that case.
    fn place_sensors(&mut self, ctx: &PlacementContext<'_>)
        -> Result<SensorPlacement, PlacementError>;

    /// Whether the engine should call `place_sensors` every step by default
    fn replans_each_step(&self) -> bool {
        false
    }

    /// Drop any learned state before a new run
    fn reset(&mut self) {}
}

/// Closed set of strategies selected by [`Algorithm`]
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Marginal-gain greedy selection
    Greedy(GreedyStrategy),
    /// Evolutionary search
    Genetic(GeneticStrategy),
    /// Epsilon-greedy value estimation
    ReinforcementLearning(ReinforcementStrategy),
}

impl Strategy {
    /// Build the strategy named by the configuration
    ///
    /// Randomized strategies take `rng`; greedy ignores it.
    pub fn from_config(config: &SimulationConfig, rng: SimRng) -> Result<Self, ConfigError> {
        let strategy = match config.algorithm {
            Algorithm::Greedy => Strategy::Greedy(GreedyStrategy::new(config.revisit_penalty)),
            Algorithm::Genetic => {
                Strategy::Genetic(GeneticStrategy::new(config.genetic.clone(), rng))
            }
            Algorithm::ReinforcementLearning => {
                Strategy::ReinforcementLearning(ReinforcementStrategy::new(
                    config.reinforcement.clone(),
                    config.revisit_penalty,
                    rng,
                ))
            }
            Algorithm::Ilp => {
                return Err(ConfigError::UnsupportedAlgorithm(Algorithm::Ilp.as_str()));
            }
        };
        Ok(strategy)
    }

    /// Algorithm this strategy implements
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Strategy::Greedy(_) => Algorithm::Greedy,
            Strategy::Genetic(_) => Algorithm::Genetic,
            Strategy::ReinforcementLearning(_) => Algorithm::ReinforcementLearning,
        }
    }
}

impl DeploymentStrategy for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Greedy(s) => s.name(),
            Strategy::Genetic(s) => s.name(),
            Strategy::ReinforcementLearning(s) => s.name(),
        }
    }

    fn place_sensors(
        &mut self,
        ctx: &PlacementContext<'_>,
    ) -> Result<SensorPlacement, PlacementError> {
        match self {
            Strategy::Greedy(s) => s.place_sensors(ctx),
            Strategy::Genetic(s) => s.place_sensors(ctx),
            Strategy::ReinforcementLearning(s) => s.place_sensors(ctx),
        }
    }

    fn replans_each_step(&self) -> bool {
        match self {
            Strategy::Greedy(s) => s.replans_each_step(),
            Strategy::Genetic(s) => s.replans_each_step(),
            Strategy::ReinforcementLearning(s) => s.replans_each_step(),
        }
    }

    fn reset(&mut self) {
        match self {
            Strategy::Greedy(s) => s.reset(),
            Strategy::Genetic(s) => s.reset(),
            Strategy::ReinforcementLearning(s) => s.reset(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::SensorPosition;

    #[test]
    fn test_from_config_dispatch() {
        let mut config = SimulationConfig::new(Algorithm::Genetic, 1, 1, 1.0, 0.4);
        let strategy = Strategy::from_config(&config, SimRng::from_seed_u64(1)).unwrap();
        assert_eq!(strategy.algorithm(), Algorithm::Genetic);
        assert_eq!(strategy.name(), "genetic");

        config.algorithm = Algorithm::Ilp;
        assert!(Strategy::from_config(&config, SimRng::from_seed_u64(1)).is_err());
    }

    #[test]
    fn test_replan_defaults() {
        let mut config = SimulationConfig::new(Algorithm::Greedy, 1, 1, 1.0, 0.4);
        for (algorithm, replans) in [
            (Algorithm::Greedy, false),
            (Algorithm::Genetic, false),
            (Algorithm::ReinforcementLearning, true),
        ] {
            config.algorithm = algorithm;
            let s = Strategy::from_config(&config, SimRng::from_seed_u64(1)).unwrap();
            assert_eq!(s.replans_each_step(), replans, "{algorithm}");
        }
    }

    #[test]
    fn test_every_strategy_rejects_oversized_request() {
        let (map, fire) = test_support::hotspot_scene();
        let ctx = PlacementContext {
            burn_map: &map,
            fire: &fire,
            step: 0,
            num_sensors: 26,
            sensor_radius: 1.0,
            weights: SignalWeights::default(),
            previous: None,
        };
        for algorithm in Algorithm::SUPPORTED {
            let config = SimulationConfig::new(algorithm, 1, 26, 1.0, 0.4);
            let mut s = Strategy::from_config(&config, SimRng::from_seed_u64(9)).unwrap();
            let err = s.place_sensors(&ctx).unwrap_err();
            assert_eq!(
                err,
                PlacementError {
                    requested: 26,
                    available: 25
                },
                "{algorithm}"
            );
        }
    }

    #[test]
    fn test_random_free_position_draws_from_complement() {
        let shape = GridShape::new(3, 3);
        let mut rng = SimRng::from_seed_u64(4);
        let mut taken: FxHashSet<SensorPosition> = shape.positions().collect();
        assert_eq!(random_free_position(&mut rng, shape, &taken), None);

        taken.remove(&SensorPosition::new(2, 1));
        for _ in 0..10 {
            assert_eq!(
                random_free_position(&mut rng, shape, &taken),
                Some(SensorPosition::new(2, 1))
            );
        }

        taken.remove(&SensorPosition::new(0, 0));
        let drawn: FxHashSet<_> = (0..50)
            .filter_map(|_| random_free_position(&mut rng, shape, &taken))
            .collect();
        assert_eq!(drawn.len(), 2);
    }

    #[test]
    fn test_randomized_strategies_fill_crowded_grid() {
        let shape = GridShape::new(30, 30);
        let map = BurnProbabilityMap::uniform(shape, 0.5, 0.9, crate::EvidenceRule::Reset);
        let fire = FireState::quiet(shape);
        let ctx = PlacementContext {
            burn_map: &map,
            fire: &fire,
            step: 0,
            num_sensors: shape.cell_count() - 1,
            sensor_radius: 0.5,
            weights: SignalWeights::default(),
            previous: None,
        };
        let mut config = SimulationConfig::new(Algorithm::ReinforcementLearning, 1, 1, 0.5, 0.4);
        config.reinforcement.epsilon = 1.0;
        config.genetic.population_size = 4;
        config.genetic.num_generations = 2;
        config.genetic.mutation_rate = 1.0;
        for algorithm in [Algorithm::ReinforcementLearning, Algorithm::Genetic] {
            config.algorithm = algorithm;
            let mut s = Strategy::from_config(&config, SimRng::from_seed_u64(3)).unwrap();
            let placement = s.place_sensors(&ctx).unwrap();
            assert_eq!(placement.len(), shape.cell_count() - 1, "{algorithm}");
        }
    }

    #[test]
    fn test_signal_grid_weights() {
        let (map, fire) = test_support::hotspot_scene();
        let ctx = PlacementContext {
            burn_map: &map,
            fire: &fire,
            step: 0,
            num_sensors: 1,
            sensor_radius: 1.0,
            weights: SignalWeights::new(0.5, 0.5),
            previous: None,
        };
        let signal = ctx.signal_grid();
        let hot = map.shape().index_of(SensorPosition::new(2, 2));
        assert!((signal[hot] - 1.0).abs() < 1e-12);
        assert!((signal[0] - 0.225).abs() < 1e-12);
    }
}
