//! Time-stepped sensor deployment simulation
//!
//! `SimulationEngine` owns the burn-probability map, the active strategy and
//! the metrics calculator, and moves through `INIT → STEPPING → DONE`:
//!
//! - **INIT** ([`SimulationEngine::new`]): validate the configuration, check
//!   the data source and optional seed grid against one grid shape, build the
//!   initial map and select the strategy.
//! - **STEPPING** ([`SimulationEngine::step`]): pull the fire state, update
//!   the map, (re)place sensors, evaluate detection, record metrics.
//! - **DONE**: metrics are final and further calls to `step` return `None`.
//!
//! Any error while stepping is fatal: the engine moves to
//! [`EnginePhase::Failed`] and refuses to continue.

pub mod report;
pub mod source;

pub use report::{CollectingObserver, NullObserver, StepObserver, StepReport};
pub use source::{FireSequence, FireSource};

use crate::burn_probability::BurnProbabilityMap;
use crate::config::SimulationConfig;
use crate::core_types::{FireState, Grid, GridShape, SensorPlacement, SimRng};
use crate::deployment::{DeploymentStrategy, PlacementContext, Strategy};
use crate::detection::evaluate_detection;
use crate::error::{ConfigError, SimulationError};
use crate::metrics::{MetricsCalculator, RunMetrics};
use tracing::{debug, info, warn};

/// RNG stream for the random burn-probability prior
const PRIOR_STREAM: u64 = 1;
/// RNG stream for the deployment strategy
const STRATEGY_STREAM: u64 = 2;

/// Lifecycle state of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// Constructed, no step taken yet
    Init,
    /// At least one step taken; `next_step` is the next zero-based index
    Stepping {
        /// Step the next call to `step` will process
        next_step: usize,
    },
    /// All configured steps processed; metrics are final
    Done,
    /// A step failed; the run cannot continue
    Failed {
        /// Step that failed
        step: usize,
    },
}

/// Drives one deployment run over a fire data source
pub struct SimulationEngine {
    config: SimulationConfig,
    source: Box<dyn FireSource>,
    shape: GridShape,
    burn_map: BurnProbabilityMap,
    strategy: Strategy,
    replan_every_step: bool,
    placement: Option<SensorPlacement>,
    previous_fire: Option<FireState>,
    calculator: MetricsCalculator,
    metrics: Option<RunMetrics>,
    phase: EnginePhase,
    seed: u64,
}

impl SimulationEngine {
    /// Run INIT: validate inputs and build the initial state
    ///
    /// # Arguments
    ///
    /// * `config` - Run configuration, validated here
    /// * `source` - Fire state per step; must hold at least `num_time_steps` steps
    /// * `seed_grid` - Optional initial burn probabilities, same shape as the source
    pub fn new(
        config: SimulationConfig,
        source: Box<dyn FireSource>,
        seed_grid: Option<Grid<f64>>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;

        let shape = source.shape();
        if source.len() < config.num_time_steps {
            return Err(ConfigError::InsufficientData {
                requested: config.num_time_steps,
                available: source.len(),
            }
            .into());
        }

        let rng = SimRng::seeded_or_entropy(config.seed);
        let seed = rng.seed();
        if config.seed.is_none() {
            warn!(seed, "No seed configured; set this seed to replay the run");
        }

        let bp = &config.burn_probability;
        let burn_map = match seed_grid {
            Some(grid) => {
                shape.ensure_matches(grid.shape(), "burn probability seed", None)?;
                BurnProbabilityMap::from_seed(grid, bp.decay_factor, bp.evidence)
            }
            None => BurnProbabilityMap::from_prior(
                shape,
                bp.prior,
                bp.decay_factor,
                bp.evidence,
                &mut rng.fork(PRIOR_STREAM),
            ),
        };

        let strategy = Strategy::from_config(&config, rng.fork(STRATEGY_STREAM))?;
        let replan_every_step = config
            .replan_every_step
            .unwrap_or_else(|| strategy.replans_each_step());

        info!(
            "Simulation initialized: {} grid, {} steps, strategy={}, sensors={}, radius={:.2}, seed={}",
            shape,
            config.num_time_steps,
            strategy.name(),
            config.num_sensors,
            config.sensor_radius,
            seed
        );

        Ok(Self {
            config,
            source,
            shape,
            burn_map,
            strategy,
            replan_every_step,
            placement: None,
            previous_fire: None,
            calculator: MetricsCalculator::new(),
            metrics: None,
            phase: EnginePhase::Init,
            seed,
        })
    }

    /// Replace the configured strategy before the first step
    ///
    /// The strategy is reset so no learned state leaks in from an earlier run.
    /// The replan policy follows the new strategy unless the configuration
    /// overrides it.
    pub fn with_strategy(mut self, mut strategy: Strategy) -> Self {
        strategy.reset();
        self.replan_every_step = self
            .config
            .replan_every_step
            .unwrap_or_else(|| strategy.replans_each_step());
        info!("Strategy replaced with {}", strategy.name());
        self.strategy = strategy;
        self
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Configuration of this run
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Grid shape shared by every input
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Seed the run's randomness was derived from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current burn-probability map
    pub fn burn_map(&self) -> &BurnProbabilityMap {
        &self.burn_map
    }

    /// Active strategy
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Placement in force, once one has been made
    pub fn placement(&self) -> Option<&SensorPlacement> {
        self.placement.as_ref()
    }

    /// Final metrics, available once the run is DONE
    pub fn metrics(&self) -> Option<&RunMetrics> {
        self.metrics.as_ref()
    }

    /// Process the next time step
    ///
    /// Returns `Ok(None)` once the run is DONE.
    pub fn step(&mut self) -> Result<Option<StepReport>, SimulationError> {
        let step = match self.phase {
            EnginePhase::Init => 0,
            EnginePhase::Stepping { next_step } => next_step,
            EnginePhase::Done => return Ok(None),
            EnginePhase::Failed { step } => return Err(SimulationError::Aborted(step)),
        };

        match self.advance(step) {
            Ok(report) => {
                let next_step = step + 1;
                if next_step >= self.config.num_time_steps {
                    self.finish();
                } else {
                    self.phase = EnginePhase::Stepping { next_step };
                }
                Ok(Some(report))
            }
            Err(err) => {
                warn!(step, %err, "Simulation step failed");
                self.phase = EnginePhase::Failed { step };
                Err(err)
            }
        }
    }

    /// Drive the run to DONE, feeding every report to `observer`
    pub fn run(&mut self, observer: &mut dyn StepObserver) -> Result<RunMetrics, SimulationError> {
        while let Some(report) = self.step()? {
            observer.on_step(&report);
        }
        let metrics = match (&self.metrics, self.phase) {
            (Some(metrics), _) => metrics.clone(),
            (None, EnginePhase::Failed { step }) => return Err(SimulationError::Aborted(step)),
            (None, _) => return Err(SimulationError::Aborted(self.config.num_time_steps)),
        };
        observer.on_complete(&metrics);
        Ok(metrics)
    }

    fn advance(&mut self, step: usize) -> Result<StepReport, SimulationError> {
        // 1. Fire state for this step
        let fire = self
            .source
            .fire_state(step)
            .ok_or(SimulationError::MissingFireState(step))?;
        self.shape
            .ensure_matches(fire.shape(), "fire state", Some(step))?;

        let ignitions = fire.ignitions_since(self.previous_fire.as_ref());
        self.calculator.record_ignitions(step, &ignitions);

        // 2. Burn probability
        let evidenced = self.burn_map.update(&fire)?;

        // 3. Placement; a held placement short of sensors is retried
        let underfilled = self
            .placement
            .as_ref()
            .is_none_or(|p| p.len() < self.config.num_sensors);
        let replanned = underfilled || self.replan_every_step;
        if replanned {
            let ctx = PlacementContext {
                burn_map: &self.burn_map,
                fire: &fire,
                step,
                num_sensors: self.config.num_sensors,
                sensor_radius: self.config.sensor_radius,
                weights: self.config.weights(),
                previous: self.placement.as_ref(),
            };
            let placement = self
                .strategy
                .place_sensors(&ctx)
                .map_err(|source| SimulationError::Placement { step, source })?;
            self.placement = Some(placement);
        }
        let placement = self
            .placement
            .clone()
            .unwrap_or_else(|| SensorPlacement::empty(self.config.sensor_radius));

        // 4. Detection
        let detection = evaluate_detection(
            step,
            &fire,
            &self.burn_map,
            &placement,
            self.config.weights(),
            self.config.detection_threshold,
        )?;

        if self.config.burn_probability.propagate_sensor_evidence {
            for sensor in detection.reporting_sensors() {
                self.burn_map
                    .raise_around(sensor, self.config.sensor_radius);
            }
        }

        // 5. Metrics
        let coverage = detection.coverage_fraction();
        self.calculator
            .record_step(step, coverage, &detection.events);

        debug!(
            "Step {}: burning={}, new={}, evidenced={}, detected={}, coverage={:.3}, replanned={}",
            step,
            detection.burning_cells,
            ignitions.len(),
            evidenced,
            detection.detected_cells,
            coverage,
            replanned
        );

        self.previous_fire = Some(fire);

        Ok(StepReport {
            step,
            placement,
            replanned,
            coverage,
            burning_cells: detection.burning_cells,
            detected_cells: detection.detected_cells,
            new_ignitions: ignitions.len(),
            events: detection.events,
            burn_probability: self.burn_map.snapshot(),
        })
    }

    fn finish(&mut self) {
        let metrics = std::mem::take(&mut self.calculator).finalize();
        info!(
            "Simulation complete: strategy={}, average coverage={:.3}, final coverage={:.3}, undetected sources={}",
            self.strategy.name(),
            metrics.average_coverage,
            metrics.final_coverage,
            metrics.undetected_sources
        );
        self.metrics = Some(metrics);
        self.phase = EnginePhase::Done;
    }
}
