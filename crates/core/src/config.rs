//! Run configuration
//!
//! The configuration record is produced by an external loader (the headless
//! demo reads it from TOML). Optional fields fall back to the defaults below;
//! [`SimulationConfig::validate`] rejects anything out of range before a run
//! starts.

use crate::burn_probability::{BurnPrior, EvidenceRule};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which deployment strategy drives the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    /// Marginal-gain greedy selection
    Greedy,
    /// Evolutionary search over placements
    Genetic,
    /// Epsilon-greedy value estimation
    ReinforcementLearning,
    /// Integer linear programming (reserved, not implemented)
    Ilp,
}

impl Algorithm {
    /// Every algorithm that can actually run
    pub const SUPPORTED: [Algorithm; 3] = [
        Algorithm::Greedy,
        Algorithm::Genetic,
        Algorithm::ReinforcementLearning,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Greedy => "greedy",
            Algorithm::Genetic => "genetic",
            Algorithm::ReinforcementLearning => "reinforcementlearning",
            Algorithm::Ilp => "ilp",
        }
    }

    /// False for reserved variants
    pub fn is_supported(&self) -> bool {
        !matches!(self, Algorithm::Ilp)
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "greedy" => Ok(Algorithm::Greedy),
            "genetic" => Ok(Algorithm::Genetic),
            "reinforcementlearning" | "reinforcement_learning" | "rl" => {
                Ok(Algorithm::ReinforcementLearning)
            }
            "ilp" => Ok(Algorithm::Ilp),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weights of the combined signal `alpha * burn_probability + beta * intensity`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    /// Weight on burn probability
    pub alpha: f64,
    /// Weight on fire intensity
    pub beta: f64,
}

impl SignalWeights {
    /// Create weights
    pub const fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Weighted signal for one cell
    #[inline]
    pub fn signal(&self, burn_probability: f64, intensity: f64) -> f64 {
        self.alpha * burn_probability + self.beta * intensity
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

/// Genetic search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticParams {
    /// Candidates per generation
    pub population_size: usize,
    /// Generations evolved per placement call
    pub num_generations: usize,
    /// Probability that an offspring has one position replaced
    pub mutation_rate: f64,
    /// Candidates drawn per tournament
    pub tournament_size: usize,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: 50,
            num_generations: 100,
            mutation_rate: 0.1,
            tournament_size: 3,
        }
    }
}

/// Epsilon-greedy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementParams {
    /// Exploration probability per sensor slot
    pub epsilon: f64,
    /// Step size of the value-table moving average
    pub learning_rate: f64,
}

impl Default for ReinforcementParams {
    fn default() -> Self {
        Self {
            epsilon: 0.2,
            learning_rate: 0.1,
        }
    }
}

/// Burn-probability map parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnProbabilityConfig {
    /// Per-step multiplicative decay for cells without fresh evidence, in (0, 1)
    pub decay_factor: f64,
    /// How burning cells raise their probability
    pub evidence: EvidenceRule,
    /// Initial map when no seed grid is supplied
    pub prior: BurnPrior,
    /// Raise cells around sensors that detected fire
    pub propagate_sensor_evidence: bool,
}

impl Default for BurnProbabilityConfig {
    fn default() -> Self {
        Self {
            decay_factor: 0.9,
            evidence: EvidenceRule::Reset,
            prior: BurnPrior::default(),
            propagate_sensor_evidence: false,
        }
    }
}

/// Validated configuration for one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of time steps to simulate
    pub num_time_steps: usize,
    /// Minimum weighted signal for a covered burning cell to count as detected
    pub detection_threshold: f64,
    /// Active strategy
    pub algorithm: Algorithm,
    /// Sensors to place
    pub num_sensors: usize,
    /// Detection radius in cells
    pub sensor_radius: f64,
    /// Burn-probability weight
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Intensity weight
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// RNG seed; `None` draws one and logs it
    #[serde(default)]
    pub seed: Option<u64>,
    /// Override whether the strategy recomputes every step
    #[serde(default)]
    pub replan_every_step: Option<bool>,
    /// Multiplier on the score of positions used in the previous step (1.0 = none)
    #[serde(default = "default_revisit_penalty")]
    pub revisit_penalty: f64,
    /// Genetic search parameters
    #[serde(default)]
    pub genetic: GeneticParams,
    /// Epsilon-greedy parameters
    #[serde(default)]
    pub reinforcement: ReinforcementParams,
    /// Burn-probability map parameters
    #[serde(default)]
    pub burn_probability: BurnProbabilityConfig,
}

fn default_alpha() -> f64 {
    SignalWeights::default().alpha
}

fn default_beta() -> f64 {
    SignalWeights::default().beta
}

fn default_revisit_penalty() -> f64 {
    1.0
}

impl SimulationConfig {
    /// Configuration with the required fields set and defaults elsewhere
    pub fn new(
        algorithm: Algorithm,
        num_time_steps: usize,
        num_sensors: usize,
        sensor_radius: f64,
        detection_threshold: f64,
    ) -> Self {
        Self {
            num_time_steps,
            detection_threshold,
            algorithm,
            num_sensors,
            sensor_radius,
            alpha: default_alpha(),
            beta: default_beta(),
            seed: None,
            replan_every_step: None,
            revisit_penalty: default_revisit_penalty(),
            genetic: GeneticParams::default(),
            reinforcement: ReinforcementParams::default(),
            burn_probability: BurnProbabilityConfig::default(),
        }
    }

    /// Signal weights used by strategies and detection
    pub fn weights(&self) -> SignalWeights {
        SignalWeights::new(self.alpha, self.beta)
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.algorithm.is_supported() {
            return Err(ConfigError::UnsupportedAlgorithm(self.algorithm.as_str()));
        }
        if self.num_time_steps == 0 {
            return Err(ConfigError::out_of_range("num_time_steps", 0.0, "> 0"));
        }
        if self.num_sensors == 0 {
            return Err(ConfigError::out_of_range("num_sensors", 0.0, "> 0"));
        }
        check_unit("detection_threshold", self.detection_threshold)?;
        if !(self.sensor_radius.is_finite() && self.sensor_radius > 0.0) {
            return Err(ConfigError::out_of_range(
                "sensor_radius",
                self.sensor_radius,
                "finite and > 0",
            ));
        }
        check_weight("alpha", self.alpha)?;
        check_weight("beta", self.beta)?;
        check_unit("revisit_penalty", self.revisit_penalty)?;

        let bp = &self.burn_probability;
        if !(bp.decay_factor > 0.0 && bp.decay_factor < 1.0) {
            return Err(ConfigError::out_of_range(
                "burn_probability.decay_factor",
                bp.decay_factor,
                "in (0, 1)",
            ));
        }
        if let EvidenceRule::Blend { weight } = bp.evidence {
            if !(weight > 0.0 && weight <= 1.0) {
                return Err(ConfigError::out_of_range(
                    "burn_probability.evidence.weight",
                    weight,
                    "in (0, 1]",
                ));
            }
        }
        if let BurnPrior::Uniform { value } = bp.prior {
            check_unit("burn_probability.prior.value", value)?;
        }

        match self.algorithm {
            Algorithm::Genetic => self.validate_genetic(),
            Algorithm::ReinforcementLearning => self.validate_reinforcement(),
            Algorithm::Greedy | Algorithm::Ilp => Ok(()),
        }
    }

    fn validate_genetic(&self) -> Result<(), ConfigError> {
        let g = &self.genetic;
        if g.population_size < 2 {
            return Err(ConfigError::out_of_range(
                "genetic.population_size",
                g.population_size as f64,
                ">= 2",
            ));
        }
        if g.num_generations == 0 {
            return Err(ConfigError::out_of_range(
                "genetic.num_generations",
                0.0,
                "> 0",
            ));
        }
        if g.tournament_size == 0 {
            return Err(ConfigError::out_of_range(
                "genetic.tournament_size",
                0.0,
                "> 0",
            ));
        }
        check_unit("genetic.mutation_rate", g.mutation_rate)
    }

    fn validate_reinforcement(&self) -> Result<(), ConfigError> {
        let r = &self.reinforcement;
        check_unit("reinforcement.epsilon", r.epsilon)?;
        if !(r.learning_rate > 0.0 && r.learning_rate <= 1.0) {
            return Err(ConfigError::out_of_range(
                "reinforcement.learning_rate",
                r.learning_rate,
                "in (0, 1]",
            ));
        }
        Ok(())
    }
}

fn check_unit(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(parameter, value, "in [0, 1]"))
    }
}

fn check_weight(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(parameter, value, "finite and >= 0"))
    }
}
