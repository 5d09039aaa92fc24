//! Fire Sensor Deployment Core Library
//!
//! Evaluates strategies for placing a fixed number of fire-detection sensors
//! on a grid while a recorded or generated fire spreads across it.
//!
//! ## Simulation
//!
//! Each time step the engine:
//! - pulls the fire state (per-cell status and intensity) from a data source
//! - decays the burn-probability map and raises it where fire is burning
//! - asks the active deployment strategy for sensor positions
//! - evaluates which burning cells the sensors detect
//! - records coverage and detection latency
//!
//! ## Deployment strategies
//!
//! - Greedy marginal-gain selection (deterministic)
//! - Genetic search with tournament selection and elitism
//! - Epsilon-greedy value estimation that learns across the run
//!
//! Randomized strategies draw from a seedable [`SimRng`], so seeded runs
//! reproduce exactly.

// Core types and utilities
pub mod core_types;
pub mod error;

// Configuration record
pub mod config;

// Per-step models
pub mod burn_probability;
pub mod detection;

// Placement strategies
pub mod deployment;

// Run orchestration and scoring
pub mod metrics;
pub mod simulation;

// Re-export core types
pub use core_types::{FireState, FireStatus, Grid, GridShape, SensorPlacement, SensorPosition, SimRng};
pub use error::{ConfigError, DataShapeError, PlacementError, SimulationError};

// Re-export configuration
pub use config::{
    Algorithm, BurnProbabilityConfig, GeneticParams, ReinforcementParams, SignalWeights,
    SimulationConfig,
};

// Re-export models and strategies
pub use burn_probability::{BurnPrior, BurnProbabilityMap, EvidenceRule};
pub use deployment::{
    DeploymentStrategy, GeneticStrategy, GreedyStrategy, PlacementContext, ReinforcementStrategy,
    Strategy,
};
pub use detection::{evaluate_detection, DetectionEvent, StepDetection};

// Re-export orchestration
pub use metrics::{DetectionLatency, MetricsCalculator, RunMetrics, StrategyComparison};
pub use simulation::{
    CollectingObserver, EnginePhase, FireSequence, FireSource, NullObserver, SimulationEngine,
    StepObserver, StepReport,
};
