mod loader;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use fire_sensor_core::{
    Algorithm, FireSequence, FireSource, RunMetrics, SimulationEngine, StrategyComparison,
};
use loader::ExperimentConfig;
use output::RunRecorder;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Sensor deployment experiment runner
#[derive(Parser, Debug)]
#[command(name = "fire-sensor-demo")]
#[command(about = "Evaluate wildfire sensor deployment strategies on recorded fire grids", long_about = None)]
struct Args {
    /// Experiment configuration file (TOML)
    #[arg(short, long, default_value = "configs/default_config.toml")]
    config: PathBuf,

    /// Override the experiment name from the config file
    #[arg(short, long)]
    experiment_name: Option<String>,

    /// Override the deployment algorithm (greedy, genetic, reinforcementlearning)
    #[arg(short, long)]
    algorithm: Option<Algorithm>,

    /// Override the RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run every supported algorithm on the same data and compare them
    #[arg(long)]
    compare: bool,

    /// Skip per-step JSON and burn-probability CSV records
    #[arg(long)]
    no_step_records: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    println!("=== Fire Sensor Deployment ===\n");

    let mut experiment = ExperimentConfig::load(&args.config)?;
    if let Some(name) = args.experiment_name {
        experiment.experiment_name = name;
    }
    if let Some(algorithm) = args.algorithm {
        experiment.simulation.algorithm = algorithm;
    }
    if args.seed.is_some() {
        experiment.simulation.seed = args.seed;
    }
    if args.no_step_records {
        experiment.output.write_step_records = false;
    }
    experiment
        .simulation
        .validate()
        .context("invalid simulation configuration")?;

    let sequence = loader::load_fire_sequence(
        &experiment.data,
        experiment.simulation.num_time_steps,
        experiment.ignition_threshold(),
    )?;
    let seed_grid = loader::load_burn_seed(&experiment.data, sequence.shape())?;

    println!(
        "Experiment '{}': {} grid, {} steps, {} sensors, radius {:.1}",
        experiment.experiment_name,
        sequence.shape(),
        experiment.simulation.num_time_steps,
        experiment.simulation.num_sensors,
        experiment.simulation.sensor_radius
    );

    let algorithms: Vec<Algorithm> = if args.compare {
        Algorithm::SUPPORTED.to_vec()
    } else {
        vec![experiment.simulation.algorithm]
    };

    let mut comparison = StrategyComparison::new();
    for algorithm in algorithms {
        let metrics = run_one(&experiment, algorithm, &sequence, seed_grid.clone())?;
        println!("\n--- {algorithm} ---\n{metrics}");
        comparison.add(algorithm.as_str(), metrics);
    }

    if args.compare {
        println!("\n=== Comparison ===\n{comparison}");
        let path = output::save_comparison(
            &experiment.experiment_dir(),
            &experiment.experiment_name,
            &comparison,
        )?;
        info!("Comparison written to {}", path.display());
    }

    Ok(())
}

/// Run one algorithm over the shared data and persist its records
fn run_one(
    experiment: &ExperimentConfig,
    algorithm: Algorithm,
    sequence: &FireSequence,
    seed_grid: Option<fire_sensor_core::Grid<f64>>,
) -> Result<RunMetrics> {
    let mut config = experiment.simulation.clone();
    config.algorithm = algorithm;

    let experiment_dir = experiment.experiment_dir();
    let mut recorder = RunRecorder::create(
        &experiment_dir,
        algorithm.as_str(),
        experiment.output.write_step_records,
    )?;

    let mut engine = SimulationEngine::new(config, Box::new(sequence.clone()), seed_grid)
        .with_context(|| format!("initializing {algorithm} run"))?;
    let seed = engine.seed();
    let metrics = engine
        .run(&mut recorder)
        .with_context(|| format!("running {algorithm}"))?;
    let written = recorder.finish()?;

    let path = output::save_metrics(
        &experiment_dir,
        &experiment.experiment_name,
        algorithm.as_str(),
        seed,
        &metrics,
    )?;
    info!(
        "{algorithm}: {written} step records, metrics written to {}",
        path.display()
    );
    Ok(metrics)
}
