//! Persistence of run records
//!
//! Layout under `<output>/<experiment>/`:
//! - `<algorithm>/timesteps/time_step_NN.json` per-step placement and coverage
//! - `<algorithm>/bp_maps/bp_map_NN.csv` per-step burn probability
//! - `<algorithm>_metrics.json` final metrics
//! - `comparison.json` when several strategies were run

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fire_sensor_core::core_types::Grid;
use fire_sensor_core::{RunMetrics, StepObserver, StepReport, StrategyComparison};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Per-step JSON record
#[derive(Debug, Serialize)]
struct TimeStepLog<'a> {
    time_step: usize,
    sensor_positions: Vec<[usize; 2]>,
    sensor_radius: f64,
    coverage: f64,
    burning_cells: usize,
    detected_cells: usize,
    new_ignitions: usize,
    replanned: bool,
    events: &'a [fire_sensor_core::DetectionEvent],
}

/// Metrics file with provenance
#[derive(Debug, Serialize)]
struct MetricsFile<'a> {
    experiment_name: &'a str,
    algorithm: &'a str,
    seed: u64,
    recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    metrics: &'a RunMetrics,
}

/// Comparison file
#[derive(Debug, Serialize)]
struct ComparisonFile<'a> {
    experiment_name: &'a str,
    recorded_at: DateTime<Utc>,
    ranking: Vec<&'a str>,
    comparison: &'a StrategyComparison,
}

/// Observer writing step records to disk
///
/// Write failures cannot be returned from the observer callback, so the
/// first one is kept and reported by [`RunRecorder::finish`].
pub struct RunRecorder {
    timestep_dir: PathBuf,
    bp_dir: PathBuf,
    enabled: bool,
    failure: Option<anyhow::Error>,
    written: usize,
}

impl RunRecorder {
    /// Recorder for one algorithm's run inside `experiment_dir`
    pub fn create(experiment_dir: &Path, algorithm: &str, enabled: bool) -> Result<Self> {
        let run_dir = experiment_dir.join(algorithm);
        let timestep_dir = run_dir.join("timesteps");
        let bp_dir = run_dir.join("bp_maps");
        if enabled {
            fs::create_dir_all(&timestep_dir)
                .with_context(|| format!("creating {}", timestep_dir.display()))?;
            fs::create_dir_all(&bp_dir)
                .with_context(|| format!("creating {}", bp_dir.display()))?;
        }
        Ok(Self {
            timestep_dir,
            bp_dir,
            enabled,
            failure: None,
            written: 0,
        })
    }

    fn write_step(&self, report: &StepReport) -> Result<()> {
        let log = TimeStepLog {
            time_step: report.step,
            sensor_positions: report
                .placement
                .positions()
                .iter()
                .map(|p| [p.row, p.col])
                .collect(),
            sensor_radius: report.placement.radius(),
            coverage: report.coverage,
            burning_cells: report.burning_cells,
            detected_cells: report.detected_cells,
            new_ignitions: report.new_ignitions,
            replanned: report.replanned,
            events: &report.events,
        };
        let path = self
            .timestep_dir
            .join(format!("time_step_{:02}.json", report.step));
        let json = serde_json::to_string_pretty(&log).context("serializing step record")?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;

        let path = self.bp_dir.join(format!("bp_map_{:02}.csv", report.step));
        write_grid_csv(&path, &report.burn_probability)?;
        Ok(())
    }

    /// Surface the first write failure, if any
    pub fn finish(self) -> Result<usize> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.written),
        }
    }
}

impl StepObserver for RunRecorder {
    fn on_step(&mut self, report: &StepReport) {
        if !self.enabled || self.failure.is_some() {
            return;
        }
        match self.write_step(report) {
            Ok(()) => {
                self.written += 1;
                debug!("Wrote records for step {}", report.step);
            }
            Err(err) => {
                error!("Failed to write step {} records: {err:#}", report.step);
                self.failure = Some(err);
            }
        }
    }
}

/// Write a grid as headerless comma-separated rows
pub fn write_grid_csv(path: &Path, grid: &Grid<f64>) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in grid.rows() {
        writer
            .write_record(row.iter().map(f64::to_string))
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

/// Write `<algorithm>_metrics.json` into the experiment directory
pub fn save_metrics(
    experiment_dir: &Path,
    experiment_name: &str,
    algorithm: &str,
    seed: u64,
    metrics: &RunMetrics,
) -> Result<PathBuf> {
    fs::create_dir_all(experiment_dir)
        .with_context(|| format!("creating {}", experiment_dir.display()))?;
    let file = MetricsFile {
        experiment_name,
        algorithm,
        seed,
        recorded_at: Utc::now(),
        metrics,
    };
    let path = experiment_dir.join(format!("{algorithm}_metrics.json"));
    let json = serde_json::to_string_pretty(&file).context("serializing metrics")?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Write `comparison.json` into the experiment directory
pub fn save_comparison(
    experiment_dir: &Path,
    experiment_name: &str,
    comparison: &StrategyComparison,
) -> Result<PathBuf> {
    fs::create_dir_all(experiment_dir)
        .with_context(|| format!("creating {}", experiment_dir.display()))?;
    let file = ComparisonFile {
        experiment_name,
        recorded_at: Utc::now(),
        ranking: comparison
            .ranked()
            .into_iter()
            .map(|e| e.name.as_str())
            .collect(),
        comparison,
    };
    let path = experiment_dir.join("comparison.json");
    let json = serde_json::to_string_pretty(&file).context("serializing comparison")?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
