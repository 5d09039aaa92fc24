//! Experiment configuration and grid ingestion
//!
//! Reads the experiment TOML file and the CSV grids it points at, producing
//! the parsed inputs the core consumes.

use anyhow::{bail, Context, Result};
use fire_sensor_core::core_types::{Grid, GridShape};
use fire_sensor_core::{FireSequence, SimulationConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Top-level experiment file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Name used for the output directory
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,
    /// Core run configuration
    pub simulation: SimulationConfig,
    /// Where the fire grids live
    pub data: DataConfig,
    /// Where records are written
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_experiment_name() -> String {
    "DefaultExperiment".to_string()
}

/// Fire grid location and parsing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding one CSV per step
    pub directory: PathBuf,
    /// File name prefix; step `t` is read from `{prefix}{t:02}.csv`
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Intensity at which a cell counts as burning (defaults to the detection threshold)
    #[serde(default)]
    pub ignition_threshold: Option<f64>,
    /// Optional initial burn probabilities (comma or whitespace separated)
    #[serde(default)]
    pub burn_probability_file: Option<PathBuf>,
}

fn default_file_prefix() -> String {
    "ForestGrid".to_string()
}

/// Output location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for experiment logs
    pub directory: PathBuf,
    /// Write per-step JSON and burn-probability CSV records
    pub write_step_records: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            write_step_records: true,
        }
    }
}

impl ExperimentConfig {
    /// Load and parse an experiment file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading experiment config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing experiment config {}", path.display()))?;
        Ok(config)
    }

    /// Threshold used to turn intensity grids into fire states
    pub fn ignition_threshold(&self) -> f64 {
        self.data
            .ignition_threshold
            .unwrap_or(self.simulation.detection_threshold)
    }

    /// Directory for this experiment's records
    pub fn experiment_dir(&self) -> PathBuf {
        self.output.directory.join(&self.experiment_name)
    }
}

/// Read a headerless, comma-separated numeric grid
pub fn read_grid_csv(path: &Path) -> Result<Grid<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading {} row {line}", path.display()))?;
        let row = record
            .iter()
            .filter(|field| !field.is_empty())
            .map(|field| {
                field
                    .parse::<f64>()
                    .with_context(|| format!("{} row {line}: '{field}' is not a number", path.display()))
            })
            .collect::<Result<Vec<f64>>>()?;
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Grid::from_rows(rows).with_context(|| format!("grid shape in {}", path.display()))
}

/// Read a burn-probability seed, comma- or whitespace-separated
pub fn read_burn_seed(path: &Path) -> Result<Grid<f64>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if contents.contains(',') {
        return read_grid_csv(path);
    }
    let mut rows = Vec::new();
    for (line, text) in contents.lines().enumerate() {
        let row = text
            .split_whitespace()
            .map(|field| {
                field
                    .parse::<f64>()
                    .with_context(|| format!("{} line {line}: '{field}' is not a number", path.display()))
            })
            .collect::<Result<Vec<f64>>>()?;
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Grid::from_rows(rows).with_context(|| format!("grid shape in {}", path.display()))
}

/// Load `steps` fire grids into a fire sequence
///
/// File `t` always becomes step `t`. A missing step repeats the previous
/// grid; missing leading steps are treated as quiet (all-zero intensity).
pub fn load_fire_sequence(data: &DataConfig, steps: usize, threshold: f64) -> Result<FireSequence> {
    let mut loaded: Vec<Option<Grid<f64>>> = Vec::with_capacity(steps);
    for t in 0..steps {
        let path = data.directory.join(format!("{}{t:02}.csv", data.file_prefix));
        if path.exists() {
            info!("Loading fire grid {}", path.display());
            loaded.push(Some(read_grid_csv(&path)?));
        } else {
            loaded.push(None);
        }
    }

    let Some(first_shape) = loaded.iter().flatten().map(Grid::shape).next() else {
        bail!("no fire grids found in {}", data.directory.display());
    };
    let mut grids = Vec::with_capacity(steps);
    for (t, grid) in loaded.into_iter().enumerate() {
        let grid = match grid {
            Some(grid) => grid,
            None => {
                let filled = match grids.last() {
                    Some(previous) => Grid::clone(previous),
                    None => Grid::filled(first_shape, 0.0),
                };
                warn!(
                    "Missing fire grid {}{t:02}.csv in {}, step {t} repeats the previous state",
                    data.file_prefix,
                    data.directory.display()
                );
                filled
            }
        };
        grids.push(grid);
    }
    FireSequence::from_intensity_grids(grids, threshold).context("fire grids disagree in shape")
}

/// Load the optional seed, warning and falling back when the file is absent
pub fn load_burn_seed(data: &DataConfig, shape: GridShape) -> Result<Option<Grid<f64>>> {
    let Some(path) = &data.burn_probability_file else {
        info!("No burn probability file configured, using the configured prior");
        return Ok(None);
    };
    if !path.exists() {
        warn!(
            "Burn probability file {} not found, using the configured prior",
            path.display()
        );
        return Ok(None);
    }
    info!("Loading burn probability seed from {}", path.display());
    let grid = read_burn_seed(path)?;
    if grid.shape() != shape {
        bail!(
            "burn probability seed {} is {}, fire grids are {}",
            path.display(),
            grid.shape(),
            shape
        );
    }
    Ok(Some(grid))
}
