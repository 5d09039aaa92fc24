//! Run-level detection metrics
//!
//! [`MetricsCalculator`] collects per-step coverage and detection events while
//! a run is stepping, then [`MetricsCalculator::finalize`] turns them into an
//! immutable [`RunMetrics`]. Every burning cell is tracked as its own fire
//! source from the step it is first seen burning; its latency is the number
//! of steps until a sensor first detects it.

use crate::core_types::SensorPosition;
use crate::detection::DetectionEvent;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Steps from ignition to first detection for one source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionLatency {
    /// Detected `steps` steps after ignition (0 = same step)
    Detected {
        /// Steps elapsed
        steps: usize,
    },
    /// Never detected within the run horizon
    Undetected,
}

impl DetectionLatency {
    /// Latency in steps, if detected
    pub fn steps(self) -> Option<usize> {
        match self {
            DetectionLatency::Detected { steps } => Some(steps),
            DetectionLatency::Undetected => None,
        }
    }
}

impl fmt::Display for DetectionLatency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionLatency::Detected { steps } => write!(f, "{steps} steps"),
            DetectionLatency::Undetected => write!(f, "undetected"),
        }
    }
}

/// Latency record for one fire source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLatency {
    /// Cell where the source ignited
    pub cell: SensorPosition,
    /// Step the cell was first seen burning
    pub ignition_step: usize,
    /// Step of the first detection event for the cell
    pub first_detection_step: Option<usize>,
    /// Steps from ignition to detection
    pub latency: DetectionLatency,
}

/// Final metrics for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Coverage fraction per recorded step, in step order
    pub coverage_over_time: Vec<f64>,
    /// Mean of `coverage_over_time` (0 when no steps were recorded)
    pub average_coverage: f64,
    /// Coverage at the last recorded step (0 when no steps were recorded)
    pub final_coverage: f64,
    /// Detection events across the run
    pub total_detection_events: usize,
    /// Per-source latencies, in ignition order
    pub source_latencies: Vec<SourceLatency>,
    /// Sum of latencies over detected sources
    pub cumulative_latency: usize,
    /// Sources never detected
    pub undetected_sources: usize,
    /// Earliest step with any detection
    pub first_detection_step: Option<usize>,
}

impl RunMetrics {
    /// Number of steps recorded
    pub fn steps(&self) -> usize {
        self.coverage_over_time.len()
    }

    /// Number of fire sources tracked
    pub fn source_count(&self) -> usize {
        self.source_latencies.len()
    }

    /// Mean latency over detected sources
    pub fn mean_latency(&self) -> Option<f64> {
        let detected = self.source_count() - self.undetected_sources;
        (detected > 0).then(|| self.cumulative_latency as f64 / detected as f64)
    }

    /// Field-wise difference `self - baseline`
    pub fn delta(&self, baseline: &RunMetrics) -> MetricsDelta {
        MetricsDelta {
            average_coverage: self.average_coverage - baseline.average_coverage,
            final_coverage: self.final_coverage - baseline.final_coverage,
            total_detection_events: signed_diff(
                self.total_detection_events,
                baseline.total_detection_events,
            ),
            cumulative_latency: signed_diff(self.cumulative_latency, baseline.cumulative_latency),
            undetected_sources: signed_diff(self.undetected_sources, baseline.undetected_sources),
        }
    }
}

fn signed_diff(a: usize, b: usize) -> i64 {
    a as i64 - b as i64
}

impl fmt::Display for RunMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "steps:               {}", self.steps())?;
        writeln!(f, "average coverage:    {:.3}", self.average_coverage)?;
        writeln!(f, "final coverage:      {:.3}", self.final_coverage)?;
        writeln!(f, "detection events:    {}", self.total_detection_events)?;
        writeln!(
            f,
            "fire sources:        {} ({} undetected)",
            self.source_count(),
            self.undetected_sources
        )?;
        writeln!(f, "cumulative latency:  {} steps", self.cumulative_latency)?;
        match self.first_detection_step {
            Some(step) => write!(f, "first detection:     step {step}"),
            None => write!(f, "first detection:     none"),
        }
    }
}

/// Field-wise difference between two runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsDelta {
    /// Average coverage difference
    pub average_coverage: f64,
    /// Final coverage difference
    pub final_coverage: f64,
    /// Detection event count difference
    pub total_detection_events: i64,
    /// Cumulative latency difference (negative = faster)
    pub cumulative_latency: i64,
    /// Undetected source difference
    pub undetected_sources: i64,
}

#[derive(Debug, Clone, Copy)]
struct SourceRecord {
    ignition_step: usize,
    first_detection: Option<usize>,
}

/// Accumulates per-step results for one run
#[derive(Debug, Clone, Default)]
pub struct MetricsCalculator {
    coverage: Vec<f64>,
    sources: FxHashMap<SensorPosition, SourceRecord>,
    source_order: Vec<SensorPosition>,
    total_events: usize,
    first_detection_step: Option<usize>,
}

impl MetricsCalculator {
    /// Empty calculator
    pub fn new() -> Self {
        Self::default()
    }

    /// Register cells first seen burning at `step`
    ///
    /// Cells already tracked keep their original ignition step.
    pub fn record_ignitions(&mut self, step: usize, cells: &[SensorPosition]) {
        for &cell in cells {
            self.track(cell, step);
        }
    }

    fn track(&mut self, cell: SensorPosition, step: usize) -> &mut SourceRecord {
        let order = &mut self.source_order;
        self.sources.entry(cell).or_insert_with(|| {
            order.push(cell);
            SourceRecord {
                ignition_step: step,
                first_detection: None,
            }
        })
    }

    /// Record one step's coverage fraction and detection events
    ///
    /// Coverage is clamped into [0, 1]. A detected cell with no recorded
    /// ignition is tracked as igniting at `step`.
    pub fn record_step(&mut self, step: usize, coverage_fraction: f64, events: &[DetectionEvent]) {
        let coverage = if coverage_fraction.is_nan() {
            0.0
        } else {
            coverage_fraction.clamp(0.0, 1.0)
        };
        self.coverage.push(coverage);
        self.total_events += events.len();
        if !events.is_empty() {
            self.first_detection_step = Some(self.first_detection_step.map_or(step, |s| s.min(step)));
        }
        for event in events {
            let record = self.track(event.cell, step);
            if record.first_detection.is_none() {
                record.first_detection = Some(event.step);
            }
        }
    }

    /// Coverage recorded so far
    pub fn coverage_so_far(&self) -> &[f64] {
        &self.coverage
    }

    /// Close the run
    pub fn finalize(self) -> RunMetrics {
        let steps = self.coverage.len();
        let average_coverage = if steps == 0 {
            0.0
        } else {
            self.coverage.iter().sum::<f64>() / steps as f64
        };
        let final_coverage = self.coverage.last().copied().unwrap_or(0.0);

        let mut cumulative_latency = 0;
        let mut undetected_sources = 0;
        let source_latencies = self
            .source_order
            .iter()
            .filter_map(|cell| self.sources.get(cell).map(|r| (*cell, *r)))
            .map(|(cell, record)| {
                let latency = match record.first_detection {
                    Some(detected) => {
                        let steps = detected.saturating_sub(record.ignition_step);
                        cumulative_latency += steps;
                        DetectionLatency::Detected { steps }
                    }
                    None => {
                        undetected_sources += 1;
                        DetectionLatency::Undetected
                    }
                };
                SourceLatency {
                    cell,
                    ignition_step: record.ignition_step,
                    first_detection_step: record.first_detection,
                    latency,
                }
            })
            .collect();

        RunMetrics {
            coverage_over_time: self.coverage,
            average_coverage,
            final_coverage,
            total_detection_events: self.total_events,
            source_latencies,
            cumulative_latency,
            undetected_sources,
            first_detection_step: self.first_detection_step,
        }
    }
}

/// One named run in a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    /// Label, usually the algorithm name
    pub name: String,
    /// Metrics of the run
    pub metrics: RunMetrics,
}

/// Side-by-side metrics for several strategies on the same data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    entries: Vec<ComparisonEntry>,
}

impl StrategyComparison {
    /// Empty comparison
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named run
    pub fn add(&mut self, name: impl Into<String>, metrics: RunMetrics) {
        self.entries.push(ComparisonEntry {
            name: name.into(),
            metrics,
        });
    }

    /// Runs in insertion order
    pub fn entries(&self) -> &[ComparisonEntry] {
        &self.entries
    }

    /// Runs ordered best first: higher average coverage, then lower cumulative latency
    pub fn ranked(&self) -> Vec<&ComparisonEntry> {
        let mut ranked: Vec<&ComparisonEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| rank_order(&a.metrics, &b.metrics));
        ranked
    }

    /// Best run, if any
    pub fn best(&self) -> Option<&ComparisonEntry> {
        self.ranked().into_iter().next()
    }

    /// Each run's delta against the named baseline
    pub fn deltas_against(&self, baseline: &str) -> Option<Vec<(&str, MetricsDelta)>> {
        let base = self.entries.iter().find(|e| e.name == baseline)?;
        Some(
            self.entries
                .iter()
                .map(|e| (e.name.as_str(), e.metrics.delta(&base.metrics)))
                .collect(),
        )
    }
}

fn rank_order(a: &RunMetrics, b: &RunMetrics) -> Ordering {
    b.average_coverage
        .total_cmp(&a.average_coverage)
        .then_with(|| a.cumulative_latency.cmp(&b.cumulative_latency))
}

impl fmt::Display for StrategyComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<4} {:<24} {:>9} {:>9} {:>8} {:>10}",
            "rank", "strategy", "avg cov", "final", "latency", "undetected"
        )?;
        for (i, entry) in self.ranked().into_iter().enumerate() {
            let m = &entry.metrics;
            writeln!(
                f,
                "{:<4} {:<24} {:>9.3} {:>9.3} {:>8} {:>10}",
                i + 1,
                entry.name,
                m.average_coverage,
                m.final_coverage,
                m.cumulative_latency,
                m.undetected_sources
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn event(step: usize, cell: (usize, usize)) -> DetectionEvent {
        DetectionEvent {
            step,
            sensor: SensorPosition::new(0, 0),
            cell: cell.into(),
        }
    }

    #[test]
    fn test_latency_from_ignition_to_detection() {
        let mut calc = MetricsCalculator::new();
        calc.record_ignitions(0, &[(1, 1).into(), (2, 2).into()]);
        calc.record_step(0, 0.5, &[event(0, (1, 1))]);
        calc.record_ignitions(1, &[(3, 3).into()]);
        calc.record_step(1, 0.0, &[]);
        calc.record_step(2, 1.0, &[event(2, (2, 2)), event(2, (1, 1))]);
        let m = calc.finalize();

        assert_eq!(m.steps(), 3);
        assert_relative_eq!(m.average_coverage, 0.5);
        assert_eq!(m.final_coverage, 1.0);
        assert_eq!(m.total_detection_events, 3);
        assert_eq!(m.first_detection_step, Some(0));
        assert_eq!(m.source_count(), 3);
        assert_eq!(m.source_latencies[0].latency, DetectionLatency::Detected { steps: 0 });
        assert_eq!(m.source_latencies[1].latency, DetectionLatency::Detected { steps: 2 });
        assert_eq!(m.source_latencies[2].latency, DetectionLatency::Undetected);
        assert_eq!(m.cumulative_latency, 2);
        assert_eq!(m.undetected_sources, 1);
        assert_relative_eq!(m.mean_latency().unwrap(), 1.0);
    }

    #[test]
    fn test_coverage_clamped() {
        let mut calc = MetricsCalculator::new();
        calc.record_step(0, 1.7, &[]);
        calc.record_step(1, -0.2, &[]);
        calc.record_step(2, f64::NAN, &[]);
        assert_eq!(calc.coverage_so_far(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_empty_run() {
        let m = MetricsCalculator::new().finalize();
        assert_eq!(m.average_coverage, 0.0);
        assert_eq!(m.final_coverage, 0.0);
        assert!(m.mean_latency().is_none());
        assert!(m.first_detection_step.is_none());
    }

    #[test]
    fn test_untracked_detection_becomes_source() {
        let mut calc = MetricsCalculator::new();
        calc.record_step(4, 1.0, &[event(4, (0, 1))]);
        let m = calc.finalize();
        assert_eq!(m.source_latencies[0].ignition_step, 4);
        assert_eq!(m.source_latencies[0].latency.steps(), Some(0));
    }

    fn metrics(avg: f64, latency: usize) -> RunMetrics {
        RunMetrics {
            coverage_over_time: vec![avg],
            average_coverage: avg,
            final_coverage: avg,
            total_detection_events: 0,
            source_latencies: Vec::new(),
            cumulative_latency: latency,
            undetected_sources: 0,
            first_detection_step: None,
        }
    }

    #[test]
    fn test_comparison_ranking() {
        let mut cmp = StrategyComparison::new();
        cmp.add("slow", metrics(0.8, 9));
        cmp.add("weak", metrics(0.4, 0));
        cmp.add("fast", metrics(0.8, 2));
        let names: Vec<_> = cmp.ranked().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["fast", "slow", "weak"]);
        assert_eq!(cmp.best().unwrap().name, "fast");

        let table = cmp.to_string();
        assert!(table.lines().nth(1).unwrap().contains("fast"));
    }

    #[test]
    fn test_delta() {
        let d = metrics(0.9, 3).delta(&metrics(0.5, 5));
        assert_relative_eq!(d.average_coverage, 0.4);
        assert_eq!(d.cumulative_latency, -2);

        let mut cmp = StrategyComparison::new();
        cmp.add("greedy", metrics(0.5, 5));
        cmp.add("genetic", metrics(0.9, 3));
        let deltas = cmp.deltas_against("greedy").unwrap();
        assert_eq!(deltas[0].1.cumulative_latency, 0);
        assert_eq!(deltas[1].1.cumulative_latency, -2);
        assert!(cmp.deltas_against("ilp").is_none());
    }

    #[test]
    fn test_metrics_serde() {
        let mut calc = MetricsCalculator::new();
        calc.record_ignitions(0, &[(0, 0).into()]);
        calc.record_step(0, 0.0, &[]);
        let m = calc.finalize();
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"status\":\"undetected\""));
        let back: RunMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
