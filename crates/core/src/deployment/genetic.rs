//! Genetic search over sensor placements
//!
//! Each call evolves a fresh population for a fixed number of generations:
//!
//! 1. Initialise `population_size` random placements of distinct positions
//! 2. Score every candidate (in parallel, the score is a pure function)
//! 3. Carry the best candidate over unmutated (elitism)
//! 4. Fill the rest of the next generation with tournament-selected parents,
//!    one-cut crossover, de-duplication with random backfill, and at most one
//!    point mutation per child
//!
//! The best candidate seen across all generations is returned. Results are
//! reproducible for a given seed of the owned [`SimRng`].

use super::{random_free_position, DeploymentStrategy, PlacementContext};
use crate::config::GeneticParams;
use crate::core_types::{disk_offsets, GridShape, SensorPlacement, SensorPosition, SimRng};
use crate::error::PlacementError;
use rand::seq::index;
use rand::Rng;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::debug;

/// A placement with its cached fitness
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Sensor positions, all distinct
    pub positions: Vec<SensorPosition>,
    /// `alpha * mean covered burn probability + beta * mean covered intensity`
    pub fitness: f64,
}

/// Result of one evolutionary search
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionOutcome {
    /// Best candidate seen in any generation
    pub best: Candidate,
    /// Best fitness present in each generation's population
    pub best_fitness_history: Vec<f64>,
}

/// Scores placements against one step's maps
struct FitnessEvaluator<'a> {
    shape: GridShape,
    burn: &'a [f64],
    intensity: &'a [f64],
    offsets: Vec<(isize, isize)>,
    alpha: f64,
    beta: f64,
}

impl<'a> FitnessEvaluator<'a> {
    fn new(ctx: &'a PlacementContext<'a>) -> Self {
        Self {
            shape: ctx.shape(),
            burn: ctx.burn_map.grid().as_slice(),
            intensity: ctx.fire.intensity().as_slice(),
            offsets: disk_offsets(ctx.sensor_radius),
            alpha: ctx.weights.alpha,
            beta: ctx.weights.beta,
        }
    }

    /// Mean-weighted signal over the union of covered cells; 0 when nothing is covered
    fn fitness(&self, positions: &[SensorPosition]) -> f64 {
        let mut seen = vec![false; self.shape.cell_count()];
        let mut count = 0usize;
        let mut burn_sum = 0.0;
        let mut intensity_sum = 0.0;
        for &pos in positions {
            for idx in self.shape.disk_indices(pos, &self.offsets) {
                if !seen[idx] {
                    seen[idx] = true;
                    count += 1;
                    burn_sum += self.burn[idx];
                    intensity_sum += self.intensity[idx];
                }
            }
        }
        if count == 0 {
            return 0.0;
        }
        let n = count as f64;
        self.alpha * (burn_sum / n) + self.beta * (intensity_sum / n)
    }
}

/// Evolutionary placement strategy
#[derive(Debug, Clone)]
pub struct GeneticStrategy {
    params: GeneticParams,
    rng: SimRng,
}

impl GeneticStrategy {
    /// Create a genetic strategy drawing all randomness from `rng`
    pub fn new(params: GeneticParams, rng: SimRng) -> Self {
        Self { params, rng }
    }

    /// Search parameters
    pub fn params(&self) -> &GeneticParams {
        &self.params
    }

    /// Score a placement the way the search does
    pub fn fitness(ctx: &PlacementContext<'_>, positions: &[SensorPosition]) -> f64 {
        FitnessEvaluator::new(ctx).fitness(positions)
    }

    /// Run the full search and report per-generation progress
    pub fn evolve(&mut self, ctx: &PlacementContext<'_>) -> Result<EvolutionOutcome, PlacementError> {
        ctx.ensure_capacity()?;

        let shape = ctx.shape();
        let n = ctx.num_sensors;
        let evaluator = FitnessEvaluator::new(ctx);
        let pop_size = self.params.population_size.max(2);

        let mut population: Vec<Candidate> = (0..pop_size)
            .map(|_| Candidate {
                positions: random_positions(&mut self.rng, shape, n),
                fitness: 0.0,
            })
            .collect();

        let mut best: Option<Candidate> = None;
        let mut history = Vec::with_capacity(self.params.num_generations);

        for generation in 0..self.params.num_generations {
            // 1. Score
            population
                .par_iter_mut()
                .for_each(|c| c.fitness = evaluator.fitness(&c.positions));

            // 2. Track the elite (first of equals wins, keeps order-independence)
            let elite_idx = fittest_index(&population);
            let elite = population[elite_idx].clone();
            history.push(elite.fitness);
            if best.as_ref().is_none_or(|b| elite.fitness > b.fitness) {
                best = Some(elite.clone());
            }
            debug!(
                step = ctx.step,
                generation,
                best_fitness = elite.fitness,
                "genetic generation scored"
            );

            if generation + 1 == self.params.num_generations {
                break;
            }

            // 3. Breed the next generation
            let mut next = Vec::with_capacity(pop_size);
            next.push(elite);
            while next.len() < pop_size {
                let p1 = self.tournament(&population);
                let p2 = self.tournament(&population);
                let mut child =
                    crossover(&mut self.rng, shape, n, &population[p1].positions, &population[p2].positions);
                if self.rng.random_bool(self.params.mutation_rate.clamp(0.0, 1.0)) {
                    mutate(&mut self.rng, shape, &mut child);
                }
                next.push(Candidate {
                    positions: child,
                    fitness: 0.0,
                });
            }
            population = next;
        }

        // num_generations == 0 still scores the initial population
        let best = match best {
            Some(b) => b,
            None => {
                population
                    .iter_mut()
                    .for_each(|c| c.fitness = evaluator.fitness(&c.positions));
                population.swap_remove(fittest_index(&population))
            }
        };

        Ok(EvolutionOutcome {
            best,
            best_fitness_history: history,
        })
    }

    /// Index of the tournament winner
    fn tournament(&mut self, population: &[Candidate]) -> usize {
        let rounds = self.params.tournament_size.max(1);
        let mut winner = self.rng.random_range(0..population.len());
        for _ in 1..rounds {
            let challenger = self.rng.random_range(0..population.len());
            if population[challenger].fitness > population[winner].fitness {
                winner = challenger;
            }
        }
        winner
    }
}

impl DeploymentStrategy for GeneticStrategy {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn place_sensors(
        &mut self,
        ctx: &PlacementContext<'_>,
    ) -> Result<SensorPlacement, PlacementError> {
        let outcome = self.evolve(ctx)?;
        debug!(
            step = ctx.step,
            fitness = outcome.best.fitness,
            "genetic search finished"
        );
        Ok(SensorPlacement::new(outcome.best.positions, ctx.sensor_radius))
    }
}

// ====== Genetic operators ======

fn fittest_index(population: &[Candidate]) -> usize {
    let mut best = 0;
    for (i, c) in population.iter().enumerate().skip(1) {
        if c.fitness > population[best].fitness {
            best = i;
        }
    }
    best
}

/// `n` distinct uniformly random positions
fn random_positions(rng: &mut SimRng, shape: GridShape, n: usize) -> Vec<SensorPosition> {
    index::sample(rng, shape.cell_count(), n)
        .into_iter()
        .map(|i| shape.position_of(i))
        .collect()
}

/// One-cut crossover, de-duplicated and backfilled to `n` positions
fn crossover(
    rng: &mut SimRng,
    shape: GridShape,
    n: usize,
    a: &[SensorPosition],
    b: &[SensorPosition],
) -> Vec<SensorPosition> {
    let cut = rng.random_range(0..=a.len().min(n));
    let mut taken = FxHashSet::default();
    let mut child = Vec::with_capacity(n);
    for &pos in a[..cut].iter().chain(b.iter().skip(cut)) {
        if child.len() == n {
            break;
        }
        if taken.insert(pos) {
            child.push(pos);
        }
    }
    while child.len() < n {
        let Some(pos) = random_free_position(rng, shape, &taken) else {
            break;
        };
        taken.insert(pos);
        child.push(pos);
    }
    child
}

/// Replace one position with a random free one
fn mutate(rng: &mut SimRng, shape: GridShape, positions: &mut [SensorPosition]) {
    if positions.is_empty() || positions.len() >= shape.cell_count() {
        return;
    }
    let slot = rng.random_range(0..positions.len());
    let taken: FxHashSet<SensorPosition> = positions.iter().copied().collect();
    if let Some(pos) = random_free_position(rng, shape, &taken) {
        positions[slot] = pos;
    }
}
