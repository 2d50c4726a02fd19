use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::genome::Genome;

/// How a genome entered the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReproductionMethod {
    /// Created by initial seeding.
    #[default]
    Seed,
    /// Copied unmodified as a species champion.
    Elite,
    /// Cloned from one parent and mutated.
    Asexual,
    /// Crossover of two parents from the same species.
    Sexual,
    /// Crossover of parents from different species.
    Interspecies,
}

/// Lineage record carried by each genome.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Origin {
    /// Method that produced the genome.
    pub method: ReproductionMethod,
    /// Mean fitness of the parents at the time of reproduction.
    pub parent_fitness: f64,
}

impl Origin {
    /// Origin of a genome produced by `method` from parents with the given mean fitness.
    pub fn new(method: ReproductionMethod, parent_fitness: f64) -> Self {
        Self {
            method,
            parent_fitness,
        }
    }
}

/// Statistics on how much offspring improve on their parents, per method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproductionStats {
    /// Recent asexual offspring: (`fitness` - `parent_fitness`)
    pub asexual_deltas: VecDeque<f64>,
    /// Recent same-species crossover offspring: (`fitness` - `parent_fitness`)
    pub sexual_deltas: VecDeque<f64>,
    /// Recent interspecies offspring: (`fitness` - `parent_fitness`)
    pub interspecies_deltas: VecDeque<f64>,
    /// Maximum number of deltas kept per method
    pub max_history: usize,
}

impl Default for ReproductionStats {
    fn default() -> Self {
        Self {
            asexual_deltas: VecDeque::new(),
            sexual_deltas: VecDeque::new(),
            interspecies_deltas: VecDeque::new(),
            max_history: 1000,
        }
    }
}

fn push_bounded(deltas: &mut VecDeque<f64>, value: f64, max: usize) {
    deltas.push_back(value);
    while deltas.len() > max {
        deltas.pop_front();
    }
}

fn mean(deltas: &VecDeque<f64>) -> f64 {
    if deltas.is_empty() {
        0.0
    } else {
        deltas.iter().sum::<f64>() / deltas.len() as f64
    }
}

impl ReproductionStats {
    /// Records an evaluated genome. Seeds and elites are skipped.
    pub fn record(&mut self, genome: &Genome) {
        let delta = genome.fitness - genome.origin.parent_fitness;
        let max = self.max_history;

        match genome.origin.method {
            ReproductionMethod::Asexual => push_bounded(&mut self.asexual_deltas, delta, max),
            ReproductionMethod::Sexual => push_bounded(&mut self.sexual_deltas, delta, max),
            ReproductionMethod::Interspecies => {
                push_bounded(&mut self.sexual_deltas, delta, max);
                push_bounded(&mut self.interspecies_deltas, delta, max);
            }
            ReproductionMethod::Seed | ReproductionMethod::Elite => {}
        }
    }

    /// Average fitness change for asexual offspring
    pub fn avg_asexual_delta(&self) -> f64 {
        mean(&self.asexual_deltas)
    }

    /// Average fitness change for crossover offspring, interspecies included
    pub fn avg_sexual_delta(&self) -> f64 {
        mean(&self.sexual_deltas)
    }

    /// Average fitness change for interspecies offspring
    pub fn avg_interspecies_delta(&self) -> f64 {
        mean(&self.interspecies_deltas)
    }

    /// Number of asexual offspring tracked
    pub fn asexual_count(&self) -> usize {
        self.asexual_deltas.len()
    }

    /// Number of crossover offspring tracked
    pub fn sexual_count(&self) -> usize {
        self.sexual_deltas.len()
    }

    /// Number of interspecies offspring tracked
    pub fn interspecies_count(&self) -> usize {
        self.interspecies_deltas.len()
    }
}
