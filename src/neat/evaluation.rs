//! Parallel fitness evaluation.
//!
//! Genomes are scored concurrently and the results are collected as
//! outcomes, then applied serially so the population is only mutated on the
//! calling thread.

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::warn;

use super::genome::Genome;

/// Fitness recorded for a genome whose evaluation failed.
pub const FAILURE_FITNESS: f64 = 0.0;

/// Result of evaluating one genome.
#[derive(Debug, Clone, PartialEq)]
pub enum FitnessOutcome {
    /// The fitness function returned a usable score.
    Scored {
        /// Index of the genome in the population.
        index: usize,
        /// Score, clamped to be non-negative.
        fitness: f64,
    },
    /// The fitness function returned an error, panicked, or produced a
    /// non-finite score.
    Failed {
        /// Index of the genome in the population.
        index: usize,
        /// Human-readable cause.
        reason: String,
    },
}

impl FitnessOutcome {
    /// Index of the evaluated genome.
    pub fn index(&self) -> usize {
        match self {
            FitnessOutcome::Scored { index, .. } | FitnessOutcome::Failed { index, .. } => *index,
        }
    }

    /// Fitness to record for the genome.
    pub fn fitness(&self) -> f64 {
        match self {
            FitnessOutcome::Scored { fitness, .. } => *fitness,
            FitnessOutcome::Failed { .. } => FAILURE_FITNESS,
        }
    }
}

/// Totals from applying a batch of outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EvaluationSummary {
    /// Genomes that received a score.
    pub scored: usize,
    /// Genomes whose evaluation failed.
    pub failed: usize,
    /// Index of the fittest genome, if any were evaluated.
    pub best: Option<usize>,
    /// Mean recorded fitness.
    pub mean_fitness: f64,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "fitness function panicked".to_string()
    }
}

/// Scores one genome, turning errors and panics into a failed outcome.
pub fn evaluate_one<F, E>(index: usize, genome: &Genome, fitness: &F) -> FitnessOutcome
where
    F: Fn(&Genome) -> Result<f64, E>,
    E: Display,
{
    match panic::catch_unwind(AssertUnwindSafe(|| fitness(genome))) {
        Ok(Ok(score)) if score.is_finite() => FitnessOutcome::Scored {
            index,
            fitness: score.max(0.0),
        },
        Ok(Ok(score)) => FitnessOutcome::Failed {
            index,
            reason: format!("non-finite fitness {score}"),
        },
        Ok(Err(e)) => FitnessOutcome::Failed {
            index,
            reason: e.to_string(),
        },
        Err(payload) => FitnessOutcome::Failed {
            index,
            reason: panic_message(payload.as_ref()),
        },
    }
}

/// Scores every genome in parallel. Outcomes are returned in genome order.
pub fn evaluate_all<F, E>(genomes: &[Genome], fitness: &F) -> Vec<FitnessOutcome>
where
    F: Fn(&Genome) -> Result<f64, E> + Sync,
    E: Display,
{
    genomes
        .par_iter()
        .enumerate()
        .map(|(index, genome)| evaluate_one(index, genome, fitness))
        .collect()
}

/// Writes outcomes back into the genomes.
pub fn apply_outcomes(genomes: &mut [Genome], outcomes: Vec<FitnessOutcome>) -> EvaluationSummary {
    let mut summary = EvaluationSummary::default();
    let mut total = 0.0;
    let mut best_fitness = f64::NEG_INFINITY;

    for outcome in outcomes {
        let index = outcome.index();
        let Some(genome) = genomes.get_mut(index) else {
            continue;
        };

        if let FitnessOutcome::Failed { reason, .. } = &outcome {
            warn!(genome = index, %reason, "fitness evaluation failed");
            summary.failed += 1;
        } else {
            summary.scored += 1;
        }

        genome.fitness = outcome.fitness();
        total += genome.fitness;

        if genome.fitness > best_fitness {
            best_fitness = genome.fitness;
            summary.best = Some(index);
        }
    }

    let evaluated = summary.scored + summary.failed;
    if evaluated > 0 {
        summary.mean_fitness = total / evaluated as f64;
    }
    summary
}
