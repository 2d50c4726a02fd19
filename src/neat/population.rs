//! Generation manager.
//!
//! A generation moves through a fixed sequence of phases:
//!
//! ```text
//! Evaluating -> Speciating -> ReproducingSelection -> ReproducingOffspring
//!            -> AdvancedGeneration -> Evaluating -> ...
//! ```
//!
//! Each step checks the phase it requires, so out-of-order calls fail with
//! [`NeatError::InvalidPhase`] instead of corrupting the population. Only
//! fitness evaluation runs in parallel; everything else happens on the
//! calling thread.

use std::convert::Infallible;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::crossover::GenomeGenerator;
use super::error::{NeatError, NeatResult};
use super::evaluation::{self, EvaluationSummary};
use super::genome::Genome;
use super::history::{GenerationHistory, GenerationRecord};
use super::innovation::{InnovationSnapshot, InnovationTracker};
use super::mutation;
use super::params::Params;
use super::reproduction::{Origin, ReproductionMethod, ReproductionStats};
use super::species::SpeciesSet;

/// Step of the generation cycle the population is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Genomes need fitness scores.
    Evaluating,
    /// Scored genomes need to be grouped into species.
    Speciating,
    /// Offspring counts and parents need to be chosen.
    ReproducingSelection,
    /// The next generation needs to be bred.
    ReproducingOffspring,
    /// The next generation is ready to replace the current one.
    AdvancedGeneration,
}

/// Offspring count and parent pool chosen for one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesAllotment {
    /// Species the plan belongs to.
    pub species_id: usize,
    /// Number of children the species contributes to the next generation.
    pub offspring: usize,
    /// Genome indices allowed to reproduce, fittest first.
    pub parents: Vec<usize>,
}

/// Outcome of speciation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpeciationSummary {
    /// Species founded this generation.
    pub created: usize,
    /// Ids of species removed for stagnation.
    pub purged: Vec<usize>,
    /// Species remaining.
    pub species_count: usize,
}

/// Summary of one full generation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// Generation that was evaluated.
    pub generation: usize,
    /// Best fitness in the evaluated generation.
    pub best_fitness: f64,
    /// Mean fitness in the evaluated generation.
    pub mean_fitness: f64,
    /// Genomes whose evaluation failed.
    pub failures: usize,
    /// Species after speciation and purging.
    pub species_count: usize,
    /// Species founded this generation.
    pub species_created: usize,
    /// Ids of species removed for stagnation.
    pub species_purged: Vec<usize>,
    /// Best fitness seen during the whole run.
    pub champion_fitness: f64,
}

/// Serializable state of a population between generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// When the checkpoint was taken.
    pub saved_at: DateTime<Utc>,
    /// Generation number.
    pub generation: usize,
    /// Run configuration.
    pub params: Params,
    /// Current genomes, not yet evaluated.
    pub genomes: Vec<Genome>,
    /// Species and compatibility threshold.
    pub species: SpeciesSet,
    /// Innovation counters and lookup table.
    pub innovations: InnovationSnapshot,
    /// Recent generation records.
    pub history: GenerationHistory,
    /// Reproduction statistics.
    pub stats: ReproductionStats,
    /// Best genome of the run.
    pub champion: Option<Genome>,
}

/// A NEAT population and its generation state machine.
#[derive(Debug)]
pub struct Population {
    params: Params,
    genomes: Vec<Genome>,
    species: SpeciesSet,
    generation: usize,
    tracker: InnovationTracker,
    phase: Phase,
    rng: StdRng,
    history: GenerationHistory,
    stats: ReproductionStats,
    champion: Option<Genome>,
    allotments: Vec<SpeciesAllotment>,
    offspring: Vec<Genome>,
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Splits `total` offspring in proportion to `shares`.
///
/// Uses largest-remainder rounding: every share first receives the floor of
/// its exact quota, then the leftover slots go to the largest fractional
/// parts, ties broken by position. The result always sums to `total`. When
/// the shares sum to zero every entry is weighted equally.
pub fn allot_offspring(shares: &[f64], total: usize) -> Vec<usize> {
    if shares.is_empty() {
        return Vec::new();
    }

    let sum: f64 = shares.iter().sum();
    let weights: Vec<f64> = if sum > 0.0 && sum.is_finite() {
        shares.iter().map(|s| s.max(0.0)).collect()
    } else {
        vec![1.0; shares.len()]
    };
    let sum: f64 = weights.iter().sum();

    let quotas: Vec<f64> = weights.iter().map(|w| w / sum * total as f64).collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();

    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = quotas[a] - quotas[a].floor();
        let fb = quotas[b] - quotas[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    for &i in order.iter().take(total.saturating_sub(assigned)) {
        counts[i] += 1;
    }
    counts
}

/// Breeds one non-elite child for the species at `plan_index`.
fn breed<R: Rng + ?Sized>(
    plan_index: usize,
    allotments: &[SpeciesAllotment],
    genomes: &[Genome],
    params: &Params,
    tracker: &InnovationTracker,
    rng: &mut R,
) -> Genome {
    let parents = &allotments[plan_index].parents;
    let i = rng.random_range(0..parents.len());
    let first = &genomes[parents[i]];

    if parents.len() < 2 || rng.random::<f32>() < params.mutate_only_prob {
        let mut child = GenomeGenerator::Mutation.generate(first, None, params, tracker, rng);
        child.origin = Origin::new(ReproductionMethod::Asexual, first.fitness);
        return child;
    }

    let interspecies =
        allotments.len() > 1 && rng.random::<f32>() < params.interspecies_mating_prob;
    let (second, method) = if interspecies {
        let mut other = rng.random_range(0..allotments.len() - 1);
        if other >= plan_index {
            other += 1;
        }
        let pool = &allotments[other].parents;
        let partner = &genomes[pool[rng.random_range(0..pool.len())]];
        (partner, ReproductionMethod::Interspecies)
    } else {
        let mut j = rng.random_range(0..parents.len() - 1);
        if j >= i {
            j += 1;
        }
        (&genomes[parents[j]], ReproductionMethod::Sexual)
    };

    let mut child = GenomeGenerator::Crossover.generate(first, Some(second), params, tracker, rng);
    mutation::mutate(&mut child, params, tracker, rng);
    child.origin = Origin::new(method, (first.fitness + second.fitness) / 2.0);
    child
}

impl Population {
    /// Validates `params` and seeds a population of minimal genomes.
    pub fn new(params: Params) -> NeatResult<Self> {
        let tracker = InnovationTracker::new(params.innovation_policy);
        Self::with_tracker(params, tracker)
    }

    /// Like [`Population::new`], with a caller-supplied innovation tracker.
    pub fn with_tracker(params: Params, tracker: InnovationTracker) -> NeatResult<Self> {
        params.validate()?;

        let mut rng = seeded_rng(params.seed);
        let genomes = (0..params.population_size)
            .map(|_| Genome::minimal(&params, &tracker, &mut rng))
            .collect();

        Ok(Self {
            species: SpeciesSet::new(params.compatibility_threshold),
            history: GenerationHistory::new(params.history_size),
            genomes,
            generation: 0,
            tracker,
            phase: Phase::Evaluating,
            rng,
            stats: ReproductionStats::default(),
            champion: None,
            allotments: Vec::new(),
            offspring: Vec::new(),
            params,
        })
    }

    fn expect_phase(&self, expected: Phase) -> NeatResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(NeatError::InvalidPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    /// Scores every genome in parallel.
    ///
    /// A genome whose fitness function errors, panics or returns a non-finite
    /// value is recorded with fitness 0 and a warning is logged; the others
    /// are unaffected. Negative scores are clamped to 0.
    pub fn evaluate<F, E>(&mut self, fitness: F) -> NeatResult<EvaluationSummary>
    where
        F: Fn(&Genome) -> Result<f64, E> + Sync,
        E: Display,
    {
        self.expect_phase(Phase::Evaluating)?;

        let outcomes = evaluation::evaluate_all(&self.genomes, &fitness);
        let summary = evaluation::apply_outcomes(&mut self.genomes, outcomes);

        for genome in &self.genomes {
            self.stats.record(genome);
        }

        let mut record = GenerationRecord {
            generation: self.generation,
            best_fitness: 0.0,
            mean_fitness: summary.mean_fitness,
            species_count: 0,
            failures: summary.failed,
            champion_nodes: 0,
            champion_connections: 0,
        };
        if let Some(best) = summary.best {
            let candidate = &self.genomes[best];
            record.best_fitness = candidate.fitness;
            record.champion_nodes = candidate.node_count();
            record.champion_connections = candidate.enabled_connections().count();
            if self
                .champion
                .as_ref()
                .is_none_or(|c| candidate.fitness > c.fitness)
            {
                self.champion = Some(candidate.clone());
            }
        }
        debug!(
            generation = self.generation,
            best_fitness = record.best_fitness,
            failures = summary.failed,
            "generation evaluated"
        );
        self.history.push(record);

        self.phase = Phase::Speciating;
        Ok(summary)
    }

    /// Same as [`Population::evaluate`] for a fitness function that cannot fail.
    pub fn evaluate_with<F>(&mut self, fitness: F) -> NeatResult<EvaluationSummary>
    where
        F: Fn(&Genome) -> f64 + Sync,
    {
        self.evaluate(|genome| Ok::<f64, Infallible>(fitness(genome)))
    }

    /// Groups the scored genomes into species and purges stagnant species.
    pub fn speciate(&mut self) -> NeatResult<SpeciationSummary> {
        self.expect_phase(Phase::Speciating)?;

        let created = self
            .species
            .speciate(&self.genomes, &self.params, self.generation);
        let purged = self
            .species
            .purge_stagnant(&self.genomes, &self.params, self.generation);

        let species_count = self.species.len();
        if let Some(record) = self.history.latest_mut() {
            record.species_count = species_count;
        }

        self.phase = Phase::ReproducingSelection;
        Ok(SpeciationSummary {
            created,
            purged,
            species_count,
        })
    }

    /// Computes adjusted fitness, offspring counts and parent pools.
    ///
    /// Fails with [`NeatError::EmptyPopulation`] when no species remain.
    pub fn select(&mut self) -> NeatResult<&[SpeciesAllotment]> {
        self.expect_phase(Phase::ReproducingSelection)?;
        if self.species.is_empty() {
            return Err(NeatError::EmptyPopulation);
        }

        for s in self.species.species() {
            let size = s.len() as f64;
            for &i in &s.members {
                self.genomes[i].adjusted_fitness = self.genomes[i].fitness / size;
            }
        }

        let shares: Vec<f64> = self
            .species
            .species()
            .iter()
            .map(|s| s.adjusted_fitness(&self.genomes))
            .collect();
        let counts = allot_offspring(&shares, self.params.population_size);

        let genomes = &self.genomes;
        let survival = self.params.survival_threshold;
        self.allotments = self
            .species
            .species()
            .iter()
            .zip(counts)
            .map(|(s, offspring)| {
                let mut ranked = s.members.clone();
                ranked.sort_by(|&a, &b| genomes[b].fitness.total_cmp(&genomes[a].fitness));
                let keep = ((ranked.len() as f32 * survival).ceil() as usize).clamp(1, ranked.len());
                ranked.truncate(keep);
                SpeciesAllotment {
                    species_id: s.id,
                    offspring,
                    parents: ranked,
                }
            })
            .collect();

        self.phase = Phase::ReproducingOffspring;
        Ok(self.allotments.as_slice())
    }

    /// Breeds the next generation from the selected parents.
    ///
    /// Returns the number of children produced, which equals
    /// `population_size`.
    pub fn reproduce(&mut self) -> NeatResult<usize> {
        self.expect_phase(Phase::ReproducingOffspring)?;
        self.tracker.begin_generation();

        let params = &self.params;
        let genomes = &self.genomes;
        let tracker = &self.tracker;
        let allotments = &self.allotments;
        let rng = &mut self.rng;
        let mut next = Vec::with_capacity(params.population_size);
        let mut representatives = Vec::with_capacity(allotments.len());

        for (k, plan) in allotments.iter().enumerate() {
            let first = next.len();
            let elites = params.elitism.min(plan.offspring).min(plan.parents.len());
            for &idx in &plan.parents[..elites] {
                let mut elite = genomes[idx].clone();
                elite.origin = Origin::new(ReproductionMethod::Elite, elite.fitness);
                elite.reset_fitness();
                next.push(elite);
            }
            for _ in elites..plan.offspring {
                next.push(breed(k, allotments, genomes, params, tracker, rng));
            }
            // The elite copy when there is one, otherwise the first child.
            if let Some(child) = next.get(first) {
                representatives.push((plan.species_id, child.clone()));
            }
        }

        self.species.carry_forward(representatives);

        let count = next.len();
        self.offspring = next;
        self.phase = Phase::AdvancedGeneration;
        Ok(count)
    }

    /// Replaces the current genomes with the bred generation.
    pub fn advance(&mut self) -> NeatResult<usize> {
        self.expect_phase(Phase::AdvancedGeneration)?;

        let best_fitness = self.history.latest().map_or(0.0, |r| r.best_fitness);
        info!(
            generation = self.generation,
            best_fitness,
            species = self.species.len(),
            "generation advanced"
        );

        self.genomes = std::mem::take(&mut self.offspring);
        self.allotments.clear();
        for s in self.species.species_mut() {
            s.members.clear();
        }
        self.generation += 1;
        self.phase = Phase::Evaluating;
        Ok(self.generation)
    }

    /// Runs one full generation cycle.
    pub fn epoch<F, E>(&mut self, fitness: F) -> NeatResult<GenerationReport>
    where
        F: Fn(&Genome) -> Result<f64, E> + Sync,
        E: Display,
    {
        let generation = self.generation;
        let evaluated = self.evaluate(fitness)?;
        let best_fitness = evaluated.best.map_or(0.0, |i| self.genomes[i].fitness);
        let speciated = self.speciate()?;
        self.select()?;
        self.reproduce()?;
        self.advance()?;

        Ok(GenerationReport {
            generation,
            best_fitness,
            mean_fitness: evaluated.mean_fitness,
            failures: evaluated.failed,
            species_count: speciated.species_count,
            species_created: speciated.created,
            species_purged: speciated.purged,
            champion_fitness: self.champion.as_ref().map_or(0.0, |c| c.fitness),
        })
    }

    /// Configuration of the run.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Current genomes.
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// Current species.
    pub fn species(&self) -> &SpeciesSet {
        &self.species
    }

    /// Generation number, starting at 0.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Phase the population is waiting in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Innovation tracker shared by all genomes of the run.
    pub fn tracker(&self) -> &InnovationTracker {
        &self.tracker
    }

    /// Recent generation records.
    pub fn history(&self) -> &GenerationHistory {
        &self.history
    }

    /// Per-method offspring statistics.
    pub fn stats(&self) -> &ReproductionStats {
        &self.stats
    }

    /// Fittest genome seen during the run.
    pub fn champion(&self) -> Option<&Genome> {
        self.champion.as_ref()
    }

    /// Plans made by the last [`Population::select`].
    pub fn allotments(&self) -> &[SpeciesAllotment] {
        &self.allotments
    }

    /// Fittest genome of the current generation.
    pub fn best_genome(&self) -> Option<&Genome> {
        self.genomes
            .iter()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    /// Captures the population between generations.
    pub fn checkpoint(&self) -> NeatResult<Checkpoint> {
        self.expect_phase(Phase::Evaluating)?;
        Ok(Checkpoint {
            saved_at: Utc::now(),
            generation: self.generation,
            params: self.params.clone(),
            genomes: self.genomes.clone(),
            species: self.species.clone(),
            innovations: self.tracker.snapshot(),
            history: self.history.clone(),
            stats: self.stats.clone(),
            champion: self.champion.clone(),
        })
    }

    /// Rebuilds a population from a checkpoint, validating its contents.
    ///
    /// The random generator is reseeded from `params.seed` and the generation
    /// number, so a resumed run is reproducible but does not replay the
    /// original stream.
    pub fn restore(checkpoint: Checkpoint) -> NeatResult<Self> {
        checkpoint.params.validate()?;
        for genome in &checkpoint.genomes {
            genome.validate()?;
        }

        let seed = checkpoint
            .params
            .seed
            .map(|s| s ^ checkpoint.generation as u64);
        Ok(Self {
            rng: seeded_rng(seed),
            tracker: InnovationTracker::from_snapshot(checkpoint.innovations),
            params: checkpoint.params,
            genomes: checkpoint.genomes,
            species: checkpoint.species,
            generation: checkpoint.generation,
            phase: Phase::Evaluating,
            history: checkpoint.history,
            stats: checkpoint.stats,
            champion: checkpoint.champion,
            allotments: Vec::new(),
            offspring: Vec::new(),
        })
    }

    /// Saves a checkpoint as pretty-printed JSON.
    pub fn save_to_file(&self, path: &str) -> NeatResult<()> {
        let json = serde_json::to_string_pretty(&self.checkpoint()?)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads a population from a JSON checkpoint.
    pub fn load_from_file(path: &str) -> NeatResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&json)?;
        Self::restore(checkpoint)
    }
}
