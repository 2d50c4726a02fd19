//! Species bookkeeping and representative-based speciation.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::distance::compatibility_distance;
use super::genome::Genome;
use super::params::Params;

/// Genomes within the compatibility threshold of a shared representative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    /// Identifier, unique for the run.
    pub id: usize,
    /// Genome new members are compared against. Fixed while a generation is
    /// being assigned.
    pub representative: Genome,
    /// Indices of the members in the population's genome list.
    pub members: Vec<usize>,
    /// Generation the species appeared in.
    pub created: usize,
    /// Best member fitness seen so far.
    pub best_fitness: f64,
    /// Generation in which `best_fitness` last improved.
    pub last_improved: usize,
    /// Best member fitness of recent generations, newest last.
    pub fitness_history: VecDeque<f64>,
}

impl Species {
    /// Creates a species around its first member.
    pub fn new(id: usize, representative: Genome, generation: usize) -> Self {
        Self {
            id,
            representative,
            members: Vec::new(),
            created: generation,
            best_fitness: 0.0,
            last_improved: generation,
            fitness_history: VecDeque::new(),
        }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the species has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Generations since the best fitness last improved.
    pub fn stagnation(&self, generation: usize) -> usize {
        generation.saturating_sub(self.last_improved)
    }

    /// Index of the fittest member.
    pub fn champion(&self, genomes: &[Genome]) -> Option<usize> {
        self.members
            .iter()
            .copied()
            .max_by(|&a, &b| genomes[a].fitness.total_cmp(&genomes[b].fitness))
    }

    /// Records this generation's best member fitness and updates stagnation.
    pub fn update_fitness(&mut self, genomes: &[Genome], generation: usize, max_history: usize) {
        let best = self
            .members
            .iter()
            .map(|&i| genomes[i].fitness)
            .fold(0.0, f64::max);

        self.fitness_history.push_back(best);
        while self.fitness_history.len() > max_history {
            self.fitness_history.pop_front();
        }

        if best > self.best_fitness {
            self.best_fitness = best;
            self.last_improved = generation;
        }
    }

    /// Sum of the members' adjusted fitness.
    pub fn adjusted_fitness(&self, genomes: &[Genome]) -> f64 {
        self.members.iter().map(|&i| genomes[i].adjusted_fitness).sum()
    }
}

/// All species of a population plus the current compatibility threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesSet {
    species: Vec<Species>,
    next_id: usize,
    threshold: f32,
}

impl SpeciesSet {
    /// Creates an empty set.
    pub fn new(threshold: f32) -> Self {
        Self {
            species: Vec::new(),
            next_id: 0,
            threshold,
        }
    }

    /// Species in creation order.
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub(crate) fn species_mut(&mut self) -> &mut [Species] {
        &mut self.species
    }

    /// Keeps only the species that received offspring and reseeds each
    /// survivor's representative from its own offspring. Returns the ids of
    /// the species that were dropped.
    pub fn carry_forward(&mut self, representatives: Vec<(usize, Genome)>) -> Vec<usize> {
        let mut representatives = representatives;
        let mut dropped = Vec::new();
        self.species.retain_mut(|s| {
            match representatives.iter().position(|(id, _)| *id == s.id) {
                Some(pos) => {
                    s.representative = representatives.swap_remove(pos).1;
                    true
                }
                None => {
                    debug!(species = s.id, "species left no offspring");
                    dropped.push(s.id);
                    false
                }
            }
        });
        dropped
    }

    /// Number of species.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Whether no species exist.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Compatibility threshold currently in force.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Looks up the species holding a genome.
    pub fn species_of(&self, genome: usize) -> Option<&Species> {
        self.species.iter().find(|s| s.members.contains(&genome))
    }

    /// Assigns every genome to a species.
    ///
    /// Each genome joins the first species, in creation order, whose
    /// representative lies closer than the threshold. A genome that matches
    /// none founds a new species and becomes its representative. Species left
    /// without members are dropped. Returns the number of species created.
    pub fn speciate(&mut self, genomes: &[Genome], params: &Params, generation: usize) -> usize {
        for s in &mut self.species {
            s.members.clear();
        }

        let mut created = 0;
        for (idx, genome) in genomes.iter().enumerate() {
            let threshold = self.threshold;
            let found = self.species.iter().position(|s| {
                compatibility_distance(&s.representative, genome, params) < threshold
            });

            if let Some(i) = found {
                self.species[i].members.push(idx);
            } else {
                let mut species = Species::new(self.next_id, genome.clone(), generation);
                species.members.push(idx);
                debug!(species = self.next_id, generation, "new species");
                self.next_id += 1;
                self.species.push(species);
                created += 1;
            }
        }

        self.species.retain(|s| {
            if s.is_empty() {
                debug!(species = s.id, generation, "species extinct");
            }
            !s.is_empty()
        });

        self.adjust_threshold(params);
        created
    }

    /// Moves the threshold one step toward `target_species`, if set.
    fn adjust_threshold(&mut self, params: &Params) {
        let Some(target) = params.target_species else {
            return;
        };
        if self.species.len() < target {
            self.threshold = (self.threshold - params.threshold_step).max(params.threshold_step);
        } else if self.species.len() > target {
            self.threshold += params.threshold_step;
        }
    }

    /// Updates every species' fitness record, then removes stagnant species.
    ///
    /// The `species_elitism` species with the best recorded fitness are never
    /// removed. A `stagnation_limit` of 0 disables purging. Returns the ids of
    /// the removed species.
    pub fn purge_stagnant(
        &mut self,
        genomes: &[Genome],
        params: &Params,
        generation: usize,
    ) -> Vec<usize> {
        for s in &mut self.species {
            s.update_fitness(genomes, generation, params.history_size);
        }
        if params.stagnation_limit == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<usize> = (0..self.species.len()).collect();
        ranked.sort_by(|&a, &b| {
            self.species[b]
                .best_fitness
                .total_cmp(&self.species[a].best_fitness)
        });
        let protected: Vec<usize> = ranked
            .iter()
            .take(params.species_elitism)
            .map(|&i| self.species[i].id)
            .collect();

        let mut removed = Vec::new();
        self.species.retain(|s| {
            let stagnant = s.stagnation(generation) >= params.stagnation_limit;
            if stagnant && !protected.contains(&s.id) {
                warn!(
                    species = s.id,
                    best_fitness = s.best_fitness,
                    generations = s.stagnation(generation),
                    "purging stagnant species"
                );
                removed.push(s.id);
                false
            } else {
                true
            }
        });
        removed
    }
}
