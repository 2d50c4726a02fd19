//! Bounded record of recent generations.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Summary of one evaluated generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation number
    pub generation: usize,
    /// Best fitness in the generation
    pub best_fitness: f64,
    /// Mean fitness over all genomes
    pub mean_fitness: f64,
    /// Number of species after speciation (0 until speciated)
    pub species_count: usize,
    /// Genomes whose evaluation failed
    pub failures: usize,
    /// Node count of the generation's best genome
    pub champion_nodes: usize,
    /// Enabled connection count of the generation's best genome
    pub champion_connections: usize,
}

/// Ring buffer of generation records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationHistory {
    /// Recent records, newest first
    records: VecDeque<GenerationRecord>,
    /// Maximum number of records to keep
    max_records: usize,
}

impl Default for GenerationHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl GenerationHistory {
    /// Creates an empty history with the given capacity
    pub fn new(max_records: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_records),
            max_records,
        }
    }

    /// Adds a record, dropping the oldest beyond capacity
    pub fn push(&mut self, record: GenerationRecord) {
        self.records.push_front(record);
        while self.records.len() > self.max_records {
            self.records.pop_back();
        }
    }

    /// Most recent record
    pub fn latest(&self) -> Option<&GenerationRecord> {
        self.records.front()
    }

    pub(crate) fn latest_mut(&mut self) -> Option<&mut GenerationRecord> {
        self.records.front_mut()
    }

    /// All records, newest first
    pub fn records(&self) -> &VecDeque<GenerationRecord> {
        &self.records
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Best fitness per recorded generation, oldest first
    pub fn best_fitness_trend(&self) -> Vec<f64> {
        self.records.iter().rev().map(|r| r.best_fitness).collect()
    }

    /// Clears all records
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
