//! # Neuroevo - NEAT Neuroevolution
//!
//! Evolves neural networks of varying topology with the NEAT algorithm.
//! Genomes start minimal and grow hidden nodes and connections through
//! mutation. Historical innovation numbers let crossover align genes of
//! different topologies, and speciation shields new structure from
//! competition until it has had time to tune its weights.
//!
//! ## Features
//!
//! - Node and connection genes with global innovation tracking
//! - Feed-forward and recurrent networks evaluated on an index arena
//! - Structural and weight mutations, linear-merge crossover
//! - Compatibility distance, speciation with stagnation and fitness sharing
//! - Generation manager with parallel fitness evaluation (rayon)
//! - JSON save/load of genomes, parameters and population checkpoints
//!
//! ## Core Modules
//!
//! - [`neat::genome`] - Genome representation and invariants
//! - [`neat::network`] - Compiled networks for evaluation
//! - [`neat::mutation`] - Mutation operators
//! - [`neat::crossover`] - Crossover and offspring generators
//! - [`neat::species`] - Speciation
//! - [`neat::population`] - Generation state machine
//!
//! ## Example
//!
//! ```no_run
//! use ndarray::array;
//! use neuroevo::neat::{params::Params, population::Population};
//!
//! let mut population = Population::new(Params::new(2, 1))?;
//! for _ in 0..50 {
//!     let report = population.epoch(|genome| {
//!         let mut network = genome.network();
//!         let out = network.tick(&array![1.0, 0.0])?;
//!         Ok::<f64, neuroevo::neat::error::NeatError>(f64::from(out[0]))
//!     })?;
//!     println!("{}: {}", report.generation, report.best_fitness);
//! }
//! # Ok::<(), neuroevo::neat::error::NeatError>(())
//! ```

/// NEAT genomes, networks and the evolutionary loop.
pub mod neat {
    /// Activation functions for hidden and output nodes.
    pub mod activation;
    /// Crossover between two parents.
    pub mod crossover;
    /// Compatibility distance between genomes.
    pub mod distance;
    /// Error type shared by the crate.
    pub mod error;
    /// Parallel fitness evaluation and outcome collection.
    pub mod evaluation;
    /// Node and connection genes.
    pub mod gene;
    /// Genome representation.
    pub mod genome;
    /// Bounded per-generation records.
    pub mod history;
    /// Innovation number and node id allocation.
    pub mod innovation;
    /// Structural and weight mutations.
    pub mod mutation;
    /// Executable networks built from genomes.
    ///
    /// A [`network::Network`] is compiled once from a genome and then ticked
    /// repeatedly. Recurrent connections carry values across ticks.
    pub mod network;
    /// Run parameters.
    pub mod params;
    /// Population and generation state machine.
    pub mod population;
    /// Offspring lineage and reproduction statistics.
    pub mod reproduction;
    /// Species and speciation.
    pub mod species;
}

pub use neat::error::{NeatError, NeatResult};
pub use neat::genome::Genome;
pub use neat::network::Network;
pub use neat::params::Params;
pub use neat::population::Population;
