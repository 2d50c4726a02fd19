//! Error types shared by every part of the evolutionary core.

use thiserror::Error;

use super::population::Phase;

/// Result type for NEAT operations.
pub type NeatResult<T> = Result<T, NeatError>;

/// Errors surfaced by genomes, networks and the population manager.
#[derive(Error, Debug)]
pub enum NeatError {
    /// A genetic operation could not proceed because required genes are missing
    /// or would be duplicated. Mutation and crossover absorb this locally.
    #[error("structural error: {0}")]
    Structural(String),

    /// A network was ticked with the wrong number of inputs.
    #[error("arity mismatch: expected {expected} inputs, got {actual}")]
    ArityMismatch {
        /// Number of input nodes in the network.
        expected: usize,
        /// Number of values supplied by the caller.
        actual: usize,
    },

    /// Every species was eliminated; the run cannot continue.
    #[error("population is empty: all species were eliminated")]
    EmptyPopulation,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A generation step was invoked out of order.
    #[error("invalid phase: expected {expected:?}, population is in {actual:?}")]
    InvalidPhase {
        /// Phase the step requires.
        expected: Phase,
        /// Phase the population is currently in.
        actual: Phase,
    },

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
