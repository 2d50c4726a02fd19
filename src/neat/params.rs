use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::activation::Activation;
use super::error::{NeatError, NeatResult};
use super::innovation::InnovationPolicy;

/// Distribution new connection weights are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Uniform in `[-bound, bound]`.
    Uniform {
        /// Half-width of the interval.
        bound: f32,
    },
    /// Zero-mean normal distribution.
    Gaussian {
        /// Standard deviation.
        stdev: f32,
    },
}

impl WeightInit {
    /// Draws a weight.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> f32 {
        match self {
            WeightInit::Uniform { bound } => {
                if bound > 0.0 {
                    rng.random_range(-bound..=bound)
                } else {
                    0.0
                }
            }
            WeightInit::Gaussian { stdev } => gaussian(rng, stdev),
        }
    }
}

/// Samples zero-mean Gaussian noise; a non-positive deviation yields zero.
pub(crate) fn gaussian<R: Rng + ?Sized>(rng: &mut R, stdev: f32) -> f32 {
    Normal::new(0.0, stdev)
        .map(|normal| normal.sample(rng))
        .unwrap_or(0.0)
}

/// Evolution parameters.
///
/// Every field has a default, so a JSON file only needs to name the values it
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Number of input nodes.
    pub num_inputs: usize,
    /// Number of output nodes.
    pub num_outputs: usize,
    /// Whether genomes carry a constant 1.0 bias node.
    pub use_bias: bool,
    /// Number of genomes per generation.
    pub population_size: usize,

    /// Species membership cutoff for the compatibility distance.
    pub compatibility_threshold: f32,
    /// Coefficient `c1` for excess genes.
    pub excess_coefficient: f32,
    /// Coefficient `c2` for disjoint genes.
    pub disjoint_coefficient: f32,
    /// Coefficient `c3` for the mean weight difference of matching genes.
    pub weight_coefficient: f32,
    /// Genomes with fewer connections than this are not size-normalised.
    pub normalize_threshold: usize,
    /// Desired species count; when set, the threshold is adjusted each generation.
    pub target_species: Option<usize>,
    /// Amount the threshold moves per generation toward `target_species`.
    pub threshold_step: f32,

    /// Probability of an add-connection mutation per offspring.
    pub add_connection_prob: f32,
    /// Probability of an add-node mutation per offspring.
    pub add_node_prob: f32,
    /// Per-connection probability of a weight mutation.
    pub weight_mutation_prob: f32,
    /// Probability that a weight mutation replaces instead of perturbing.
    pub weight_replace_prob: f32,
    /// Standard deviation of weight perturbations.
    pub weight_perturb_power: f32,
    /// Weights are clamped to `[-weight_limit, weight_limit]`.
    pub weight_limit: f32,
    /// Distribution of fresh weights.
    pub weight_init: WeightInit,
    /// Probability of toggling one connection's enabled flag per offspring.
    pub toggle_enabled_prob: f32,
    /// Probability of changing one hidden node's activation per offspring.
    pub activation_mutation_prob: f32,
    /// Probability that each input-output pair is connected in the seed genomes.
    pub initial_connection_prob: f32,
    /// Whether mutation may create cycles.
    pub allow_recurrent: bool,

    /// Activation of output nodes.
    pub output_activation: Activation,
    /// Activation of newly inserted hidden nodes.
    pub hidden_activation: Activation,
    /// Choices for activation mutations.
    pub activation_options: Vec<Activation>,

    /// Fraction of each species kept as parents.
    pub survival_threshold: f32,
    /// Number of unmodified champions copied per species.
    pub elitism: usize,
    /// Probability an offspring is a mutated clone rather than a crossover child.
    pub mutate_only_prob: f32,
    /// Probability a crossover partner is taken from another species.
    pub interspecies_mating_prob: f32,
    /// Inclusion probability of non-matching genes when parents tie.
    pub tie_gene_inclusion_prob: f32,
    /// Probability an inherited gene stays disabled if either parent disabled it.
    pub disable_inherited_prob: f32,

    /// Generations without improvement before a species is stagnant.
    pub stagnation_limit: usize,
    /// Number of best species protected from stagnation purges.
    pub species_elitism: usize,

    /// Lifetime of the innovation lookup table.
    pub innovation_policy: InnovationPolicy,
    /// Number of generation records kept in the history.
    pub history_size: usize,
    /// Seed for the population's random number generator.
    pub seed: Option<u64>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            num_inputs: 2,
            num_outputs: 1,
            use_bias: true,
            population_size: 150,

            compatibility_threshold: 3.0,
            excess_coefficient: 1.0,
            disjoint_coefficient: 1.0,
            weight_coefficient: 0.4,
            normalize_threshold: 20,
            target_species: None,
            threshold_step: 0.3,

            add_connection_prob: 0.05,
            add_node_prob: 0.03,
            weight_mutation_prob: 0.8,
            weight_replace_prob: 0.1,
            weight_perturb_power: 0.5,
            weight_limit: 8.0,
            weight_init: WeightInit::Uniform { bound: 1.0 },
            toggle_enabled_prob: 0.01,
            activation_mutation_prob: 0.0,
            initial_connection_prob: 1.0,
            allow_recurrent: false,

            output_activation: Activation::Sigmoid,
            hidden_activation: Activation::Sigmoid,
            activation_options: vec![Activation::Sigmoid, Activation::Tanh, Activation::Relu],

            survival_threshold: 0.2,
            elitism: 1,
            mutate_only_prob: 0.25,
            interspecies_mating_prob: 0.001,
            tie_gene_inclusion_prob: 0.5,
            disable_inherited_prob: 0.75,

            stagnation_limit: 15,
            species_elitism: 2,

            innovation_policy: InnovationPolicy::PerGeneration,
            history_size: 100,
            seed: None,
        }
    }
}

impl Params {
    /// Default parameters for a network with the given interface.
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            num_inputs,
            num_outputs,
            ..Self::default()
        }
    }

    /// Checks every value is in range.
    pub fn validate(&self) -> NeatResult<()> {
        fn invalid(msg: String) -> NeatResult<()> {
            Err(NeatError::InvalidConfiguration(msg))
        }

        if self.num_inputs == 0 {
            return invalid("num_inputs must be at least 1".into());
        }
        if self.num_outputs == 0 {
            return invalid("num_outputs must be at least 1".into());
        }
        if self.population_size == 0 {
            return invalid("population_size must be at least 1".into());
        }

        let probabilities = [
            ("add_connection_prob", self.add_connection_prob),
            ("add_node_prob", self.add_node_prob),
            ("weight_mutation_prob", self.weight_mutation_prob),
            ("weight_replace_prob", self.weight_replace_prob),
            ("toggle_enabled_prob", self.toggle_enabled_prob),
            ("activation_mutation_prob", self.activation_mutation_prob),
            ("initial_connection_prob", self.initial_connection_prob),
            ("mutate_only_prob", self.mutate_only_prob),
            ("interspecies_mating_prob", self.interspecies_mating_prob),
            ("tie_gene_inclusion_prob", self.tie_gene_inclusion_prob),
            ("disable_inherited_prob", self.disable_inherited_prob),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{name} must be in [0, 1], got {p}"));
            }
        }

        if !(self.survival_threshold > 0.0 && self.survival_threshold <= 1.0) {
            return invalid(format!(
                "survival_threshold must be in (0, 1], got {}",
                self.survival_threshold
            ));
        }
        if !self.compatibility_threshold.is_finite() || self.compatibility_threshold < 0.0 {
            return invalid(format!(
                "compatibility_threshold must be finite and non-negative, got {}",
                self.compatibility_threshold
            ));
        }

        let non_negative = [
            ("excess_coefficient", self.excess_coefficient),
            ("disjoint_coefficient", self.disjoint_coefficient),
            ("weight_coefficient", self.weight_coefficient),
            ("weight_perturb_power", self.weight_perturb_power),
            ("threshold_step", self.threshold_step),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be finite and non-negative, got {value}"));
            }
        }

        if !self.weight_limit.is_finite() || self.weight_limit <= 0.0 {
            return invalid(format!("weight_limit must be positive, got {}", self.weight_limit));
        }
        match self.weight_init {
            WeightInit::Uniform { bound: v } | WeightInit::Gaussian { stdev: v }
                if !v.is_finite() || v < 0.0 =>
            {
                return invalid(format!("weight_init parameter must be non-negative, got {v}"));
            }
            _ => {}
        }

        if self.activation_mutation_prob > 0.0 && self.activation_options.is_empty() {
            return invalid("activation_options must not be empty when activations mutate".into());
        }
        if self.elitism > self.population_size {
            return invalid(format!(
                "elitism ({}) exceeds population_size ({})",
                self.elitism, self.population_size
            ));
        }
        if self.target_species == Some(0) {
            return invalid("target_species must be at least 1".into());
        }
        if self.history_size == 0 {
            return invalid("history_size must be at least 1".into());
        }

        Ok(())
    }

    /// Loads and validates parameters from a JSON file.
    pub fn load_from_file(path: &str) -> NeatResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&json)?;
        params.validate()?;
        Ok(params)
    }

    /// Saves the parameters as pretty-printed JSON.
    pub fn save_to_file(&self, path: &str) -> NeatResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
