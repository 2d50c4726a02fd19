//! Structural and parametric mutation operators.
//!
//! Every operator is best-effort: when a genome offers no valid target the
//! operator leaves it untouched and reports `false`.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::gene::{ConnectionGene, NodeGene, NodeId, NodeType};
use super::genome::Genome;
use super::innovation::InnovationTracker;
use super::params::{Params, gaussian};

/// Closed set of mutation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Connects two previously unconnected nodes.
    AddConnection,
    /// Splits an enabled connection with a new hidden node.
    AddNode,
    /// Perturbs or replaces connection weights.
    PerturbWeights,
    /// Flips one connection's enabled flag.
    ToggleEnabled,
    /// Swaps one hidden node's activation function.
    Activation,
}

impl Mutation {
    /// Every operator, in the order `mutate` considers them.
    pub const ALL: [Mutation; 5] = [
        Mutation::AddNode,
        Mutation::AddConnection,
        Mutation::PerturbWeights,
        Mutation::ToggleEnabled,
        Mutation::Activation,
    ];

    /// Applies the operator once. Returns whether the genome changed.
    pub fn apply<R: Rng + ?Sized>(
        self,
        genome: &mut Genome,
        params: &Params,
        tracker: &InnovationTracker,
        rng: &mut R,
    ) -> bool {
        match self {
            Mutation::AddConnection => add_connection(genome, params, tracker, rng),
            Mutation::AddNode => add_node(genome, params, tracker, rng),
            Mutation::PerturbWeights => perturb_weights(genome, params, rng),
            Mutation::ToggleEnabled => toggle_enabled(genome, params, rng),
            Mutation::Activation => mutate_activation(genome, params, rng),
        }
    }

    /// Chance the operator is attempted on an offspring. Weight perturbation
    /// is always attempted and gates itself per connection.
    pub fn probability(self, params: &Params) -> f32 {
        match self {
            Mutation::AddConnection => params.add_connection_prob,
            Mutation::AddNode => params.add_node_prob,
            Mutation::PerturbWeights => 1.0,
            Mutation::ToggleEnabled => params.toggle_enabled_prob,
            Mutation::Activation => params.activation_mutation_prob,
        }
    }
}

/// Attempts each operator with its configured probability.
///
/// Returns the operators that changed the genome.
pub fn mutate<R: Rng + ?Sized>(
    genome: &mut Genome,
    params: &Params,
    tracker: &InnovationTracker,
    rng: &mut R,
) -> Vec<Mutation> {
    let mut applied = Vec::new();
    for mutation in Mutation::ALL {
        if rng.random::<f32>() < mutation.probability(params)
            && mutation.apply(genome, params, tracker, rng)
        {
            applied.push(mutation);
        }
    }
    applied
}

/// Nodes reachable from each node through enabled connections, itself included.
fn descendants(genome: &Genome) -> HashMap<NodeId, Vec<NodeId>> {
    let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for c in genome.enabled_connections() {
        adjacency.entry(c.source).or_default().push(c.target);
    }

    genome
        .nodes()
        .map(|start| {
            let mut seen = vec![start.id];
            let mut stack = vec![start.id];
            while let Some(node) = stack.pop() {
                for &next in adjacency.get(&node).into_iter().flatten() {
                    if !seen.contains(&next) {
                        seen.push(next);
                        stack.push(next);
                    }
                }
            }
            (start.id, seen)
        })
        .collect()
}

/// Adds a connection between a random pair of nodes lacking an enabled one.
///
/// Targets are hidden or output nodes. Without recurrence, pairs that would
/// close a cycle are skipped. A disabled connection for the chosen pair is
/// re-enabled with a fresh weight instead of duplicated.
pub fn add_connection<R: Rng + ?Sized>(
    genome: &mut Genome,
    params: &Params,
    tracker: &InnovationTracker,
    rng: &mut R,
) -> bool {
    let reach = (!params.allow_recurrent).then(|| descendants(genome));

    let sources: Vec<NodeId> = genome.nodes().map(|n| n.id).collect();
    let targets: Vec<NodeId> = genome
        .nodes()
        .filter(|n| !n.node_type.is_source_only())
        .map(|n| n.id)
        .collect();

    let mut candidates = Vec::new();
    for &target in &targets {
        for &source in &sources {
            if genome.has_enabled_connection(source, target) {
                continue;
            }
            let cyclic = reach
                .as_ref()
                .is_some_and(|r| r.get(&target).is_some_and(|d| d.contains(&source)));
            if !cyclic {
                candidates.push((source, target));
            }
        }
    }

    if candidates.is_empty() {
        return false;
    }
    let (source, target) = candidates[rng.random_range(0..candidates.len())];
    let weight = params.weight_init.sample(rng);

    if let Some(idx) = genome.find_connection(source, target) {
        let existing = &mut genome.connections_mut()[idx];
        existing.enabled = true;
        existing.weight = weight;
        return true;
    }

    let innovation = tracker.connection(source, target);
    genome
        .add_connection(ConnectionGene::new(source, target, weight, innovation))
        .is_ok()
}

/// Splits a random enabled connection with a new hidden node.
///
/// The original connection is disabled. The incoming connection gets weight
/// 1.0 and the outgoing one inherits the original weight.
pub fn add_node<R: Rng + ?Sized>(
    genome: &mut Genome,
    params: &Params,
    tracker: &InnovationTracker,
    rng: &mut R,
) -> bool {
    let enabled: Vec<usize> = genome
        .connections()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.enabled)
        .map(|(i, _)| i)
        .collect();
    if enabled.is_empty() {
        return false;
    }

    let idx = enabled[rng.random_range(0..enabled.len())];
    let split_gene = genome.connections()[idx].clone();

    let mut ids = tracker.split(split_gene.innovation, split_gene.source, split_gene.target);
    while genome.has_node(ids.node)
        || genome.connection_by_innovation(ids.incoming).is_some()
        || genome.connection_by_innovation(ids.outgoing).is_some()
    {
        ids = tracker.fresh_split();
    }

    genome.connections_mut()[idx].enabled = false;
    if genome
        .add_node(NodeGene::hidden(ids.node, params.hidden_activation))
        .is_err()
    {
        return false;
    }
    let incoming = ConnectionGene::new(split_gene.source, ids.node, 1.0, ids.incoming);
    let outgoing =
        ConnectionGene::new(ids.node, split_gene.target, split_gene.weight, ids.outgoing);
    genome
        .add_connection(incoming)
        .and_then(|()| genome.add_connection(outgoing))
        .is_ok()
}

/// Mutates each connection weight with probability `weight_mutation_prob`.
///
/// A mutated weight is replaced with a fresh sample with probability
/// `weight_replace_prob`, otherwise it receives Gaussian noise. Results are
/// clamped to `weight_limit`.
pub fn perturb_weights<R: Rng + ?Sized>(
    genome: &mut Genome,
    params: &Params,
    rng: &mut R,
) -> bool {
    let mut changed = false;
    for c in genome.connections_mut() {
        if rng.random::<f32>() >= params.weight_mutation_prob {
            continue;
        }
        let weight = if rng.random::<f32>() < params.weight_replace_prob {
            params.weight_init.sample(rng)
        } else {
            c.weight + gaussian(rng, params.weight_perturb_power)
        };
        c.weight = weight.clamp(-params.weight_limit, params.weight_limit);
        changed = true;
    }
    changed
}

/// Flips the enabled flag of a random connection.
///
/// Enabling is skipped when it would duplicate an enabled pair or, without
/// recurrence, close a cycle.
pub fn toggle_enabled<R: Rng + ?Sized>(
    genome: &mut Genome,
    params: &Params,
    rng: &mut R,
) -> bool {
    let count = genome.connection_count();
    if count == 0 {
        return false;
    }

    let idx = rng.random_range(0..count);
    let gene = &genome.connections()[idx];
    if !gene.enabled {
        let (source, target) = gene.endpoints();
        if genome.has_enabled_connection(source, target)
            || (!params.allow_recurrent && genome.would_create_cycle(source, target))
        {
            return false;
        }
    }

    let gene = &mut genome.connections_mut()[idx];
    gene.enabled = !gene.enabled;
    true
}

/// Gives a random hidden node a random activation from `activation_options`.
pub fn mutate_activation<R: Rng + ?Sized>(
    genome: &mut Genome,
    params: &Params,
    rng: &mut R,
) -> bool {
    let hidden = genome.hidden_ids();
    if hidden.is_empty() || params.activation_options.is_empty() {
        return false;
    }

    let id = hidden[rng.random_range(0..hidden.len())];
    let options = &params.activation_options;
    let activation = options[rng.random_range(0..options.len())];
    match genome.node_mut(id) {
        Some(node) if node.node_type == NodeType::Hidden => {
            node.activation = Some(activation);
            true
        }
        _ => false,
    }
}
