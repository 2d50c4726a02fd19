//! Genomes: node and connection genes describing one candidate network.
//!
//! Connections are kept sorted by innovation number. Crossover and the
//! compatibility distance walk two genomes side by side in a single linear
//! merge, which relies on this order.

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::{NeatError, NeatResult};
use super::gene::{ConnectionGene, Innovation, NodeGene, NodeId, NodeType};
use super::innovation::InnovationTracker;
use super::network::Network;
use super::params::Params;
use super::reproduction::Origin;

/// One candidate network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Genome {
    nodes: BTreeMap<NodeId, NodeGene>,
    connections: Vec<ConnectionGene>,
    /// Raw fitness assigned by the evaluator.
    pub fitness: f64,
    /// Fitness divided by the size of the genome's species.
    pub adjusted_fitness: f64,
    /// How this genome was produced.
    #[serde(default)]
    pub origin: Origin,
}

impl Genome {
    /// Creates a genome without nodes or connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a seed genome with input, bias and output nodes.
    ///
    /// Input ids are `0..num_inputs`, followed by the bias node (if any) and
    /// the outputs. Each source/output pair is connected with probability
    /// `initial_connection_prob`, with innovations from `tracker` so every seed
    /// genome shares the same ids for the same pairs.
    pub fn minimal<R: Rng + ?Sized>(
        params: &Params,
        tracker: &InnovationTracker,
        rng: &mut R,
    ) -> Self {
        let mut genome = Self::new();
        let mut next_id: NodeId = 0;
        let mut sources = Vec::with_capacity(params.num_inputs + 1);

        for _ in 0..params.num_inputs {
            genome.nodes.insert(next_id, NodeGene::input(next_id));
            sources.push(next_id);
            next_id += 1;
        }
        if params.use_bias {
            genome.nodes.insert(next_id, NodeGene::bias(next_id));
            sources.push(next_id);
            next_id += 1;
        }
        let mut outputs = Vec::with_capacity(params.num_outputs);
        for _ in 0..params.num_outputs {
            genome
                .nodes
                .insert(next_id, NodeGene::output(next_id, params.output_activation));
            outputs.push(next_id);
            next_id += 1;
        }
        tracker.reserve_nodes(next_id);

        for &source in &sources {
            for &target in &outputs {
                if rng.random::<f32>() < params.initial_connection_prob {
                    let innovation = tracker.connection(source, target);
                    let weight = params.weight_init.sample(rng);
                    let inserted = genome.add_connection(ConnectionGene::new(
                        source, target, weight, innovation,
                    ));
                    debug_assert!(inserted.is_ok());
                }
            }
        }

        genome
    }

    /// Adds a node gene.
    pub fn add_node(&mut self, node: NodeGene) -> NeatResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(NeatError::Structural(format!("duplicate node id {}", node.id)));
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Adds a connection gene at its position in innovation order.
    ///
    /// Fails if an endpoint is missing, the target is an input or bias node,
    /// the innovation is already present, or an enabled connection would
    /// duplicate the (source, target) pair of another enabled connection.
    pub fn add_connection(&mut self, connection: ConnectionGene) -> NeatResult<()> {
        let target_type = match (
            self.nodes.get(&connection.source),
            self.nodes.get(&connection.target),
        ) {
            (Some(_), Some(target)) => target.node_type,
            _ => {
                return Err(NeatError::Structural(format!(
                    "connection {} references missing node ({} -> {})",
                    connection.innovation, connection.source, connection.target
                )));
            }
        };
        if target_type.is_source_only() {
            return Err(NeatError::Structural(format!(
                "connection {} targets {:?} node {}",
                connection.innovation, target_type, connection.target
            )));
        }
        if connection.enabled
            && self.has_enabled_connection(connection.source, connection.target)
        {
            return Err(NeatError::Structural(format!(
                "enabled connection {} -> {} already exists",
                connection.source, connection.target
            )));
        }

        match self
            .connections
            .binary_search_by_key(&connection.innovation, |c| c.innovation)
        {
            Ok(_) => Err(NeatError::Structural(format!(
                "duplicate innovation {}",
                connection.innovation
            ))),
            Err(pos) => {
                self.connections.insert(pos, connection);
                Ok(())
            }
        }
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&NodeGene> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeGene> {
        self.nodes.get_mut(&id)
    }

    /// Whether the genome holds a node with this id.
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeGene> {
        self.nodes.values()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connections in ascending innovation order.
    pub fn connections(&self) -> &[ConnectionGene] {
        &self.connections
    }

    /// Mutable view of the connections. Callers change weights and enabled
    /// flags only; innovations and endpoints stay untouched.
    pub(crate) fn connections_mut(&mut self) -> &mut [ConnectionGene] {
        &mut self.connections
    }

    /// Number of connections, enabled or not.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Enabled connections in innovation order.
    pub fn enabled_connections(&self) -> impl Iterator<Item = &ConnectionGene> {
        self.connections.iter().filter(|c| c.enabled)
    }

    /// Looks up a connection by innovation number.
    pub fn connection_by_innovation(&self, innovation: Innovation) -> Option<&ConnectionGene> {
        self.connections
            .binary_search_by_key(&innovation, |c| c.innovation)
            .ok()
            .map(|i| &self.connections[i])
    }

    /// Index of the first connection between `source` and `target`.
    pub fn find_connection(&self, source: NodeId, target: NodeId) -> Option<usize> {
        self.connections
            .iter()
            .position(|c| c.source == source && c.target == target)
    }

    /// Whether an enabled connection joins `source` to `target`.
    pub fn has_enabled_connection(&self, source: NodeId, target: NodeId) -> bool {
        self.connections
            .iter()
            .any(|c| c.enabled && c.source == source && c.target == target)
    }

    fn ids_of(&self, node_type: NodeType) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.node_type == node_type)
            .map(|n| n.id)
            .collect()
    }

    /// Input node ids in ascending order, which is the order `Network::tick`
    /// expects its inputs in.
    pub fn input_ids(&self) -> Vec<NodeId> {
        self.ids_of(NodeType::Input)
    }

    /// Output node ids in ascending order.
    pub fn output_ids(&self) -> Vec<NodeId> {
        self.ids_of(NodeType::Output)
    }

    /// Hidden node ids in ascending order.
    pub fn hidden_ids(&self) -> Vec<NodeId> {
        self.ids_of(NodeType::Hidden)
    }

    /// Id of the bias node, if any.
    pub fn bias_id(&self) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|n| n.node_type == NodeType::Bias)
            .map(|n| n.id)
    }

    /// Highest innovation number in the genome.
    pub fn max_innovation(&self) -> Option<Innovation> {
        self.connections.last().map(|c| c.innovation)
    }

    /// Whether enabling `source -> target` would close a cycle through enabled
    /// connections. Self-loops count as cycles.
    pub fn would_create_cycle(&self, source: NodeId, target: NodeId) -> bool {
        if source == target {
            return true;
        }

        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for c in self.enabled_connections() {
            adjacency.entry(c.source).or_default().push(c.target);
        }

        // Search for a path target ->* source.
        let mut visited = HashSet::new();
        let mut stack = vec![target];
        while let Some(node) = stack.pop() {
            if node == source {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(next) = adjacency.get(&node) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }

    /// Checks every structural invariant.
    pub fn validate(&self) -> NeatResult<()> {
        for (&id, node) in &self.nodes {
            if id != node.id {
                return Err(NeatError::Structural(format!(
                    "node stored under id {id} claims id {}",
                    node.id
                )));
            }
        }

        let mut enabled_pairs = HashSet::new();
        for (i, c) in self.connections.iter().enumerate() {
            if i > 0 && self.connections[i - 1].innovation >= c.innovation {
                return Err(NeatError::Structural(format!(
                    "connections out of innovation order at {}",
                    c.innovation
                )));
            }
            match (self.nodes.get(&c.source), self.nodes.get(&c.target)) {
                (Some(_), Some(target)) if !target.node_type.is_source_only() => {}
                _ => {
                    return Err(NeatError::Structural(format!(
                        "connection {} has an invalid endpoint ({} -> {})",
                        c.innovation, c.source, c.target
                    )));
                }
            }
            if c.enabled && !enabled_pairs.insert(c.endpoints()) {
                return Err(NeatError::Structural(format!(
                    "duplicate enabled connection {} -> {}",
                    c.source, c.target
                )));
            }
        }
        Ok(())
    }

    /// Compiles the genome into an executable network.
    pub fn network(&self) -> Network {
        Network::build(self)
    }

    /// Clears fitness values ahead of a new evaluation.
    pub(crate) fn reset_fitness(&mut self) {
        self.fitness = 0.0;
        self.adjusted_fitness = 0.0;
    }

    /// Encodes the genome as JSON.
    pub fn to_json(&self) -> NeatResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes and validates a genome from JSON.
    pub fn from_json(json: &str) -> NeatResult<Self> {
        let genome: Self = serde_json::from_str(json)?;
        genome.validate()?;
        Ok(genome)
    }

    /// Saves the genome to a JSON file.
    pub fn save_to_file(&self, path: &str) -> NeatResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Loads a genome from a JSON file.
    pub fn load_from_file(path: &str) -> NeatResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
