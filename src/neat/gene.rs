//! Node and connection genes, the atomic units a genome is built from.

use serde::{Deserialize, Serialize};

use super::activation::Activation;

/// Identifier of a node, unique within a genome.
///
/// Hidden node ids are handed out by the innovation tracker, so the node
/// created by splitting the same connection carries the same id in every
/// genome that made that split.
pub type NodeId = u64;

/// Historical marker of a structural mutation event.
pub type Innovation = u64;

/// Role a node plays in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Receives an external input value each tick.
    Input,
    /// Produces one of the network's outputs.
    Output,
    /// Interior node created by splitting a connection.
    Hidden,
    /// Constant 1.0 source.
    Bias,
}

impl NodeType {
    /// Whether connections may originate only from this node, never end at it.
    pub fn is_source_only(self) -> bool {
        matches!(self, NodeType::Input | NodeType::Bias)
    }
}

/// A node gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    /// Identifier within the genome.
    pub id: NodeId,
    /// Role of the node.
    pub node_type: NodeType,
    /// Activation applied to the weighted sum; `None` for inputs and bias.
    pub activation: Option<Activation>,
}

impl NodeGene {
    /// Creates an input node.
    pub fn input(id: NodeId) -> Self {
        Self {
            id,
            node_type: NodeType::Input,
            activation: None,
        }
    }

    /// Creates the bias node.
    pub fn bias(id: NodeId) -> Self {
        Self {
            id,
            node_type: NodeType::Bias,
            activation: None,
        }
    }

    /// Creates an output node.
    pub fn output(id: NodeId, activation: Activation) -> Self {
        Self {
            id,
            node_type: NodeType::Output,
            activation: Some(activation),
        }
    }

    /// Creates a hidden node.
    pub fn hidden(id: NodeId, activation: Activation) -> Self {
        Self {
            id,
            node_type: NodeType::Hidden,
            activation: Some(activation),
        }
    }
}

/// A weighted connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
    /// Connection weight.
    pub weight: f32,
    /// Disabled connections are kept for alignment but skipped by networks.
    pub enabled: bool,
    /// Innovation number used to align genes across genomes.
    pub innovation: Innovation,
}

impl ConnectionGene {
    /// Creates an enabled connection.
    pub fn new(source: NodeId, target: NodeId, weight: f32, innovation: Innovation) -> Self {
        Self {
            source,
            target,
            weight,
            enabled: true,
            innovation,
        }
    }

    /// The (source, target) pair.
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.source, self.target)
    }
}
