//! Executable networks compiled from genomes.
//!
//! Nodes are addressed by dense indices into value arrays rather than by
//! reference, so recurrent topologies need no shared ownership. Building a
//! network computes an evaluation order with a depth-first traversal from the
//! input and bias nodes. Edges that close a cycle are marked as feedback
//! edges and read the value their source held on the previous tick.

use ndarray::Array1;

use super::activation::Activation;
use super::error::{NeatError, NeatResult};
use super::gene::{NodeId, NodeType};
use super::genome::Genome;

#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    weight: f32,
    feedback: bool,
}

#[derive(Debug, Clone)]
struct NodeEval {
    index: usize,
    activation: Activation,
    incoming: Vec<Link>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Open,
    Done,
}

/// A compiled network with its own activation state.
///
/// Ticking overwrites the stored activations, so a network must not be shared
/// between threads while it is being ticked; build one per worker instead.
#[derive(Debug, Clone)]
pub struct Network {
    ids: Vec<NodeId>,
    values: Vec<f32>,
    previous: Vec<f32>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    bias: Option<usize>,
    order: Vec<NodeEval>,
    feedback_links: usize,
}

impl Network {
    /// Compiles a genome.
    pub fn build(genome: &Genome) -> Self {
        let ids: Vec<NodeId> = genome.nodes().map(|n| n.id).collect();
        let index_of = |id: NodeId| ids.binary_search(&id).ok();
        let n = ids.len();

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut bias = None;
        for (i, node) in genome.nodes().enumerate() {
            match node.node_type {
                NodeType::Input => inputs.push(i),
                NodeType::Output => outputs.push(i),
                NodeType::Bias => bias = Some(i),
                NodeType::Hidden => {}
            }
        }

        // Outgoing enabled edges as (target, weight).
        let mut outgoing: Vec<Vec<(usize, f32)>> = vec![Vec::new(); n];
        for c in genome.enabled_connections() {
            if let (Some(s), Some(t)) = (index_of(c.source), index_of(c.target)) {
                outgoing[s].push((t, c.weight));
            }
        }

        let mut marks = vec![Mark::Unvisited; n];
        let mut finished = Vec::with_capacity(n);
        let mut incoming: Vec<Vec<Link>> = vec![Vec::new(); n];
        let mut feedback_links = 0;

        let roots = inputs.iter().copied().chain(bias);
        for root in roots {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::Open;
            let mut stack = vec![(root, 0usize)];
            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                if let Some(&(target, weight)) = outgoing[node].get(frame.1) {
                    frame.1 += 1;
                    let feedback = marks[target] == Mark::Open;
                    if feedback {
                        feedback_links += 1;
                    }
                    incoming[target].push(Link {
                        source: node,
                        weight,
                        feedback,
                    });
                    if marks[target] == Mark::Unvisited {
                        marks[target] = Mark::Open;
                        stack.push((target, 0));
                    }
                } else {
                    marks[node] = Mark::Done;
                    finished.push(node);
                    stack.pop();
                }
            }
        }

        let activation_of = |i: usize| {
            genome
                .node(ids[i])
                .and_then(|node| node.activation)
                .unwrap_or(Activation::Identity)
        };
        let is_source = |i: usize| inputs.contains(&i) || bias == Some(i);

        let mut order: Vec<NodeEval> = finished
            .iter()
            .rev()
            .copied()
            .filter(|&i| !is_source(i))
            .map(|i| NodeEval {
                index: i,
                activation: activation_of(i),
                incoming: std::mem::take(&mut incoming[i]),
            })
            .collect();

        // Outputs nothing reaches still produce activation(0).
        for &i in &outputs {
            if marks[i] == Mark::Unvisited {
                order.push(NodeEval {
                    index: i,
                    activation: activation_of(i),
                    incoming: Vec::new(),
                });
            }
        }

        Self {
            ids,
            values: vec![0.0; n],
            previous: vec![0.0; n],
            inputs,
            outputs,
            bias,
            order,
            feedback_links,
        }
    }

    /// Number of inputs `tick` expects.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Number of outputs `tick` returns.
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Number of connections evaluated with one tick of delay.
    pub fn feedback_links(&self) -> usize {
        self.feedback_links
    }

    /// Whether the network contains cycles.
    pub fn is_recurrent(&self) -> bool {
        self.feedback_links > 0
    }

    /// Advances the network one step.
    ///
    /// Inputs are given in ascending input node id order. Feed-forward paths
    /// settle within the call; values cross each feedback edge once per tick.
    pub fn tick(&mut self, inputs: &Array1<f32>) -> NeatResult<Array1<f32>> {
        if inputs.len() != self.inputs.len() {
            return Err(NeatError::ArityMismatch {
                expected: self.inputs.len(),
                actual: inputs.len(),
            });
        }

        self.previous.copy_from_slice(&self.values);
        for (&slot, &value) in self.inputs.iter().zip(inputs.iter()) {
            self.values[slot] = value;
        }
        if let Some(bias) = self.bias {
            self.values[bias] = 1.0;
        }

        for node in &self.order {
            let sum: f32 = node
                .incoming
                .iter()
                .map(|link| {
                    let value = if link.feedback {
                        self.previous[link.source]
                    } else {
                        self.values[link.source]
                    };
                    link.weight * value
                })
                .sum();
            self.values[node.index] = node.activation.apply(sum);
        }

        Ok(self.outputs.iter().map(|&i| self.values[i]).collect())
    }

    /// Current activation of a node.
    pub fn value(&self, id: NodeId) -> Option<f32> {
        self.ids.binary_search(&id).ok().map(|i| self.values[i])
    }

    /// Zeroes all stored activations.
    pub fn reset(&mut self) {
        self.values.fill(0.0);
        self.previous.fill(0.0);
    }
}
