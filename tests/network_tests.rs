#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use ndarray::array;
use neuroevo::neat::activation::Activation;
use neuroevo::neat::error::NeatError;
use neuroevo::neat::gene::{ConnectionGene, NodeGene};
use neuroevo::neat::genome::Genome;
use neuroevo::neat::innovation::{InnovationPolicy, InnovationTracker};
use neuroevo::neat::network::Network;
use neuroevo::neat::params::Params;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Inputs 0 and 1, identity output 2.
fn two_input_genome() -> Genome {
    let mut genome = Genome::new();
    genome.add_node(NodeGene::input(0)).unwrap();
    genome.add_node(NodeGene::input(1)).unwrap();
    genome
        .add_node(NodeGene::output(2, Activation::Identity))
        .unwrap();
    genome
}

#[test]
fn test_weighted_sum_feed_forward() {
    let mut genome = two_input_genome();
    genome
        .add_connection(ConnectionGene::new(0, 2, 0.5, 1))
        .unwrap();
    genome
        .add_connection(ConnectionGene::new(1, 2, -2.0, 2))
        .unwrap();

    let mut network = genome.network();
    let out = network.tick(&array![2.0, 1.0]).unwrap();

    assert_eq!(out.len(), 1);
    assert!((out[0] - (-1.0)).abs() < 1e-6);
    assert!(!network.is_recurrent());
}

#[test]
fn test_hidden_layer_settles_within_one_tick() {
    let mut genome = two_input_genome();
    genome
        .add_node(NodeGene::hidden(3, Activation::Identity))
        .unwrap();
    genome
        .add_connection(ConnectionGene::new(0, 3, 2.0, 1))
        .unwrap();
    genome
        .add_connection(ConnectionGene::new(3, 2, 3.0, 2))
        .unwrap();
    genome
        .add_connection(ConnectionGene::new(1, 2, 1.0, 3))
        .unwrap();

    let mut network = genome.network();
    let out = network.tick(&array![1.0, 1.0]).unwrap();

    assert!((out[0] - 7.0).abs() < 1e-6);
    assert_eq!(network.value(3), Some(2.0));
}

#[test]
fn test_repeated_ticks_are_deterministic() {
    let params = Params {
        seed: Some(7),
        ..Params::new(3, 2)
    };
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(7);
    let genome = Genome::minimal(&params, &tracker, &mut rng);

    let inputs = array![0.3, -0.7, 1.5];
    let mut first = genome.network();
    let mut second = genome.network();

    let a = first.tick(&inputs).unwrap();
    let b = first.tick(&inputs).unwrap();
    let c = second.tick(&inputs).unwrap();

    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn test_arity_mismatch() {
    let mut genome = two_input_genome();
    genome
        .add_connection(ConnectionGene::new(0, 2, 1.0, 1))
        .unwrap();
    let mut network = genome.network();

    match network.tick(&array![1.0, 2.0, 3.0]) {
        Err(NeatError::ArityMismatch { expected, actual }) => {
            assert_eq!(expected, 2);
            assert_eq!(actual, 3);
        }
        other => panic!("expected arity mismatch, got {:?}", other),
    }
}

#[test]
fn test_unconnected_output_is_activation_of_zero() {
    let params = Params {
        initial_connection_prob: 0.0,
        output_activation: Activation::Sigmoid,
        ..Params::new(2, 3)
    };
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(1);
    let genome = Genome::minimal(&params, &tracker, &mut rng);
    assert_eq!(genome.connection_count(), 0);

    let mut network = genome.network();
    let out = network.tick(&array![5.0, -5.0]).unwrap();

    assert_eq!(out.len(), 3);
    for value in out.iter() {
        assert!((value - 0.5).abs() < 1e-6);
    }
}

#[test]
fn test_bias_node_outputs_one() {
    let mut genome = two_input_genome();
    genome.add_node(NodeGene::bias(5)).unwrap();
    genome
        .add_connection(ConnectionGene::new(5, 2, 0.25, 1))
        .unwrap();

    let mut network = genome.network();
    let out = network.tick(&array![0.0, 0.0]).unwrap();

    assert!((out[0] - 0.25).abs() < 1e-6);
}

#[test]
fn test_disabled_connections_are_ignored() {
    let mut genome = two_input_genome();
    let mut disabled = ConnectionGene::new(0, 2, 10.0, 1);
    disabled.enabled = false;
    genome.add_connection(disabled).unwrap();
    genome
        .add_connection(ConnectionGene::new(1, 2, 1.0, 2))
        .unwrap();

    let mut network = genome.network();
    let out = network.tick(&array![1.0, 1.0]).unwrap();

    assert!((out[0] - 1.0).abs() < 1e-6);
}

#[test]
fn test_unreachable_hidden_node_is_pruned() {
    let mut genome = two_input_genome();
    // Hidden node 3 has no incoming connection; sigmoid(0) would leak 0.5.
    genome
        .add_node(NodeGene::hidden(3, Activation::Sigmoid))
        .unwrap();
    genome
        .add_connection(ConnectionGene::new(3, 2, 1.0, 1))
        .unwrap();
    genome
        .add_connection(ConnectionGene::new(0, 2, 1.0, 2))
        .unwrap();

    let mut network = genome.network();
    let out = network.tick(&array![2.0, 0.0]).unwrap();

    assert!((out[0] - 2.0).abs() < 1e-6);
}

#[test]
fn test_self_loop_moves_one_hop_per_tick() {
    let mut genome = two_input_genome();
    genome
        .add_connection(ConnectionGene::new(0, 2, 1.0, 1))
        .unwrap();
    genome
        .add_connection(ConnectionGene::new(2, 2, 0.5, 2))
        .unwrap();

    let mut network = genome.network();
    assert!(network.is_recurrent());
    assert_eq!(network.feedback_links(), 1);

    let out = network.tick(&array![1.0, 0.0]).unwrap();
    assert!((out[0] - 1.0).abs() < 1e-6);
    let out = network.tick(&array![0.0, 0.0]).unwrap();
    assert!((out[0] - 0.5).abs() < 1e-6);
    let out = network.tick(&array![0.0, 0.0]).unwrap();
    assert!((out[0] - 0.25).abs() < 1e-6);
}

#[test]
fn test_recurrent_loop_accumulates_and_resets() {
    let mut genome = two_input_genome();
    genome
        .add_node(NodeGene::hidden(3, Activation::Identity))
        .unwrap();
    genome
        .add_connection(ConnectionGene::new(0, 3, 1.0, 1))
        .unwrap();
    genome
        .add_connection(ConnectionGene::new(3, 2, 1.0, 2))
        .unwrap();
    genome
        .add_connection(ConnectionGene::new(2, 3, 1.0, 3))
        .unwrap();

    let mut network = genome.network();
    let inputs = array![1.0, 0.0];

    let outputs: Vec<f32> = (0..3)
        .map(|_| network.tick(&inputs).unwrap()[0])
        .collect();
    assert_eq!(outputs, vec![1.0, 2.0, 3.0]);

    network.reset();
    let out = network.tick(&inputs).unwrap();
    assert_eq!(out[0], 1.0);
}

#[test]
fn test_interface_sizes() {
    let params = Params::new(4, 2);
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(3);
    let genome = Genome::minimal(&params, &tracker, &mut rng);
    let network = Network::build(&genome);

    assert_eq!(network.num_inputs(), 4);
    assert_eq!(network.num_outputs(), 2);
    assert_eq!(genome.input_ids(), vec![0, 1, 2, 3]);
    assert_eq!(genome.bias_id(), Some(4));
    assert_eq!(genome.output_ids(), vec![5, 6]);
}
