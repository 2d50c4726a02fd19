#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use std::collections::HashSet;

use neuroevo::neat::activation::Activation;
use neuroevo::neat::gene::{ConnectionGene, NodeGene, NodeType};
use neuroevo::neat::genome::Genome;
use neuroevo::neat::innovation::{InnovationPolicy, InnovationTracker};
use neuroevo::neat::mutation::{self, Mutation};
use neuroevo::neat::params::Params;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// One input, one output, a single connection with innovation 1.
fn single_link(tracker: &InnovationTracker) -> Genome {
    let mut genome = Genome::new();
    genome.add_node(NodeGene::input(0)).unwrap();
    genome
        .add_node(NodeGene::output(1, Activation::Sigmoid))
        .unwrap();
    tracker.reserve_nodes(2);
    let innovation = tracker.connection(0, 1);
    genome
        .add_connection(ConnectionGene::new(0, 1, 0.7, innovation))
        .unwrap();
    genome
}

fn assert_no_duplicate_enabled_pairs(genome: &Genome) {
    let mut pairs = HashSet::new();
    for c in genome.enabled_connections() {
        assert!(
            pairs.insert(c.endpoints()),
            "duplicate enabled pair {:?}",
            c.endpoints()
        );
    }
}

#[test]
fn test_add_node_splits_connection() {
    let params = Params::new(1, 1);
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(11);
    let mut genome = single_link(&tracker);

    assert!(mutation::add_node(&mut genome, &params, &tracker, &mut rng));

    assert_eq!(genome.node_count(), 3);
    assert_eq!(genome.connection_count(), 3);

    let original = genome.connection_by_innovation(1).unwrap();
    assert!(!original.enabled);

    let hidden = genome.hidden_ids();
    assert_eq!(hidden.len(), 1);
    let node = hidden[0];
    assert_eq!(genome.node(node).unwrap().node_type, NodeType::Hidden);

    let incoming = &genome.connections()[genome.find_connection(0, node).unwrap()];
    let outgoing = &genome.connections()[genome.find_connection(node, 1).unwrap()];
    assert!(incoming.enabled && outgoing.enabled);
    assert_eq!(incoming.weight, 1.0);
    assert_eq!(outgoing.weight, 0.7);
    assert!(genome.validate().is_ok());
}

#[test]
fn test_add_node_without_enabled_connections_is_noop() {
    let params = Params::new(1, 1);
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(3);
    let mut genome = single_link(&tracker);
    assert!(mutation::toggle_enabled(&mut genome, &params, &mut rng));

    assert!(!mutation::add_node(&mut genome, &params, &tracker, &mut rng));
    assert_eq!(genome.node_count(), 2);
}

#[test]
fn test_add_connection_on_saturated_feed_forward_genome() {
    let params = Params::new(2, 1);
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(5);
    let mut genome = Genome::minimal(&params, &tracker, &mut rng);
    assert_eq!(genome.connection_count(), 3);

    // Every source already feeds the only output; the self-loop is a cycle.
    assert!(!mutation::add_connection(
        &mut genome,
        &params,
        &tracker,
        &mut rng
    ));

    let recurrent = Params {
        allow_recurrent: true,
        ..params
    };
    assert!(mutation::add_connection(
        &mut genome,
        &recurrent,
        &tracker,
        &mut rng
    ));
    assert!(genome.has_enabled_connection(3, 3));
}

#[test]
fn test_add_connection_reenables_disabled_pair() {
    let params = Params::new(1, 1);
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(8);
    let mut genome = single_link(&tracker);
    assert!(mutation::toggle_enabled(&mut genome, &params, &mut rng));

    assert!(mutation::add_connection(
        &mut genome,
        &params,
        &tracker,
        &mut rng
    ));
    assert_eq!(genome.connection_count(), 1);
    assert!(genome.connections()[0].enabled);
    assert_eq!(genome.connections()[0].innovation, 1);
}

#[test]
fn test_structural_mutations_keep_invariants() {
    for allow_recurrent in [false, true] {
        let params = Params {
            allow_recurrent,
            ..Params::new(3, 2)
        };
        let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
        let mut rng = StdRng::seed_from_u64(42);
        let mut genome = Genome::minimal(&params, &tracker, &mut rng);

        for step in 0..300 {
            let op = match step % 4 {
                0 => Mutation::AddNode,
                1 | 2 => Mutation::AddConnection,
                _ => Mutation::ToggleEnabled,
            };
            op.apply(&mut genome, &params, &tracker, &mut rng);

            assert!(genome.validate().is_ok(), "invalid genome at step {step}");
            assert_no_duplicate_enabled_pairs(&genome);
            if !allow_recurrent {
                assert!(!genome.network().is_recurrent());
            }
        }
        assert!(!genome.hidden_ids().is_empty());
    }
}

#[test]
fn test_same_split_shares_ids_within_generation() {
    let params = Params::new(1, 1);
    let tracker = InnovationTracker::new(InnovationPolicy::PerGeneration);
    let mut rng = StdRng::seed_from_u64(1);
    let base = single_link(&tracker);

    let mut a = base.clone();
    let mut b = base.clone();
    assert!(mutation::add_node(&mut a, &params, &tracker, &mut rng));
    assert!(mutation::add_node(&mut b, &params, &tracker, &mut rng));

    let innovations =
        |g: &Genome| -> Vec<u64> { g.connections().iter().map(|c| c.innovation).collect() };
    assert_eq!(innovations(&a), innovations(&b));
    assert_eq!(a.hidden_ids(), b.hidden_ids());

    tracker.begin_generation();
    let mut c = base.clone();
    assert!(mutation::add_node(&mut c, &params, &tracker, &mut rng));
    assert_ne!(innovations(&a), innovations(&c));
    assert_ne!(a.hidden_ids(), c.hidden_ids());
}

#[test]
fn test_per_run_policy_keeps_ids_across_generations() {
    let params = Params::new(1, 1);
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(2);
    let base = single_link(&tracker);

    let mut a = base.clone();
    assert!(mutation::add_node(&mut a, &params, &tracker, &mut rng));
    tracker.begin_generation();
    let mut b = base.clone();
    assert!(mutation::add_node(&mut b, &params, &tracker, &mut rng));

    // Both splits copy the original weight, so the genes match exactly.
    assert_eq!(a.connections(), b.connections());
    assert_eq!(a.hidden_ids(), b.hidden_ids());
}

#[test]
fn test_tracker_counters_never_go_backwards() {
    let tracker = InnovationTracker::new(InnovationPolicy::PerGeneration);
    let first = tracker.connection(0, 1);
    assert_eq!(first, 1);
    assert_eq!(tracker.connection(0, 1), first);

    tracker.begin_generation();
    let second = tracker.connection(0, 1);
    assert!(second > first);
    assert_eq!(tracker.peek_innovation(), second + 1);
}

#[test]
fn test_perturb_weights_respects_limit() {
    let params = Params {
        weight_mutation_prob: 1.0,
        weight_replace_prob: 0.0,
        weight_perturb_power: 100.0,
        weight_limit: 2.0,
        ..Params::new(4, 3)
    };
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(9);
    let mut genome = Genome::minimal(&params, &tracker, &mut rng);
    let before: Vec<f32> = genome.connections().iter().map(|c| c.weight).collect();

    assert!(mutation::perturb_weights(&mut genome, &params, &mut rng));

    let after: Vec<f32> = genome.connections().iter().map(|c| c.weight).collect();
    assert_ne!(before, after);
    assert!(after.iter().all(|w| w.abs() <= 2.0));
}

#[test]
fn test_toggle_enabled_flips_flag() {
    let params = Params::new(1, 1);
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(4);
    let mut genome = single_link(&tracker);

    assert!(mutation::toggle_enabled(&mut genome, &params, &mut rng));
    assert!(!genome.connections()[0].enabled);
    assert!(mutation::toggle_enabled(&mut genome, &params, &mut rng));
    assert!(genome.connections()[0].enabled);
}

#[test]
fn test_mutate_activation_uses_options() {
    let params = Params {
        activation_options: vec![Activation::Tanh],
        ..Params::new(1, 1)
    };
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(6);
    let mut genome = single_link(&tracker);

    assert!(!mutation::mutate_activation(&mut genome, &params, &mut rng));
    assert!(mutation::add_node(&mut genome, &params, &tracker, &mut rng));
    assert!(mutation::mutate_activation(&mut genome, &params, &mut rng));

    let hidden = genome.hidden_ids()[0];
    assert_eq!(
        genome.node(hidden).unwrap().activation,
        Some(Activation::Tanh)
    );
}

#[test]
fn test_mutate_reports_applied_operators() {
    let params = Params {
        add_node_prob: 1.0,
        add_connection_prob: 0.0,
        weight_mutation_prob: 0.0,
        toggle_enabled_prob: 0.0,
        ..Params::new(1, 1)
    };
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(12);
    let mut genome = single_link(&tracker);

    let applied = mutation::mutate(&mut genome, &params, &tracker, &mut rng);
    assert_eq!(applied, vec![Mutation::AddNode]);
    assert_eq!(genome.hidden_ids().len(), 1);
}
