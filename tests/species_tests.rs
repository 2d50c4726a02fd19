#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use neuroevo::neat::activation::Activation;
use neuroevo::neat::distance::{compare, compatibility_distance};
use neuroevo::neat::gene::{ConnectionGene, NodeGene};
use neuroevo::neat::genome::Genome;
use neuroevo::neat::innovation::{InnovationPolicy, InnovationTracker};
use neuroevo::neat::mutation;
use neuroevo::neat::params::Params;
use neuroevo::neat::species::SpeciesSet;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn genome_with(links: &[(u64, u64, f32, u64)]) -> Genome {
    let mut genome = Genome::new();
    for id in 0..3 {
        genome.add_node(NodeGene::input(id)).unwrap();
    }
    genome
        .add_node(NodeGene::output(3, Activation::Sigmoid))
        .unwrap();
    for &(source, target, weight, innovation) in links {
        if !genome.has_node(source) {
            genome
                .add_node(NodeGene::hidden(source, Activation::Sigmoid))
                .unwrap();
        }
        if !genome.has_node(target) {
            genome
                .add_node(NodeGene::hidden(target, Activation::Sigmoid))
                .unwrap();
        }
        genome
            .add_connection(ConnectionGene::new(source, target, weight, innovation))
            .unwrap();
    }
    genome
}

fn random_population(params: &Params, size: usize, seed: u64) -> Vec<Genome> {
    let tracker = InnovationTracker::new(InnovationPolicy::PerRun);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..size)
        .map(|_| {
            let mut genome = Genome::minimal(params, &tracker, &mut rng);
            mutation::mutate(&mut genome, params, &tracker, &mut rng);
            genome
        })
        .collect()
}

#[test]
fn test_compare_classifies_genes() {
    let a = genome_with(&[(0, 3, 1.0, 1), (1, 3, 1.0, 2), (2, 3, 1.0, 3)]);
    let b = genome_with(&[(0, 3, 0.5, 1), (1, 3, 2.0, 2), (2, 5, 1.0, 4)]);

    let cmp = compare(&a, &b);
    assert_eq!(cmp.matching, 2);
    assert_eq!(cmp.disjoint, 1);
    assert_eq!(cmp.excess, 1);
    assert!((cmp.mean_weight_difference - 0.75).abs() < 1e-6);

    let params = Params::new(3, 1);
    let d = compatibility_distance(&a, &b, &params);
    assert!((d - (1.0 + 1.0 + 0.4 * 0.75)).abs() < 1e-6);
}

#[test]
fn test_large_genomes_are_normalised() {
    let links_a: Vec<_> = (0..30).map(|i| (0, 100 + i, 1.0, i + 1)).collect();
    let links_b: Vec<_> = (0..20).map(|i| (0, 100 + i, 1.0, i + 1)).collect();
    let a = genome_with(&links_a);
    let b = genome_with(&links_b);

    let params = Params::new(3, 1);
    let d = compatibility_distance(&a, &b, &params);
    assert!((d - 10.0 / 30.0).abs() < 1e-6);
}

#[test]
fn test_distance_is_symmetric_and_zero_on_self() {
    let params = Params {
        add_node_prob: 0.5,
        add_connection_prob: 0.5,
        ..Params::new(3, 2)
    };
    let genomes = random_population(&params, 12, 17);

    for a in &genomes {
        assert_eq!(compatibility_distance(a, a, &params), 0.0);
        for b in &genomes {
            assert_eq!(
                compatibility_distance(a, b, &params),
                compatibility_distance(b, a, &params)
            );
        }
    }
}

#[test]
fn test_near_zero_threshold_separates_every_genome() {
    let params = Params {
        compatibility_threshold: 1e-6,
        ..Params::new(2, 1)
    };
    let genomes = random_population(&params, 10, 5);

    let mut set = SpeciesSet::new(params.compatibility_threshold);
    let created = set.speciate(&genomes, &params, 0);

    assert_eq!(created, 10);
    assert_eq!(set.len(), 10);
    for (i, species) in set.species().iter().enumerate() {
        assert_eq!(species.members, vec![i]);
    }
}

#[test]
fn test_large_threshold_gives_one_species() {
    let params = Params {
        compatibility_threshold: 1000.0,
        ..Params::new(2, 1)
    };
    let genomes = random_population(&params, 10, 6);

    let mut set = SpeciesSet::new(params.compatibility_threshold);
    set.speciate(&genomes, &params, 0);

    assert_eq!(set.len(), 1);
    assert_eq!(set.species()[0].len(), 10);
    assert_eq!(set.species_of(7).map(|s| s.id), Some(0));
}

#[test]
fn test_species_persist_and_empty_species_are_dropped() {
    let params = Params {
        compatibility_threshold: 0.5,
        ..Params::new(3, 1)
    };
    let near = genome_with(&[(0, 3, 1.0, 1)]);
    let far = genome_with(&[(1, 3, 1.0, 2), (2, 3, 1.0, 3)]);

    let mut set = SpeciesSet::new(params.compatibility_threshold);
    set.speciate(&[near.clone(), far.clone(), near.clone()], &params, 0);
    assert_eq!(set.len(), 2);
    assert_eq!(set.species()[0].members, vec![0, 2]);
    assert_eq!(set.species()[1].members, vec![1]);

    // Existing species keep their ids; the second one loses all members.
    let created = set.speciate(&[near.clone(), near], &params, 1);
    assert_eq!(created, 0);
    assert_eq!(set.len(), 1);
    assert_eq!(set.species()[0].id, 0);
    assert_eq!(set.species()[0].members, vec![0, 1]);
}

#[test]
fn test_stagnant_species_are_purged_except_the_best() {
    let params = Params {
        compatibility_threshold: 0.5,
        stagnation_limit: 3,
        species_elitism: 1,
        ..Params::new(3, 1)
    };
    let mut strong = genome_with(&[(0, 3, 1.0, 1)]);
    let mut weak = genome_with(&[(1, 3, 1.0, 2), (2, 3, 1.0, 3)]);
    strong.fitness = 1.0;
    weak.fitness = 0.5;
    let genomes = vec![strong, weak];

    let mut set = SpeciesSet::new(params.compatibility_threshold);
    set.speciate(&genomes, &params, 0);
    assert!(set.purge_stagnant(&genomes, &params, 0).is_empty());

    for generation in 1..3 {
        assert!(set.purge_stagnant(&genomes, &params, generation).is_empty());
    }
    let removed = set.purge_stagnant(&genomes, &params, 3);

    assert_eq!(removed, vec![1]);
    assert_eq!(set.len(), 1);
    assert_eq!(set.species()[0].best_fitness, 1.0);
    assert_eq!(set.species()[0].stagnation(3), 3);
    assert_eq!(set.species()[0].fitness_history.len(), 4);
}

#[test]
fn test_improvement_resets_stagnation() {
    let params = Params {
        compatibility_threshold: 0.5,
        stagnation_limit: 2,
        species_elitism: 0,
        ..Params::new(3, 1)
    };
    let mut genomes = vec![genome_with(&[(0, 3, 1.0, 1)])];
    genomes[0].fitness = 1.0;

    let mut set = SpeciesSet::new(params.compatibility_threshold);
    set.speciate(&genomes, &params, 0);
    set.purge_stagnant(&genomes, &params, 0);
    set.purge_stagnant(&genomes, &params, 1);

    genomes[0].fitness = 2.0;
    assert!(set.purge_stagnant(&genomes, &params, 2).is_empty());
    assert_eq!(set.species()[0].last_improved, 2);
}

#[test]
fn test_threshold_moves_toward_target_species() {
    let params = Params {
        compatibility_threshold: 1e-6,
        target_species: Some(2),
        threshold_step: 0.25,
        ..Params::new(2, 1)
    };
    let genomes = random_population(&params, 10, 8);

    let mut set = SpeciesSet::new(params.compatibility_threshold);
    set.speciate(&genomes, &params, 0);
    assert!((set.threshold() - (1e-6 + 0.25)).abs() < 1e-6);

    let params = Params {
        compatibility_threshold: 1000.0,
        ..params
    };
    let mut set = SpeciesSet::new(params.compatibility_threshold);
    set.speciate(&genomes, &params, 0);
    assert!((set.threshold() - 999.75).abs() < 1e-3);
}

#[test]
fn test_carry_forward_drops_species_without_representatives() {
    let params = Params {
        compatibility_threshold: 0.5,
        ..Params::new(3, 1)
    };
    let near = genome_with(&[(0, 3, 1.0, 1)]);
    let far = genome_with(&[(1, 3, 1.0, 2), (2, 3, 1.0, 3)]);
    let child = genome_with(&[(0, 3, 0.75, 1)]);

    let mut set = SpeciesSet::new(params.compatibility_threshold);
    set.speciate(&[near, far.clone()], &params, 0);
    assert_eq!(set.len(), 2);

    let dropped = set.carry_forward(vec![(0, child.clone())]);
    assert_eq!(dropped, vec![1]);
    assert_eq!(set.len(), 1);
    assert_eq!(set.species()[0].id, 0);
    assert_eq!(set.species()[0].representative.connections(), child.connections());

    // A genome close to the dropped species now founds a new one.
    let created = set.speciate(&[child, far], &params, 1);
    assert_eq!(created, 1);
    assert_eq!(set.species()[1].id, 2);
    assert_eq!(set.species()[1].last_improved, 1);
}
