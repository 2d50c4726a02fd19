//! Crossover of two parent genomes and the offspring generators built on it.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::gene::{ConnectionGene, NodeType};
use super::genome::Genome;
use super::innovation::InnovationTracker;
use super::mutation;
use super::params::Params;

/// Closed set of ways to derive a child genome from its parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenomeGenerator {
    /// Aligns and recombines two parents; no mutation.
    Crossover,
    /// Clones the first parent and mutates the copy.
    Mutation,
}

impl GenomeGenerator {
    /// Produces a child.
    ///
    /// `Crossover` without a second parent degrades to a plain clone.
    pub fn generate<R: Rng + ?Sized>(
        self,
        first: &Genome,
        second: Option<&Genome>,
        params: &Params,
        tracker: &InnovationTracker,
        rng: &mut R,
    ) -> Genome {
        let mut child = match (self, second) {
            (GenomeGenerator::Crossover, Some(second)) => {
                let same_fitness = first.fitness.total_cmp(&second.fitness).is_eq();
                crossover(first, second, same_fitness, params, rng)
            }
            (GenomeGenerator::Crossover, None) => first.clone(),
            (GenomeGenerator::Mutation, _) => {
                let mut child = first.clone();
                mutation::mutate(&mut child, params, tracker, rng);
                child
            }
        };
        child.reset_fitness();
        child
    }
}

/// Recombines two genomes by aligning their connections on innovation number.
///
/// Matching genes take their weight and enabled flag from a random parent.
/// Disjoint and excess genes come from the fitter parent only, unless
/// `same_fitness` is set, in which case each is taken from either parent with
/// probability `tie_gene_inclusion_prob`. The child holds every input, output
/// and bias node plus the endpoints of each inherited connection.
pub fn crossover<R: Rng + ?Sized>(
    a: &Genome,
    b: &Genome,
    same_fitness: bool,
    params: &Params,
    rng: &mut R,
) -> Genome {
    let (fitter, weaker) = if b.fitness > a.fitness { (b, a) } else { (a, b) };

    let mut child = Genome::new();
    for node in fitter.nodes().filter(|n| n.node_type != NodeType::Hidden) {
        // The child starts empty and parent node ids are unique, so this cannot fail.
        let _ = child.add_node(node.clone());
    }

    let xs = fitter.connections();
    let ys = weaker.connections();
    let (mut i, mut j) = (0, 0);

    // Non-matching genes are kept from the fitter parent, or from either
    // parent with the tie probability when fitness is equal.
    let keep_unmatched = |from_fitter: bool, rng: &mut R| {
        if same_fitness {
            rng.random::<f32>() < params.tie_gene_inclusion_prob
        } else {
            from_fitter
        }
    };

    loop {
        let (gene, parent, either_disabled) = match (xs.get(i), ys.get(j)) {
            (Some(x), Some(y)) if x.innovation == y.innovation => {
                i += 1;
                j += 1;
                let either_disabled = !x.enabled || !y.enabled;
                if rng.random_bool(0.5) {
                    (x, fitter, either_disabled)
                } else {
                    (y, weaker, either_disabled)
                }
            }
            (Some(x), Some(y)) if x.innovation < y.innovation => {
                i += 1;
                if !keep_unmatched(true, &mut *rng) {
                    continue;
                }
                (x, fitter, false)
            }
            (Some(x), None) => {
                i += 1;
                if !keep_unmatched(true, &mut *rng) {
                    continue;
                }
                (x, fitter, false)
            }
            (_, Some(y)) => {
                j += 1;
                if !keep_unmatched(false, &mut *rng) {
                    continue;
                }
                (y, weaker, false)
            }
            (None, None) => break,
        };

        inherit(&mut child, gene, parent, either_disabled, params, rng);
    }

    child
}

/// Copies one connection and its endpoints into the child.
fn inherit<R: Rng + ?Sized>(
    child: &mut Genome,
    gene: &ConnectionGene,
    parent: &Genome,
    either_disabled: bool,
    params: &Params,
    rng: &mut R,
) {
    for id in [gene.source, gene.target] {
        if !child.has_node(id) {
            if let Some(node) = parent.node(id) {
                // Guarded by has_node, so the id is free.
                let _ = child.add_node(node.clone());
            }
        }
    }

    let mut gene = gene.clone();
    if either_disabled {
        gene.enabled = rng.random::<f32>() >= params.disable_inherited_prob;
    }
    if gene.enabled
        && (child.has_enabled_connection(gene.source, gene.target)
            || (!params.allow_recurrent && child.would_create_cycle(gene.source, gene.target)))
    {
        gene.enabled = false;
    }

    // Only an invalid parent can make this fail; the gene is then skipped.
    let _ = child.add_connection(gene);
}
