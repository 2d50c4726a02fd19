//! Genetic distance between genomes, used to group them into species.

use super::genome::Genome;
use super::params::Params;

/// Gene-by-gene comparison of two genomes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeneComparison {
    /// Genes present in both genomes.
    pub matching: usize,
    /// Unmatched genes inside the other genome's innovation range.
    pub disjoint: usize,
    /// Unmatched genes beyond the other genome's highest innovation.
    pub excess: usize,
    /// Mean absolute weight difference over matching genes (0 if none match).
    pub mean_weight_difference: f32,
}

/// Aligns two genomes' connections in a single pass.
///
/// Both connection lists are sorted by innovation, so a merge walk classifies
/// every gene. Genes left over once one list is exhausted are excess.
pub fn compare(a: &Genome, b: &Genome) -> GeneComparison {
    let xs = a.connections();
    let ys = b.connections();
    let (mut i, mut j) = (0, 0);
    let mut result = GeneComparison::default();
    let mut weight_sum = 0.0;

    while i < xs.len() && j < ys.len() {
        let (x, y) = (&xs[i], &ys[j]);
        match x.innovation.cmp(&y.innovation) {
            std::cmp::Ordering::Equal => {
                result.matching += 1;
                weight_sum += (x.weight - y.weight).abs();
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                result.disjoint += 1;
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                result.disjoint += 1;
                j += 1;
            }
        }
    }
    result.excess = (xs.len() - i) + (ys.len() - j);

    if result.matching > 0 {
        result.mean_weight_difference = weight_sum / result.matching as f32;
    }
    result
}

/// Calculates the compatibility distance between two genomes.
///
/// # Arguments
///
/// * `a` - First genome
/// * `b` - Second genome
/// * `params` - Supplies the coefficients `c1`, `c2`, `c3` and the size below
///   which genomes are not normalised
///
/// # Returns
///
/// `(c1 * excess + c2 * disjoint) / n + c3 * mean_weight_difference`, where `n`
/// is the larger connection count, or 1 when both genomes are smaller than
/// `normalize_threshold`. The result is symmetric and zero for identical genomes.
pub fn compatibility_distance(a: &Genome, b: &Genome, params: &Params) -> f32 {
    let cmp = compare(a, b);
    let larger = a.connection_count().max(b.connection_count());
    let n = if larger < params.normalize_threshold || larger == 0 {
        1.0
    } else {
        larger as f32
    };

    let structural = params.excess_coefficient * cmp.excess as f32
        + params.disjoint_coefficient * cmp.disjoint as f32;
    structural / n + params.weight_coefficient * cmp.mean_weight_difference
}
