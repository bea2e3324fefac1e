//! Gaussian parameter mutation (§4.7.4-4.7.5), grounded on the same
//! `Normal(0, sigma)` perturbation shape used by numeric gene mutation,
//! generalised to the typed leaves of a parameter tree.

use rand_distr::{Distribution, Normal};

use crate::individual::{FactorWeights, ParamMap, ParamValue};
use crate::random::RandomGenerator;

/// Mutates every leaf of `params` independently with probability
/// `gene_mutation_rate`, per §4.7.4: integer leaves step by
/// `max(1, floor(0.1 * |v|))` with a uniformly-chosen sign; float leaves
/// are perturbed multiplicatively by `N(0, mutation_strength) * v` (a
/// zero value stays zero) and clipped to `bounds` when given; strings and
/// lists of non-numeric leaves are left untouched; weight leaves perturb
/// each component the same way as floats with bounds `(0, 1)` and then
/// re-normalize.
pub fn gaussian_mutate(
    params: &ParamMap,
    gene_mutation_rate: f64,
    mutation_strength: f64,
    bounds: Option<(f64, f64)>,
    rng: &mut impl RandomGenerator,
) -> ParamMap {
    params
        .iter()
        .map(|(key, value)| (key.clone(), mutate_value(value, gene_mutation_rate, mutation_strength, bounds, rng)))
        .collect()
}

fn mutate_value(
    value: &ParamValue,
    gene_mutation_rate: f64,
    mutation_strength: f64,
    bounds: Option<(f64, f64)>,
    rng: &mut impl RandomGenerator,
) -> ParamValue {
    match value {
        ParamValue::Int(i) => {
            if rng.gen_bool(gene_mutation_rate) {
                let step = (0.1 * (*i as f64).abs()).floor().max(1.0) as i64;
                let sign = if rng.gen_bool(0.5) { 1 } else { -1 };
                ParamValue::Int(i + sign * step)
            } else {
                ParamValue::Int(*i)
            }
        }
        ParamValue::Float(f) => {
            if rng.gen_bool(gene_mutation_rate) && *f != 0.0 {
                let delta = sample_normal(mutation_strength, rng) * f;
                let mut mutated = f + delta;
                if let Some((lo, hi)) = bounds {
                    mutated = mutated.clamp(lo, hi);
                }
                ParamValue::Float(mutated)
            } else {
                ParamValue::Float(*f)
            }
        }
        ParamValue::Str(s) => ParamValue::Str(s.clone()),
        ParamValue::List(items) => ParamValue::List(
            items
                .iter()
                .map(|item| mutate_value(item, gene_mutation_rate, mutation_strength, bounds, rng))
                .collect(),
        ),
        ParamValue::Map(map) => {
            ParamValue::Map(gaussian_mutate(map, gene_mutation_rate, mutation_strength, bounds, rng))
        }
        ParamValue::Weights(weights) => {
            let mut mutated = weights.as_map().clone();
            for v in mutated.values_mut() {
                if rng.gen_bool(gene_mutation_rate) && *v != 0.0 {
                    let delta = sample_normal(mutation_strength, rng) * *v;
                    *v = (*v + delta).clamp(0.0, 1.0);
                }
            }
            ParamValue::Weights(FactorWeights::new(mutated))
        }
    }
}

fn sample_normal(sigma: f64, rng: &mut impl RandomGenerator) -> f64 {
    if sigma <= 0.0 {
        return 0.0;
    }
    let normal = Normal::new(0.0, sigma).expect("sigma is finite and positive");
    normal.sample(rng.rng())
}
