//! Parameter crossover (§4.7.1-4.7.3): per-key random choice between two
//! compatible parents, grounded on the same "blend two parents' genes"
//! shape as arithmetic crossover, generalised from float blending to a
//! per-key draw over a typed parameter tree.

use std::collections::HashSet;

use thiserror::Error;

use crate::individual::{FactorWeights, ParamMap, ParamValue};
use crate::random::RandomGenerator;

const FACTOR_WEIGHTS_KEY: &str = "factor_weights";
const COMPATIBILITY_THRESHOLD: f64 = 0.30;

#[derive(Debug, Error)]
pub enum CrossoverError {
    #[error("parents use incompatible template types: {left} vs {right}")]
    IncompatibleTemplates { left: String, right: String },
}

/// The compatibility check of §4.7.2: two parents may only cross over if
/// both carry a non-empty `factor_weights` leaf and the overlap of their
/// key sets, divided by the union, is at least 0.30.
pub fn is_crossover_compatible(left: &ParamMap, right: &ParamMap) -> bool {
    let (Some(ParamValue::Weights(lw)), Some(ParamValue::Weights(rw))) =
        (left.get(FACTOR_WEIGHTS_KEY), right.get(FACTOR_WEIGHTS_KEY))
    else {
        return false;
    };
    if lw.as_map().is_empty() || rw.as_map().is_empty() {
        return false;
    }
    let lk: HashSet<&String> = lw.as_map().keys().collect();
    let rk: HashSet<&String> = rw.as_map().keys().collect();
    let union = lk.union(&rk).count();
    if union == 0 {
        return false;
    }
    let overlap = lk.intersection(&rk).count() as f64 / union as f64;
    overlap >= COMPATIBILITY_THRESHOLD
}

/// Produces one child `ParamMap` by, for every key present in both
/// parents, randomly taking the whole value from one side or the other --
/// including `Map` and `Weights` leaves, which are never merged
/// sub-key-by-sub-key. Keys present in only one parent are copied from
/// that parent unchanged.
///
/// Parents must share the same template type, otherwise structural
/// crossover would splice incompatible representations together.
pub fn crossover(
    left_template: &str,
    right_template: &str,
    left: &ParamMap,
    right: &ParamMap,
    rng: &mut impl RandomGenerator,
) -> Result<ParamMap, CrossoverError> {
    if left_template != right_template {
        return Err(CrossoverError::IncompatibleTemplates {
            left: left_template.to_string(),
            right: right_template.to_string(),
        });
    }

    let mut child = ParamMap::new();
    for key in left.keys().chain(right.keys()).collect::<std::collections::BTreeSet<_>>() {
        let value = match (left.get(key), right.get(key)) {
            (Some(l), Some(r)) => crossover_value(l, r, rng),
            (Some(l), None) => l.clone(),
            (None, Some(r)) => r.clone(),
            (None, None) => unreachable!("key came from one of the two maps"),
        };
        child.insert(key.clone(), value);
    }
    Ok(child)
}

/// Picks one parent's whole value uniformly at random. Per §4.7.1, a key
/// present in both parents is resolved by choosing one of the two values
/// outright, not by merging their substructure -- `Map` and `Weights`
/// leaves are copied whole from whichever parent wins the draw, same as
/// any scalar. `FactorWeights` is already self-normalizing on
/// construction, so the chosen leaf carries a valid sum-to-one weighting
/// without any extra renormalize step.
fn crossover_value(left: &ParamValue, right: &ParamValue, rng: &mut impl RandomGenerator) -> ParamValue {
    if rng.gen_bool(0.5) {
        left.clone()
    } else {
        right.clone()
    }
}
