//! Feature-token extraction, Jaccard distance, and novelty scoring (C5).
//!
//! Grounded on the same feature grammar and k-NN novelty scheme used by
//! the diversity-tracking layer this engine replaces: a representation is
//! reduced to the set of `data.get('name')` / `data.indicator('name')`
//! tokens it references, and novelty is the mean Jaccard distance to the
//! `k` nearest neighbours in feature-space.

use std::collections::HashSet;

use crate::error::EngineError;
use crate::individual::Individual;

/// Extracts the set of feature tokens referenced by a representation
/// string, recognizing the two supported call forms:
/// `data.get('name')` and `data.indicator('name')` (single or double
/// quotes).
pub fn extract_features(representation: &str) -> HashSet<String> {
    let mut features = HashSet::new();
    for call in ["get", "indicator"] {
        let needle = format!("data.{call}(");
        let mut search_from = 0;
        while let Some(start) = representation[search_from..].find(&needle) {
            let abs_start = search_from + start + needle.len();
            let rest = &representation[abs_start..];
            if let Some(token) = extract_quoted(rest) {
                features.insert(token.to_string());
            }
            search_from = abs_start;
        }
    }
    features
}

fn extract_quoted(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let quote = *bytes.first()?;
    if quote != b'\'' && quote != b'"' {
        return None;
    }
    let rest = &s[1..];
    let end = rest.find(quote as char)?;
    Some(&rest[..end])
}

/// Jaccard distance between two feature sets: `1 - |intersection| / |union|`.
/// Two empty sets are defined as identical (distance `0.0`): neither
/// strategy references any feature, so there is no evidence of difference.
pub fn jaccard_distance(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    1.0 - (intersection as f64 / union as f64)
}

/// Average pairwise Jaccard distance across the whole population,
/// representing the population's aggregate structural diversity. Requires
/// at least two individuals.
pub fn population_diversity(population: &[Individual]) -> Result<f64, EngineError> {
    if population.len() < 2 {
        return Err(EngineError::InsufficientPopulation {
            size: population.len(),
        });
    }
    let feature_sets: Vec<HashSet<String>> = population
        .iter()
        .map(|ind| extract_features(&ind.representation))
        .collect();

    let mut total = 0.0;
    let mut count = 0usize;
    for i in 0..feature_sets.len() {
        for j in (i + 1)..feature_sets.len() {
            total += jaccard_distance(&feature_sets[i], &feature_sets[j]);
            count += 1;
        }
    }
    Ok(if count == 0 { 0.0 } else { total / count as f64 })
}

/// Whether the population's structural diversity has fallen below the
/// configured threshold, signalling that the scheduler should escalate
/// its mutation rate.
pub fn should_raise_mutation(diversity_score: f64, threshold: f64) -> bool {
    diversity_score < threshold
}

/// The novelty score of a single individual relative to the rest of the
/// population: the mean Jaccard distance to its `k` nearest neighbours in
/// feature-space. If fewer than `k` other individuals exist,
/// `effective_k = min(k, n - 1)` is used instead; if that is zero (a
/// population of one), novelty is defined as `1.0`.
pub fn novelty_score(target: &Individual, population: &[Individual], k: usize) -> f64 {
    let target_features = extract_features(&target.representation);
    let mut distances: Vec<f64> = population
        .iter()
        .filter(|ind| ind.id != target.id)
        .map(|ind| jaccard_distance(&target_features, &extract_features(&ind.representation)))
        .collect();

    let effective_k = k.min(distances.len());
    if effective_k == 0 {
        return 1.0;
    }
    distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
    distances[..effective_k].iter().sum::<f64>() / effective_k as f64
}
