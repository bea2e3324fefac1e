//! Tournament selection and elite extraction (C6).

use crate::crowding::crowding_distance;
use crate::error::EngineError;
use crate::individual::Individual;
use crate::pareto::fast_non_dominated_sort;
use crate::random::RandomGenerator;

/// Samples `tournament_size` distinct indices from `[0, population_len)`
/// without replacement (§4.6 step 1), via a partial Fisher-Yates shuffle
/// of the index range.
fn sample_indices_without_replacement(
    population_len: usize,
    tournament_size: usize,
    rng: &mut impl RandomGenerator,
) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..population_len).collect();
    rng.shuffle_vec_usize(&mut indices);
    indices.truncate(tournament_size.min(population_len));
    indices
}

/// Ranks and crowds a tournament subset locally (§4.6 step 2), then
/// orders it ascending by `(rank, -crowding)` (step 3). Crowding falls
/// back to `0.0` for every member when the subset is too small or has no
/// successful individual to compute a front over; the ordering then
/// degrades gracefully to rank alone.
fn ranked_tournament_pool<'a>(pool: &[&'a Individual]) -> Vec<&'a Individual> {
    let owned: Vec<Individual> = pool.iter().map(|ind| (*ind).clone()).collect();
    let ranks = fast_non_dominated_sort(&owned);

    let successful: Vec<&Individual> = pool.iter().filter(|ind| ind.is_successful()).copied().collect();
    let crowding = crowding_distance(&successful).unwrap_or_default();

    let mut ordered: Vec<&Individual> = pool.to_vec();
    ordered.sort_by(|a, b| {
        let ra = ranks.get(&a.id).copied().unwrap_or(u32::MAX);
        let rb = ranks.get(&b.id).copied().unwrap_or(u32::MAX);
        ra.cmp(&rb).then_with(|| {
            let ca = crowding.get(&a.id).copied().unwrap_or(0.0);
            let cb = crowding.get(&b.id).copied().unwrap_or(0.0);
            cb.partial_cmp(&ca).unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    ordered
}

/// Runs one tournament (§4.6): samples `tournament_size` individuals
/// without replacement, ranks and crowds them locally, then with
/// probability `selection_pressure` returns the best-ordered member,
/// otherwise a uniformly random member of the sampled pool.
pub fn tournament_select<'a>(
    population: &'a [Individual],
    tournament_size: usize,
    selection_pressure: f64,
    rng: &mut impl RandomGenerator,
) -> &'a Individual {
    assert!(!population.is_empty(), "cannot select from an empty population");
    let indices = sample_indices_without_replacement(population.len(), tournament_size.max(2), rng);
    let pool: Vec<&Individual> = indices.iter().map(|&i| &population[i]).collect();
    let ordered = ranked_tournament_pool(&pool);

    if rng.gen_bool(selection_pressure) {
        ordered[0]
    } else {
        let pick = rng.gen_range_usize(0, ordered.len());
        ordered[pick]
    }
}

/// Selects `count` parent pairs via independent tournaments (§4.6
/// `select_parents`). If both tournaments in a pair land on the same
/// individual, the second draw is re-sampled up to 100 times; if still
/// colliding, it falls back to a uniformly random different individual.
/// Fails with [`EngineError::InsufficientPopulation`] when the population
/// has fewer than two members.
pub fn select_parents<'a>(
    population: &'a [Individual],
    count: usize,
    tournament_size: usize,
    selection_pressure: f64,
    rng: &mut impl RandomGenerator,
) -> Result<Vec<(&'a Individual, &'a Individual)>, EngineError> {
    if population.len() < 2 {
        return Err(EngineError::InsufficientPopulation { size: population.len() });
    }
    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        let first = tournament_select(population, tournament_size, selection_pressure, rng);
        let mut second = tournament_select(population, tournament_size, selection_pressure, rng);
        let mut retries = 0;
        while second.id == first.id && retries < 100 {
            second = tournament_select(population, tournament_size, selection_pressure, rng);
            retries += 1;
        }
        if second.id == first.id {
            second = population
                .iter()
                .find(|ind| ind.id != first.id)
                .expect("population has at least two distinct members");
        }
        pairs.push((first, second));
    }
    Ok(pairs)
}

/// The combined fitness+novelty selection weight of §4.6:
/// `p(i) = (1 / (rank(i) + 1)) * (1 + diversity_weight * novelty(i))`.
/// Returned as an unnormalised weight; callers decide how to sample from
/// it (the core never samples from this itself).
pub fn selection_probability(individual: &Individual, diversity_weight: f64) -> f64 {
    (1.0 / (individual.rank as f64 + 1.0)) * (1.0 + diversity_weight * individual.novelty)
}

/// Extracts the top `elite_count` individuals by `(sharpe, calmar)`
/// descending (§4.6 `get_elite`); individuals with no metrics sort last.
/// Fails if `elite_count` exceeds the population size; returns an empty
/// list for `elite_count = 0`.
pub fn select_elites(population: &[Individual], elite_count: usize) -> Result<Vec<Individual>, EngineError> {
    if elite_count > population.len() {
        return Err(EngineError::InsufficientPopulation { size: population.len() });
    }
    if elite_count == 0 {
        return Ok(Vec::new());
    }
    let mut ordered: Vec<&Individual> = population.iter().collect();
    ordered.sort_by(|a, b| {
        let key = |ind: &Individual| (ind.metrics.map(|m| m.sharpe), ind.metrics.map(|m| m.calmar));
        let (sa, ca) = key(a);
        let (sb, cb) = key(b);
        sb.unwrap_or(f64::NEG_INFINITY)
            .partial_cmp(&sa.unwrap_or(f64::NEG_INFINITY))
            .unwrap()
            .then_with(|| {
                cb.unwrap_or(f64::NEG_INFINITY)
                    .partial_cmp(&ca.unwrap_or(f64::NEG_INFINITY))
                    .unwrap()
            })
    });
    Ok(ordered.into_iter().take(elite_count).cloned().collect())
}
