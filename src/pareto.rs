//! Fast non-dominated sorting (C3).

use std::collections::HashMap;

use crate::individual::Individual;

/// Assigns a Pareto rank to every individual via the classic NSGA-II fast
/// non-dominated sort: rank 1 is the set of individuals dominated by
/// nobody, rank 2 is dominated only by rank-1 members once they are
/// removed, and so on. Individuals with no metrics or `success = false`
/// are assigned rank 0, marking them as not-yet-ranked / invalid rather
/// than folding them into the worst real front.
///
/// Complexity is `O(M * N^2)` for `N` individuals and `M` objectives,
/// matching the textbook algorithm.
pub fn fast_non_dominated_sort(population: &[Individual]) -> HashMap<String, u32> {
    let n = population.len();
    let mut ranks = HashMap::with_capacity(n);
    if n == 0 {
        return ranks;
    }

    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count: Vec<usize> = vec![0; n];
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

    let eligible: Vec<bool> = population.iter().map(|ind| ind.is_successful()).collect();

    for i in 0..n {
        if !eligible[i] {
            continue;
        }
        for j in 0..n {
            if i == j || !eligible[j] {
                continue;
            }
            if population[i].dominates(&population[j]) {
                dominated_by[i].push(j);
            } else if population[j].dominates(&population[i]) {
                domination_count[i] += 1;
            }
        }
        if domination_count[i] == 0 {
            fronts[0].push(i);
        }
    }

    let mut current = 0;
    while !fronts[current].is_empty() {
        let mut next_front = Vec::new();
        for &i in &fronts[current] {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next_front.push(j);
                }
            }
        }
        current += 1;
        fronts.push(next_front);
    }

    for (rank_idx, front) in fronts.iter().enumerate() {
        for &i in front {
            ranks.insert(population[i].id.clone(), (rank_idx + 1) as u32);
        }
    }

    for (i, ok) in eligible.iter().enumerate() {
        if !ok {
            ranks.insert(population[i].id.clone(), 0);
        }
    }

    ranks
}

/// Splits a population into ordered Pareto fronts by id, front 0 first.
/// Individuals without a successful evaluation are excluded entirely.
pub fn build_fronts(population: &[Individual]) -> Vec<Vec<String>> {
    let ranks = fast_non_dominated_sort(population);
    let mut by_rank: HashMap<u32, Vec<String>> = HashMap::new();
    for ind in population {
        if !ind.is_successful() {
            continue;
        }
        if let Some(&r) = ranks.get(&ind.id) {
            by_rank.entry(r).or_default().push(ind.id.clone());
        }
    }
    let mut keys: Vec<u32> = by_rank.keys().copied().collect();
    keys.sort_unstable();
    keys.into_iter().map(|k| by_rank.remove(&k).unwrap()).collect()
}
