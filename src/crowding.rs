//! Crowding distance, the density-based diversity term within a front (C4).

use std::collections::HashMap;

use ordered_float::OrderedFloat;

use crate::error::EngineError;
use crate::individual::Individual;

const OBJECTIVE_COUNT: usize = 6;

fn objective(ind: &Individual, axis: usize) -> f64 {
    let m = ind.metrics.expect("crowding_distance requires evaluated individuals");
    match axis {
        0 => m.sharpe,
        1 => m.calmar,
        2 => m.max_drawdown,
        3 => m.total_return,
        4 => m.win_rate,
        _ => m.annual_return,
    }
}

/// Computes the crowding distance of every individual within a single
/// front (all ids are assumed to share the same Pareto rank). Boundary
/// individuals — lowest and highest on any objective — get `f64::INFINITY`
/// so they are never squeezed out by the replacement step.
///
/// Requires at least two individuals and that every one of them has been
/// evaluated successfully; otherwise returns
/// [`EngineError::InsufficientPopulation`].
pub fn crowding_distance(front: &[&Individual]) -> Result<HashMap<String, f64>, EngineError> {
    let n = front.len();
    if n < 2 || front.iter().any(|ind| !ind.is_successful()) {
        return Err(EngineError::InsufficientPopulation { size: n });
    }

    let mut distance: HashMap<String, f64> = front.iter().map(|ind| (ind.id.clone(), 0.0)).collect();

    for axis in 0..OBJECTIVE_COUNT {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| OrderedFloat(objective(front[i], axis)));

        let lo = objective(front[order[0]], axis);
        let hi = objective(front[order[n - 1]], axis);
        let span = hi - lo;

        if span <= 0.0 {
            continue;
        }

        distance.insert(front[order[0]].id.clone(), f64::INFINITY);
        distance.insert(front[order[n - 1]].id.clone(), f64::INFINITY);

        for k in 1..n - 1 {
            let prev = objective(front[order[k - 1]], axis);
            let next = objective(front[order[k + 1]], axis);
            let id = &front[order[k]].id;
            if let Some(d) = distance.get_mut(id) {
                if d.is_finite() {
                    *d += (next - prev) / span;
                }
            }
        }
    }

    Ok(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::ParamMap;
    use crate::metrics::ObjectiveVector;

    fn ind(id: &str, sharpe: f64, calmar: f64) -> Individual {
        let mut i = Individual::new(
            id.into(),
            0,
            vec![],
            ParamMap::new(),
            "{}".into(),
            "t".into(),
        );
        i.metrics = Some(ObjectiveVector::new(sharpe, calmar, -0.1, 0.2, 0.5, 0.3));
        i
    }

    #[test]
    fn boundary_points_get_infinite_distance() {
        let a = ind("a", 1.0, 3.0);
        let b = ind("b", 2.0, 2.0);
        let c = ind("c", 3.0, 1.0);
        let front = vec![&a, &b, &c];
        let d = crowding_distance(&front).unwrap();
        assert_eq!(d["a"], f64::INFINITY);
        assert_eq!(d["c"], f64::INFINITY);
        assert!(d["b"].is_finite());
    }

    #[test]
    fn too_small_front_errors() {
        let a = ind("a", 1.0, 1.0);
        let front = vec![&a];
        assert!(crowding_distance(&front).is_err());
    }

    #[test]
    fn unsuccessful_member_errors() {
        let mut a = ind("a", 1.0, 1.0);
        a.metrics.as_mut().unwrap().success = false;
        let b = ind("b", 2.0, 2.0);
        let front = vec![&a, &b];
        assert!(crowding_distance(&front).is_err());
    }

    #[test]
    fn identical_objective_values_yield_zero_distance() {
        let a = ind("a", 1.0, 1.0);
        let b = ind("b", 1.0, 1.0);
        let c = ind("c", 1.0, 1.0);
        let front = vec![&a, &b, &c];
        let d = crowding_distance(&front).unwrap();
        // every axis has zero span (mdd/return/win/annual are also tied in
        // `ind`), so every objective is skipped entirely and no member ever
        // receives the boundary infinity.
        assert!(d.values().all(|&v| v == 0.0));
    }
}
