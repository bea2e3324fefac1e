extern crate evo_engine;

use codspeed_criterion_compat::{Criterion, black_box, criterion_group, criterion_main};

use evo_engine::individual::{Individual, ParamMap};
use evo_engine::metrics::ObjectiveVector;
use evo_engine::pareto::fast_non_dominated_sort;

fn synthetic_population(n: usize) -> Vec<Individual> {
    (0..n)
        .map(|i| {
            let mut ind = Individual::new(
                format!("ind_{i}"),
                0,
                vec![],
                ParamMap::new(),
                format!("rep_{i}"),
                "trend".into(),
            );
            let t = i as f64 / n as f64;
            ind.metrics = Some(ObjectiveVector::new(
                t,
                1.0 - t,
                -0.1 * t,
                0.2 + t,
                0.5,
                0.3 + t * 0.1,
            ));
            ind
        })
        .collect()
}

fn bench_fast_non_dominated_sort(c: &mut Criterion) {
    let population = synthetic_population(1000);
    c.bench_function("fast_non_dominated_sort_1000", |b| {
        b.iter(|| fast_non_dominated_sort(black_box(&population)))
    });
}

criterion_group!(benches, bench_fast_non_dominated_sort);
criterion_main!(benches);
