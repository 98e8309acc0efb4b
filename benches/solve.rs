//! Benchmarks for clique solving and the full resolution pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};

use boom_engine::clique::extract_cliques;
use boom_engine::config::ResolverConfig;
use boom_engine::graph::{GraphBuilder, Hypothesis, ProbabilisticGraph};
use boom_engine::resolver::Resolver;
use boom_engine::solver::CliqueSolver;

/// A connected graph: a chain over `entities` classes plus random chords
/// until it has `edges` probabilistic edges.
fn random_graph(seed: u64, entities: usize, edges: usize) -> ProbabilisticGraph {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut b = GraphBuilder::new();
    let ids: Vec<_> = (0..entities)
        .map(|i| b.identifier(&format!("B:{i:04}")))
        .collect();
    let mut pairs: Vec<(usize, usize)> = (1..entities).map(|i| (i - 1, i)).collect();
    while pairs.len() < edges {
        let x = rng.gen_range(0..entities);
        let y = rng.gen_range(0..entities);
        if x != y && !pairs.contains(&(x.min(y), x.max(y))) {
            pairs.push((x.min(y), x.max(y)));
        }
    }
    for (x, y) in pairs {
        let w: Vec<f64> = (0..4).map(|_| rng.gen_range(0.05..1.0)).collect();
        let t: f64 = w.iter().sum();
        b.probabilistic_edge(
            ids[x],
            ids[y],
            vec![
                (Hypothesis::SubsumedBy { sub: ids[x], sup: ids[y] }, w[0] / t),
                (Hypothesis::SubsumedBy { sub: ids[y], sup: ids[x] }, w[1] / t),
                (Hypothesis::Equivalent, w[2] / t),
                (Hypothesis::NoRelation, w[3] / t),
            ],
        );
    }
    b.build().unwrap()
}

fn bench_solve_clique(c: &mut Criterion) {
    let graph = random_graph(0, 6, 9);
    let clique = extract_cliques(&graph).remove(0);
    let solver = CliqueSolver::new(&graph);

    c.bench_function("solve_9_edge_clique", |bench| {
        bench.iter(|| black_box(solver.solve(&clique).unwrap()))
    });
}

fn bench_resolve_serial(c: &mut Criterion) {
    let graph = random_graph(1, 60, 90);
    let config = ResolverConfig {
        parallel: false,
        ..Default::default()
    };

    c.bench_function("resolve_90_edges_serial", |bench| {
        bench.iter(|| black_box(Resolver::new(&graph, config.clone()).unwrap().resolve()))
    });
}

fn bench_resolve_parallel(c: &mut Criterion) {
    let graph = random_graph(1, 60, 90);

    c.bench_function("resolve_90_edges_parallel", |bench| {
        bench.iter(|| {
            black_box(
                Resolver::new(&graph, ResolverConfig::default())
                    .unwrap()
                    .resolve(),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_solve_clique,
    bench_resolve_serial,
    bench_resolve_parallel
);
criterion_main!(benches);
