//! Benchmarks for hierarchy closure queries.
//!
//! Compares on-demand BFS over the graph with lookups in a precomputed
//! transitive closure, and measures pruning on a synthetic vocabulary.
//!
//! Run with: cargo bench -p medcode-ontology-optimizer --bench closure_bench --features closure

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use medcode_ontology::{CodeHandle, OntologyBuilder, OntologyGraph};
use medcode_ontology_optimizer::closure::TransitiveClosure;

/// Builds a balanced tree with `fanout` children per node and `depth`
/// levels, plus a second parent for every fifth code to create diamonds.
fn synthetic_graph(fanout: usize, depth: usize) -> OntologyGraph {
    let mut builder = OntologyBuilder::new();
    let mut level = vec![builder.register("SYN/root", None).unwrap()];
    let mut next_id = 0usize;

    for _ in 0..depth {
        let mut next_level = Vec::with_capacity(level.len() * fanout);
        for (position, &parent) in level.iter().enumerate() {
            for _ in 0..fanout {
                let identifier = format!("SYN/{next_id}");
                next_id += 1;
                let child = builder.register(&identifier, None).unwrap();
                builder.add_edge(parent, child).unwrap();
                if next_id % 5 == 0 {
                    let other = level[(position + 1) % level.len()];
                    builder.add_edge(other, child).unwrap();
                }
                next_level.push(child);
            }
        }
        level = next_level;
    }

    builder.build()
}

fn bench_ancestor_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("ancestors");

    for depth in [4usize, 6] {
        let graph = synthetic_graph(4, depth);
        let closure = TransitiveClosure::build(&graph);
        let leaf = CodeHandle::new(graph.code_count() as u32 - 1);
        let root = CodeHandle::new(0);

        group.bench_with_input(BenchmarkId::new("bfs", depth), &leaf, |b, &leaf| {
            b.iter(|| black_box(graph.all_ancestors(leaf)))
        });
        group.bench_with_input(BenchmarkId::new("closure", depth), &leaf, |b, &leaf| {
            b.iter(|| black_box(closure.is_ancestor_of(root, leaf)))
        });
    }

    group.finish();
}

fn bench_closure_build(c: &mut Criterion) {
    let graph = synthetic_graph(4, 6);
    c.bench_function("closure_build", |b| {
        b.iter(|| black_box(TransitiveClosure::build(&graph)))
    });
}

fn bench_prune(c: &mut Criterion) {
    let graph = synthetic_graph(4, 6);
    let used: Vec<String> = (0..graph.code_count())
        .step_by(97)
        .filter_map(|i| {
            graph
                .identifier_of(CodeHandle::new(i as u32))
                .ok()
                .map(str::to_string)
        })
        .collect();

    c.bench_function("prune", |b| b.iter(|| black_box(graph.prune(&used))));
}

criterion_group!(
    benches,
    bench_ancestor_queries,
    bench_closure_build,
    bench_prune
);
criterion_main!(benches);
