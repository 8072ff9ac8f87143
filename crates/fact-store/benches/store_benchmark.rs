//! In-memory store benchmarks: insertion and bound-position queries

use atom_model::{Atom, BasicQuery, Predicate, Term, Variable};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fact_store::{Data, InMemoryGraphStore, Writable};
use std::collections::BTreeMap;

fn edge(i: u64) -> Atom {
    Atom::new(
        Predicate::new("edge", 2),
        vec![
            Term::constant(format!("n{}", i)),
            Term::constant(format!("n{}", i + 1)),
        ],
    )
    .unwrap()
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("store_insert_10k", |b| {
        b.iter(|| {
            let mut store = InMemoryGraphStore::new();
            for i in 0..10_000 {
                store.add(edge(i)).unwrap();
            }
            black_box(store)
        })
    });
}

fn bench_bound_query(c: &mut Criterion) {
    let store = InMemoryGraphStore::with_atoms((0..10_000).map(edge));
    let query = BasicQuery::new(
        Predicate::new("edge", 2),
        BTreeMap::from([(0, Term::constant("n5000"))]),
        BTreeMap::from([(1, Variable::new("Y"))]),
    )
    .unwrap();

    c.bench_function("store_bound_query", |b| {
        b.iter(|| {
            let results: Vec<_> = store.evaluate(black_box(&query)).unwrap().collect();
            black_box(results)
        })
    });
}

criterion_group!(benches, bench_insert, bench_bound_query);
criterion_main!(benches);
