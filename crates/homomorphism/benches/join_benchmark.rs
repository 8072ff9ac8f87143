//! Join benchmarks: two-hop path query over a chain graph

use atom_model::{Atom, Predicate, Substitution, Term};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fact_store::InMemoryGraphStore;
use homomorphism::HomomorphismIterator;

fn chain(n: u64) -> InMemoryGraphStore {
    InMemoryGraphStore::with_atoms((0..n).map(|i| {
        Atom::new(
            Predicate::new("edge", 2),
            vec![
                Term::constant(format!("n{}", i)),
                Term::constant(format!("n{}", i + 1)),
            ],
        )
        .unwrap()
    }))
}

fn bench_two_hop(c: &mut Criterion) {
    let store = chain(2_000);
    let source = vec![
        Atom::new(
            Predicate::new("edge", 2),
            vec![Term::variable("X"), Term::variable("Y")],
        )
        .unwrap(),
        Atom::new(
            Predicate::new("edge", 2),
            vec![Term::variable("Y"), Term::variable("Z")],
        )
        .unwrap(),
    ];

    c.bench_function("two_hop_join_2k", |b| {
        b.iter(|| {
            let count = HomomorphismIterator::new(&source, &store, Substitution::new())
                .unwrap()
                .count();
            black_box(count)
        })
    });
}

criterion_group!(benches, bench_two_hop);
criterion_main!(benches);
