//! End-to-end evaluator coverage over the in-memory store

use atom_model::{
    Atom, ConjunctiveQuery, FoQuery, Formula, Predicate, Substitution, Term, Variable,
};
use fact_store::{
    ComparisonSource, Data, DataCollection, FunctionSource, InMemoryGraphStore, MaterializedData,
};
use homomorphism::{EvalError, FoQueryEvaluator};

fn atom(p: &str, terms: Vec<Term>) -> Atom {
    Atom::new(Predicate::new(p, terms.len()), terms).unwrap()
}

fn c(n: &str) -> Term {
    Term::constant(n)
}

fn v(n: &str) -> Term {
    Term::variable(n)
}

fn var(n: &str) -> Variable {
    Variable::new(n)
}

/// p(a,b), p(b,c), q(b), q(c)
fn store() -> InMemoryGraphStore {
    InMemoryGraphStore::with_atoms([
        atom("p", vec![c("a"), c("b")]),
        atom("p", vec![c("b"), c("c")]),
        atom("q", vec![c("b")]),
        atom("q", vec![c("c")]),
    ])
}

#[test]
fn completeness_every_fact_is_reachable() {
    let store = store();
    let evaluator = FoQueryEvaluator::new();
    let query = FoQuery::new(
        Formula::Atom(atom("p", vec![v("X"), v("Y")])),
        vec![var("X"), var("Y")],
    );
    let results: Vec<_> = evaluator
        .evaluate_and_project(&query, &store)
        .unwrap()
        .collect();
    // Every ground p-fact appears as one tuple.
    for expected in [[c("a"), c("b")], [c("b"), c("c")]] {
        assert!(results.contains(&expected.to_vec()));
    }
    assert_eq!(results.len(), 2);
}

#[test]
fn conjunction_joins_across_formulas() {
    let store = store();
    let evaluator = FoQueryEvaluator::new();
    let query = FoQuery::new(
        Formula::and(
            Formula::Atom(atom("p", vec![v("X"), v("Y")])),
            Formula::Atom(atom("p", vec![v("Y"), v("Z")])),
        ),
        vec![var("X"), var("Z")],
    );
    let results: Vec<_> = evaluator
        .evaluate_and_project(&query, &store)
        .unwrap()
        .collect();
    assert_eq!(results, vec![vec![c("a"), c("c")]]);
}

#[test]
fn disjunction_concatenates_and_dedups() {
    let store = store();
    let evaluator = FoQueryEvaluator::new();
    // q(X) ∨ q(X): the projection must not duplicate.
    let query = FoQuery::new(
        Formula::or(
            Formula::Atom(atom("q", vec![v("X")])),
            Formula::Atom(atom("q", vec![v("X")])),
        ),
        vec![var("X")],
    );
    let results: Vec<_> = evaluator
        .evaluate_and_project(&query, &store)
        .unwrap()
        .collect();
    assert_eq!(results.len(), 2);
}

#[test]
fn negation_as_failure_filters() {
    let store = store();
    let evaluator = FoQueryEvaluator::new();
    // p(X, Y) ∧ ¬q(X): only X = a survives (q(b) exists).
    let query = FoQuery::new(
        Formula::and(
            Formula::Atom(atom("p", vec![v("X"), v("Y")])),
            Formula::not(Formula::Atom(atom("q", vec![v("X")]))),
        ),
        vec![var("X")],
    );
    let results: Vec<_> = evaluator
        .evaluate_and_project(&query, &store)
        .unwrap()
        .collect();
    assert_eq!(results, vec![vec![c("a")]]);
}

#[test]
fn unsafe_negation_is_refused() {
    let store = store();
    let evaluator = FoQueryEvaluator::new();
    // ¬q(X) with X bound by nothing.
    let query = FoQuery::new(
        Formula::not(Formula::Atom(atom("q", vec![v("X")]))),
        vec![var("X")],
    );
    assert!(matches!(
        evaluator.evaluate(&query, &store),
        Err(EvalError::UnsafeNegation(_))
    ));
}

#[test]
fn existential_projects_out() {
    let store = store();
    let evaluator = FoQueryEvaluator::new();
    let query = FoQuery::new(
        Formula::exists(
            var("Y"),
            Formula::Atom(atom("p", vec![v("X"), v("Y")])),
        ),
        vec![var("X")],
    );
    let results: Vec<Substitution> = evaluator.evaluate(&query, &store).unwrap().collect();
    assert_eq!(results.len(), 2);
    for s in &results {
        assert!(!s.contains(&var("Y")));
    }
}

#[test]
fn universal_filter() {
    let store = store();
    let evaluator = FoQueryEvaluator::new();
    // p(X, Y) ∧ ∀Z.¬(p(Y, Z) ∧ ¬q(Z)): every p-successor of Y is a q.
    let query = FoQuery::new(
        Formula::and(
            Formula::Atom(atom("p", vec![v("X"), v("Y")])),
            Formula::forall(
                var("Z"),
                Formula::not(Formula::and(
                    Formula::Atom(atom("p", vec![v("Y"), v("Z")])),
                    Formula::not(Formula::Atom(atom("q", vec![v("Z")]))),
                )),
            ),
        ),
        vec![var("X"), var("Y")],
    );
    let results: Vec<_> = evaluator
        .evaluate_and_project(&query, &store)
        .unwrap()
        .collect();
    // Both rows pass: b's successor c is a q, c has no successor.
    assert_eq!(results.len(), 2);
}

#[test]
fn equality_atoms_unify_before_joining() {
    let store = store();
    let evaluator = FoQueryEvaluator::new();
    let cq = ConjunctiveQuery::new(
        vec![
            atom("p", vec![v("X"), v("Y")]),
            Atom::new(Predicate::equality(), vec![v("X"), c("a")]).unwrap(),
        ],
        vec![var("Y")],
    );
    let results: Vec<Substitution> = evaluator.evaluate_conjunctive(&cq, &store).unwrap().collect();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get(&var("Y")), Some(&c("b")));
}

#[test]
fn comparison_atoms_filter_after_binding() {
    let facts = InMemoryGraphStore::with_atoms([
        atom("age", vec![c("alice"), Term::literal_int(30)]),
        atom("age", vec![c("bob"), Term::literal_int(17)]),
    ]);
    let comparisons = ComparisonSource::new();
    let union = DataCollection::from_sources(vec![&facts as &dyn Data, &comparisons]);
    let evaluator = FoQueryEvaluator::new();

    let query = FoQuery::new(
        Formula::and(
            Formula::Atom(atom("age", vec![v("X"), v("A")])),
            Formula::Atom(
                Atom::new(
                    Predicate::new(">=", 2),
                    vec![v("A"), Term::literal_int(18)],
                )
                .unwrap(),
            ),
        ),
        vec![var("X")],
    );
    let results: Vec<_> = evaluator
        .evaluate_and_project(&query, &union)
        .unwrap()
        .collect();
    assert_eq!(results, vec![vec![c("alice")]]);
}

#[test]
fn evaluable_function_terms_expand_to_computed_atoms() {
    let facts = InMemoryGraphStore::with_atoms([
        atom("price", vec![c("book"), Term::literal_int(10)]),
        atom("price", vec![c("pen"), Term::literal_int(2)]),
    ]);
    let functions = FunctionSource::standard();
    let union = DataCollection::from_sources(vec![&facts as &dyn Data, &functions]);
    let evaluator = FoQueryEvaluator::new();

    // doubled price: price(X, P) ∧ D = add(P, P) via an equality atom.
    let doubled = Term::EvaluableFunction(atom_model::FunctionTerm::new(
        "add",
        vec![v("P"), v("P")],
    ));
    let cq = ConjunctiveQuery::new(
        vec![
            atom("price", vec![v("X"), v("P")]),
            Atom::new(Predicate::equality(), vec![v("D"), doubled]).unwrap(),
        ],
        vec![var("X"), var("D")],
    );
    let results: Vec<Substitution> = evaluator.evaluate_conjunctive(&cq, &union).unwrap().collect();
    assert_eq!(results.len(), 2);
    let book = results
        .iter()
        .find(|s| s.get(&var("X")) == Some(&c("book")))
        .unwrap();
    assert_eq!(book.get(&var("D")), Some(&Term::literal_int(20)));
}

#[test]
fn unknown_predicate_in_routed_union_is_an_error() {
    let facts = store();
    let union = DataCollection::from_sources(vec![&facts as &dyn Data]);
    let evaluator = FoQueryEvaluator::new();
    let query = FoQuery::new(
        Formula::Atom(atom("nowhere", vec![v("X")])),
        vec![var("X")],
    );
    assert!(matches!(
        evaluator.evaluate(&query, &union),
        Err(EvalError::Store(fact_store::StoreError::UnknownPredicate(_)))
    ));
    // The same query against the plain store finds nothing, silently.
    let results: Vec<_> = evaluator.evaluate(&query, &facts).unwrap().collect();
    assert!(results.is_empty());
}

#[test]
fn soundness_on_variable_atoms_in_store() {
    // Stores may hold labelled nulls (variables); matching binds the
    // query variable to the stored null.
    let null = Term::variable("_v_null");
    let facts = InMemoryGraphStore::with_atoms([atom("e", vec![c("a"), null.clone()])]);
    let evaluator = FoQueryEvaluator::new();
    let query = FoQuery::new(
        Formula::Atom(atom("e", vec![c("a"), v("Y")])),
        vec![var("Y")],
    );
    let results: Vec<_> = evaluator
        .evaluate_and_project(&query, &facts)
        .unwrap()
        .collect();
    assert_eq!(results, vec![vec![null]]);
    let _ = facts.len();
}
