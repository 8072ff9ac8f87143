//! Coverage for the pluggable chase policies

use atom_model::{Atom, Formula, Predicate, Rule, RuleBase, Term, Variable};
use chase::{
    find_violation, stratify, ApplierKind, ChasableData, ChaseBuilder, ChaseError, CheckerKind,
    ComputerKind, ExternalInterruption, LimitAtoms, LimitSteps, StratificationStrategy,
    StratifiedChaseBuilder,
};
use fact_store::{
    Acceptance, AtomicPattern, ComparisonSource, Data, DatalogDelegable, FactBase,
    InMemoryGraphStore, MaterializedData, StoreResult, TupleIter, Writable,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn atom(p: &str, terms: Vec<Term>) -> Atom {
    Atom::new(Predicate::new(p, terms.len()), terms).unwrap()
}

fn c(n: &str) -> Term {
    Term::constant(n)
}

fn v(n: &str) -> Term {
    Term::variable(n)
}

fn transitivity() -> Rule {
    Rule::universally_closed(
        Formula::and(
            Formula::Atom(atom("p", vec![v("X"), v("Y")])),
            Formula::Atom(atom("p", vec![v("Y"), v("Z")])),
        ),
        Formula::Atom(atom("p", vec![v("X"), v("Z")])),
        None,
    )
    .unwrap()
}

fn chain_facts(n: usize) -> Vec<Atom> {
    (0..n)
        .map(|i| atom("p", vec![c(&format!("n{i}")), c(&format!("n{}", i + 1))]))
        .collect()
}

fn closure_size(n: usize) -> usize {
    // A chain of n edges closes into n*(n+1)/2 pairs.
    n * (n + 1) / 2
}

fn saturated_size(facts: Vec<Atom>, rules: Vec<Rule>, configure: impl FnOnce(ChaseBuilder) -> ChaseBuilder) -> usize {
    let data = ChasableData::new(Box::new(InMemoryGraphStore::with_atoms(facts)));
    let builder = ChaseBuilder::new()
        .chasable_data(data)
        .rule_base(RuleBase::from_rules(rules, []));
    let mut chase = configure(builder).build().unwrap();
    chase.execute().unwrap();
    let size = chase.core().data().target().len();
    size
}

#[test]
fn semi_naive_matches_naive() {
    let naive = saturated_size(chain_facts(5), vec![transitivity()], |b| b);
    let semi_naive = saturated_size(chain_facts(5), vec![transitivity()], |b| {
        b.computer(ComputerKind::SemiNaive)
    });
    assert_eq!(naive, closure_size(5));
    assert_eq!(semi_naive, naive);
}

#[test]
fn two_steps_matches_naive() {
    let two_steps = saturated_size(chain_facts(4), vec![transitivity()], |b| {
        b.computer(ComputerKind::TwoSteps)
    });
    assert_eq!(two_steps, closure_size(4));
}

#[test]
fn restricted_computer_reaches_the_same_fixpoint() {
    let restricted = saturated_size(chain_facts(4), vec![transitivity()], |b| {
        b.computer(ComputerKind::Restricted)
    });
    assert_eq!(restricted, closure_size(4));
}

#[test]
fn multi_thread_applier_matches_sequential() {
    let parallel = saturated_size(chain_facts(5), vec![transitivity()], |b| {
        b.applier(ApplierKind::MultiThread)
    });
    assert_eq!(parallel, closure_size(5));
}

#[test]
fn always_true_checker_needs_a_limit() {
    // Datalog-only, so AlwaysTrue with a step limit terminates with
    // the right answer anyway.
    let size = saturated_size(chain_facts(3), vec![transitivity()], |b| {
        b.checker(CheckerKind::AlwaysTrue)
            .halting_condition(Box::new(chase::CreatedFactsAtPreviousStep::new()))
            .halting_condition(Box::new(chase::HasRulesToApply::new()))
            .halting_condition(Box::new(LimitSteps::new(10)))
    });
    assert_eq!(size, closure_size(3));
}

#[test]
fn external_interruption_stops_before_any_step() {
    let flag = Arc::new(AtomicBool::new(true));
    let data = ChasableData::new(Box::new(InMemoryGraphStore::with_atoms(chain_facts(3))));
    let mut chase = ChaseBuilder::new()
        .chasable_data(data)
        .rule_base(RuleBase::from_rules([transitivity()], []))
        .standard_halting_conditions()
        .halting_condition(Box::new(ExternalInterruption::new(flag)))
        .build()
        .unwrap();
    chase.execute().unwrap();
    assert_eq!(chase.step_count(), 0);
    assert_eq!(chase.core().data().target().len(), 3);
}

#[test]
fn atom_limit_caps_growth() {
    let data = ChasableData::new(Box::new(InMemoryGraphStore::with_atoms(chain_facts(6))));
    let mut chase = ChaseBuilder::new()
        .chasable_data(data)
        .rule_base(RuleBase::from_rules([transitivity()], []))
        .standard_halting_conditions()
        .halting_condition(Box::new(LimitAtoms::new(8)))
        .build()
        .unwrap();
    chase.execute().unwrap();
    // The limit is checked between steps: at least 8 atoms, but the
    // chase stopped before full closure.
    assert!(chase.core().data().target().len() >= 8);
    assert!(chase.core().data().target().len() < closure_size(6));
}

#[test]
fn comparison_atoms_in_rule_bodies() {
    // age(X, A) ∧ A >= 18 → adult(X)
    let rule = Rule::universally_closed(
        Formula::and(
            Formula::Atom(atom("age", vec![v("X"), v("A")])),
            Formula::Atom(
                Atom::new(Predicate::new(">=", 2), vec![v("A"), Term::literal_int(18)]).unwrap(),
            ),
        ),
        Formula::Atom(atom("adult", vec![v("X")])),
        None,
    )
    .unwrap();
    let facts = InMemoryGraphStore::with_atoms([
        atom("age", vec![c("alice"), Term::literal_int(30)]),
        atom("age", vec![c("bob"), Term::literal_int(17)]),
    ]);
    let data = ChasableData::with_sources(
        Box::new(facts),
        vec![Box::new(ComparisonSource::new())],
    );
    let mut chase = ChaseBuilder::new()
        .chasable_data(data)
        .rule_base(RuleBase::from_rules([rule], []))
        .build()
        .unwrap();
    chase.execute().unwrap();
    let target = chase.into_data().into_target();
    assert!(target.contains(&atom("adult", vec![c("alice")])));
    assert!(!target.contains(&atom("adult", vec![c("bob")])));
}

#[test]
fn stratified_chase_matches_plain_chase() {
    let rules = [
        Rule::new(
            Formula::Atom(atom("p", vec![v("X")])),
            Formula::Atom(atom("q", vec![v("X")])),
            None,
        )
        .unwrap(),
        Rule::new(
            Formula::Atom(atom("q", vec![v("X")])),
            Formula::Atom(atom("r", vec![v("X")])),
            None,
        )
        .unwrap(),
    ];
    let facts = vec![atom("p", vec![c("a")]), atom("p", vec![c("b")])];

    let plain = saturated_size(facts.clone(), rules.to_vec(), |b| b);

    let mut stratified = StratifiedChaseBuilder::new()
        .chasable_data(ChasableData::new(Box::new(InMemoryGraphStore::with_atoms(
            facts,
        ))))
        .rule_base(RuleBase::from_rules(rules, []))
        .strategy(StratificationStrategy::ByScc)
        .build()
        .unwrap();
    stratified.execute().unwrap();
    assert_eq!(stratified.strata_run(), 2);
    let target = stratified.into_data().unwrap().into_target();
    assert_eq!(target.len(), plain);
}

#[test]
fn stratified_final_predicates_drop_intermediates() {
    let rules = [
        Rule::new(
            Formula::Atom(atom("p", vec![v("X")])),
            Formula::Atom(atom("q", vec![v("X")])),
            None,
        )
        .unwrap(),
        Rule::new(
            Formula::Atom(atom("q", vec![v("X")])),
            Formula::Atom(atom("r", vec![v("X")])),
            None,
        )
        .unwrap(),
    ];
    let mut stratified = StratifiedChaseBuilder::new()
        .chasable_data(ChasableData::new(Box::new(InMemoryGraphStore::with_atoms(
            vec![atom("p", vec![c("a")])],
        ))))
        .rule_base(RuleBase::from_rules(rules, []))
        .final_predicates(vec![Predicate::new("r", 1)])
        .build()
        .unwrap();
    stratified.execute().unwrap();
    let target = stratified.into_data().unwrap().into_target();
    assert!(target.contains(&atom("r", vec![c("a")])));
    assert!(!target.has_predicate(&Predicate::new("q", 1)));
}

#[test]
fn stratification_strategies_cover_the_rule_base() {
    let base = RuleBase::from_rules(
        [
            Rule::new(
                Formula::Atom(atom("p", vec![v("X")])),
                Formula::Atom(atom("q", vec![v("X")])),
                None,
            )
            .unwrap(),
            transitivity(),
        ],
        [],
    );
    for strategy in [
        StratificationStrategy::ByScc,
        StratificationStrategy::PseudoMinimal,
        StratificationStrategy::SingleEvaluation,
    ] {
        let strata = stratify(&base, strategy);
        let total: usize = strata.iter().map(RuleBase::len).sum();
        assert_eq!(total, base.len(), "{strategy:?} lost or duplicated rules");
    }
}

#[test]
fn negative_constraint_violations_surface_after_saturation() {
    use atom_model::NegativeConstraint;
    let rule = Rule::new(
        Formula::Atom(atom("penguin", vec![v("X")])),
        Formula::Atom(atom("bird", vec![v("X")])),
        None,
    )
    .unwrap();
    let constraint = NegativeConstraint::new(
        Formula::and(
            Formula::Atom(atom("bird", vec![v("X")])),
            Formula::Atom(atom("submarine", vec![v("X")])),
        ),
        None,
    );
    let base = RuleBase::from_rules([rule], [constraint]);
    let data = ChasableData::new(Box::new(InMemoryGraphStore::with_atoms([
        atom("penguin", vec![c("pingu")]),
        atom("submarine", vec![c("pingu")]),
    ])));
    let mut chase = ChaseBuilder::new()
        .chasable_data(data)
        .rule_base(base.clone())
        .build()
        .unwrap();
    chase.execute().unwrap();
    let target = chase.into_data().into_target();
    let violation = find_violation(&base, target.as_data()).unwrap();
    assert!(violation.is_some());
}

/// A store that natively saturates datalog batches (one predicate
/// copy rule), for the source-delegated applier
struct CopyingStore {
    inner: InMemoryGraphStore,
}

impl CopyingStore {
    fn new(atoms: impl IntoIterator<Item = Atom>) -> Self {
        Self {
            inner: InMemoryGraphStore::with_atoms(atoms),
        }
    }
}

impl Data for CopyingStore {
    fn predicates(&self) -> Vec<Predicate> {
        self.inner.predicates()
    }
    fn has_predicate(&self, predicate: &Predicate) -> bool {
        self.inner.has_predicate(predicate)
    }
    fn atomic_pattern(&self, predicate: &Predicate) -> Option<AtomicPattern> {
        self.inner.atomic_pattern(predicate)
    }
    fn evaluate<'a>(&'a self, query: &atom_model::BasicQuery) -> StoreResult<TupleIter<'a>> {
        self.inner.evaluate(query)
    }
}

impl MaterializedData for CopyingStore {
    fn atoms(&self) -> Box<dyn Iterator<Item = &Atom> + '_> {
        self.inner.atoms()
    }
    fn len(&self) -> usize {
        self.inner.len()
    }
    fn contains(&self, a: &Atom) -> bool {
        self.inner.contains(a)
    }
}

impl Writable for CopyingStore {
    fn accepts_atom(&self, atom: &Atom) -> Acceptance {
        self.inner.accepts_atom(atom)
    }
    fn add(&mut self, atom: Atom) -> StoreResult<bool> {
        self.inner.add(atom)
    }
    fn remove(&mut self, atom: &Atom) -> bool {
        self.inner.remove(atom)
    }
}

impl DatalogDelegable for CopyingStore {
    fn delegate_rules(&mut self, rules: &[Rule]) -> StoreResult<bool> {
        // Naive bottom-up application of copy-shaped rules.
        let mut changed = false;
        for rule in rules {
            let body_predicates: BTreeSet<Predicate> = rule
                .body_atoms()
                .iter()
                .map(|a| a.predicate().clone())
                .collect();
            for body_predicate in body_predicates {
                let head_atoms = rule.head_atoms();
                let Some(head) = head_atoms.first() else {
                    continue;
                };
                let matching: Vec<Atom> = self
                    .inner
                    .atoms()
                    .filter(|a| a.predicate() == &body_predicate)
                    .cloned()
                    .collect();
                for fact in matching {
                    let copied =
                        Atom::new(head.predicate().clone(), fact.terms().to_vec()).ok();
                    if let Some(copied) = copied {
                        changed |= self.inner.add(copied)?;
                    }
                }
            }
        }
        Ok(changed)
    }
}

impl FactBase for CopyingStore {
    fn as_data(&self) -> &dyn Data {
        self
    }
    fn as_materialized(&self) -> &dyn MaterializedData {
        self
    }
    fn datalog_delegable(&mut self) -> Option<&mut dyn DatalogDelegable> {
        Some(self)
    }
}

#[test]
fn source_delegated_applier_uses_the_store() {
    // p(X) → q(X) is datalog: the store saturates it natively.
    let rule = Rule::new(
        Formula::Atom(atom("p", vec![v("X")])),
        Formula::Atom(atom("q", vec![v("X")])),
        None,
    )
    .unwrap();
    let data = ChasableData::new(Box::new(CopyingStore::new([atom("p", vec![c("a")])])));
    let mut chase = ChaseBuilder::new()
        .chasable_data(data)
        .rule_base(RuleBase::from_rules([rule], []))
        .applier(ApplierKind::SourceDelegatedDatalog)
        .build()
        .unwrap();
    chase.execute().unwrap();
    let target = chase.into_data().into_target();
    assert!(target.contains(&atom("q", vec![c("a")])));
}

#[test]
fn builder_rejects_rule_base_swap_after_start() {
    let data = ChasableData::new(Box::new(InMemoryGraphStore::with_atoms(chain_facts(2))));
    let mut chase = ChaseBuilder::new()
        .chasable_data(data)
        .rule_base(RuleBase::from_rules([transitivity()], []))
        .build()
        .unwrap();
    chase.execute().unwrap();
    assert!(chase.step_count() > 0);
    let swap = chase.core_mut().set_rule_base(RuleBase::new());
    assert!(matches!(swap, Err(ChaseError::Configuration(_))));
}
