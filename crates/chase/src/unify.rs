//! Syntactic unification and one-way matching over atoms

use atom_model::{Atom, Substitution, Term, Variable};
use std::collections::BTreeSet;

/// Most general unifier of two atoms, if one exists
///
/// Variables on either side unify; function terms unify structurally
/// (same symbol, same kind, same arity); everything else requires
/// equality. An occurs check prevents infinite terms. Callers wanting
/// "after renaming" semantics rename one side apart first.
pub fn unify(left: &Atom, right: &Atom) -> Option<Substitution> {
    if left.predicate() != right.predicate() {
        return None;
    }
    let mut unifier = Substitution::new();
    for (l, r) in left.terms().iter().zip(right.terms()) {
        if !unify_terms(&mut unifier, l, r) {
            return None;
        }
    }
    Some(unifier)
}

fn unify_terms(unifier: &mut Substitution, left: &Term, right: &Term) -> bool {
    let left = unifier.apply_term(left);
    let right = unifier.apply_term(right);
    if left == right {
        return true;
    }
    match (&left, &right) {
        (Term::Variable(v), other) | (other, Term::Variable(v)) => {
            if occurs(v, other) {
                return false;
            }
            let binding: Substitution = [(v.clone(), (*other).clone())].into_iter().collect();
            *unifier = binding.compose(unifier);
            true
        }
        (Term::LogicalFunction(f), Term::LogicalFunction(g))
        | (Term::EvaluableFunction(f), Term::EvaluableFunction(g)) => {
            f.name() == g.name()
                && f.args().len() == g.args().len()
                && f.args()
                    .iter()
                    .zip(g.args())
                    .all(|(a, b)| unify_terms(unifier, a, b))
        }
        _ => false,
    }
}

fn occurs(variable: &Variable, term: &Term) -> bool {
    let mut vars = BTreeSet::new();
    term.collect_variables(&mut vars);
    vars.contains(variable)
}

/// One-way matching: a substitution σ with σ(general) = specific
///
/// Only the general side's variables may be bound.
pub fn matches(general: &Atom, specific: &Atom) -> Option<Substitution> {
    if general.predicate() != specific.predicate() {
        return None;
    }
    let mut matcher = Substitution::new();
    for (g, s) in general.terms().iter().zip(specific.terms()) {
        if !match_terms(&mut matcher, g, s) {
            return None;
        }
    }
    Some(matcher)
}

fn match_terms(matcher: &mut Substitution, general: &Term, specific: &Term) -> bool {
    match general {
        Term::Variable(v) => matcher.bind(v.clone(), specific.clone()),
        Term::LogicalFunction(f) => match specific {
            Term::LogicalFunction(g) => {
                f.name() == g.name()
                    && f.args().len() == g.args().len()
                    && f.args()
                        .iter()
                        .zip(g.args())
                        .all(|(a, b)| match_terms(matcher, a, b))
            }
            _ => false,
        },
        Term::EvaluableFunction(f) => match specific {
            Term::EvaluableFunction(g) => {
                f.name() == g.name()
                    && f.args().len() == g.args().len()
                    && f.args()
                        .iter()
                        .zip(g.args())
                        .all(|(a, b)| match_terms(matcher, a, b))
            }
            _ => false,
        },
        other => other == specific,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atom_model::Predicate;

    fn atom(p: &str, terms: Vec<Term>) -> Atom {
        Atom::new(Predicate::new(p, terms.len()), terms).unwrap()
    }

    #[test]
    fn test_unify_variable_against_constant() {
        let a = atom("p", vec![Term::variable("X"), Term::constant("b")]);
        let b = atom("p", vec![Term::constant("a"), Term::variable("Y")]);
        let unifier = unify(&a, &b).unwrap();
        assert_eq!(unifier.apply_atom(&a), unifier.apply_atom(&b));
    }

    #[test]
    fn test_unify_conflict() {
        let a = atom("p", vec![Term::constant("a")]);
        let b = atom("p", vec![Term::constant("b")]);
        assert!(unify(&a, &b).is_none());
    }

    #[test]
    fn test_unify_shared_variable() {
        // p(X, X) with p(a, b) cannot unify; with p(a, a) it can.
        let shared = atom("p", vec![Term::variable("X"), Term::variable("X")]);
        assert!(unify(&shared, &atom("p", vec![Term::constant("a"), Term::constant("b")])).is_none());
        assert!(unify(&shared, &atom("p", vec![Term::constant("a"), Term::constant("a")])).is_some());
    }

    #[test]
    fn test_occurs_check() {
        use atom_model::FunctionTerm;
        let a = atom("p", vec![Term::variable("X")]);
        let b = atom(
            "p",
            vec![Term::LogicalFunction(FunctionTerm::new(
                "f",
                vec![Term::variable("X")],
            ))],
        );
        assert!(unify(&a, &b).is_none());
    }

    #[test]
    fn test_one_way_matching() {
        let general = atom("p", vec![Term::variable("X"), Term::variable("X")]);
        let specific = atom("p", vec![Term::constant("a"), Term::constant("a")]);
        assert!(matches(&general, &specific).is_some());
        // The specific side's variables must not be bound.
        let open = atom("p", vec![Term::constant("a"), Term::variable("Y")]);
        assert!(matches(&general, &open).is_none());
    }
}
