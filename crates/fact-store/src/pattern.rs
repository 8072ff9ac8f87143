//! Per-position query constraints

use atom_model::{BasicQuery, Predicate};

/// Constraint on one position of a predicate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionConstraint {
    /// The position may be bound, projected or ignored freely
    Any,
    /// The position must be bound to a ground term at query time
    Ground,
}

/// Per-position constraints a source imposes on basic queries
///
/// An unconstrained pattern admits every well-formed query; a source
/// like the comparison predicates requires both positions ground.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicPattern {
    predicate: Predicate,
    constraints: Vec<PositionConstraint>,
}

impl AtomicPattern {
    /// A pattern with explicit per-position constraints
    ///
    /// Missing trailing constraints default to [`PositionConstraint::Any`].
    pub fn new(predicate: Predicate, mut constraints: Vec<PositionConstraint>) -> Self {
        constraints.resize(predicate.arity(), PositionConstraint::Any);
        Self {
            predicate,
            constraints,
        }
    }

    /// A pattern with no constraints at all
    pub fn unconstrained(predicate: Predicate) -> Self {
        let arity = predicate.arity();
        Self::new(predicate, vec![PositionConstraint::Any; arity])
    }

    /// A pattern requiring every position ground
    pub fn all_ground(predicate: Predicate) -> Self {
        let arity = predicate.arity();
        Self::new(predicate, vec![PositionConstraint::Ground; arity])
    }

    /// The constrained predicate
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// The constraint at a position
    pub fn constraint(&self, position: usize) -> PositionConstraint {
        self.constraints
            .get(position)
            .copied()
            .unwrap_or(PositionConstraint::Any)
    }

    /// Check whether a query satisfies every ground requirement
    pub fn admits(&self, query: &BasicQuery) -> bool {
        if query.predicate() != &self.predicate {
            return false;
        }
        self.constraints
            .iter()
            .enumerate()
            .all(|(position, constraint)| match constraint {
                PositionConstraint::Any => true,
                PositionConstraint::Ground => query
                    .bound_term(position)
                    .map(|t| t.is_ground())
                    .unwrap_or(false),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atom_model::{Term, Variable};
    use std::collections::BTreeMap;

    #[test]
    fn test_unconstrained_admits_wildcards() {
        let p = Predicate::new("p", 2);
        let pattern = AtomicPattern::unconstrained(p.clone());
        let query = BasicQuery::new(p, BTreeMap::new(), BTreeMap::new()).unwrap();
        assert!(pattern.admits(&query));
    }

    #[test]
    fn test_ground_requirement() {
        let p = Predicate::new("<", 2);
        let pattern = AtomicPattern::all_ground(p.clone());

        let unbound = BasicQuery::new(
            p.clone(),
            BTreeMap::from([(0, Term::literal_int(1))]),
            BTreeMap::from([(1, Variable::new("X"))]),
        )
        .unwrap();
        assert!(!pattern.admits(&unbound));

        let bound = BasicQuery::new(
            p,
            BTreeMap::from([(0, Term::literal_int(1)), (1, Term::literal_int(2))]),
            BTreeMap::new(),
        )
        .unwrap();
        assert!(pattern.admits(&bound));
    }

    #[test]
    fn test_bound_variable_is_not_ground() {
        let p = Predicate::new("<", 2);
        let pattern = AtomicPattern::all_ground(p.clone());
        let query = BasicQuery::new(
            p,
            BTreeMap::from([(0, Term::variable("X")), (1, Term::literal_int(2))]),
            BTreeMap::new(),
        )
        .unwrap();
        assert!(!pattern.admits(&query));
    }
}
