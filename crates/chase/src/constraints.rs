//! Negative-constraint checking against (saturated) data

use crate::ChaseResult;
use atom_model::{FoQuery, RuleBase, Substitution, Variable};
use fact_store::Data;
use homomorphism::FoQueryEvaluator;

/// Find a violated negative constraint, if any
///
/// A constraint is violated when its body is satisfiable in the data;
/// the witness substitution names the offending individuals. Returns
/// the first violation as (constraint index, witness), or `None` when
/// the data is consistent with every constraint.
pub fn find_violation(
    rule_base: &RuleBase,
    data: &dyn Data,
) -> ChaseResult<Option<(usize, Substitution)>> {
    let evaluator = FoQueryEvaluator::new();
    for (index, constraint) in rule_base.negative_constraints().iter().enumerate() {
        let answers: Vec<Variable> = constraint.body().free_variables().into_iter().collect();
        let query = FoQuery::new(constraint.body().clone(), answers);
        let mut witnesses = evaluator.evaluate(&query, data)?;
        if let Some(witness) = witnesses.next() {
            return Ok(Some((index, witness)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atom_model::{Atom, Formula, NegativeConstraint, Predicate, Term};
    use fact_store::InMemoryGraphStore;

    fn atom(p: &str, terms: Vec<Term>) -> Atom {
        Atom::new(Predicate::new(p, terms.len()), terms).unwrap()
    }

    #[test]
    fn test_violation_found_with_witness() {
        // Constraint: nobody is both a cat and a dog.
        let constraint = NegativeConstraint::new(
            Formula::and(
                Formula::Atom(atom("cat", vec![Term::variable("X")])),
                Formula::Atom(atom("dog", vec![Term::variable("X")])),
            ),
            Some("exclusive".into()),
        );
        let base = RuleBase::from_rules([], [constraint]);

        let consistent = InMemoryGraphStore::with_atoms([
            atom("cat", vec![Term::constant("felix")]),
            atom("dog", vec![Term::constant("rex")]),
        ]);
        assert!(find_violation(&base, &consistent).unwrap().is_none());

        let inconsistent = InMemoryGraphStore::with_atoms([
            atom("cat", vec![Term::constant("felix")]),
            atom("dog", vec![Term::constant("felix")]),
        ]);
        let (index, witness) = find_violation(&base, &inconsistent).unwrap().unwrap();
        assert_eq!(index, 0);
        assert_eq!(
            witness.get(&atom_model::Variable::new("X")),
            Some(&Term::constant("felix"))
        );
    }
}
