//! Built-in comparison predicates as a read-only source
//!
//! Exposes `<`, `<=`, `>`, `>=` and `!=`, each of arity 2, each
//! requiring both positions ground. A holding comparison yields a
//! single empty tuple; anything else yields nothing.

use crate::pattern::AtomicPattern;
use crate::{Data, StoreResult, TupleIter};
use atom_model::{
    BasicQuery, ComparisonKey, LiteralPolicy, Predicate, Term, COMPARISON_OPERATORS,
};
use std::cmp::Ordering;

/// Read-only source for the comparison predicates
#[derive(Clone, Debug, Default)]
pub struct ComparisonSource {
    policy: LiteralPolicy,
}

impl ComparisonSource {
    /// A source comparing by normalized values (the default policy)
    pub fn new() -> Self {
        Self::default()
    }

    /// A source with an explicit comparison policy
    pub fn with_policy(policy: LiteralPolicy) -> Self {
        Self { policy }
    }

    /// The comparison key of a term under this source's policy
    fn key_of(&self, term: &Term) -> Option<ComparisonKey> {
        match term {
            Term::Literal(literal) => Some(match self.policy {
                LiteralPolicy::Lexical => ComparisonKey::Text(literal.lexical().into()),
                LiteralPolicy::NormalizedValue => literal.key().clone(),
            }),
            Term::Constant(constant) => Some(ComparisonKey::Text(constant.name().into())),
            _ => None,
        }
    }

    fn holds(&self, operator: &str, left: &Term, right: &Term) -> bool {
        let keys = (self.key_of(left), self.key_of(right));
        let ordering = match &keys {
            (Some(l), Some(r)) => l.compare_values(r),
            _ => None,
        };
        match operator {
            "<" => ordering == Some(Ordering::Less),
            "<=" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            ">" => ordering == Some(Ordering::Greater),
            ">=" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            // Inequality falls back to term identity when the keys are
            // incomparable (a function term is still != a literal).
            "!=" => match ordering {
                Some(o) => o != Ordering::Equal,
                None => left != right,
            },
            _ => false,
        }
    }
}

impl Data for ComparisonSource {
    fn predicates(&self) -> Vec<Predicate> {
        COMPARISON_OPERATORS
            .iter()
            .map(|op| Predicate::new(*op, 2))
            .collect()
    }

    fn has_predicate(&self, predicate: &Predicate) -> bool {
        predicate.is_comparison()
    }

    fn atomic_pattern(&self, predicate: &Predicate) -> Option<AtomicPattern> {
        predicate
            .is_comparison()
            .then(|| AtomicPattern::all_ground(predicate.clone()))
    }

    fn evaluate<'a>(&'a self, query: &BasicQuery) -> StoreResult<TupleIter<'a>> {
        let (Some(left), Some(right)) = (query.bound_term(0), query.bound_term(1)) else {
            return Ok(Box::new(std::iter::empty()));
        };
        if self.holds(query.predicate().name(), left, right) {
            Ok(Box::new(std::iter::once(Vec::new())))
        } else {
            Ok(Box::new(std::iter::empty()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atom_model::Literal;
    use std::collections::BTreeMap;

    fn query(op: &str, left: Term, right: Term) -> BasicQuery {
        BasicQuery::new(
            Predicate::new(op, 2),
            BTreeMap::from([(0, left), (1, right)]),
            BTreeMap::new(),
        )
        .unwrap()
    }

    fn holds(source: &ComparisonSource, op: &str, left: Term, right: Term) -> bool {
        source.evaluate(&query(op, left, right)).unwrap().count() == 1
    }

    #[test]
    fn test_numeric_comparisons() {
        let source = ComparisonSource::new();
        assert!(holds(&source, "<", Term::literal_int(1), Term::literal_int(2)));
        assert!(!holds(&source, "<", Term::literal_int(2), Term::literal_int(2)));
        assert!(holds(&source, "<=", Term::literal_int(2), Term::literal_int(2)));
        assert!(holds(&source, ">", Term::literal_decimal(2.5), Term::literal_int(2)));
        assert!(holds(&source, "!=", Term::literal_int(1), Term::literal_int(2)));
    }

    #[test]
    fn test_cross_kind_is_incomparable() {
        let source = ComparisonSource::new();
        assert!(!holds(&source, "<", Term::literal_str("a"), Term::literal_int(2)));
        // ...but still unequal.
        assert!(holds(&source, "!=", Term::literal_str("a"), Term::literal_int(2)));
    }

    #[test]
    fn test_constants_compare_lexically() {
        let source = ComparisonSource::new();
        assert!(holds(&source, "<", Term::constant("a"), Term::constant("b")));
        assert!(!holds(&source, "!=", Term::constant("a"), Term::constant("a")));
    }

    #[test]
    fn test_lexical_policy() {
        let normalized = ComparisonSource::new();
        let lexical = ComparisonSource::with_policy(LiteralPolicy::Lexical);
        let l = |s: &str| Term::Literal(Literal::typed(s, atom_model::XSD_INTEGER));
        // "10" < "9" lexically, 10 > 9 numerically.
        assert!(holds(&lexical, "<", l("10"), l("9")));
        assert!(holds(&normalized, ">", l("10"), l("9")));
    }

    #[test]
    fn test_missing_operand_yields_nothing() {
        let source = ComparisonSource::new();
        let q = BasicQuery::new(
            Predicate::new("<", 2),
            BTreeMap::from([(0, Term::literal_int(1))]),
            BTreeMap::from([(1, atom_model::Variable::new("X"))]),
        )
        .unwrap();
        assert!(!source.can_evaluate(&q));
        assert_eq!(source.evaluate(&q).unwrap().count(), 0);
    }
}
