//! Query value types
//!
//! [`BasicQuery`] is the single-atom query a `Data` source answers
//! directly; [`ConjunctiveQuery`] and [`FoQuery`] are the caller-facing
//! shapes the evaluator consumes.

use crate::atom::{Atom, Predicate};
use crate::formula::Formula;
use crate::substitution::Substitution;
use crate::term::{Term, Variable};
use crate::{ModelError, ModelResult};
use std::collections::BTreeMap;
use std::fmt;

/// A single-atom query with bound positions and answer positions
///
/// Positions not in either map are ignored wildcards. Answer tuples
/// are ordered by ascending answer position.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasicQuery {
    predicate: Predicate,
    bound: BTreeMap<usize, Term>,
    answers: BTreeMap<usize, Variable>,
}

impl BasicQuery {
    /// Create a basic query, validating positions against the arity
    pub fn new(
        predicate: Predicate,
        bound: BTreeMap<usize, Term>,
        answers: BTreeMap<usize, Variable>,
    ) -> ModelResult<Self> {
        let arity = predicate.arity();
        for position in bound.keys().chain(answers.keys()) {
            if *position >= arity {
                return Err(ModelError::PositionOutOfRange {
                    predicate: format!("{predicate:?}"),
                    position: *position,
                });
            }
        }
        if let Some(position) = bound.keys().find(|p| answers.contains_key(p)) {
            return Err(ModelError::ConflictingPosition(*position));
        }
        Ok(Self {
            predicate,
            bound,
            answers,
        })
    }

    /// The queried predicate
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// The bound positions, in position order
    pub fn bound_positions(&self) -> &BTreeMap<usize, Term> {
        &self.bound
    }

    /// The answer-variable positions, in position order
    pub fn answer_variables(&self) -> &BTreeMap<usize, Variable> {
        &self.answers
    }

    /// The bound term at a position, if any
    pub fn bound_term(&self, position: usize) -> Option<&Term> {
        self.bound.get(&position)
    }

    /// Number of answer positions (the emitted tuple width)
    pub fn answer_width(&self) -> usize {
        self.answers.len()
    }
}

impl fmt::Debug for BasicQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate)?;
        for position in 0..self.predicate.arity() {
            if position > 0 {
                write!(f, ", ")?;
            }
            if let Some(term) = self.bound.get(&position) {
                write!(f, "{term}")?;
            } else if let Some(var) = self.answers.get(&position) {
                write!(f, "?{var}")?;
            } else {
                write!(f, "_")?;
            }
        }
        write!(f, ")")
    }
}

/// A conjunctive query: atoms, answer variables, optional seed bindings
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConjunctiveQuery {
    atoms: Vec<Atom>,
    answer_variables: Vec<Variable>,
    pre_substitution: Option<Substitution>,
}

impl ConjunctiveQuery {
    /// Create a conjunctive query
    pub fn new(atoms: Vec<Atom>, answer_variables: Vec<Variable>) -> Self {
        Self {
            atoms,
            answer_variables,
            pre_substitution: None,
        }
    }

    /// Attach seed bindings applied before evaluation
    pub fn with_pre_substitution(mut self, substitution: Substitution) -> Self {
        self.pre_substitution = Some(substitution);
        self
    }

    /// The query atoms, in order
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// The answer variables, in order
    pub fn answer_variables(&self) -> &[Variable] {
        &self.answer_variables
    }

    /// The seed bindings, if any
    pub fn pre_substitution(&self) -> Option<&Substitution> {
        self.pre_substitution.as_ref()
    }

    /// View this query as a first-order query
    ///
    /// An empty atom list turns into `None` (the empty conjunction has
    /// no formula representation).
    pub fn to_fo_query(&self) -> Option<FoQuery> {
        let formula = Formula::conjunction_of(self.atoms.iter().cloned())?;
        let mut query = FoQuery::new(formula, self.answer_variables.clone());
        if let Some(pre) = &self.pre_substitution {
            query = query.with_pre_substitution(pre.clone());
        }
        Some(query)
    }
}

impl fmt::Debug for ConjunctiveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?(")?;
        for (i, v) in self.answer_variables.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ") :- ")?;
        for (i, atom) in self.atoms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{atom}")?;
        }
        Ok(())
    }
}

/// A first-order query: arbitrary formula plus answer variables
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FoQuery {
    formula: Formula,
    answer_variables: Vec<Variable>,
    pre_substitution: Option<Substitution>,
}

impl FoQuery {
    /// Create a first-order query
    pub fn new(formula: Formula, answer_variables: Vec<Variable>) -> Self {
        Self {
            formula,
            answer_variables,
            pre_substitution: None,
        }
    }

    /// A query over a single atom, projecting its variables
    pub fn from_atom(atom: Atom) -> Self {
        let answer_variables = atom.variables().into_iter().collect();
        Self::new(Formula::Atom(atom), answer_variables)
    }

    /// Attach seed bindings applied before evaluation
    pub fn with_pre_substitution(mut self, substitution: Substitution) -> Self {
        self.pre_substitution = Some(substitution);
        self
    }

    /// The query formula
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// The answer variables, in order
    pub fn answer_variables(&self) -> &[Variable] {
        &self.answer_variables
    }

    /// The seed bindings, if any
    pub fn pre_substitution(&self) -> Option<&Substitution> {
        self.pre_substitution.as_ref()
    }
}

impl fmt::Debug for FoQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?(")?;
        for (i, v) in self.answer_variables.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ") :- {}", self.formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_query_position_validation() {
        let p = Predicate::new("p", 2);
        let bad = BasicQuery::new(
            p.clone(),
            BTreeMap::from([(5, Term::constant("a"))]),
            BTreeMap::new(),
        );
        assert!(matches!(bad, Err(ModelError::PositionOutOfRange { .. })));

        let conflicting = BasicQuery::new(
            p,
            BTreeMap::from([(0, Term::constant("a"))]),
            BTreeMap::from([(0, Variable::new("X"))]),
        );
        assert!(matches!(conflicting, Err(ModelError::ConflictingPosition(0))));
    }

    #[test]
    fn test_wildcard_positions_are_allowed() {
        let p = Predicate::new("p", 3);
        let q = BasicQuery::new(
            p,
            BTreeMap::from([(0, Term::constant("a"))]),
            BTreeMap::from([(2, Variable::new("X"))]),
        )
        .unwrap();
        // Position 1 is an ignored wildcard.
        assert_eq!(q.answer_width(), 1);
        assert!(q.bound_term(1).is_none());
    }

    #[test]
    fn test_cq_to_fo_query() {
        let atom = Atom::new(
            Predicate::new("p", 2),
            vec![Term::variable("X"), Term::variable("Y")],
        )
        .unwrap();
        let cq = ConjunctiveQuery::new(vec![atom], vec![Variable::new("X")]);
        let fo = cq.to_fo_query().unwrap();
        assert_eq!(fo.answer_variables().len(), 1);

        let empty = ConjunctiveQuery::new(vec![], vec![]);
        assert!(empty.to_fo_query().is_none());
    }
}
