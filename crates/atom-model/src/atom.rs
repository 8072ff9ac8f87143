//! Predicates and atoms

use crate::term::{Constant, Term, Variable};
use crate::{ModelError, ModelResult};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Name of the built-in equality predicate
pub const EQUALITY_PREDICATE_NAME: &str = "=";

/// The built-in comparison operators (all arity 2)
pub const COMPARISON_OPERATORS: [&str; 5] = ["<", "<=", ">", ">=", "!="];

/// A predicate: a name together with a fixed arity
///
/// Equality and hashing are on `(name, arity)`; the arity is immutable.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Predicate {
    name: Arc<str>,
    arity: usize,
}

impl Predicate {
    /// Create a predicate
    pub fn new(name: impl Into<Arc<str>>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    /// The built-in equality predicate `=`/2
    pub fn equality() -> Self {
        Self::new(EQUALITY_PREDICATE_NAME, 2)
    }

    /// A built-in comparison predicate (`<`, `<=`, `>`, `>=`, `!=`)
    pub fn comparison(symbol: &str) -> ModelResult<Self> {
        if COMPARISON_OPERATORS.contains(&symbol) {
            Ok(Self::new(symbol, 2))
        } else {
            Err(ModelError::UnknownComparisonOperator(symbol.to_string()))
        }
    }

    /// The predicate name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The predicate arity
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Check if this is the equality predicate
    pub fn is_equality(&self) -> bool {
        self.arity == 2 && &*self.name == EQUALITY_PREDICATE_NAME
    }

    /// Check if this is one of the comparison predicates
    pub fn is_comparison(&self) -> bool {
        self.arity == 2 && COMPARISON_OPERATORS.contains(&&*self.name)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// A predicate applied to an ordered sequence of terms
///
/// The term count always matches the predicate arity; [`Atom::new`]
/// rejects mismatches. Equality and hashing are structural.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Atom {
    predicate: Predicate,
    terms: SmallVec<[Term; 4]>,
}

impl Atom {
    /// Create an atom, validating the term count against the arity
    pub fn new(predicate: Predicate, terms: impl IntoIterator<Item = Term>) -> ModelResult<Self> {
        let terms: SmallVec<[Term; 4]> = terms.into_iter().collect();
        if terms.len() != predicate.arity() {
            return Err(ModelError::ArityMismatch {
                predicate: format!("{predicate:?}"),
                expected: predicate.arity(),
                actual: terms.len(),
            });
        }
        Ok(Self { predicate, terms })
    }

    /// Rebuild an atom with the same predicate and new terms
    ///
    /// Internal shortcut for term-by-term rewrites that preserve the
    /// term count by construction.
    pub(crate) fn rebuilt(&self, terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            predicate: self.predicate.clone(),
            terms: terms.into_iter().collect(),
        }
    }

    /// The predicate
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// The terms, in positional order
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// The term at a position
    pub fn term(&self, position: usize) -> Option<&Term> {
        self.terms.get(position)
    }

    /// The predicate arity (equals the term count)
    pub fn arity(&self) -> usize {
        self.predicate.arity()
    }

    /// True when every term is ground
    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(Term::is_ground)
    }

    /// The variables occurring anywhere in the terms, sorted
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut out = BTreeSet::new();
        for term in &self.terms {
            term.collect_variables(&mut out);
        }
        out
    }

    /// The constants occurring at top level, sorted
    pub fn constants(&self) -> BTreeSet<Constant> {
        self.terms
            .iter()
            .filter_map(|t| t.as_constant().cloned())
            .collect()
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicate.is_equality() || self.predicate.is_comparison() {
            return write!(f, "{} {} {}", self.terms[0], self.predicate, self.terms[1]);
        }
        write!(f, "{}(", self.predicate)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{term}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(p: &str, terms: Vec<Term>) -> Atom {
        Atom::new(Predicate::new(p, terms.len()), terms).unwrap()
    }

    #[test]
    fn test_arity_is_validated() {
        let p = Predicate::new("p", 2);
        let err = Atom::new(p, vec![Term::constant("a")]);
        assert!(matches!(err, Err(ModelError::ArityMismatch { .. })));
    }

    #[test]
    fn test_structural_equality() {
        let a = atom("p", vec![Term::constant("a"), Term::variable("X")]);
        let b = atom("p", vec![Term::constant("a"), Term::variable("X")]);
        assert_eq!(a, b);
        let c = atom("p", vec![Term::variable("X"), Term::constant("a")]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_variables_include_function_arguments() {
        use crate::term::FunctionTerm;
        let a = atom(
            "p",
            vec![Term::LogicalFunction(FunctionTerm::new(
                "f",
                vec![Term::variable("X")],
            ))],
        );
        assert_eq!(a.variables().len(), 1);
        assert!(!a.is_ground());
    }

    #[test]
    fn test_special_predicates() {
        assert!(Predicate::equality().is_equality());
        assert!(Predicate::comparison("<").unwrap().is_comparison());
        assert!(Predicate::comparison("~").is_err());
        // A user predicate named "=" with a different arity is ordinary.
        assert!(!Predicate::new("=", 3).is_equality());
    }

    #[test]
    fn test_display() {
        let a = atom("p", vec![Term::constant("a"), Term::constant("b")]);
        assert_eq!(a.to_string(), "p(a, b)");
        let eq = Atom::new(
            Predicate::equality(),
            vec![Term::variable("X"), Term::constant("a")],
        )
        .unwrap();
        assert_eq!(eq.to_string(), "X = a");
    }
}
