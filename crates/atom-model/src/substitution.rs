//! Substitutions: partial maps from variables to terms
//!
//! A substitution is a value (cheap to clone, usable as a memo key).
//! Variables are stored in a `BTreeMap`, so iteration order is the
//! variable order and two equal substitutions hash identically. An
//! identity pair `v ↦ v` is never recorded.

use crate::atom::Atom;
use crate::formula::Formula;
use crate::term::{FunctionTerm, Term, Variable};
use std::collections::BTreeMap;
use std::fmt;

/// A partial mapping from variables to terms
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Substitution {
    map: BTreeMap<Variable, Term>,
}

impl Substitution {
    /// The empty substitution
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mapped variables
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no variable is mapped
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Map `variable` to `term`, overwriting any previous image
    ///
    /// Identity pairs are dropped silently (a substitution never maps
    /// a variable to itself).
    pub fn insert(&mut self, variable: Variable, term: Term) {
        if let Term::Variable(v) = &term {
            if *v == variable {
                self.map.remove(&variable);
                return;
            }
        }
        self.map.insert(variable, term);
    }

    /// Extend with a binding, failing on conflict
    ///
    /// Returns `true` when the variable was unbound or already bound to
    /// the same term, `false` on a conflicting image. The map is only
    /// modified in the success case.
    pub fn bind(&mut self, variable: Variable, term: Term) -> bool {
        match self.map.get(&variable) {
            Some(existing) => *existing == term,
            None => {
                self.insert(variable, term);
                true
            }
        }
    }

    /// The image of a variable, if mapped
    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.map.get(variable)
    }

    /// True when the variable is in the domain
    pub fn contains(&self, variable: &Variable) -> bool {
        self.map.contains_key(variable)
    }

    /// Remove a variable from the domain
    pub fn remove(&mut self, variable: &Variable) -> Option<Term> {
        self.map.remove(variable)
    }

    /// The domain, in variable order
    pub fn domain(&self) -> impl Iterator<Item = &Variable> {
        self.map.keys()
    }

    /// The graph of the mapping, in variable order
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.map.iter()
    }

    /// Apply to a term
    ///
    /// Non-variable, non-function terms are returned unchanged;
    /// function terms are rewritten structurally.
    pub fn apply_term(&self, term: &Term) -> Term {
        match term {
            Term::Variable(v) => self
                .map
                .get(v)
                .cloned()
                .unwrap_or_else(|| term.clone()),
            Term::Constant(_) | Term::Literal(_) | Term::Blank(_) => term.clone(),
            Term::LogicalFunction(f) => Term::LogicalFunction(self.apply_function(f)),
            Term::EvaluableFunction(f) => Term::EvaluableFunction(self.apply_function(f)),
        }
    }

    fn apply_function(&self, f: &FunctionTerm) -> FunctionTerm {
        FunctionTerm::new(
            f.name().to_string(),
            f.args().iter().map(|a| self.apply_term(a)).collect(),
        )
    }

    /// Apply to an atom
    pub fn apply_atom(&self, atom: &Atom) -> Atom {
        atom.rebuilt(atom.terms().iter().map(|t| self.apply_term(t)))
    }

    /// Apply to a sequence of atoms
    pub fn apply_atoms<'a>(&self, atoms: impl IntoIterator<Item = &'a Atom>) -> Vec<Atom> {
        atoms.into_iter().map(|a| self.apply_atom(a)).collect()
    }

    /// Apply to a formula, replacing free occurrences only
    ///
    /// Quantified variables shadow the substitution inside their scope.
    pub fn apply_formula(&self, formula: &Formula) -> Formula {
        match formula {
            Formula::Atom(atom) => Formula::Atom(self.apply_atom(atom)),
            Formula::And(l, r) => Formula::and(self.apply_formula(l), self.apply_formula(r)),
            Formula::Or(l, r) => Formula::or(self.apply_formula(l), self.apply_formula(r)),
            Formula::Not(inner) => Formula::not(self.apply_formula(inner)),
            Formula::Exists(v, inner) => {
                Formula::exists(v.clone(), self.scoped(v).apply_formula(inner))
            }
            Formula::Forall(v, inner) => {
                Formula::forall(v.clone(), self.scoped(v).apply_formula(inner))
            }
        }
    }

    /// This substitution with one variable removed from the domain
    fn scoped(&self, shadowed: &Variable) -> Substitution {
        if self.map.contains_key(shadowed) {
            let mut scoped = self.clone();
            scoped.map.remove(shadowed);
            scoped
        } else {
            self.clone()
        }
    }

    /// Composition: `self ∘ other`
    ///
    /// The result maps every `v ∈ dom(other)` to `self(other(v))` and
    /// keeps the entries of `self` not shadowed by `other`; identity
    /// pairs are stripped. For every term `t`,
    /// `compose(a, b).apply(t) == a.apply(b.apply(t))`.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        let mut out = Substitution::new();
        for (v, t) in other.iter() {
            out.insert(v.clone(), self.apply_term(t));
        }
        for (v, t) in self.iter() {
            if !other.contains(v) {
                out.insert(v.clone(), t.clone());
            }
        }
        out
    }

    /// Canonical form with no identity entries
    ///
    /// Insertion already refuses identity pairs, so this is the
    /// identity function on well-formed values; it exists so callers
    /// can normalize substitutions received from outside.
    pub fn normalize(&self) -> Substitution {
        let mut out = Substitution::new();
        for (v, t) in self.iter() {
            out.insert(v.clone(), t.clone());
        }
        out
    }

    /// Restriction of the domain to the given variables
    pub fn restrict<'a>(&self, variables: impl IntoIterator<Item = &'a Variable>) -> Substitution {
        let mut out = Substitution::new();
        for v in variables {
            if let Some(t) = self.map.get(v) {
                out.insert(v.clone(), t.clone());
            }
        }
        out
    }

    /// A renaming of the given variables to fresh ones
    pub fn fresh_renaming<'a>(variables: impl IntoIterator<Item = &'a Variable>) -> Substitution {
        let mut out = Substitution::new();
        for v in variables {
            out.insert(v.clone(), Term::Variable(Variable::fresh()));
        }
        out
    }
}

impl FromIterator<(Variable, Term)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (Variable, Term)>>(iter: I) -> Self {
        let mut out = Substitution::new();
        for (v, t) in iter {
            out.insert(v, t);
        }
        out
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (v, t)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v} \u{21a6} {t}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Predicate;

    fn sub(pairs: &[(&str, Term)]) -> Substitution {
        pairs
            .iter()
            .map(|(v, t)| (Variable::new(*v), t.clone()))
            .collect()
    }

    #[test]
    fn test_identity_pairs_are_dropped() {
        let s = sub(&[("X", Term::variable("X")), ("Y", Term::constant("a"))]);
        assert_eq!(s.len(), 1);
        assert!(!s.contains(&Variable::new("X")));
    }

    #[test]
    fn test_apply_term() {
        let s = sub(&[("X", Term::constant("a"))]);
        assert_eq!(s.apply_term(&Term::variable("X")), Term::constant("a"));
        assert_eq!(s.apply_term(&Term::variable("Y")), Term::variable("Y"));
        assert_eq!(s.apply_term(&Term::constant("b")), Term::constant("b"));
    }

    #[test]
    fn test_apply_recurses_into_function_terms() {
        let s = sub(&[("X", Term::constant("a"))]);
        let t = Term::LogicalFunction(FunctionTerm::new("f", vec![Term::variable("X")]));
        let expected = Term::LogicalFunction(FunctionTerm::new("f", vec![Term::constant("a")]));
        assert_eq!(s.apply_term(&t), expected);
    }

    #[test]
    fn test_compose_law() {
        let a = sub(&[("Y", Term::constant("c"))]);
        let b = sub(&[("X", Term::variable("Y"))]);
        let composed = a.compose(&b);
        for t in [Term::variable("X"), Term::variable("Y"), Term::constant("d")] {
            assert_eq!(composed.apply_term(&t), a.apply_term(&b.apply_term(&t)));
        }
    }

    #[test]
    fn test_compose_strips_identities() {
        // b maps X to Y, a maps Y back to X: composition is empty on X.
        let a = sub(&[("Y", Term::variable("X"))]);
        let b = sub(&[("X", Term::variable("Y"))]);
        let composed = a.compose(&b);
        assert!(!composed.contains(&Variable::new("X")));
    }

    #[test]
    fn test_bind_conflict() {
        let mut s = Substitution::new();
        assert!(s.bind(Variable::new("X"), Term::constant("a")));
        assert!(s.bind(Variable::new("X"), Term::constant("a")));
        assert!(!s.bind(Variable::new("X"), Term::constant("b")));
        assert_eq!(s.get(&Variable::new("X")), Some(&Term::constant("a")));
    }

    #[test]
    fn test_apply_formula_respects_quantifier_scope() {
        let s = sub(&[("X", Term::constant("a"))]);
        let f = Formula::exists(
            Variable::new("X"),
            Formula::Atom(
                Atom::new(Predicate::new("p", 1), vec![Term::variable("X")]).unwrap(),
            ),
        );
        // X is bound inside: the substitution must not reach it.
        assert_eq!(s.apply_formula(&f), f);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let s = sub(&[("X", Term::constant("a"))]);
        assert_eq!(s.normalize(), s);
        assert_eq!(s.normalize().normalize(), s.normalize());
    }
}
