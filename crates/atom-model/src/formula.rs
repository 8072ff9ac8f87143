//! First-order formulas as a sealed sum
//!
//! The variant set is closed (`Atom`, conjunction, disjunction,
//! negation, existential and universal quantification); every consumer
//! dispatches with a `match`.

use crate::atom::Atom;
use crate::term::Variable;
use std::collections::BTreeSet;
use std::fmt;

/// A first-order formula over atoms
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Formula {
    /// An atomic formula
    Atom(Atom),
    /// Conjunction of two formulas
    And(Box<Formula>, Box<Formula>),
    /// Disjunction of two formulas
    Or(Box<Formula>, Box<Formula>),
    /// Negation of a formula
    Not(Box<Formula>),
    /// Existential quantification
    Exists(Variable, Box<Formula>),
    /// Universal quantification
    Forall(Variable, Box<Formula>),
}

impl Formula {
    /// Conjunction of two formulas
    pub fn and(left: Formula, right: Formula) -> Self {
        Formula::And(Box::new(left), Box::new(right))
    }

    /// Disjunction of two formulas
    pub fn or(left: Formula, right: Formula) -> Self {
        Formula::Or(Box::new(left), Box::new(right))
    }

    /// Negation of a formula
    pub fn not(inner: Formula) -> Self {
        Formula::Not(Box::new(inner))
    }

    /// Existential quantification over one variable
    pub fn exists(variable: Variable, inner: Formula) -> Self {
        Formula::Exists(variable, Box::new(inner))
    }

    /// Universal quantification over one variable
    pub fn forall(variable: Variable, inner: Formula) -> Self {
        Formula::Forall(variable, Box::new(inner))
    }

    /// Left-deep conjunction of a sequence of atoms
    ///
    /// Returns `None` for an empty sequence.
    pub fn conjunction_of(atoms: impl IntoIterator<Item = Atom>) -> Option<Formula> {
        let mut iter = atoms.into_iter();
        let first = Formula::Atom(iter.next()?);
        Some(iter.fold(first, |acc, atom| Formula::and(acc, Formula::Atom(atom))))
    }

    /// The free variables of this formula, sorted
    pub fn free_variables(&self) -> BTreeSet<Variable> {
        match self {
            Formula::Atom(atom) => atom.variables(),
            Formula::And(l, r) | Formula::Or(l, r) => {
                let mut vars = l.free_variables();
                vars.extend(r.free_variables());
                vars
            }
            Formula::Not(inner) => inner.free_variables(),
            Formula::Exists(v, inner) | Formula::Forall(v, inner) => {
                let mut vars = inner.free_variables();
                vars.remove(v);
                vars
            }
        }
    }

    /// The quantifier-bound variables of this formula, sorted
    pub fn bound_variables(&self) -> BTreeSet<Variable> {
        match self {
            Formula::Atom(_) => BTreeSet::new(),
            Formula::And(l, r) | Formula::Or(l, r) => {
                let mut vars = l.bound_variables();
                vars.extend(r.bound_variables());
                vars
            }
            Formula::Not(inner) => inner.bound_variables(),
            Formula::Exists(v, inner) | Formula::Forall(v, inner) => {
                let mut vars = inner.bound_variables();
                vars.insert(v.clone());
                vars
            }
        }
    }

    /// The existentially quantified variables, sorted
    pub fn existential_variables(&self) -> BTreeSet<Variable> {
        match self {
            Formula::Atom(_) => BTreeSet::new(),
            Formula::And(l, r) | Formula::Or(l, r) => {
                let mut vars = l.existential_variables();
                vars.extend(r.existential_variables());
                vars
            }
            Formula::Not(inner) | Formula::Forall(_, inner) => inner.existential_variables(),
            Formula::Exists(v, inner) => {
                let mut vars = inner.existential_variables();
                vars.insert(v.clone());
                vars
            }
        }
    }

    /// Atoms reachable without crossing a negation, in syntactic order
    pub fn atoms(&self) -> Vec<&Atom> {
        let mut out = Vec::new();
        self.collect_atoms(false, &mut out);
        out
    }

    /// All atoms including those under negation, in syntactic order
    ///
    /// Used by the by-predicate scheduler, which must also wake rules
    /// whose negated body atoms mention a freshly produced predicate.
    pub fn atoms_with_negated(&self) -> Vec<&Atom> {
        let mut out = Vec::new();
        self.collect_atoms(true, &mut out);
        out
    }

    fn collect_atoms<'a>(&'a self, cross_negation: bool, out: &mut Vec<&'a Atom>) {
        match self {
            Formula::Atom(atom) => out.push(atom),
            Formula::And(l, r) | Formula::Or(l, r) => {
                l.collect_atoms(cross_negation, out);
                r.collect_atoms(cross_negation, out);
            }
            Formula::Not(inner) => {
                if cross_negation {
                    inner.collect_atoms(cross_negation, out);
                }
            }
            Formula::Exists(_, inner) | Formula::Forall(_, inner) => {
                inner.collect_atoms(cross_negation, out);
            }
        }
    }

    /// Split a disjunction into its disjuncts (left-to-right)
    pub fn disjuncts(&self) -> Vec<&Formula> {
        match self {
            Formula::Or(l, r) => {
                let mut out = l.disjuncts();
                out.extend(r.disjuncts());
                out
            }
            _ => vec![self],
        }
    }

    /// Split a disjunction-free formula into its single-piece parts
    ///
    /// A piece is a maximal variable-induced connected component of the
    /// formula's atoms. Each returned piece is a conjunction of its
    /// atoms re-quantified over the existential variables it contains,
    /// so each piece is a well-formed head on its own. A formula with
    /// at most one atom is returned unchanged.
    pub fn single_pieces(&self) -> Vec<Formula> {
        let atoms = self.atoms();
        if atoms.len() <= 1 {
            return vec![self.clone()];
        }
        let existentials = self.existential_variables();

        // Union atoms that share a variable, then walk the components.
        let vars_per_atom: Vec<BTreeSet<Variable>> =
            atoms.iter().map(|a| a.variables()).collect();
        let mut component: Vec<usize> = (0..atoms.len()).collect();
        for i in 0..atoms.len() {
            for j in (i + 1)..atoms.len() {
                if !vars_per_atom[i].is_disjoint(&vars_per_atom[j]) {
                    let (ci, cj) = (component[i], component[j]);
                    if ci != cj {
                        for c in component.iter_mut() {
                            if *c == cj {
                                *c = ci;
                            }
                        }
                    }
                }
            }
        }

        let mut roots: Vec<usize> = component.clone();
        roots.sort_unstable();
        roots.dedup();

        roots
            .into_iter()
            .filter_map(|root| {
                let piece_atoms: Vec<Atom> = atoms
                    .iter()
                    .zip(&component)
                    .filter(|(_, c)| **c == root)
                    .map(|(a, _)| (*a).clone())
                    .collect();
                let mut piece_vars = BTreeSet::new();
                for atom in &piece_atoms {
                    piece_vars.extend(atom.variables());
                }
                let mut piece = Formula::conjunction_of(piece_atoms)?;
                for var in existentials.iter().rev() {
                    if piece_vars.contains(var) {
                        piece = Formula::exists(var.clone(), piece);
                    }
                }
                Some(piece)
            })
            .collect()
    }
}

impl From<Atom> for Formula {
    fn from(atom: Atom) -> Self {
        Formula::Atom(atom)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Atom(atom) => write!(f, "{atom}"),
            Formula::And(l, r) => write!(f, "({l} \u{2227} {r})"),
            Formula::Or(l, r) => write!(f, "({l} \u{2228} {r})"),
            Formula::Not(inner) => write!(f, "\u{00ac}({inner})"),
            Formula::Exists(v, inner) => write!(f, "\u{2203}{v}.({inner})"),
            Formula::Forall(v, inner) => write!(f, "\u{2200}{v}.({inner})"),
        }
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
