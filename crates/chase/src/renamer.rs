//! Existential renaming: what a fired trigger instantiates `∃Y` with
//!
//! The fresh renamer allocates a brand-new null per firing. The
//! pseudo-skolem family caches its choice per (rule, key) so the same
//! trigger always reuses the same null. The true-skolem family emits
//! logical function terms whose identity *is* the key, enabling
//! convergence arguments for the skolem chase.

use ahash::AHashMap;
use atom_model::{FunctionTerm, Rule, Substitution, Term, Variable};
use std::collections::BTreeMap;

/// Computes the full application substitution for a trigger
///
/// The result extends the body substitution with one binding per
/// existential variable of the rule.
pub trait ExistentialRenamer: Send {
    /// Rename the rule's existentials under the given trigger
    fn rename(&mut self, rule_index: usize, rule: &Rule, substitution: &Substitution)
        -> Substitution;
}

/// Join a body substitution with existential bindings
fn extend(substitution: &Substitution, bindings: BTreeMap<Variable, Term>) -> Substitution {
    let mut full = substitution.clone();
    for (variable, term) in bindings {
        full.insert(variable, term);
    }
    full
}

/// The trigger key the skolem families cache on
#[derive(Clone, PartialEq, Eq, Hash)]
enum SkolemKey {
    /// Full body substitution
    Body(Substitution),
    /// Substitution restricted to the frontier
    Frontier(Substitution),
    /// Frontier restriction of one head piece
    Piece(usize, Substitution),
}

/// Shared cache of the skolem families
#[derive(Default)]
struct SkolemCache {
    names: AHashMap<(usize, SkolemKey), BTreeMap<Variable, Term>>,
    counters: AHashMap<usize, u64>,
}

impl SkolemCache {
    /// The cached existential bindings for a trigger key, creating
    /// them with `make` on first use
    fn bindings<'a>(
        &mut self,
        rule_index: usize,
        key: SkolemKey,
        existentials: impl Iterator<Item = &'a Variable>,
        mut make: impl FnMut(u64) -> Term,
    ) -> BTreeMap<Variable, Term> {
        let counter = self.counters.entry(rule_index).or_insert(0);
        let slot = self.names.entry((rule_index, key)).or_default();
        for variable in existentials {
            if !slot.contains_key(variable) {
                *counter += 1;
                slot.insert(variable.clone(), make(*counter));
            }
        }
        slot.clone()
    }
}

/// A new unique null for every existential, every firing
#[derive(Debug, Default)]
pub struct FreshRenamer;

impl FreshRenamer {
    /// Create a fresh renamer
    pub fn new() -> Self {
        Self
    }
}

impl ExistentialRenamer for FreshRenamer {
    fn rename(
        &mut self,
        _rule_index: usize,
        rule: &Rule,
        substitution: &Substitution,
    ) -> Substitution {
        let bindings = rule
            .existential_variables()
            .iter()
            .map(|v| (v.clone(), Term::Variable(Variable::fresh())))
            .collect();
        extend(substitution, bindings)
    }
}

/// Skolem naming: which key identifies a trigger, and which term kind
/// stands in for the existential
struct SkolemRenamer {
    cache: SkolemCache,
    keying: Keying,
    true_skolem: bool,
    family: &'static str,
}

#[derive(Clone, Copy)]
enum Keying {
    Body,
    Frontier,
    FrontierByPiece,
}

impl SkolemRenamer {
    fn new(keying: Keying, true_skolem: bool, family: &'static str) -> Self {
        Self {
            cache: SkolemCache::default(),
            keying,
            true_skolem,
            family,
        }
    }

    fn skolem_term(
        &self,
        rule: &Rule,
        counter: u64,
        key_substitution: &Substitution,
    ) -> Term {
        let label = rule.label().unwrap_or("anon");
        let name = format!("sk_{}_{}_{}", self.family, label, counter);
        let args: Vec<Term> = key_substitution.iter().map(|(_, t)| t.clone()).collect();
        Term::LogicalFunction(FunctionTerm::new(name, args))
    }

    fn rename(
        &mut self,
        rule_index: usize,
        rule: &Rule,
        substitution: &Substitution,
    ) -> Substitution {
        match self.keying {
            Keying::Body => {
                let key_substitution = substitution.normalize();
                self.rename_with_key(
                    rule_index,
                    rule,
                    substitution,
                    SkolemKey::Body(key_substitution.clone()),
                    &key_substitution,
                    None,
                )
            }
            Keying::Frontier => {
                let key_substitution = substitution.restrict(rule.frontier());
                self.rename_with_key(
                    rule_index,
                    rule,
                    substitution,
                    SkolemKey::Frontier(key_substitution.clone()),
                    &key_substitution,
                    None,
                )
            }
            Keying::FrontierByPiece => {
                let pieces = rule.split_single_pieces().unwrap_or_default();
                let mut all = BTreeMap::new();
                for (piece_index, piece_rule) in pieces.iter().enumerate() {
                    let key_substitution = substitution.restrict(piece_rule.frontier());
                    let bound = self.rename_with_key(
                        rule_index,
                        piece_rule,
                        &Substitution::new(),
                        SkolemKey::Piece(piece_index, key_substitution.clone()),
                        &key_substitution,
                        Some(piece_index),
                    );
                    for (variable, term) in bound.iter() {
                        all.insert(variable.clone(), term.clone());
                    }
                }
                extend(substitution, all)
            }
        }
    }

    fn rename_with_key(
        &mut self,
        rule_index: usize,
        rule: &Rule,
        substitution: &Substitution,
        key: SkolemKey,
        key_substitution: &Substitution,
        _piece: Option<usize>,
    ) -> Substitution {
        let true_skolem = self.true_skolem;
        let bindings = if true_skolem {
            let family = self.family;
            let label = rule.label().unwrap_or("anon").to_string();
            let args: Vec<Term> = key_substitution.iter().map(|(_, t)| t.clone()).collect();
            self.cache.bindings(
                rule_index,
                key,
                rule.existential_variables().iter(),
                move |counter| {
                    let name = format!("sk_{family}_{label}_{counter}");
                    Term::LogicalFunction(FunctionTerm::new(name, args.clone()))
                },
            )
        } else {
            self.cache.bindings(
                rule_index,
                key,
                rule.existential_variables().iter(),
                |_| Term::Variable(Variable::fresh()),
            )
        };
        extend(substitution, bindings)
    }
}

macro_rules! skolem_renamer {
    ($(#[$doc:meta])* $name:ident, $keying:expr, $true_skolem:expr, $family:literal) => {
        $(#[$doc])*
        pub struct $name {
            inner: SkolemRenamer,
        }

        impl $name {
            /// Create the renamer with an empty cache
            pub fn new() -> Self {
                Self {
                    inner: SkolemRenamer::new($keying, $true_skolem, $family),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ExistentialRenamer for $name {
            fn rename(
                &mut self,
                rule_index: usize,
                rule: &Rule,
                substitution: &Substitution,
            ) -> Substitution {
                self.inner.rename(rule_index, rule, substitution)
            }
        }
    };
}

skolem_renamer!(
    /// Nulls cached per (rule, full body substitution)
    BodyPseudoSkolem,
    Keying::Body,
    false,
    "body"
);
skolem_renamer!(
    /// Nulls cached per (rule, frontier restriction)
    FrontierPseudoSkolem,
    Keying::Frontier,
    false,
    "frontier"
);
skolem_renamer!(
    /// Nulls cached per (rule, head piece, piece frontier restriction)
    FrontierByPiecePseudoSkolem,
    Keying::FrontierByPiece,
    false,
    "frontier_piece"
);
skolem_renamer!(
    /// Logical function terms keyed by the full body substitution
    BodyTrueSkolem,
    Keying::Body,
    true,
    "body"
);
skolem_renamer!(
    /// Logical function terms keyed by the frontier restriction
    FrontierTrueSkolem,
    Keying::Frontier,
    true,
    "frontier"
);
skolem_renamer!(
    /// Logical function terms keyed per head piece
    FrontierByPieceTrueSkolem,
    Keying::FrontierByPiece,
    true,
    "frontier_piece"
);
