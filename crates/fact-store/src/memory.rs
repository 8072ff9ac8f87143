//! The in-memory graph store
//!
//! Keeps three indexes in lockstep: the atom set, predicate → atoms
//! and term → atoms. Query evaluation picks the smallest applicable
//! bucket as its candidate set and filters the rest.

use crate::pattern::AtomicPattern;
use crate::{Acceptance, Data, FactBase, MaterializedData, StoreResult, TupleIter, Writable};
use atom_model::{Atom, BasicQuery, Predicate, Term};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

/// In-memory fact base with predicate and term indexes
///
/// Accepts any atom, including atoms containing variables (the chase
/// stores labelled nulls this way). Iteration order is deterministic
/// within a process for identical insertion histories.
#[derive(Clone, Default)]
pub struct InMemoryGraphStore {
    atoms: FxHashSet<Atom>,
    by_predicate: FxHashMap<Predicate, FxHashSet<Atom>>,
    by_term: FxHashMap<Term, FxHashSet<Atom>>,
}

impl InMemoryGraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given atoms
    pub fn with_atoms(atoms: impl IntoIterator<Item = Atom>) -> Self {
        let mut store = Self::new();
        for atom in atoms {
            store.insert(atom);
        }
        store
    }

    /// Insert without the acceptance round-trip (infallible here)
    fn insert(&mut self, atom: Atom) -> bool {
        if self.atoms.contains(&atom) {
            return false;
        }
        self.by_predicate
            .entry(atom.predicate().clone())
            .or_default()
            .insert(atom.clone());
        for term in atom.terms() {
            self.by_term
                .entry(term.clone())
                .or_default()
                .insert(atom.clone());
        }
        trace!(atom = %atom, "store add");
        self.atoms.insert(atom);
        true
    }

    /// The candidate bucket for a query: the smallest index bucket
    /// among the predicate bucket and the buckets of bound terms
    fn candidates(&self, query: &BasicQuery) -> Option<&FxHashSet<Atom>> {
        let by_predicate = self.by_predicate.get(query.predicate())?;
        let mut best = by_predicate;
        for term in query.bound_positions().values() {
            match self.by_term.get(term) {
                Some(bucket) if bucket.len() < best.len() => best = bucket,
                Some(_) => {}
                // A bound term absent from the store: nothing matches.
                None => return None,
            }
        }
        Some(best)
    }
}

impl Data for InMemoryGraphStore {
    fn predicates(&self) -> Vec<Predicate> {
        self.by_predicate.keys().cloned().collect()
    }

    fn has_predicate(&self, predicate: &Predicate) -> bool {
        self.by_predicate.contains_key(predicate)
    }

    fn atomic_pattern(&self, predicate: &Predicate) -> Option<AtomicPattern> {
        Some(AtomicPattern::unconstrained(predicate.clone()))
    }

    fn evaluate<'a>(&'a self, query: &BasicQuery) -> StoreResult<TupleIter<'a>> {
        let Some(candidates) = self.candidates(query) else {
            return Ok(Box::new(std::iter::empty()));
        };
        let predicate = query.predicate().clone();
        let bound = query.bound_positions().clone();
        let answer_positions: Vec<usize> = query.answer_variables().keys().copied().collect();

        Ok(Box::new(candidates.iter().filter_map(move |atom| {
            if atom.predicate() != &predicate {
                return None;
            }
            if bound
                .iter()
                .any(|(position, term)| atom.term(*position) != Some(term))
            {
                return None;
            }
            Some(
                answer_positions
                    .iter()
                    .filter_map(|position| atom.term(*position).cloned())
                    .collect(),
            )
        })))
    }

    fn can_evaluate(&self, _query: &BasicQuery) -> bool {
        true
    }

    fn estimate_bound(&self, query: &BasicQuery) -> Option<usize> {
        Some(self.candidates(query).map(FxHashSet::len).unwrap_or(0))
    }
}

impl MaterializedData for InMemoryGraphStore {
    fn atoms(&self) -> Box<dyn Iterator<Item = &Atom> + '_> {
        Box::new(self.atoms.iter())
    }

    fn len(&self) -> usize {
        self.atoms.len()
    }

    fn contains(&self, atom: &Atom) -> bool {
        self.atoms.contains(atom)
    }
}

impl Writable for InMemoryGraphStore {
    fn accepts_atom(&self, _atom: &Atom) -> Acceptance {
        // Variables are welcome: the chase stores labelled nulls.
        Acceptance::ok()
    }

    fn add(&mut self, atom: Atom) -> StoreResult<bool> {
        Ok(self.insert(atom))
    }

    fn remove(&mut self, atom: &Atom) -> bool {
        if !self.atoms.remove(atom) {
            return false;
        }
        if let Some(bucket) = self.by_predicate.get_mut(atom.predicate()) {
            bucket.remove(atom);
            if bucket.is_empty() {
                self.by_predicate.remove(atom.predicate());
            }
        }
        for term in atom.terms() {
            if let Some(bucket) = self.by_term.get_mut(term) {
                bucket.remove(atom);
                if bucket.is_empty() {
                    self.by_term.remove(term);
                }
            }
        }
        trace!(atom = %atom, "store remove");
        true
    }
}

impl FactBase for InMemoryGraphStore {
    fn as_data(&self) -> &dyn Data {
        self
    }

    fn as_materialized(&self) -> &dyn MaterializedData {
        self
    }
}

impl std::fmt::Debug for InMemoryGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGraphStore")
            .field("atoms", &self.atoms.len())
            .field("predicates", &self.by_predicate.len())
            .finish()
    }
}
