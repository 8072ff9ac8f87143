//! Virtual deletion: hide atoms without touching the wrapped store

use crate::pattern::AtomicPattern;
use crate::{
    Acceptance, Data, FactBase, MaterializedData, StoreResult, TupleIter, Writable,
};
use atom_model::{Atom, BasicQuery, Predicate, Term};
use rustc_hash::FxHashSet;

/// Rebuild the atom a result tuple came from
///
/// Positions are filled from the query's bound terms and the tuple's
/// answer values; a query with ignored wildcard positions cannot be
/// reconstructed and yields `None`.
pub fn reconstruct_atom(query: &BasicQuery, tuple: &[Term]) -> Option<Atom> {
    let arity = query.predicate().arity();
    let mut terms: Vec<Option<Term>> = vec![None; arity];
    for (position, term) in query.bound_positions() {
        terms[*position] = Some(term.clone());
    }
    for (value, position) in tuple.iter().zip(query.answer_variables().keys()) {
        terms[*position] = Some(value.clone());
    }
    let terms: Option<Vec<Term>> = terms.into_iter().collect();
    Atom::new(query.predicate().clone(), terms?).ok()
}

/// A writable store whose removals stay virtual until drained
///
/// `remove` adds to the virtual set without touching the underlying
/// store; reads filter the virtual set; [`concrete_deletions`]
/// turns the virtual set into real removals.
///
/// [`concrete_deletions`]: VirtualDeletionStore::concrete_deletions
pub struct VirtualDeletionStore<S> {
    inner: S,
    removed: FxHashSet<Atom>,
}

impl<S: FactBase> VirtualDeletionStore<S> {
    /// Wrap a store with an empty virtual-deletion set
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            removed: FxHashSet::default(),
        }
    }

    /// The atoms currently virtually removed
    pub fn removed_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.removed.iter()
    }

    /// Drain the virtual set into real removals on the wrapped store
    ///
    /// Returns the number of atoms concretely removed.
    pub fn concrete_deletions(&mut self) -> usize {
        let drained: Vec<Atom> = self.removed.drain().collect();
        drained.iter().filter(|a| self.inner.remove(a)).count()
    }

    /// Unwrap, discarding any still-virtual removals
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: FactBase> Data for VirtualDeletionStore<S> {
    fn predicates(&self) -> Vec<Predicate> {
        self.inner.predicates()
    }

    fn has_predicate(&self, predicate: &Predicate) -> bool {
        self.inner.has_predicate(predicate)
    }

    fn atomic_pattern(&self, predicate: &Predicate) -> Option<AtomicPattern> {
        self.inner.atomic_pattern(predicate)
    }

    fn evaluate<'a>(&'a self, query: &BasicQuery) -> StoreResult<TupleIter<'a>> {
        let inner = self.inner.evaluate(query)?;
        let removed = &self.removed;
        let query = query.clone();
        Ok(Box::new(inner.filter(move |tuple| {
            match reconstruct_atom(&query, tuple) {
                Some(atom) => !removed.contains(&atom),
                None => true,
            }
        })))
    }

    fn can_evaluate(&self, query: &BasicQuery) -> bool {
        self.inner.can_evaluate(query)
    }

    fn estimate_bound(&self, query: &BasicQuery) -> Option<usize> {
        self.inner.estimate_bound(query)
    }
}

impl<S: FactBase> MaterializedData for VirtualDeletionStore<S> {
    fn atoms(&self) -> Box<dyn Iterator<Item = &Atom> + '_> {
        Box::new(self.inner.atoms().filter(|a| !self.removed.contains(*a)))
    }

    fn len(&self) -> usize {
        self.inner.len() - self.removed.len()
    }

    fn contains(&self, atom: &Atom) -> bool {
        !self.removed.contains(atom) && self.inner.contains(atom)
    }
}

impl<S: FactBase> Writable for VirtualDeletionStore<S> {
    fn accepts_predicate(&self, predicate: &Predicate) -> Acceptance {
        self.inner.accepts_predicate(predicate)
    }

    fn accepts_atom(&self, atom: &Atom) -> Acceptance {
        self.inner.accepts_atom(atom)
    }

    fn add(&mut self, atom: Atom) -> StoreResult<bool> {
        let was_virtual = self.removed.remove(&atom);
        let added = self.inner.add(atom)?;
        Ok(added || was_virtual)
    }

    fn remove(&mut self, atom: &Atom) -> bool {
        if self.inner.contains(atom) && !self.removed.contains(atom) {
            self.removed.insert(atom.clone());
            true
        } else {
            false
        }
    }
}

impl<S: FactBase> FactBase for VirtualDeletionStore<S> {
    fn as_data(&self) -> &dyn Data {
        self
    }

    fn as_materialized(&self) -> &dyn MaterializedData {
        self
    }
}

/// Read-only view subtracting a fact set from a source
///
/// The semi-naive trigger computer uses this to join non-anchor atoms
/// against "everything but the last step's facts".
pub struct WithoutAtoms<'a> {
    inner: &'a dyn Data,
    removed: &'a dyn MaterializedData,
}

impl<'a> WithoutAtoms<'a> {
    /// A view of `inner` without the atoms of `removed`
    pub fn new(inner: &'a dyn Data, removed: &'a dyn MaterializedData) -> Self {
        Self { inner, removed }
    }
}

impl Data for WithoutAtoms<'_> {
    fn predicates(&self) -> Vec<Predicate> {
        self.inner.predicates()
    }

    fn has_predicate(&self, predicate: &Predicate) -> bool {
        self.inner.has_predicate(predicate)
    }

    fn atomic_pattern(&self, predicate: &Predicate) -> Option<AtomicPattern> {
        self.inner.atomic_pattern(predicate)
    }

    fn evaluate<'b>(&'b self, query: &BasicQuery) -> StoreResult<TupleIter<'b>> {
        let inner = self.inner.evaluate(query)?;
        let removed = self.removed;
        let query = query.clone();
        Ok(Box::new(inner.filter(move |tuple| {
            match reconstruct_atom(&query, tuple) {
                Some(atom) => !removed.contains(&atom),
                None => true,
            }
        })))
    }

    fn can_evaluate(&self, query: &BasicQuery) -> bool {
        self.inner.can_evaluate(query)
    }

    fn estimate_bound(&self, query: &BasicQuery) -> Option<usize> {
        self.inner.estimate_bound(query)
    }
}
