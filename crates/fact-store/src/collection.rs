//! Unions of data sources
//!
//! A [`DataCollection`] routes each predicate to exactly one source
//! (the first one claiming it); asking for a predicate no source owns
//! is [`StoreError::UnknownPredicate`]. Callers that prefer silence
//! over failure wrap the union in [`MissingAsEmpty`].

use crate::pattern::AtomicPattern;
use crate::{Data, StoreError, StoreResult, TupleIter};
use atom_model::{BasicQuery, Predicate};

/// A predicate-routed union of borrowed sources
///
/// Routing happens at query time (sources are probed in order), so a
/// source growing new predicates mid-run is picked up immediately.
pub struct DataCollection<'a> {
    sources: Vec<&'a dyn Data>,
}

impl<'a> DataCollection<'a> {
    /// An empty collection
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Build from an ordered list of sources
    pub fn from_sources(sources: Vec<&'a dyn Data>) -> Self {
        Self { sources }
    }

    /// Append a source with lower routing priority than existing ones
    pub fn push(&mut self, source: &'a dyn Data) {
        self.sources.push(source);
    }

    /// The source owning a predicate, if any
    fn source_for(&self, predicate: &Predicate) -> Option<&'a dyn Data> {
        self.sources
            .iter()
            .copied()
            .find(|s| s.has_predicate(predicate))
    }
}

impl Default for DataCollection<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Data for DataCollection<'_> {
    fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        for source in &self.sources {
            for predicate in source.predicates() {
                if !out.contains(&predicate) {
                    out.push(predicate);
                }
            }
        }
        out
    }

    fn has_predicate(&self, predicate: &Predicate) -> bool {
        self.source_for(predicate).is_some()
    }

    fn atomic_pattern(&self, predicate: &Predicate) -> Option<AtomicPattern> {
        self.source_for(predicate)?.atomic_pattern(predicate)
    }

    fn evaluate<'b>(&'b self, query: &BasicQuery) -> StoreResult<TupleIter<'b>> {
        match self.source_for(query.predicate()) {
            Some(source) => source.evaluate(query),
            None => Err(StoreError::UnknownPredicate(format!(
                "{:?}",
                query.predicate()
            ))),
        }
    }

    fn can_evaluate(&self, query: &BasicQuery) -> bool {
        self.source_for(query.predicate())
            .map(|s| s.can_evaluate(query))
            .unwrap_or(false)
    }

    fn estimate_bound(&self, query: &BasicQuery) -> Option<usize> {
        self.source_for(query.predicate())?.estimate_bound(query)
    }
}

/// Adapter translating unknown predicates into empty results
///
/// The chase reads through this view: a rule body mentioning a
/// predicate no source has produced yet simply finds no trigger.
pub struct MissingAsEmpty<D>(pub D);

impl<D: Data> Data for MissingAsEmpty<D> {
    fn predicates(&self) -> Vec<Predicate> {
        self.0.predicates()
    }

    fn has_predicate(&self, predicate: &Predicate) -> bool {
        self.0.has_predicate(predicate)
    }

    fn atomic_pattern(&self, predicate: &Predicate) -> Option<AtomicPattern> {
        self.0
            .atomic_pattern(predicate)
            .or_else(|| Some(AtomicPattern::unconstrained(predicate.clone())))
    }

    fn evaluate<'a>(&'a self, query: &BasicQuery) -> StoreResult<TupleIter<'a>> {
        match self.0.evaluate(query) {
            Ok(results) => Ok(results),
            Err(StoreError::UnknownPredicate(_)) => Ok(Box::new(std::iter::empty())),
            Err(other) => Err(other),
        }
    }

    fn can_evaluate(&self, query: &BasicQuery) -> bool {
        // Unknown predicates are answerable (with nothing).
        !self.0.has_predicate(query.predicate()) || self.0.can_evaluate(query)
    }

    fn estimate_bound(&self, query: &BasicQuery) -> Option<usize> {
        if self.0.has_predicate(query.predicate()) {
            self.0.estimate_bound(query)
        } else {
            Some(0)
        }
    }
}
