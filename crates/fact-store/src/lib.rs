//! Pluggable fact storage for existential-rule reasoning
//!
//! This crate provides a trait-based abstraction over fact sources,
//! allowing the same evaluation machinery to work with:
//! - The in-memory graph store (predicate and term indexed)
//! - Built-in comparison predicates
//! - Computed predicates backed by a function registry
//! - Wrappers: virtual deletion, routed unions, missing-as-empty
//!
//! # Design Principles
//!
//! 1. **`Data` trait**: the minimal queryable contract every source
//!    implements; richer capabilities layer on top.
//! 2. **No match is no error**: an absent predicate inside a plain
//!    store yields an empty iterator; only a *routed* collection
//!    reports [`StoreError::UnknownPredicate`], and the
//!    [`MissingAsEmpty`] adapter turns even that into emptiness.
//! 3. **Deterministic iteration**: FxHash is unseeded, so identical
//!    insertion histories replay identically within a process.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod collection;
mod comparison;
mod functions;
mod memory;
mod pattern;
mod virtual_deletion;

pub use collection::{DataCollection, MissingAsEmpty};
pub use comparison::ComparisonSource;
pub use functions::{function_predicate, FunctionRegistry, FunctionSource, StandardFunction};
pub use memory::InMemoryGraphStore;
pub use pattern::{AtomicPattern, PositionConstraint};
pub use virtual_deletion::{reconstruct_atom, VirtualDeletionStore, WithoutAtoms};

use atom_model::{Atom, Constant, Predicate, Rule, Term, Variable};
use std::collections::BTreeSet;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A lazy sequence of answer tuples
///
/// Each tuple has the query's answer width, ordered by ascending
/// answer position.
pub type TupleIter<'a> = Box<dyn Iterator<Item = Vec<Term>> + 'a>;

/// Errors that can occur in storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A routed collection was asked about a predicate no source owns
    #[error("no source owns predicate: {0}")]
    UnknownPredicate(String),

    /// A storage refused an atom on its acceptance rules
    #[error("atom {atom} rejected by storage: {reason}")]
    Rejected {
        /// The refused atom, rendered
        atom: String,
        /// The storage's reason
        reason: String,
    },

    /// A source was asked for a capability it does not implement
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Invalid model value handed to the storage layer
    #[error(transparent)]
    Model(#[from] atom_model::ModelError),
}

/// Outcome of an acceptance check on a writable storage
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Acceptance {
    /// Whether the predicate/atom is accepted
    pub accepted: bool,
    /// Reason for a rejection, if any
    pub reason: Option<String>,
}

impl Acceptance {
    /// Accept unconditionally
    pub fn ok() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    /// Reject with a reason
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// A queryable fact source
///
/// The contract every source implements: enumerate predicates,
/// describe per-position constraints, and answer [`BasicQuery`]s.
/// Results are deduplicated only if the source natively deduplicates;
/// consumers must not assume uniqueness.
///
/// Sources are `Send + Sync` so the multi-threaded rule applier can
/// share them across its worker pool.
///
/// [`BasicQuery`]: atom_model::BasicQuery
pub trait Data: Send + Sync {
    /// All predicates available in this source
    fn predicates(&self) -> Vec<Predicate>;

    /// Check if this source contains the given predicate
    fn has_predicate(&self, predicate: &Predicate) -> bool;

    /// Per-position query constraints for a predicate, if known here
    fn atomic_pattern(&self, predicate: &Predicate) -> Option<AtomicPattern>;

    /// Evaluate a basic query into a lazy sequence of answer tuples
    fn evaluate<'a>(&'a self, query: &atom_model::BasicQuery) -> StoreResult<TupleIter<'a>>;

    /// Check whether this source can answer the query as posed
    fn can_evaluate(&self, query: &atom_model::BasicQuery) -> bool {
        match self.atomic_pattern(query.predicate()) {
            Some(pattern) => pattern.admits(query),
            None => false,
        }
    }

    /// Advisory estimate of the result size, `None` when unknown
    ///
    /// The join planner prefers atoms with small bounds; correctness
    /// never depends on the estimate.
    fn estimate_bound(&self, _query: &atom_model::BasicQuery) -> Option<usize> {
        None
    }
}

/// A fully materialized source: every atom is enumerable
pub trait MaterializedData: Data {
    /// Iterate over all atoms
    fn atoms(&self) -> Box<dyn Iterator<Item = &Atom> + '_>;

    /// Number of atoms
    fn len(&self) -> usize;

    /// True when the source holds no atom
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exact containment check
    fn contains(&self, atom: &Atom) -> bool;

    /// All variables appearing in stored atoms
    fn variables(&self) -> BTreeSet<Variable> {
        let mut out = BTreeSet::new();
        for atom in self.atoms() {
            out.extend(atom.variables());
        }
        out
    }

    /// All constants appearing in stored atoms
    fn constants(&self) -> BTreeSet<Constant> {
        let mut out = BTreeSet::new();
        for atom in self.atoms() {
            out.extend(atom.constants());
        }
        out
    }

    /// All terms appearing in stored atoms
    fn terms(&self) -> BTreeSet<Term> {
        let mut out = BTreeSet::new();
        for atom in self.atoms() {
            out.extend(atom.terms().iter().cloned());
        }
        out
    }
}

/// A mutable fact source
pub trait Writable {
    /// Acceptance rule for a predicate; accept-all by default
    fn accepts_predicate(&self, _predicate: &Predicate) -> Acceptance {
        Acceptance::ok()
    }

    /// Acceptance rule for an atom; accept-all by default
    fn accepts_atom(&self, _atom: &Atom) -> Acceptance {
        Acceptance::ok()
    }

    /// Insert an atom; `Ok(true)` when it was newly added
    ///
    /// Acceptance failures surface as [`StoreError::Rejected`].
    fn add(&mut self, atom: Atom) -> StoreResult<bool>;

    /// Insert many atoms; returns the number newly added
    fn add_all(&mut self, atoms: Vec<Atom>) -> StoreResult<usize> {
        let mut added = 0;
        for atom in atoms {
            if self.add(atom)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove an atom; removing an absent atom is a no-op
    fn remove(&mut self, atom: &Atom) -> bool;

    /// Remove many atoms; returns the number actually removed
    fn remove_all(&mut self, atoms: &[Atom]) -> usize {
        atoms.iter().filter(|a| self.remove(a)).count()
    }
}

/// A store that can saturate datalog rule batches natively
///
/// Discovered through [`FactBase::datalog_delegable`]; the
/// source-delegated applier hands such stores their datalog rules as
/// one batch per step.
pub trait DatalogDelegable {
    /// Apply a batch of datalog rules; `Ok(true)` when facts changed
    ///
    /// A `true` return stands for "unknown new facts": the caller
    /// cannot enumerate them and records the step result accordingly.
    fn delegate_rules(&mut self, rules: &[Rule]) -> StoreResult<bool>;
}

/// A complete fact base: queryable, materialized and writable
pub trait FactBase: Data + MaterializedData + Writable {
    /// View this fact base as a plain data source
    fn as_data(&self) -> &dyn Data;

    /// View this fact base as a materialized source
    fn as_materialized(&self) -> &dyn MaterializedData;

    /// Access the datalog-delegation capability, when implemented
    fn datalog_delegable(&mut self) -> Option<&mut dyn DatalogDelegable> {
        None
    }
}
