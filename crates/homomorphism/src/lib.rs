//! Homomorphism search and first-order query evaluation
//!
//! The join engine at the heart of both rule application and query
//! answering:
//! - [`HomomorphismIterator`]: lazy backtracking join of an atom set
//!   against a [`Data`] source, driven by an explicit frame stack
//! - [`FoQueryEvaluator`]: dispatch over the full formula sum
//!   (conjunction, disjunction, negation as failure, quantifiers)
//!
//! # Design Principles
//!
//! 1. **Plan fallibly, iterate infallibly**: atom reordering, equality
//!    elimination, function-term expansion and safety checks happen in
//!    constructors that return `Result`; iteration then only produces
//!    substitutions.
//! 2. **Advisory planning**: the greedy most-constrained-first order
//!    uses `estimate_bound` where available, but correctness never
//!    depends on the ordering.
//! 3. **Empty, not error**: unmatched atoms, failed function
//!    evaluations and absent predicates in plain stores all contribute
//!    zero tuples.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod evaluator;
mod join;
mod plan;

pub use evaluator::{FoQueryEvaluator, SubstitutionIter};
pub use join::HomomorphismIterator;

use fact_store::StoreError;

/// Result type for query evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while planning or validating a query
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// A storage-layer failure (unknown predicate in a routed union,
    /// rejected atom, unsupported capability)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid model value built during planning
    #[error(transparent)]
    Model(#[from] atom_model::ModelError),

    /// A negated subformula is not range-restricted by its context
    #[error("unsafely quantified negation: {0}")]
    UnsafeNegation(String),

    /// The chosen evaluation path cannot handle this construct
    #[error("unsupported query construct: {0}")]
    UnsupportedQuery(String),
}
