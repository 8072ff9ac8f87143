//! Logical vocabulary for existential-rule reasoning
//!
//! This crate provides the value types shared by every layer of the
//! engine:
//! - Interned terms (variables, constants, literals, blank nodes,
//!   function terms) with cheap clones
//! - Atoms over fixed-arity predicates
//! - A sealed first-order formula sum
//! - Substitutions with `apply`/`compose`/`normalize`
//! - Rules, rule bases and negative constraints
//! - Query value types (`BasicQuery`, `ConjunctiveQuery`, `FoQuery`)
//!
//! # Design Principles
//!
//! 1. **Structural equality**: two terms with the same identifier are
//!    the same value; interning only removes duplicate allocations.
//! 2. **Deterministic iteration**: variable sets are `BTreeSet`s and
//!    substitutions are `BTreeMap`s so every traversal order is stable.
//! 3. **Closed sums**: terms and formulas are enums; dispatch is a
//!    `match`, never a vtable.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod atom;
mod formula;
mod interner;
mod literal;
mod query;
mod rule;
mod substitution;
mod term;

pub use atom::{Atom, Predicate, COMPARISON_OPERATORS, EQUALITY_PREDICATE_NAME};
pub use formula::Formula;
pub use interner::TermFactory;
pub use literal::{
    ComparisonKey, Literal, LiteralPolicy, XSD_BOOLEAN, XSD_DECIMAL, XSD_INTEGER, XSD_STRING,
};
pub use query::{BasicQuery, ConjunctiveQuery, FoQuery};
pub use rule::{NegativeConstraint, Rule, RuleBase};
pub use substitution::Substitution;
pub use term::{BlankNode, Constant, FunctionTerm, Term, Variable};

/// Result type for model construction
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building model values
///
/// These are the eager, fatal validation errors of the vocabulary
/// layer; "no match" situations are never represented here.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An atom was built with a term count different from its
    /// predicate's arity
    #[error("atom over {predicate} expects {expected} terms, got {actual}")]
    ArityMismatch {
        /// Offending predicate rendered as `name/arity`
        predicate: String,
        /// Arity declared by the predicate
        expected: usize,
        /// Number of terms supplied
        actual: usize,
    },

    /// A rule's body and head disagree on their free variables
    #[error("rule body and head must share their free variables (body: {body:?}, head: {head:?})")]
    FrontierMismatch {
        /// Free variable names of the body
        body: Vec<String>,
        /// Free variable names of the head
        head: Vec<String>,
    },

    /// An existential head variable also occurs free in the body
    #[error("existential variable {0} occurs free in the rule body")]
    ExistentialInBody(String),

    /// A query referred to a position outside the predicate's arity
    #[error("position {position} is out of range for {predicate}")]
    PositionOutOfRange {
        /// Predicate rendered as `name/arity`
        predicate: String,
        /// Offending position
        position: usize,
    },

    /// A query bound and projected the same position
    #[error("position {0} cannot be both bound and an answer position")]
    ConflictingPosition(usize),

    /// An operator name is not one of the comparison predicates
    #[error("unknown comparison operator: {0}")]
    UnknownComparisonOperator(String),

    /// A disjunct index was out of range for a rule head
    #[error("head disjunct index {index} out of range ({count} disjuncts)")]
    DisjunctOutOfRange {
        /// Requested disjunct
        index: usize,
        /// Number of disjuncts in the head
        count: usize,
    },
}
