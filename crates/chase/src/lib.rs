//! The chase: saturation of a fact base under existential rules
//!
//! Orchestrates the standard saturation loop with pluggable policies:
//!
//! ```text
//! apply_global_pretreatments
//! while all halting conditions report continue:
//!     apply_step_pretreatments
//!     rules ← scheduler.rules_to_apply(last_step.applied_rules)
//!     last_step ← rule_applier.apply(rules, chasable_data)
//!     apply_end_of_step_treatments
//! apply_global_end_treatments
//! ```
//!
//! Every stage is swappable through the [`ChaseBuilder`]: scheduler
//! (naive / by-predicate / GRD), trigger computer (naive / semi-naive /
//! two-steps / restricted), trigger checker (always-true / oblivious /
//! semi-oblivious / restricted / equivalent / composite), existential
//! renamer (fresh / pseudo-skolem / true-skolem families), facts
//! handler (direct / delegated), halting conditions and treatments.
//! The [`StratifiedChase`] meta-algorithm runs one inner chase per
//! stratum of the rule base.
//!
//! # Design Principles
//!
//! 1. **Rule identity is the index** into the rule base's list;
//!    schedulers, step results and memo caches all speak in indices,
//!    never in back-references.
//! 2. **Routine emptiness is not an error**: unmatched bodies, rejected
//!    triggers and unknown predicates produce no work; only structural
//!    misuse (builder misconfiguration, lifecycle violations, storage
//!    rejections) is fatal.
//! 3. **Steps are transactions over frozen inputs**: the scheduler's
//!    output, the checker's memo and the renamer's cache are consulted
//!    against the state at step start.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod applier;
mod body;
mod builder;
mod chase;
mod checker;
mod compilation;
mod computer;
mod constraints;
mod data;
mod grd;
mod halting;
mod renamer;
mod scheduler;
mod step;
mod stratified;
mod treatment;
mod unify;

pub use applier::{
    BreadthFirstApplier, DelegatedApplication, DirectApplication, FactsHandler,
    MultiThreadApplier, RuleApplier, SourceDelegatedDatalogApplier, TriggerApplier,
};
pub use body::{group_rules_by_body, AllTransformer, BodyToQuery, FrontierTransformer};
pub use builder::{
    ApplierKind, ChaseBuilder, CheckerKind, ComputerKind, FactsHandlerKind, RenamerKind,
    SchedulerKind, TransformerKind,
};
pub use chase::{Chase, ChaseCore, ChaseView};
pub use checker::{
    AlwaysTrueChecker, EquivalentChecker, MultiChecker, ObliviousChecker, RestrictedChecker,
    SemiObliviousChecker, TriggerChecker,
};
pub use compilation::{NoCompilation, RuleCompilation};
pub use computer::{
    NaiveComputer, RestrictedComputer, SemiNaiveComputer, TriggerComputer, TwoStepsComputer,
};
pub use constraints::find_violation;
pub use data::ChasableData;
pub use grd::Grd;
pub use halting::{
    CreatedFactsAtPreviousStep, ExternalInterruption, HaltingCondition, HasRulesToApply,
    LimitAtoms, LimitSteps, Timeout,
};
pub use renamer::{
    BodyPseudoSkolem, BodyTrueSkolem, ExistentialRenamer, FreshRenamer,
    FrontierByPiecePseudoSkolem, FrontierByPieceTrueSkolem, FrontierPseudoSkolem,
    FrontierTrueSkolem,
};
pub use scheduler::{ByPredicateScheduler, GrdScheduler, NaiveScheduler, RuleScheduler};
pub use step::{StepContext, StepResult};
pub use stratified::{
    stratify, StratificationStrategy, StratifiedChase, StratifiedChaseBuilder,
};
pub use treatment::{
    AddCreatedFacts, ComputeCore, ComputeLocalCore, CoreProcessor, Debug, PredicateFilter,
    RuleSplit, Treatment,
};
pub use unify::{matches, unify};

/// Result type for chase operations
pub type ChaseResult<T> = Result<T, ChaseError>;

/// Errors raised by the chase engine
#[derive(Debug, thiserror::Error)]
pub enum ChaseError {
    /// Builder or chase used before required dependencies were set, or
    /// reconfigured after execution started
    #[error("chase configuration error: {0}")]
    Configuration(String),

    /// A component was used against a rule base it was never
    /// initialized for
    #[error("chase lifecycle error: {0}")]
    Lifecycle(String),

    /// Storage-layer failure (rejected atom, unknown predicate in a
    /// routed union)
    #[error(transparent)]
    Store(#[from] fact_store::StoreError),

    /// Query-evaluation failure while computing or checking triggers
    #[error(transparent)]
    Eval(#[from] homomorphism::EvalError),

    /// Invalid model value built during rule application
    #[error(transparent)]
    Model(#[from] atom_model::ModelError),
}
